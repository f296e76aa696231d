use tracing::debug;

use crate::platform::{ChatPlatform, IncomingMessage};

/// Outcome of the authorization gate for a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    Denied(DenyReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No roles configured; the gate fails closed.
    EmptyAllowList,
    /// Member or role lookup failed; treated as denial, not as an error.
    LookupFailed,
    MissingRole,
    /// Direct message with no verification guild configured.
    NoVerificationGuild,
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allowed)
    }
}

/// Decide whether the author of `msg` may use the relay. The decision is
/// computed fresh on every call; role membership is never cached.
pub async fn decide<P: ChatPlatform + ?Sized>(
    platform: &P,
    allow_list: &[String],
    verification_guild: Option<&str>,
    msg: &IncomingMessage,
) -> AuthDecision {
    if allow_list.is_empty() {
        return AuthDecision::Denied(DenyReason::EmptyAllowList);
    }

    let lookup_guild = match (&msg.guild_id, verification_guild) {
        (Some(guild_id), _) => guild_id.as_str(),
        (None, Some(guild_id)) => guild_id,
        (None, None) => return AuthDecision::Denied(DenyReason::NoVerificationGuild),
    };

    let roles = match platform.member_role_ids(lookup_guild, &msg.author_id).await {
        Ok(roles) => roles,
        Err(e) => {
            debug!(
                user_id = %msg.author_id,
                guild_id = %lookup_guild,
                "role lookup failed, denying: {:#}",
                e
            );
            return AuthDecision::Denied(DenyReason::LookupFailed);
        }
    };

    if roles.iter().any(|role| allow_list.contains(role)) {
        AuthDecision::Allowed
    } else {
        AuthDecision::Denied(DenyReason::MissingRole)
    }
}
