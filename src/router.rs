use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::{self, AuthDecision};
use crate::backend::{Backend, BackendResult};
use crate::delivery;
use crate::heartbeat::TypingHeartbeat;
use crate::normalize;
use crate::payload;
use crate::platform::{ChatPlatform, IncomingMessage};

const DENIED_MESSAGE: &str = "Sorry, you are not authorized to use this bot.";
const BACKEND_UNAVAILABLE_MESSAGE: &str =
    "Sorry, I couldn't reach the automation backend. Please try again later.";

/// The closed set of platform events the router consumes.
#[derive(Debug, Clone)]
pub enum RouterEvent {
    MessageCreated(IncomingMessage),
    MessageEdited(EditEvent),
}

/// An edit as the gateway reports it. Either side may be missing: the old
/// version when it was never cached, the new one when the gateway sent only
/// a partial update.
#[derive(Debug, Clone)]
pub struct EditEvent {
    pub channel_id: String,
    pub message_id: String,
    /// Guild of the edited message as the gateway reported it; a message
    /// refetched over REST does not carry one itself.
    pub guild_id: Option<String>,
    pub old: Option<IncomingMessage>,
    pub new: Option<IncomingMessage>,
}

/// Terminal state of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Ignored,
    Denied,
    Processed,
}

/// Top-level controller: decides trigger eligibility for created and edited
/// messages and drives gate, payload, backend call, normalization and reply
/// delivery. Collaborators are injected; the router holds no platform
/// session state of its own.
pub struct EventRouter<P, B> {
    platform: Arc<P>,
    backend: Arc<B>,
    allow_list: Vec<String>,
    verification_guild: Option<String>,
}

impl<P, B> EventRouter<P, B>
where
    P: ChatPlatform + 'static,
    B: Backend,
{
    pub fn new(
        platform: Arc<P>,
        backend: Arc<B>,
        allow_list: Vec<String>,
        verification_guild: Option<String>,
    ) -> Self {
        Self {
            platform,
            backend,
            allow_list,
            verification_guild,
        }
    }

    pub async fn handle(&self, event: RouterEvent) -> RouteOutcome {
        match event {
            RouterEvent::MessageCreated(msg) => self.handle_created(msg).await,
            RouterEvent::MessageEdited(edit) => self.handle_edited(edit).await,
        }
    }

    async fn handle_created(&self, msg: IncomingMessage) -> RouteOutcome {
        if msg.author_is_bot {
            return RouteOutcome::Ignored;
        }

        // Direct messages always reach the gate; guild messages must address
        // the relay first.
        if !msg.is_direct() && !self.is_triggered(&msg).await {
            return RouteOutcome::Ignored;
        }

        self.process(&msg, false).await
    }

    async fn handle_edited(&self, edit: EditEvent) -> RouteOutcome {
        let new_msg = match edit.new {
            Some(msg) => msg,
            None => {
                match self
                    .platform
                    .fetch_message(&edit.channel_id, &edit.message_id)
                    .await
                {
                    Ok(mut msg) => {
                        // A REST-fetched message has no guild of its own.
                        msg.guild_id = msg.guild_id.or_else(|| edit.guild_id.clone());
                        msg
                    }
                    Err(e) => {
                        debug!(
                            message_id = %edit.message_id,
                            "skipping edit, refetch failed: {:#}",
                            e
                        );
                        return RouteOutcome::Ignored;
                    }
                }
            }
        };

        if new_msg.author_is_bot {
            return RouteOutcome::Ignored;
        }

        // Process only the not-triggered -> triggered transition, so an edit
        // that adds the mention reacts while keystroke-level edits of an
        // already-handled message do not. An unavailable old version counts
        // as not triggered.
        let was_triggered = match &edit.old {
            Some(old) => self.is_triggered(old).await,
            None => false,
        };
        let is_triggered = self.is_triggered(&new_msg).await;

        if was_triggered || !is_triggered {
            return RouteOutcome::Ignored;
        }

        self.process(&new_msg, true).await
    }

    /// Whether a message addresses the relay: direct messages always do;
    /// guild messages must mention the relay or reply to one of its
    /// messages. Lookup failures degrade to "not triggered".
    async fn is_triggered(&self, msg: &IncomingMessage) -> bool {
        if msg.is_direct() {
            return true;
        }

        let Some(self_id) = self.platform.self_id() else {
            return false;
        };

        if msg.mentioned_user_ids.contains(&self_id) {
            return true;
        }

        if let Some(referenced_id) = &msg.referenced_message_id {
            match self
                .platform
                .fetch_message(&msg.channel_id, referenced_id)
                .await
            {
                Ok(referenced) => return referenced.author_id == self_id,
                Err(e) => {
                    debug!(
                        message_id = %referenced_id,
                        "referenced message lookup failed: {:#}",
                        e
                    );
                    return false;
                }
            }
        }

        false
    }

    async fn process(&self, msg: &IncomingMessage, is_edit: bool) -> RouteOutcome {
        let decision = auth::decide(
            self.platform.as_ref(),
            &self.allow_list,
            self.verification_guild.as_deref(),
            msg,
        )
        .await;

        if let AuthDecision::Denied(reason) = decision {
            info!(user_id = %msg.author_id, ?reason, "authorization denied");
            if let Err(e) = self
                .platform
                .send_message(&msg.channel_id, DENIED_MESSAGE)
                .await
            {
                warn!("failed to send denial notice: {:#}", e);
            }
            return RouteOutcome::Denied;
        }

        let payload = payload::build(msg, is_edit, self.platform.self_id().as_deref());

        let mut heartbeat =
            TypingHeartbeat::start(self.platform.clone(), msg.channel_id.clone()).await;
        let result = self.backend.invoke(&payload).await;
        heartbeat.stop();

        match &result {
            BackendResult::Failure(failure) => {
                warn!(message_id = %msg.id, ?failure, "backend call failed");
                if let Err(e) = self
                    .platform
                    .send_message(&msg.channel_id, BACKEND_UNAVAILABLE_MESSAGE)
                    .await
                {
                    warn!("failed to send fallback notice: {:#}", e);
                }
            }
            BackendResult::Success { status, .. } => {
                debug!(message_id = %msg.id, status = *status, "backend responded");
                match normalize::normalize(&result) {
                    Some(text) => delivery::deliver(self.platform.as_ref(), msg, &text).await,
                    None => debug!(message_id = %msg.id, "backend produced no reply"),
                }
            }
        }

        RouteOutcome::Processed
    }
}
