use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::platform::IncomingMessage;

/// Canonical record posted to the automation backend. Immutable once built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundPayload {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message_id: String,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub guild_id: Option<String>,
    pub guild_name: Option<String>,
    pub author: PayloadAuthor,
    pub content: PayloadContent,
    pub attachments: Vec<PayloadAttachment>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub is_edit: bool,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayloadAuthor {
    pub id: String,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayloadContent {
    pub id: String,
    /// Sanitized text, self-mentions removed.
    pub text: String,
    /// Original text as received.
    pub raw: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadAttachment {
    pub id: String,
    pub name: Option<String>,
    pub url: Option<String>,
    pub size: Option<u64>,
    pub content_type: Option<String>,
}

/// Strip self-mentions (`<@ID>` and `<@!ID>`) from `raw`, collapse runs of
/// whitespace to single spaces, and trim. With no known self id, only trims.
pub fn sanitize(raw: &str, self_id: Option<&str>) -> String {
    let Some(id) = self_id else {
        return raw.trim().to_string();
    };

    let stripped = raw
        .replace(&format!("<@!{id}>"), " ")
        .replace(&format!("<@{id}>"), " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the outbound payload for a message. `is_edit` is carried through
/// unchanged; the permalink exists only for guild messages.
pub fn build(msg: &IncomingMessage, is_edit: bool, self_id: Option<&str>) -> OutboundPayload {
    let link = msg.guild_id.as_ref().map(|guild_id| {
        format!(
            "https://discord.com/channels/{}/{}/{}",
            guild_id, msg.channel_id, msg.id
        )
    });

    OutboundPayload {
        kind: "chat",
        message_id: msg.id.clone(),
        channel_id: msg.channel_id.clone(),
        channel_name: msg.channel_name.clone(),
        guild_id: msg.guild_id.clone(),
        guild_name: msg.guild_name.clone(),
        author: PayloadAuthor {
            id: msg.author_id.clone(),
            tag: msg.author_tag.clone(),
        },
        content: PayloadContent {
            id: msg.id.clone(),
            text: sanitize(&msg.text, self_id),
            raw: msg.text.clone(),
        },
        attachments: msg
            .attachments
            .iter()
            .map(|a| PayloadAttachment {
                id: a.id.clone(),
                name: a.name.clone(),
                url: a.url.clone(),
                size: a.size,
                content_type: a.content_type.clone(),
            })
            .collect(),
        created_at: msg.created_at,
        edited_at: msg.edited_at,
        is_edit,
        link,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testutil::{direct_message, guild_message};

    #[test]
    fn test_sanitize_strips_both_mention_forms() {
        let text = "<@42> hello <@!42> world";
        assert_eq!(sanitize(text, Some("42")), "hello world");
    }

    #[test]
    fn test_sanitize_collapses_whitespace() {
        assert_eq!(sanitize("  a \n\n b   c ", Some("42")), "a b c");
    }

    #[test]
    fn test_sanitize_without_self_id_only_trims() {
        assert_eq!(sanitize("  <@42> hi  ", None), "<@42> hi");
    }

    #[test]
    fn test_sanitize_keeps_other_mentions() {
        assert_eq!(sanitize("<@42> ping <@99>", Some("42")), "ping <@99>");
    }

    #[test]
    fn test_build_guild_message_has_link() {
        let msg = guild_message("m1", "user-1", "<@bot> do the thing");
        let payload = build(&msg, false, Some("bot"));

        assert_eq!(
            payload.link.as_deref(),
            Some("https://discord.com/channels/guild-1/chan-1/m1")
        );
        assert_eq!(payload.content.text, "do the thing");
        assert_eq!(payload.content.raw, "<@bot> do the thing");
        assert!(!payload.is_edit);
    }

    #[test]
    fn test_build_direct_message_has_no_link() {
        let msg = direct_message("m1", "user-1", "hello");
        let payload = build(&msg, true, Some("bot"));

        assert!(payload.link.is_none());
        assert!(payload.is_edit);
    }

    #[test]
    fn test_wire_field_names() {
        let msg = guild_message("m1", "user-1", "hello");
        let payload = build(&msg, false, Some("bot"));
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["type"], "chat");
        assert_eq!(value["messageId"], "m1");
        assert_eq!(value["channelId"], "chan-1");
        assert_eq!(value["channelName"], "general");
        assert_eq!(value["guildId"], "guild-1");
        assert_eq!(value["author"]["id"], "user-1");
        assert_eq!(value["author"]["tag"], "user-1#0001");
        assert_eq!(value["content"]["raw"], "hello");
        assert_eq!(value["isEdit"], false);
        assert!(value["createdAt"].is_string());
        assert!(value.get("link").is_some());
    }
}
