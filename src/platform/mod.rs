pub mod discord;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A message received from the chat platform, reduced to what the relay
/// needs. Produced by the platform adapter; read-only to the core.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: String,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub guild_id: Option<String>,
    pub guild_name: Option<String>,
    pub author_id: String,
    /// Display tag of the author (e.g. "user#1234" or plain username).
    pub author_tag: String,
    pub author_is_bot: bool,
    pub text: String,
    /// User ids mentioned in the message body.
    pub mentioned_user_ids: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    /// Set when this message is itself a reply to another message.
    pub referenced_message_id: Option<String>,
}

impl IncomingMessage {
    pub fn is_direct(&self) -> bool {
        self.guild_id.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: String,
    pub name: Option<String>,
    pub url: Option<String>,
    pub size: Option<u64>,
    pub content_type: Option<String>,
}

/// The narrow surface of the chat platform the relay consumes. Every call is
/// fallible; callers degrade failures to a safe default instead of
/// propagating them.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// The relay's own user id, once the platform session has established it.
    fn self_id(&self) -> Option<String>;

    /// Role ids of a member in a guild.
    async fn member_role_ids(&self, guild_id: &str, user_id: &str) -> Result<Vec<String>>;

    async fn fetch_message(&self, channel_id: &str, message_id: &str) -> Result<IncomingMessage>;

    async fn send_message(&self, channel_id: &str, text: &str) -> Result<()>;

    /// Send `text` as a reply to a specific message, without pinging the
    /// replied-to user.
    async fn reply_to(&self, channel_id: &str, message_id: &str, text: &str) -> Result<()>;

    async fn trigger_typing(&self, channel_id: &str) -> Result<()>;
}

#[cfg(test)]
pub mod testutil {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// What a mock delivery looked like: a plain send or a reply to a
    /// specific message.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Sent {
        Message { channel_id: String, text: String },
        Reply {
            channel_id: String,
            message_id: String,
            text: String,
        },
    }

    /// Recording platform double for router/auth/delivery tests.
    #[derive(Default)]
    pub struct MockPlatform {
        pub self_id: Option<String>,
        /// (guild_id, user_id) -> role ids; absent key means lookup failure.
        pub roles: HashMap<(String, String), Vec<String>>,
        /// message_id -> message, for `fetch_message`.
        pub messages: HashMap<String, IncomingMessage>,
        pub sent: Mutex<Vec<Sent>>,
        pub typing_count: Mutex<u32>,
    }

    impl MockPlatform {
        pub fn with_self_id(id: &str) -> Self {
            Self {
                self_id: Some(id.to_string()),
                ..Default::default()
            }
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        pub fn typing_count(&self) -> u32 {
            *self.typing_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl ChatPlatform for MockPlatform {
        fn self_id(&self) -> Option<String> {
            self.self_id.clone()
        }

        async fn member_role_ids(&self, guild_id: &str, user_id: &str) -> Result<Vec<String>> {
            self.roles
                .get(&(guild_id.to_string(), user_id.to_string()))
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("member not found"))
        }

        async fn fetch_message(
            &self,
            _channel_id: &str,
            message_id: &str,
        ) -> Result<IncomingMessage> {
            self.messages
                .get(message_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("message not found"))
        }

        async fn send_message(&self, channel_id: &str, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(Sent::Message {
                channel_id: channel_id.to_string(),
                text: text.to_string(),
            });
            Ok(())
        }

        async fn reply_to(&self, channel_id: &str, message_id: &str, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(Sent::Reply {
                channel_id: channel_id.to_string(),
                message_id: message_id.to_string(),
                text: text.to_string(),
            });
            Ok(())
        }

        async fn trigger_typing(&self, _channel_id: &str) -> Result<()> {
            *self.typing_count.lock().unwrap() += 1;
            Ok(())
        }
    }

    /// A guild message with sensible defaults for tests.
    pub fn guild_message(id: &str, author_id: &str, text: &str) -> IncomingMessage {
        IncomingMessage {
            id: id.to_string(),
            channel_id: "chan-1".to_string(),
            channel_name: Some("general".to_string()),
            guild_id: Some("guild-1".to_string()),
            guild_name: Some("Test Guild".to_string()),
            author_id: author_id.to_string(),
            author_tag: format!("{author_id}#0001"),
            author_is_bot: false,
            text: text.to_string(),
            mentioned_user_ids: Vec::new(),
            attachments: Vec::new(),
            created_at: Utc::now(),
            edited_at: None,
            referenced_message_id: None,
        }
    }

    /// A direct message with sensible defaults for tests.
    pub fn direct_message(id: &str, author_id: &str, text: &str) -> IncomingMessage {
        IncomingMessage {
            guild_id: None,
            guild_name: None,
            channel_name: None,
            ..guild_message(id, author_id, text)
        }
    }
}
