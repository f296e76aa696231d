use std::sync::{Arc, OnceLock};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::Utc;
use serenity::all::{
    ChannelId, Client, Context, CreateAllowedMentions, CreateMessage, EventHandler,
    GatewayIntents, GuildId, Message, MessageId, MessageReference, MessageUpdateEvent, Ready,
    UserId,
};
use serenity::http::Http;
use tracing::info;

use crate::backend::HttpBackend;
use crate::config::Config;
use crate::router::{EditEvent, EventRouter, RouterEvent};

use super::{Attachment, ChatPlatform, IncomingMessage};

/// Serenity-backed implementation of the platform surface. REST calls go
/// through its own `Http` handle; the gateway connection lives in the client.
pub struct DiscordPlatform {
    http: Arc<Http>,
    self_id: OnceLock<String>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            self_id: OnceLock::new(),
        }
    }

    fn set_self_id(&self, id: String) {
        let _ = self.self_id.set(id);
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    fn self_id(&self) -> Option<String> {
        self.self_id.get().cloned()
    }

    async fn member_role_ids(&self, guild_id: &str, user_id: &str) -> Result<Vec<String>> {
        let guild: u64 = guild_id.parse().context("invalid guild id")?;
        let user: u64 = user_id.parse().context("invalid user id")?;
        let member = self
            .http
            .get_member(GuildId::new(guild), UserId::new(user))
            .await?;
        Ok(member.roles.iter().map(|r| r.to_string()).collect())
    }

    async fn fetch_message(&self, channel_id: &str, message_id: &str) -> Result<IncomingMessage> {
        let channel: u64 = channel_id.parse().context("invalid channel id")?;
        let message: u64 = message_id.parse().context("invalid message id")?;
        let msg = self
            .http
            .get_message(ChannelId::new(channel), MessageId::new(message))
            .await?;
        Ok(convert(&msg))
    }

    async fn send_message(&self, channel_id: &str, text: &str) -> Result<()> {
        let channel: u64 = channel_id.parse().context("invalid channel id")?;
        ChannelId::new(channel).say(&self.http, text).await?;
        Ok(())
    }

    async fn reply_to(&self, channel_id: &str, message_id: &str, text: &str) -> Result<()> {
        let channel = ChannelId::new(channel_id.parse().context("invalid channel id")?);
        let message = MessageId::new(message_id.parse().context("invalid message id")?);

        let builder = CreateMessage::new()
            .content(text)
            .reference_message(MessageReference::from((channel, message)))
            .allowed_mentions(CreateAllowedMentions::new().replied_user(false));
        channel.send_message(&self.http, builder).await?;
        Ok(())
    }

    async fn trigger_typing(&self, channel_id: &str) -> Result<()> {
        let channel: u64 = channel_id.parse().context("invalid channel id")?;
        ChannelId::new(channel).broadcast_typing(&self.http).await?;
        Ok(())
    }
}

fn convert(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        id: msg.id.to_string(),
        channel_id: msg.channel_id.to_string(),
        channel_name: None,
        guild_id: msg.guild_id.map(|g| g.to_string()),
        guild_name: None,
        author_id: msg.author.id.to_string(),
        author_tag: msg.author.tag(),
        author_is_bot: msg.author.bot,
        text: msg.content.clone(),
        mentioned_user_ids: msg.mentions.iter().map(|u| u.id.to_string()).collect(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| Attachment {
                id: a.id.to_string(),
                name: Some(a.filename.clone()),
                url: Some(a.url.clone()),
                size: Some(u64::from(a.size)),
                content_type: a.content_type.clone(),
            })
            .collect(),
        created_at: msg.timestamp.with_timezone(&Utc),
        edited_at: msg.edited_timestamp.map(|t| t.with_timezone(&Utc)),
        referenced_message_id: msg
            .message_reference
            .as_ref()
            .and_then(|r| r.message_id)
            .map(|id| id.to_string()),
    }
}

/// Fill in channel and guild names, best-effort. Name lookups never block a
/// message; any failure leaves the field empty.
async fn enrich(http: &Http, mut msg: IncomingMessage) -> IncomingMessage {
    let Some(guild) = msg.guild_id.as_ref().and_then(|g| g.parse::<u64>().ok()) else {
        return msg;
    };

    if let Ok(guild) = GuildId::new(guild).to_partial_guild(http).await {
        msg.guild_name = Some(guild.name);
    }
    if let Ok(channel) = msg.channel_id.parse::<u64>() {
        if let Ok(channel) = http.get_channel(ChannelId::new(channel)).await {
            msg.channel_name = channel.guild().map(|c| c.name);
        }
    }

    msg
}

struct Handler {
    platform: Arc<DiscordPlatform>,
    router: Arc<EventRouter<DiscordPlatform, HttpBackend>>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "connected to Discord"
        );
        self.platform.set_self_id(ready.user.id.to_string());
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let incoming = enrich(&ctx.http, convert(&msg)).await;
        self.router
            .handle(RouterEvent::MessageCreated(incoming))
            .await;
    }

    async fn message_update(
        &self,
        ctx: Context,
        old_if_available: Option<Message>,
        new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        let old = old_if_available.as_ref().map(convert);
        let new = match new {
            Some(msg) => Some(enrich(&ctx.http, convert(&msg)).await),
            None => None,
        };

        let edit = EditEvent {
            channel_id: event.channel_id.to_string(),
            message_id: event.id.to_string(),
            guild_id: event.guild_id.map(|g| g.to_string()),
            old,
            new,
        };
        self.router.handle(RouterEvent::MessageEdited(edit)).await;
    }
}

fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

/// Connect to the gateway and relay events until a shutdown signal. Returns
/// an error when login fails; returns normally after a graceful interrupt.
pub async fn run(config: Config) -> Result<()> {
    let http = Arc::new(Http::new(&config.discord.token));
    let platform = Arc::new(DiscordPlatform::new(http));
    let backend = Arc::new(HttpBackend::new(
        config.backend.webhook_url.clone(),
        config.backend.timeout_ms,
    ));
    let router = Arc::new(EventRouter::new(
        platform.clone(),
        backend,
        config.allowed_role_ids(),
        config.discord.verification_guild_id.clone(),
    ));

    let handler = Handler { platform, router };
    let mut client = Client::builder(&config.discord.token, intents())
        .event_handler(handler)
        .await
        .context("Failed to create Discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down...");
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await.context("Discord client error")?;
    Ok(())
}
