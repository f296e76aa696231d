use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub discord: DiscordConfig,
    pub backend: BackendConfig,
    #[serde(default = "default_log_config")]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    pub token: String,
    /// Comma-separated role ids allowed to use the relay. Empty means nobody.
    #[serde(default)]
    pub allowed_role_ids: String,
    /// Guild whose roles authorize direct-message use. Without it, DMs are
    /// always denied.
    #[serde(default)]
    pub verification_guild_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub webhook_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_config() -> LogConfig {
    LogConfig {
        level: default_log_level(),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.discord.token.trim().is_empty() {
            anyhow::bail!("discord.token is missing or empty");
        }
        if self.backend.webhook_url.trim().is_empty() {
            anyhow::bail!("backend.webhook_url is missing or empty");
        }
        Ok(())
    }

    /// Parsed role allow-list; blank entries are dropped.
    pub fn allowed_role_ids(&self) -> Vec<String> {
        self.discord
            .allowed_role_ids
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
