//! Bot configuration loaded from the environment (and `.env` via dotenvy), with CLI overrides.

#[cfg(test)]
mod tests;

use std::env;
use std::time::Duration;

use anyhow::Result;
use dbot_interact::{PollMonitorConfig, RegistryConfig};
use dbot_telegram::{ConnectRetry, TelegramConfig};

/// Placeholder shipped in sample configs; rejected so a copied `.env` fails loudly.
pub const CHANNEL_PLACEHOLDER: &str = "YOUR_CHANNEL_ID";
pub const DEFAULT_LOG_FILE: &str = "logs/dbot.log";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 7;
pub const DEFAULT_REGISTRY_CAPACITY: usize = 10_000;
pub const DEFAULT_TOKEN_LENGTH: usize = 26;
pub const DEFAULT_CONNECT_RETRY_SECS: u64 = 120;
/// Token length bounds. 48 keeps callback data under Telegram's 64-byte limit.
pub const MIN_TOKEN_LENGTH: usize = 16;
pub const MAX_TOKEN_LENGTH: usize = 48;

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// BOT_TOKEN
    pub bot_token: String,
    /// BOT_CHANNELS, comma-separated chat ids: the default audience and the monitored chats.
    pub channels: Vec<i64>,
    /// LOG_FILE
    pub log_file: String,
    /// TELEGRAM_API_URL or TELOXIDE_API_URL
    pub telegram_api_url: Option<String>,
    /// POLL_INTERVAL_SECS
    pub poll_interval_secs: u64,
    /// ACTION_REGISTRY_CAPACITY
    pub registry_capacity: usize,
    /// ACTION_TOKEN_LENGTH
    pub token_length: usize,
    /// OUTBOUND_DELAY_MS, pause before each broadcast send.
    pub outbound_delay_ms: u64,
    /// CONNECT_RETRY_SECS, wait between failed logins.
    pub connect_retry_secs: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Parses comma-separated chat ids.
pub fn parse_channels<S: AsRef<str>>(raw: &[S]) -> Result<Vec<i64>> {
    let mut channels = Vec::new();
    for part in raw.iter().flat_map(|s| s.as_ref().split(',')) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if part == CHANNEL_PLACEHOLDER {
            anyhow::bail!("Please set your channel id (found placeholder {})", CHANNEL_PLACEHOLDER);
        }
        let id: i64 = part
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid chat id in BOT_CHANNELS: {}", part))?;
        if !channels.contains(&id) {
            channels.push(id);
        }
    }
    Ok(channels)
}

impl BotConfig {
    /// Loads from environment variables. `token` overrides BOT_TOKEN and non-empty `channels`
    /// override BOT_CHANNELS.
    pub fn load(token: Option<String>, channels: Vec<String>) -> Result<Self> {
        let bot_token = match token.or_else(|| env::var("BOT_TOKEN").ok()) {
            Some(token) => token,
            None => anyhow::bail!("BOT_TOKEN not set"),
        };
        let channels = if channels.is_empty() {
            parse_channels(&[env::var("BOT_CHANNELS").unwrap_or_default()])?
        } else {
            parse_channels(&channels)?
        };
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
        let telegram_api_url = env::var("TELEGRAM_API_URL")
            .or_else(|_| env::var("TELOXIDE_API_URL"))
            .ok();

        Ok(Self {
            bot_token,
            channels,
            log_file,
            telegram_api_url,
            poll_interval_secs: env_or("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS),
            registry_capacity: env_or("ACTION_REGISTRY_CAPACITY", DEFAULT_REGISTRY_CAPACITY),
            token_length: env_or("ACTION_TOKEN_LENGTH", DEFAULT_TOKEN_LENGTH),
            outbound_delay_ms: env_or("OUTBOUND_DELAY_MS", 0),
            connect_retry_secs: env_or("CONNECT_RETRY_SECS", DEFAULT_CONNECT_RETRY_SECS),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            anyhow::bail!("BOT_TOKEN is empty");
        }
        if self.channels.is_empty() {
            anyhow::bail!("BOT_CHANNELS must list at least one chat id");
        }
        if let Some(ref url_str) = self.telegram_api_url {
            if reqwest::Url::parse(url_str).is_err() {
                anyhow::bail!(
                    "TELEGRAM_API_URL (or TELOXIDE_API_URL) is set but not a valid URL: {}",
                    url_str
                );
            }
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("POLL_INTERVAL_SECS must be at least 1");
        }
        if self.connect_retry_secs == 0 {
            anyhow::bail!("CONNECT_RETRY_SECS must be at least 1");
        }
        if self.registry_capacity == 0 {
            anyhow::bail!("ACTION_REGISTRY_CAPACITY must be at least 1");
        }
        if !(MIN_TOKEN_LENGTH..=MAX_TOKEN_LENGTH).contains(&self.token_length) {
            anyhow::bail!(
                "ACTION_TOKEN_LENGTH must be between {} and {}, got {}",
                MIN_TOKEN_LENGTH,
                MAX_TOKEN_LENGTH,
                self.token_length
            );
        }
        Ok(())
    }

    pub fn telegram(&self) -> TelegramConfig {
        TelegramConfig::new(self.bot_token.clone(), self.telegram_api_url.clone())
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            token_length: self.token_length,
            capacity: self.registry_capacity,
            ..RegistryConfig::default()
        }
    }

    pub fn poll_monitor_config(&self) -> PollMonitorConfig {
        PollMonitorConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
        }
    }

    pub fn outbound_delay(&self) -> Duration {
        Duration::from_millis(self.outbound_delay_ms)
    }

    /// Login retried forever, every CONNECT_RETRY_SECS.
    pub fn connect_retry(&self) -> ConnectRetry {
        ConnectRetry {
            interval: Duration::from_secs(self.connect_retry_secs),
            max_attempts: None,
        }
    }
}
