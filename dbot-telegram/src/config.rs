//! Telegram connection settings and bot construction.

use teloxide::Bot;
use tracing::{error, info};

/// Token and optional Bot API server for one Telegram bot.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Custom Bot API server (e.g. a local `telegram-bot-api`); `None` uses api.telegram.org.
    pub telegram_api_url: Option<String>,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, telegram_api_url: Option<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            telegram_api_url,
        }
    }

    pub fn with_token(bot_token: impl Into<String>) -> Self {
        Self::new(bot_token, None)
    }

    /// Builds the teloxide bot. An unparsable API URL is logged and the default server is used.
    pub fn build_bot(&self) -> Bot {
        let bot = Bot::new(self.bot_token.clone());
        let Some(url_str) = &self.telegram_api_url else {
            return bot;
        };
        match reqwest::Url::parse(url_str) {
            Ok(url) => {
                info!(url = %url, "Using custom Telegram API URL");
                bot.set_api_url(url)
            }
            Err(e) => {
                error!(error = %e, url = %url_str, "Invalid TELEGRAM_API_URL, using default");
                bot
            }
        }
    }
}
