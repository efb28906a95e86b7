//! Logging in to Telegram, retried until it succeeds.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::{info, warn};

pub const DEFAULT_CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(120);

/// One login attempt. Returns the bot's username when it has one.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Option<String>>;
}

#[async_trait]
impl Connector for Bot {
    async fn connect(&self) -> Result<Option<String>> {
        let me = self
            .get_me()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to Telegram: {}", e))?;
        Ok(me.user.username.clone())
    }
}

/// How failed logins are retried.
#[derive(Debug, Clone)]
pub struct ConnectRetry {
    pub interval: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ConnectRetry {
    fn default() -> Self {
        Self {
            interval: DEFAULT_CONNECT_RETRY_INTERVAL,
            max_attempts: None,
        }
    }
}

/// Calls `connector` until it succeeds, sleeping `retry.interval` after each failure.
///
/// Fails with the last error once `retry.max_attempts` attempts have failed.
pub async fn connect_with_retry<C>(connector: &C, retry: &ConnectRetry) -> Result<Option<String>>
where
    C: Connector + ?Sized,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match connector.connect().await {
            Ok(username) => {
                info!(attempt, "Connected to Telegram");
                return Ok(username);
            }
            Err(e) if retry.max_attempts.is_some_and(|max| attempt >= max) => {
                return Err(e.context(format!("Giving up after {} login attempts", attempt)));
            }
            Err(e) => {
                warn!(
                    attempt,
                    retry_in_secs = retry.interval.as_secs(),
                    error = %e,
                    "Login failed, retrying"
                );
                tokio::time::sleep(retry.interval).await;
            }
        }
    }
}
