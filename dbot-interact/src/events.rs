//! Application-level bot events.

use async_trait::async_trait;
use dbot_core::Reaction;

/// Events the application layer (the user bot) reacts to. Every method defaults to a no-op.
#[async_trait]
pub trait AppEvents: Send + Sync {
    /// The transport connection is established.
    async fn on_connected(&self) {}
    /// A control was triggered whose token no longer resolves (stale or previous-version buttons).
    async fn on_action_not_found(&self, _token: &str) {}
    /// The bot was mentioned; `text` has the mention removed.
    async fn on_mention(&self, _text: &str) {}
    /// A `!`-prefixed message was posted in a monitored chat.
    async fn on_command(&self, _text: &str) {}
    /// A user reacted to a message in a monitored chat.
    async fn on_reaction(&self, _reaction: &Reaction) {}
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl AppEvents for NoopEvents {}
