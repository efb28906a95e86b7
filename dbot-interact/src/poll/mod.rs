//! Polls: sending, tracking and periodic monitoring of time-boxed votes.

mod entry;
mod monitor;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dbot_core::PollHandle;

pub use monitor::{PollMonitor, PollMonitorConfig, DEFAULT_POLL_INTERVAL};

/// What a poll callback is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollEvent {
    /// At least one answer's vote count changed since the previous tick.
    Update,
    /// The reminder delay elapsed before enough users voted.
    Reminder,
    /// The poll expired; answers carry the final tallies.
    Complete,
}

impl fmt::Display for PollEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollEvent::Update => write!(f, "update"),
            PollEvent::Reminder => write!(f, "reminder"),
            PollEvent::Complete => write!(f, "complete"),
        }
    }
}

/// Live state of one answer handed to poll callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct PollAnswerState {
    pub index: usize,
    /// Caller-supplied id of the answer, or its index when none was given.
    pub id: String,
    pub text: String,
    pub vote_count: u32,
    /// Caller-supplied opaque payload.
    pub data: Option<serde_json::Value>,
}

#[async_trait]
pub trait PollCallback: Send + Sync {
    async fn on_event(
        &self,
        event: PollEvent,
        poll: &PollHandle,
        answers: &[PollAnswerState],
    ) -> anyhow::Result<()>;
}

struct FnPollCallback<F>(F);

#[async_trait]
impl<F, Fut> PollCallback for FnPollCallback<F>
where
    F: Fn(PollEvent, PollHandle, Vec<PollAnswerState>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn on_event(
        &self,
        event: PollEvent,
        poll: &PollHandle,
        answers: &[PollAnswerState],
    ) -> anyhow::Result<()> {
        (self.0)(event, poll.clone(), answers.to_vec()).await
    }
}

/// Wraps an async closure as a [`PollCallback`].
pub fn poll_fn<F, Fut>(f: F) -> Arc<dyn PollCallback>
where
    F: Fn(PollEvent, PollHandle, Vec<PollAnswerState>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnPollCallback(f))
}

/// One answer of a poll to send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollAnswerSpec {
    pub text: String,
    pub emoji: Option<String>,
    pub id: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl PollAnswerSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Per-poll configuration. Zero disables the reminder delay and the unique-voter threshold.
#[derive(Clone)]
pub struct PollOptions {
    pub duration_hours: f64,
    pub remind_after_hours: f64,
    pub reminder_unique_voters_expected: usize,
    pub allow_multiselect: bool,
    pub callback: Option<Arc<dyn PollCallback>>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            duration_hours: 1.0,
            remind_after_hours: 0.0,
            reminder_unique_voters_expected: 0,
            allow_multiselect: false,
            callback: None,
        }
    }
}

impl fmt::Debug for PollOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollOptions")
            .field("duration_hours", &self.duration_hours)
            .field("remind_after_hours", &self.remind_after_hours)
            .field("reminder_unique_voters_expected", &self.reminder_unique_voters_expected)
            .field("allow_multiselect", &self.allow_multiselect)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Converts fractional hours to a duration, clamping negatives to zero.
pub(crate) fn hours(h: f64) -> chrono::Duration {
    if !h.is_finite() || h <= 0.0 {
        return chrono::Duration::zero();
    }
    chrono::Duration::milliseconds((h * 3_600_000.0) as i64)
}
