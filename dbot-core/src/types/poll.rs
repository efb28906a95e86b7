//! Poll request, handle and live snapshot types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One answer of a poll to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollChoice {
    pub text: String,
    pub emoji: Option<String>,
}

/// A poll to send to one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub question: String,
    pub answers: Vec<PollChoice>,
    pub allow_multiselect: bool,
    pub duration: Duration,
}

/// Transport-native handle of a sent poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollHandle {
    pub chat_id: i64,
    pub message_id: String,
    /// Transport poll id (Telegram keys poll updates by it).
    pub poll_id: String,
}

impl PollHandle {
    /// Tracking key: the poll's message identifier, unique across chats.
    pub fn key(&self) -> String {
        format!("{}:{}", self.chat_id, self.message_id)
    }
}

/// Current vote count of one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerTally {
    pub index: usize,
    pub text: String,
    pub vote_count: u32,
}

/// Live state of a poll as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSnapshot {
    pub expires_at: DateTime<Utc>,
    pub closed: bool,
    pub answers: Vec<AnswerTally>,
}

impl PollSnapshot {
    /// True once the poll was closed or its expiry timestamp has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.closed || self.expires_at < now
    }
}
