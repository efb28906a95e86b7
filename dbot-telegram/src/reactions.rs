//! Reaction tallies for messages in monitored chats.
//!
//! `message_reaction` updates only carry one user's old and new reaction lists, so per-glyph
//! counts are rebuilt here from who reacted with what.

use std::collections::{HashMap, HashSet, VecDeque};

use tokio::sync::Mutex;
use tracing::debug;

/// Messages whose reactions are remembered; the oldest is dropped first.
pub const DEFAULT_TRACKED_MESSAGES: usize = 1_000;

#[derive(Default)]
struct Tallies {
    /// `(chat_id, message_id)` to glyph to reacting users.
    messages: HashMap<(i64, i32), HashMap<String, HashSet<i64>>>,
    order: VecDeque<(i64, i32)>,
}

pub struct ReactionBook {
    tallies: Mutex<Tallies>,
    capacity: usize,
}

impl Default for ReactionBook {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKED_MESSAGES)
    }
}

impl ReactionBook {
    pub fn new(capacity: usize) -> Self {
        Self {
            tallies: Mutex::new(Tallies::default()),
            capacity: capacity.max(1),
        }
    }

    /// Applies one user's reaction change. Returns each newly added glyph with its count after
    /// the change; removed glyphs only lower their counts.
    pub async fn apply(
        &self,
        chat_id: i64,
        message_id: i32,
        user_id: i64,
        old: &[String],
        new: &[String],
    ) -> Vec<(String, u32)> {
        let mut tallies = self.tallies.lock().await;
        let message = (chat_id, message_id);
        if !tallies.messages.contains_key(&message) {
            if tallies.order.len() >= self.capacity {
                if let Some(oldest) = tallies.order.pop_front() {
                    tallies.messages.remove(&oldest);
                    debug!(chat_id = oldest.0, message_id = oldest.1, "Reaction tally dropped");
                }
            }
            tallies.order.push_back(message);
        }
        let glyphs = tallies.messages.entry(message).or_default();

        for emoji in old.iter().filter(|e| !new.contains(e)) {
            if let Some(users) = glyphs.get_mut(emoji) {
                users.remove(&user_id);
            }
        }
        let mut added = Vec::new();
        for emoji in new.iter().filter(|e| !old.contains(e)) {
            let users = glyphs.entry(emoji.clone()).or_default();
            users.insert(user_id);
            added.push((emoji.clone(), users.len() as u32));
        }
        added
    }
}
