//! Tracking state of one live poll.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dbot_core::{PollHandle, PollSnapshot};

use super::{PollAnswerSpec, PollAnswerState, PollOptions};

#[derive(Debug, Clone)]
pub(crate) struct PollEntry {
    pub handle: PollHandle,
    pub options: PollOptions,
    pub answers: Vec<PollAnswerSpec>,
    pub created_at: DateTime<Utc>,
    /// Once true, never reset.
    pub reminder_done: bool,
    /// Last vote count seen per answer index. Unseen answers count as zero.
    pub last_seen: HashMap<usize, u32>,
}

impl PollEntry {
    pub fn new(
        handle: PollHandle,
        answers: Vec<PollAnswerSpec>,
        options: PollOptions,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            handle,
            options,
            answers,
            created_at,
            reminder_done: false,
            last_seen: HashMap::new(),
        }
    }

    pub fn key(&self) -> String {
        self.handle.key()
    }

    /// Joins live tallies with the caller metadata of each answer.
    pub fn answer_states(&self, snapshot: &PollSnapshot) -> Vec<PollAnswerState> {
        snapshot
            .answers
            .iter()
            .map(|tally| {
                let spec = self.answers.get(tally.index);
                PollAnswerState {
                    index: tally.index,
                    id: spec
                        .and_then(|s| s.id.clone())
                        .unwrap_or_else(|| tally.index.to_string()),
                    text: tally.text.clone(),
                    vote_count: tally.vote_count,
                    data: spec.and_then(|s| s.data.clone()),
                }
            })
            .collect()
    }

    /// Records the counts in `snapshot`; true if any differs from the last seen one.
    pub fn record_tallies(&mut self, snapshot: &PollSnapshot) -> bool {
        let mut changed = false;
        for tally in &snapshot.answers {
            let last = self.last_seen.get(&tally.index).copied().unwrap_or(0);
            if last != tally.vote_count {
                self.last_seen.insert(tally.index, tally.vote_count);
                changed = true;
            }
        }
        changed
    }
}
