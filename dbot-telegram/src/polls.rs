//! Live state of sent polls, fed by `Poll` and `PollAnswer` updates.
//!
//! Telegram has no "get poll" call, so tallies and voters are cached as updates arrive. Polls
//! are sent non-anonymous, otherwise no `PollAnswer` (and no voter id) would be delivered.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dbot_core::{AnswerTally, PollHandle, PollSnapshot};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
struct PollRecord {
    handle: PollHandle,
    expires_at: DateTime<Utc>,
    closed: bool,
    answers: Vec<AnswerTally>,
    /// Chosen answer indexes per voter.
    voters: HashMap<i64, Vec<usize>>,
}

impl PollRecord {
    fn snapshot(&self) -> PollSnapshot {
        PollSnapshot {
            expires_at: self.expires_at,
            closed: self.closed,
            answers: self.answers.clone(),
        }
    }

    fn recount_from_voters(&mut self) {
        for tally in &mut self.answers {
            tally.vote_count = self
                .voters
                .values()
                .filter(|chosen| chosen.contains(&tally.index))
                .count() as u32;
        }
    }
}

/// Poll cache keyed by Telegram poll id.
#[derive(Default)]
pub struct PollBook {
    polls: Mutex<HashMap<String, PollRecord>>,
}

impl PollBook {
    pub async fn insert(&self, handle: PollHandle, answers: Vec<String>, expires_at: DateTime<Utc>) {
        let answers = answers
            .into_iter()
            .enumerate()
            .map(|(index, text)| AnswerTally {
                index,
                text,
                vote_count: 0,
            })
            .collect();
        let record = PollRecord {
            handle: handle.clone(),
            expires_at,
            closed: false,
            answers,
            voters: HashMap::new(),
        };
        self.polls.lock().await.insert(handle.poll_id, record);
    }

    /// Applies a `Poll` update. Returns false for polls this process did not send.
    pub async fn apply_counts(&self, poll_id: &str, counts: &[u32], closed: bool) -> bool {
        let mut polls = self.polls.lock().await;
        let Some(record) = polls.get_mut(poll_id) else {
            return false;
        };
        for (tally, &count) in record.answers.iter_mut().zip(counts) {
            tally.vote_count = count;
        }
        record.closed |= closed;
        debug!(poll_id = %poll_id, closed = record.closed, "Poll tallies updated");
        true
    }

    /// Applies a `PollAnswer` update. An empty `option_ids` is a retracted vote.
    pub async fn apply_answer(&self, poll_id: &str, user_id: i64, option_ids: Vec<usize>) -> bool {
        let mut polls = self.polls.lock().await;
        let Some(record) = polls.get_mut(poll_id) else {
            return false;
        };
        if option_ids.is_empty() {
            record.voters.remove(&user_id);
        } else {
            record.voters.insert(user_id, option_ids);
        }
        record.recount_from_voters();
        true
    }

    pub async fn snapshot(&self, handle: &PollHandle) -> Option<PollSnapshot> {
        self.polls
            .lock()
            .await
            .get(&handle.poll_id)
            .filter(|record| record.handle == *handle)
            .map(PollRecord::snapshot)
    }

    /// Ids of users whose current vote includes `answer_index`, ascending.
    pub async fn voters(&self, handle: &PollHandle, answer_index: usize) -> Vec<i64> {
        let polls = self.polls.lock().await;
        let Some(record) = polls.get(&handle.poll_id) else {
            return Vec::new();
        };
        let mut voters: Vec<i64> = record
            .voters
            .iter()
            .filter(|(_, chosen)| chosen.contains(&answer_index))
            .map(|(&user, _)| user)
            .collect();
        voters.sort_unstable();
        voters
    }

    pub async fn forget(&self, handle: &PollHandle) {
        self.polls.lock().await.remove(&handle.poll_id);
    }
}
