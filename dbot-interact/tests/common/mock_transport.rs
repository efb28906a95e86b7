//! Recording mock of [`dbot_core::Transport`] and [`dbot_core::PollTransport`].
//!
//! Every outbound call is appended to a [`Call`] log; poll state is set by the test.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dbot_core::{
    AnswerTally, Chat, DbotError, DisplayPayload, FormSpec, Interaction, InteractionKind,
    PollHandle, PollRequest, PollSnapshot, PollTransport, Prompt, PromptHandle, Result, Transport,
    User,
};
use tokio::sync::{Mutex, Notify};

/// One recorded transport call.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Call {
    SendPrompt { chat_id: i64, prompt: Prompt },
    ShowForm { form: FormSpec },
    Reply { prompt: Prompt, ephemeral: bool },
    DeferReply { ephemeral: bool },
    EditReply { payload: DisplayPayload },
    DeleteReply,
    SendPoll { chat_id: i64, request: PollRequest },
    ClosePoll { key: String },
    ReleasePoll { key: String },
}

#[derive(Default)]
struct PollState {
    snapshots: HashMap<String, PollSnapshot>,
    voters: HashMap<(String, usize), Vec<i64>>,
    failing_snapshots: Vec<String>,
    failing_voters: Vec<String>,
}

#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    polls: Mutex<PollState>,
    next_id: AtomicU64,
    /// When set, `defer_reply` records the call and then waits for this to be notified.
    defer_gate: Mutex<Option<Arc<Notify>>>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Holds every following `defer_reply` until the returned gate is notified.
    pub async fn gate_defer_reply(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.defer_gate.lock().await = Some(gate.clone());
        gate
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    /// Prompts sent to the audience (broadcasts and messages).
    pub async fn sent_prompts(&self) -> Vec<Prompt> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                Call::SendPrompt { prompt, .. } => Some(prompt.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn replies(&self) -> Vec<Prompt> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                Call::Reply { prompt, .. } => Some(prompt.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn edits(&self) -> Vec<DisplayPayload> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                Call::EditReply { payload } => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn forms(&self) -> Vec<FormSpec> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                Call::ShowForm { form } => Some(form.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn set_snapshot(&self, poll: &PollHandle, snapshot: PollSnapshot) {
        self.polls.lock().await.snapshots.insert(poll.key(), snapshot);
    }

    /// Makes the poll look deleted: `poll_snapshot` returns `None`.
    pub async fn remove_snapshot(&self, poll: &PollHandle) {
        self.polls.lock().await.snapshots.remove(&poll.key());
    }

    pub async fn set_voters(&self, poll: &PollHandle, answer_index: usize, voters: Vec<i64>) {
        self.polls
            .lock()
            .await
            .voters
            .insert((poll.key(), answer_index), voters);
    }

    pub async fn fail_snapshot(&self, poll: &PollHandle) {
        self.polls.lock().await.failing_snapshots.push(poll.key());
    }

    pub async fn fail_voters(&self, poll: &PollHandle) {
        self.polls.lock().await.failing_voters.push(poll.key());
    }

    async fn record(&self, call: Call) {
        self.calls.lock().await.push(call);
    }

    fn next_id(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_prompt(&self, chat: &Chat, prompt: &Prompt) -> Result<PromptHandle> {
        self.record(Call::SendPrompt {
            chat_id: chat.id,
            prompt: prompt.clone(),
        })
        .await;
        Ok(PromptHandle {
            chat_id: chat.id,
            message_id: self.next_id(),
        })
    }

    async fn show_form(&self, _interaction: &Interaction, form: &FormSpec) -> Result<()> {
        self.record(Call::ShowForm { form: form.clone() }).await;
        Ok(())
    }

    async fn reply(&self, _interaction: &Interaction, prompt: &Prompt, ephemeral: bool) -> Result<()> {
        self.record(Call::Reply {
            prompt: prompt.clone(),
            ephemeral,
        })
        .await;
        Ok(())
    }

    async fn defer_reply(&self, _interaction: &Interaction, ephemeral: bool) -> Result<()> {
        self.record(Call::DeferReply { ephemeral }).await;
        let gate = self.defer_gate.lock().await.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(())
    }

    async fn edit_reply(&self, _interaction: &Interaction, payload: &DisplayPayload) -> Result<()> {
        self.record(Call::EditReply {
            payload: payload.clone(),
        })
        .await;
        Ok(())
    }

    async fn delete_reply(&self, _interaction: &Interaction) -> Result<()> {
        self.record(Call::DeleteReply).await;
        Ok(())
    }
}

#[async_trait]
impl PollTransport for MockTransport {
    async fn send_poll(&self, chat: &Chat, request: &PollRequest) -> Result<PollHandle> {
        self.record(Call::SendPoll {
            chat_id: chat.id,
            request: request.clone(),
        })
        .await;
        let id = self.next_id();
        let handle = PollHandle {
            chat_id: chat.id,
            message_id: id.clone(),
            poll_id: format!("poll-{}", id),
        };
        let snapshot = PollSnapshot {
            expires_at: Utc::now() + request.duration,
            closed: false,
            answers: request
                .answers
                .iter()
                .enumerate()
                .map(|(index, answer)| AnswerTally {
                    index,
                    text: answer.text.clone(),
                    vote_count: 0,
                })
                .collect(),
        };
        self.set_snapshot(&handle, snapshot).await;
        Ok(handle)
    }

    async fn poll_snapshot(&self, poll: &PollHandle) -> Result<Option<PollSnapshot>> {
        let state = self.polls.lock().await;
        if state.failing_snapshots.contains(&poll.key()) {
            return Err(DbotError::Transport("snapshot unavailable".to_string()));
        }
        Ok(state.snapshots.get(&poll.key()).cloned())
    }

    async fn fetch_voters(&self, poll: &PollHandle, answer_index: usize) -> Result<Vec<i64>> {
        let state = self.polls.lock().await;
        if state.failing_voters.contains(&poll.key()) {
            return Err(DbotError::Transport("voters unavailable".to_string()));
        }
        Ok(state
            .voters
            .get(&(poll.key(), answer_index))
            .cloned()
            .unwrap_or_default())
    }

    async fn close_poll(&self, poll: &PollHandle) -> Result<()> {
        self.record(Call::ClosePoll { key: poll.key() }).await;
        Ok(())
    }

    async fn release_poll(&self, poll: &PollHandle) {
        self.record(Call::ReleasePoll { key: poll.key() }).await;
    }
}

#[allow(dead_code)]
pub fn interaction(user_id: i64) -> Interaction {
    Interaction {
        id: format!("interaction-{}", user_id),
        kind: InteractionKind::Button,
        user: User {
            id: user_id,
            username: Some("tester".to_string()),
            first_name: Some("Test".to_string()),
            last_name: None,
        },
        chat: Chat::with_id(-100),
        message_id: Some("1".to_string()),
        created_at: Utc::now(),
    }
}

/// Snapshot with the given per-answer counts, expiring `expires_in` from now.
#[allow(dead_code)]
pub fn snapshot(counts: &[u32], expires_in: Duration) -> PollSnapshot {
    PollSnapshot {
        expires_at: Utc::now() + expires_in,
        closed: false,
        answers: counts
            .iter()
            .enumerate()
            .map(|(index, &vote_count)| AnswerTally {
                index,
                text: format!("answer {}", index),
                vote_count,
            })
            .collect(),
    }
}
