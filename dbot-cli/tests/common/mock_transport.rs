//! Recording transport for driving the demo bot without Telegram.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dbot_core::{
    Chat, DisplayPayload, FormSpec, Interaction, InteractionKind, PollHandle, PollRequest,
    PollSnapshot, PollTransport, Prompt, PromptHandle, Result, Transport, User,
};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct MockTransport {
    prompts: Mutex<Vec<Prompt>>,
    /// Handles of `send_prompt` calls, in order.
    handles: Mutex<Vec<PromptHandle>>,
    forms: Mutex<Vec<FormSpec>>,
    edits: Mutex<Vec<DisplayPayload>>,
    polls: Mutex<Vec<PollRequest>>,
    next_id: AtomicU64,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().await.clone()
    }

    pub async fn prompt_handles(&self) -> Vec<PromptHandle> {
        self.handles.lock().await.clone()
    }

    pub async fn forms(&self) -> Vec<FormSpec> {
        self.forms.lock().await.clone()
    }

    pub async fn edits(&self) -> Vec<DisplayPayload> {
        self.edits.lock().await.clone()
    }

    pub async fn polls(&self) -> Vec<PollRequest> {
        self.polls.lock().await.clone()
    }

    fn next_id(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_prompt(&self, chat: &Chat, prompt: &Prompt) -> Result<PromptHandle> {
        self.prompts.lock().await.push(prompt.clone());
        let handle = PromptHandle {
            chat_id: chat.id,
            message_id: self.next_id(),
        };
        self.handles.lock().await.push(handle.clone());
        Ok(handle)
    }

    async fn show_form(&self, _interaction: &Interaction, form: &FormSpec) -> Result<()> {
        self.forms.lock().await.push(form.clone());
        Ok(())
    }

    async fn reply(&self, _interaction: &Interaction, prompt: &Prompt, _ephemeral: bool) -> Result<()> {
        self.prompts.lock().await.push(prompt.clone());
        Ok(())
    }

    async fn defer_reply(&self, _interaction: &Interaction, _ephemeral: bool) -> Result<()> {
        Ok(())
    }

    async fn edit_reply(&self, _interaction: &Interaction, payload: &DisplayPayload) -> Result<()> {
        self.edits.lock().await.push(payload.clone());
        Ok(())
    }

    async fn delete_reply(&self, _interaction: &Interaction) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl PollTransport for MockTransport {
    async fn send_poll(&self, chat: &Chat, request: &PollRequest) -> Result<PollHandle> {
        self.polls.lock().await.push(request.clone());
        let message_id = self.next_id();
        Ok(PollHandle {
            chat_id: chat.id,
            poll_id: format!("poll-{}", message_id),
            message_id,
        })
    }

    async fn poll_snapshot(&self, _poll: &PollHandle) -> Result<Option<PollSnapshot>> {
        Ok(None)
    }

    async fn fetch_voters(&self, _poll: &PollHandle, _answer_index: usize) -> Result<Vec<i64>> {
        Ok(Vec::new())
    }

    async fn close_poll(&self, _poll: &PollHandle) -> Result<()> {
        Ok(())
    }
}

/// A button press by a user in chat -100.
pub fn interaction(user_id: i64) -> Interaction {
    Interaction {
        id: format!("cb-{}", user_id),
        kind: InteractionKind::Button,
        user: User {
            id: user_id,
            username: None,
            first_name: Some("Test".to_string()),
            last_name: None,
        },
        chat: Chat::with_id(-100),
        message_id: Some("1".to_string()),
        created_at: Utc::now(),
    }
}
