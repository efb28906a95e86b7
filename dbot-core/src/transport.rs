//! Transport abstraction for prompts, forms, interaction replies and polls.
//!
//! [`Transport`] and [`PollTransport`] are transport-agnostic; dbot-telegram implements them via
//! teloxide, tests substitute recording mocks.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Chat, DisplayPayload, FormSpec, Interaction, PollHandle, PollRequest, PollSnapshot, Prompt,
    PromptHandle,
};

/// Sending prompts and replying to interactions.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts a message carrying zero or more controls to the given chat.
    async fn send_prompt(&self, chat: &Chat, prompt: &Prompt) -> Result<PromptHandle>;
    /// Presents a form to the interacting user. The submission arrives later as a separate event.
    async fn show_form(&self, interaction: &Interaction, form: &FormSpec) -> Result<()>;
    /// Replies to the interaction. `ephemeral` is a visibility hint.
    async fn reply(&self, interaction: &Interaction, prompt: &Prompt, ephemeral: bool) -> Result<()>;
    /// Acknowledges the interaction with a pending reply to be edited or deleted later.
    async fn defer_reply(&self, interaction: &Interaction, ephemeral: bool) -> Result<()>;
    /// Replaces the deferred reply with `payload`.
    async fn edit_reply(&self, interaction: &Interaction, payload: &DisplayPayload) -> Result<()>;
    /// Removes the deferred reply.
    async fn delete_reply(&self, interaction: &Interaction) -> Result<()>;
}

/// Sending polls and reading their live state.
#[async_trait]
pub trait PollTransport: Send + Sync {
    async fn send_poll(&self, chat: &Chat, poll: &PollRequest) -> Result<PollHandle>;
    /// Current tallies and expiry. `Ok(None)` when the poll message is gone or no longer modifiable.
    async fn poll_snapshot(&self, poll: &PollHandle) -> Result<Option<PollSnapshot>>;
    /// Ids of the users who voted for the answer at `answer_index`.
    async fn fetch_voters(&self, poll: &PollHandle, answer_index: usize) -> Result<Vec<i64>>;
    /// Closes voting on the poll. Does not delete the message.
    async fn close_poll(&self, _poll: &PollHandle) -> Result<()> {
        Ok(())
    }
    /// Drops any state kept for the poll. Called once the poll is no longer tracked.
    async fn release_poll(&self, _poll: &PollHandle) {}
}
