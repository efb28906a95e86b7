//! Core types: user, chat, interaction, prompt, form and poll.
//!
//! Types are split into one file per main type for easier navigation.

mod chat;
mod form;
mod interaction;
mod poll;
mod prompt;
mod user;

pub use chat::Chat;
pub use form::{ChoiceSet, FieldValue, FormSpec, InputChoice, InputSpec, SubmittedValue};
pub use interaction::{Interaction, InteractionKind, Reaction};
pub use poll::{AnswerTally, PollChoice, PollHandle, PollRequest, PollSnapshot};
pub use prompt::{
    ButtonStyle, Color, Control, ControlTarget, DisplayPayload, Prompt, PromptField, PromptHandle,
};
pub use user::{ToCoreUser, User};
