//! # dbot-core
//!
//! Core types and traits for interactive bot actions and polls: [`Transport`], [`PollTransport`],
//! prompt, form and poll types, errors, and tracing initialization. Transport-agnostic; used by
//! dbot-interact (the action and poll engine) and dbot-telegram (the Telegram transport).

pub mod error;
pub mod logger;
pub mod transport;
pub mod types;

pub use error::{DbotError, Result};
pub use logger::init_tracing;
pub use transport::{PollTransport, Transport};
pub use types::{
    AnswerTally, ButtonStyle, Chat, ChoiceSet, Color, Control, ControlTarget, DisplayPayload,
    FieldValue, FormSpec, InputChoice, InputSpec, Interaction, InteractionKind, PollChoice,
    PollHandle, PollRequest, PollSnapshot, Prompt, PromptField, PromptHandle, Reaction, SubmittedValue,
    ToCoreUser, User,
};
