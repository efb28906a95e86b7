//! # dbot-telegram
//!
//! Telegram transport for the interaction engine: renders prompts as HTML with inline keyboards,
//! emulates forms with sequential ForceReply questions, caches poll state from `Poll` and
//! `PollAnswer` updates, and routes updates through the teloxide dispatcher.

mod adapters;
mod config;
mod connect;
mod forms;
mod polls;
mod reactions;
mod render;
mod runner;
mod transport;

pub use adapters::{
    callback_interaction, core_chat, message_interaction, reaction_glyphs, TelegramUserWrapper,
};
pub use config::TelegramConfig;
pub use connect::{connect_with_retry, ConnectRetry, Connector, DEFAULT_CONNECT_RETRY_INTERVAL};
pub use forms::{FormBook, FormStep, PendingForm, BLANK_ANSWER, CANCEL_COMMAND};
pub use polls::PollBook;
pub use reactions::{ReactionBook, DEFAULT_TRACKED_MESSAGES};
pub use render::{html_escape, keyboard, render_payload, render_prompt, BUTTONS_PER_ROW};
pub use runner::{classify_text, run_repl, Incoming, UpdateRouter, COMMAND_PREFIX};
pub use transport::{parse_message_id, poll_expiry, TelegramTransport};
