//! # dbot-interact
//!
//! Interactive actions and poll monitoring: [`ActionRegistry`] turns buttons into addressable,
//! revocable server-side [`Action`]s; [`InteractionDispatcher`] drives each trigger through
//! confirmation and input collection before running the callback; [`PollMonitor`] ticks over
//! tracked polls, firing update/reminder/completion callbacks and retiring finished polls.
//! [`Broadcaster`] owns the default audience used for announcements and error reports.

pub mod action;
pub mod broadcast;
pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod poll;
pub mod registry;

pub use action::{
    action_fn, panic_message, Action, ActionCallback, ActionOptions, InputCollector, InputValue,
    ProvidedInputs, DEFAULT_MODAL_TITLE, MAX_INPUTS,
};
pub use broadcast::{BroadcastOptions, Broadcaster, ButtonSpec, MessageOptions, ReactionTrigger};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::{DispatchOutcome, InteractionDispatcher};
pub use error::{InteractError, RegistryError};
pub use events::{AppEvents, NoopEvents};
pub use poll::{
    poll_fn, PollAnswerSpec, PollAnswerState, PollCallback, PollEvent, PollMonitor,
    PollMonitorConfig, PollOptions, DEFAULT_POLL_INTERVAL,
};
pub use registry::{generate_token, ActionKey, ActionRegistry, RegistryConfig, ResolvedAction};
