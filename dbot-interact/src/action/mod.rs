//! Actions: revocable, possibly-confirmable, possibly-parameterized units of work bound to a
//! callback.

mod inputs;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use dbot_core::{DisplayPayload, FieldValue, InputSpec};
use futures::FutureExt;
use tracing::info;

use crate::error::InteractError;

pub use inputs::{InputCollector, InputValue, ProvidedInputs};

/// Maximum number of inputs an action may declare.
pub const MAX_INPUTS: usize = 5;

pub const DEFAULT_MODAL_TITLE: &str = "Input required";

/// Application code run when an action executes. `Ok(None)` means nothing to show.
#[async_trait]
pub trait ActionCallback: Send + Sync {
    async fn call(&self, inputs: &ProvidedInputs) -> anyhow::Result<Option<DisplayPayload>>;
}

struct FnCallback<F>(F);

#[async_trait]
impl<F, Fut> ActionCallback for FnCallback<F>
where
    F: Fn(ProvidedInputs) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<DisplayPayload>>> + Send,
{
    async fn call(&self, inputs: &ProvidedInputs) -> anyhow::Result<Option<DisplayPayload>> {
        (self.0)(inputs.clone()).await
    }
}

/// Wraps an async closure as an [`ActionCallback`].
pub fn action_fn<F, Fut>(f: F) -> Arc<dyn ActionCallback>
where
    F: Fn(ProvidedInputs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Option<DisplayPayload>>> + Send + 'static,
{
    Arc::new(FnCallback(f))
}

/// Per-action configuration.
#[derive(Debug, Clone, Default)]
pub struct ActionOptions {
    pub needs_confirmation: bool,
    pub announcement: bool,
    pub ephemeral_reply: bool,
    pub execute_only_once: bool,
    pub inputs: Vec<InputSpec>,
    pub modal_title: Option<String>,
}

pub struct Action {
    description: String,
    emoji: String,
    emoji_count: u32,
    needs_confirmation: bool,
    announcement: bool,
    ephemeral_reply: bool,
    execute_only_once: bool,
    modal_title: String,
    callback: Arc<dyn ActionCallback>,
    inputs: Mutex<InputCollector>,
    executed: AtomicBool,
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("description", &self.description)
            .field("needs_confirmation", &self.needs_confirmation)
            .field("execute_only_once", &self.execute_only_once)
            .field("executed", &self.is_executed())
            .finish_non_exhaustive()
    }
}

impl Action {
    pub fn new(
        description: impl Into<String>,
        callback: Arc<dyn ActionCallback>,
        options: ActionOptions,
    ) -> Self {
        Self {
            description: description.into(),
            emoji: String::new(),
            emoji_count: 1,
            needs_confirmation: options.needs_confirmation,
            announcement: options.announcement,
            ephemeral_reply: options.ephemeral_reply,
            execute_only_once: options.execute_only_once,
            modal_title: options
                .modal_title
                .unwrap_or_else(|| DEFAULT_MODAL_TITLE.to_string()),
            callback,
            inputs: Mutex::new(InputCollector::new(options.inputs)),
            executed: AtomicBool::new(false),
        }
    }

    /// Sets the reaction glyph and count that confirm this action (reaction-based confirmation).
    pub fn with_reaction(mut self, emoji: impl Into<String>, count: u32) -> Self {
        self.emoji = emoji.into();
        self.emoji_count = count;
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn needs_confirmation(&self) -> bool {
        self.needs_confirmation
    }

    pub fn is_announcement(&self) -> bool {
        self.announcement
    }

    pub fn is_ephemeral_reply(&self) -> bool {
        self.ephemeral_reply
    }

    pub fn execute_only_once(&self) -> bool {
        self.execute_only_once
    }

    pub fn modal_title(&self) -> &str {
        &self.modal_title
    }

    pub fn is_executed(&self) -> bool {
        self.executed.load(Ordering::SeqCst)
    }

    pub fn is_confirmed_by_reaction(&self, emoji: &str, count: u32) -> bool {
        !self.emoji.is_empty() && self.emoji == emoji && self.emoji_count == count
    }

    fn collector(&self) -> MutexGuard<'_, InputCollector> {
        self.inputs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn has_inputs(&self) -> bool {
        self.collector().has_inputs()
    }

    pub fn expected_inputs(&self) -> Vec<InputSpec> {
        self.collector().expected().to_vec()
    }

    pub fn set_input(&self, id: impl Into<String>, value: InputValue) {
        self.collector().set_input(id, value);
    }

    /// Stores a form submission. When nothing is left missing, returns the inputs as of this
    /// submission, taken under the same lock.
    pub fn submit(&self, fields: &[FieldValue]) -> Option<ProvidedInputs> {
        let mut collector = self.collector();
        collector.apply_submission(fields);
        if collector.is_input_missing() {
            None
        } else {
            Some(collector.provided())
        }
    }

    pub fn is_input_missing(&self) -> bool {
        self.collector().is_input_missing()
    }

    pub fn reset_inputs(&self) {
        self.collector().reset_inputs();
    }

    /// `(expected ids, provided ids)` for missing-input reports.
    pub fn input_report(&self) -> (Vec<String>, Vec<String>) {
        let collector = self.collector();
        (collector.expected_ids(), collector.provided_ids())
    }

    pub fn provided_inputs(&self) -> ProvidedInputs {
        self.collector().provided()
    }

    /// Accepts a run: a single atomic check-and-set on `executed`.
    ///
    /// Returns false when the action runs only once and was already accepted.
    pub fn try_begin_run(&self) -> bool {
        if self.execute_only_once {
            self.executed
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        } else {
            self.executed.store(true, Ordering::SeqCst);
            true
        }
    }

    /// Invokes the callback with `inputs`. Errors and panics become [`InteractError::Callback`].
    ///
    /// The collector is not read here: callers pass the inputs captured when the run was
    /// accepted, so a later reset or submission cannot change what the callback sees.
    pub async fn invoke_with(&self, inputs: &ProvidedInputs) -> Result<Option<DisplayPayload>, InteractError> {
        match AssertUnwindSafe(self.callback.call(inputs)).catch_unwind().await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(e)) => Err(InteractError::Callback(format!("{:#}", e))),
            Err(panic) => Err(InteractError::Callback(panic_message(panic.as_ref()))),
        }
    }

    /// Accepts and invokes in one step. `Ok(None)` also covers the skipped run-once case.
    pub async fn run(&self) -> Result<Option<DisplayPayload>, InteractError> {
        if !self.try_begin_run() {
            info!(action = %self.description, "Action already executed, skipping");
            return Ok(None);
        }
        let inputs = self.provided_inputs();
        self.invoke_with(&inputs).await
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_action(
        counter: Arc<AtomicUsize>,
        options: ActionOptions,
    ) -> Action {
        Action::new(
            "count",
            action_fn(move |_inputs| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(DisplayPayload::text("counted")))
                }
            }),
            options,
        )
    }

    #[tokio::test]
    async fn test_execute_only_once_runs_callback_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let action = counting_action(
            counter.clone(),
            ActionOptions {
                execute_only_once: true,
                ..ActionOptions::default()
            },
        );

        assert_eq!(action.run().await.unwrap(), Some(DisplayPayload::text("counted")));
        for _ in 0..5 {
            assert_eq!(action.run().await.unwrap(), None);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(action.is_executed());
    }

    #[tokio::test]
    async fn test_repeatable_action_runs_every_time() {
        let counter = Arc::new(AtomicUsize::new(0));
        let action = counting_action(counter.clone(), ActionOptions::default());
        for _ in 0..3 {
            action.run().await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_callback_receives_inputs() {
        let action = Action::new(
            "echo",
            action_fn(|inputs: ProvidedInputs| async move {
                Ok(inputs.text("length").map(|v| DisplayPayload::text(v.to_string())))
            }),
            ActionOptions {
                inputs: vec![InputSpec::text("length", "Length")],
                ..ActionOptions::default()
            },
        );
        action.set_input("length", InputValue::Text("12".to_string()));
        assert_eq!(action.run().await.unwrap(), Some(DisplayPayload::text("12")));
    }

    #[tokio::test]
    async fn test_callback_panic_becomes_error() {
        let action = Action::new(
            "boom",
            action_fn(|_inputs| async move {
                if true {
                    panic!("kaboom");
                }
                Ok(None)
            }),
            ActionOptions::default(),
        );
        match action.run().await {
            Err(InteractError::Callback(msg)) => assert!(msg.contains("kaboom")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_modal_title_default() {
        let action = Action::new("x", action_fn(|_| async { Ok(None) }), ActionOptions::default());
        assert_eq!(action.modal_title(), DEFAULT_MODAL_TITLE);
    }

    #[test]
    fn test_reaction_confirmation() {
        let action = Action::new("x", action_fn(|_| async { Ok(None) }), ActionOptions::default())
            .with_reaction("👍", 2);
        assert!(action.is_confirmed_by_reaction("👍", 2));
        assert!(!action.is_confirmed_by_reaction("👍", 1));
        assert!(!action.is_confirmed_by_reaction("👎", 2));
    }
}
