//! Interaction dispatcher: resolves trigger tokens and drives actions through confirmation,
//! input collection and execution.
//!
//! Every call returns a [`DispatchOutcome`]; callback and transport failures are contained here
//! (logged and broadcast to the default audience) and never propagate to the caller.

use std::sync::Arc;

use dbot_core::{
    ButtonStyle, Color, Control, DisplayPayload, FieldValue, FormSpec, Interaction, Prompt,
    Reaction, Transport,
};
use tracing::{debug, error, info, instrument, warn};

use crate::action::{Action, ProvidedInputs};
use crate::broadcast::{BroadcastOptions, Broadcaster};
use crate::error::InteractError;
use crate::events::AppEvents;
use crate::registry::ActionRegistry;

const CONFIRM_LABEL: &str = "Confirm & proceed";

/// What a trigger or form submission led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The token resolves to no action.
    NotFound,
    /// A confirmation prompt bound to `token` was shown.
    ConfirmationRequested { token: String },
    /// A form was shown to collect the declared inputs.
    InputRequested,
    /// The submission left inputs missing; the callback did not run.
    InputsMissing {
        expected: Vec<String>,
        provided: Vec<String>,
    },
    /// The callback ran; `payload` is what it asked to display.
    Completed { payload: Option<DisplayPayload> },
    /// Run-once action already executed; nothing happened.
    AlreadyExecuted,
    /// Callback or transport failure, already logged and broadcast.
    Failed { error: String },
}

pub struct InteractionDispatcher {
    registry: Arc<ActionRegistry>,
    transport: Arc<dyn Transport>,
    broadcaster: Arc<Broadcaster>,
    events: Arc<dyn AppEvents>,
}

impl InteractionDispatcher {
    pub fn new(
        registry: Arc<ActionRegistry>,
        transport: Arc<dyn Transport>,
        broadcaster: Arc<Broadcaster>,
        events: Arc<dyn AppEvents>,
    ) -> Self {
        Self {
            registry,
            transport,
            broadcaster,
            events,
        }
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Handles a triggered control. Whether this is the confirmation leg comes from the token.
    #[instrument(skip(self, interaction), fields(user_id = interaction.user.id, chat_id = interaction.chat.id))]
    pub async fn on_trigger(&self, interaction: &Interaction, token: &str) -> DispatchOutcome {
        let Some(resolved) = self.registry.resolve(token).await else {
            warn!(token = %token, "No action found for token");
            self.events.on_action_not_found(token).await;
            return DispatchOutcome::NotFound;
        };
        let action = resolved.action;

        if action.needs_confirmation() && !resolved.is_confirmation {
            return self.request_confirmation(interaction, &action).await;
        }

        if action.has_inputs() {
            return self.request_inputs(interaction, token, &action).await;
        }

        let inputs = action.provided_inputs();
        self.run_action(interaction, &action, inputs).await
    }

    /// Handles a submitted form: stores each field, then runs the action if nothing is missing.
    #[instrument(skip(self, interaction, fields), fields(user_id = interaction.user.id, fields = fields.len()))]
    pub async fn on_form_submit(
        &self,
        interaction: &Interaction,
        token: &str,
        fields: &[FieldValue],
    ) -> DispatchOutcome {
        let Some(resolved) = self.registry.resolve(token).await else {
            warn!(token = %token, "No action found for submitted form");
            self.events.on_action_not_found(token).await;
            return DispatchOutcome::NotFound;
        };
        let action = resolved.action;

        let Some(inputs) = action.submit(fields) else {
            let (expected, provided) = action.input_report();
            info!(
                action = %action.description(),
                expected = %expected.join(", "),
                provided = %provided.join(", "),
                "Inputs still missing"
            );
            let report = Prompt::text(format!(
                "Expected inputs: {}\nProvided inputs: {}",
                expected.join(", "),
                provided.join(", ")
            ))
            .with_title(format!(
                "Some inputs are still missing for action {}",
                action.description()
            ))
            .with_color(Color::ERROR);
            if let Err(e) = self.transport.reply(interaction, &report, true).await {
                error!(action = %action.description(), error = %e, "Error reporting missing inputs");
            }
            return DispatchOutcome::InputsMissing { expected, provided };
        };

        self.run_action(interaction, &action, inputs).await
    }

    /// Handles a reaction: the application is told first, then the action bound to the message
    /// runs if the reaction confirms it. `None` when no bound action is confirmed.
    ///
    /// Reaching the required count is the confirmation, so no confirmation prompt is shown.
    #[instrument(skip(self, reaction), fields(user_id = reaction.user.id, chat_id = reaction.chat.id, emoji = %reaction.emoji))]
    pub async fn on_reaction(&self, interaction_id: &str, reaction: &Reaction) -> Option<DispatchOutcome> {
        self.events.on_reaction(reaction).await;

        let (token, action) = self
            .registry
            .reaction_action(reaction.chat.id, &reaction.message_id)
            .await?;
        if !action.is_confirmed_by_reaction(&reaction.emoji, reaction.count) {
            debug!(action = %action.description(), count = reaction.count, "Reaction does not confirm action");
            return None;
        }

        info!(action = %action.description(), "Action confirmed by reaction");
        let interaction = reaction.to_interaction(interaction_id);
        if action.has_inputs() {
            return Some(self.request_inputs(&interaction, &token, &action).await);
        }
        let inputs = action.provided_inputs();
        Some(self.run_action(&interaction, &action, inputs).await)
    }

    async fn request_confirmation(&self, interaction: &Interaction, action: &Arc<Action>) -> DispatchOutcome {
        let token = match self.registry.register_confirmation(action.clone()).await {
            Ok(token) => token,
            Err(e) => return self.contain_failure(interaction, action, e.into(), false).await,
        };

        let prompt = Prompt::text(format!(
            "Are you sure you want to {} ?",
            action.description()
        ))
        .with_color(Color::ERROR)
        .with_control(Control::action(CONFIRM_LABEL, token.clone(), ButtonStyle::Danger));

        match self.transport.reply(interaction, &prompt, true).await {
            Ok(()) => {
                debug!(action = %action.description(), "Confirmation requested");
                DispatchOutcome::ConfirmationRequested { token }
            }
            Err(e) => self.contain_failure(interaction, action, e.into(), false).await,
        }
    }

    async fn request_inputs(&self, interaction: &Interaction, token: &str, action: &Arc<Action>) -> DispatchOutcome {
        action.reset_inputs();
        let form = FormSpec {
            token: token.to_string(),
            title: action.modal_title().to_string(),
            fields: action.expected_inputs(),
        };
        debug!(action = %action.description(), fields = form.fields.len(), "Showing form");

        match self.transport.show_form(interaction, &form).await {
            Ok(()) => DispatchOutcome::InputRequested,
            Err(e) => self.contain_failure(interaction, action, e.into(), false).await,
        }
    }

    /// Runs an accepted action with `inputs`, the values captured before any await.
    async fn run_action(
        &self,
        interaction: &Interaction,
        action: &Arc<Action>,
        inputs: ProvidedInputs,
    ) -> DispatchOutcome {
        if !action.try_begin_run() {
            info!(action = %action.description(), "Action already executed, skipping");
            return DispatchOutcome::AlreadyExecuted;
        }

        if action.is_announcement() {
            self.broadcaster
                .broadcast(
                    &format!(
                        "Action {} requested by {}",
                        action.description(),
                        interaction.user.display_name()
                    ),
                    BroadcastOptions::color(Color::INFO),
                )
                .await;
        }

        if let Err(e) = self
            .transport
            .defer_reply(interaction, action.is_ephemeral_reply())
            .await
        {
            return self.contain_failure(interaction, action, e.into(), false).await;
        }

        info!(action = %action.description(), "Running action");
        match action.invoke_with(&inputs).await {
            Ok(Some(payload)) => match self.transport.edit_reply(interaction, &payload).await {
                Ok(()) => DispatchOutcome::Completed {
                    payload: Some(payload),
                },
                Err(e) => self.contain_failure(interaction, action, e.into(), false).await,
            },
            Ok(None) => match self.transport.delete_reply(interaction).await {
                Ok(()) => DispatchOutcome::Completed { payload: None },
                Err(e) => self.contain_failure(interaction, action, e.into(), false).await,
            },
            Err(e) => self.contain_failure(interaction, action, e, true).await,
        }
    }

    /// Logs, broadcasts the error, and substitutes it in the deferred reply when one was promised.
    async fn contain_failure(
        &self,
        interaction: &Interaction,
        action: &Action,
        err: InteractError,
        reply_deferred: bool,
    ) -> DispatchOutcome {
        error!(action = %action.description(), error = %err, "Error running action");
        let text = format!("Error running action {}:\n{}", action.description(), err);
        self.broadcaster
            .broadcast(&text, BroadcastOptions::color(Color::ERROR))
            .await;

        if reply_deferred {
            let payload = DisplayPayload::text(text.clone()).with_color(Color::ERROR);
            if let Err(e) = self.transport.edit_reply(interaction, &payload).await {
                error!(action = %action.description(), error = %e, "Error substituting failure in reply");
            }
        }

        DispatchOutcome::Failed {
            error: err.to_string(),
        }
    }
}
