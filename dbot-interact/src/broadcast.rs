//! Default audience: announcements, error reports, messages with action buttons, and the
//! best-effort final broadcast used before the process exits.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use dbot_core::{
    ButtonStyle, Chat, Color, Control, ControlTarget, Prompt, PromptField, PromptHandle, Transport,
};
use futures::FutureExt;
use tracing::{error, instrument, warn};

use crate::action::{panic_message, Action, ActionCallback, ActionOptions};
use crate::registry::ActionRegistry;

const MAX_LABEL_CHARS: usize = 80;
const TRUNCATED_LABEL_CHARS: usize = 75;
/// Controls per message (5 rows of 5).
const CONTROLS_PER_MESSAGE: usize = 25;
const FINAL_BROADCAST_TIMEOUT: Duration = Duration::from_secs(5);

/// Title and color of a broadcast.
#[derive(Debug, Clone, Default)]
pub struct BroadcastOptions {
    pub title: Option<String>,
    pub color: Option<Color>,
}

impl BroadcastOptions {
    pub fn color(color: Color) -> Self {
        Self {
            title: None,
            color: Some(color),
        }
    }

    pub fn titled(title: impl Into<String>, color: Color) -> Self {
        Self {
            title: Some(title.into()),
            color: Some(color),
        }
    }
}

/// A button to attach to a message: a link, or an action bound to a callback.
#[derive(Clone, Default)]
pub struct ButtonSpec {
    pub label: String,
    pub emoji: Option<String>,
    pub url: Option<String>,
    pub callback: Option<Arc<dyn ActionCallback>>,
    /// Description used in confirmations and announcements; defaults to the label.
    pub action_description: Option<String>,
    pub secondary: bool,
    pub options: ActionOptions,
}

impl ButtonSpec {
    pub fn action(label: impl Into<String>, callback: Arc<dyn ActionCallback>) -> Self {
        Self {
            label: label.into(),
            callback: Some(callback),
            ..Self::default()
        }
    }

    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    pub fn with_options(mut self, options: ActionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.action_description = Some(description.into());
        self
    }

    pub fn secondary(mut self) -> Self {
        self.secondary = true;
        self
    }
}

/// An action run when a sent message collects exactly `count` reactions of `emoji`.
#[derive(Clone)]
pub struct ReactionTrigger {
    pub description: String,
    pub emoji: String,
    pub count: u32,
    pub callback: Arc<dyn ActionCallback>,
    pub options: ActionOptions,
}

impl ReactionTrigger {
    pub fn new(
        description: impl Into<String>,
        emoji: impl Into<String>,
        count: u32,
        callback: Arc<dyn ActionCallback>,
    ) -> Self {
        Self {
            description: description.into(),
            emoji: emoji.into(),
            count,
            callback,
            options: ActionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ActionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Content options of [`Broadcaster::send_message`].
#[derive(Clone, Default)]
pub struct MessageOptions {
    pub title: Option<String>,
    pub color: Option<Color>,
    pub fields: Vec<PromptField>,
    pub buttons: Vec<ButtonSpec>,
    pub image: Option<String>,
    /// Binds every sent publication to one reaction-triggered action.
    pub reaction: Option<ReactionTrigger>,
}

/// Sends to every chat of the default audience.
pub struct Broadcaster {
    transport: Arc<dyn Transport>,
    registry: Arc<ActionRegistry>,
    audience: Vec<Chat>,
    outbound_delay: Duration,
}

impl Broadcaster {
    pub fn new(transport: Arc<dyn Transport>, registry: Arc<ActionRegistry>, audience: Vec<Chat>) -> Self {
        Self {
            transport,
            registry,
            audience,
            outbound_delay: Duration::ZERO,
        }
    }

    /// Sleeps this long before each outbound send to smooth bursts.
    pub fn with_outbound_delay(mut self, delay: Duration) -> Self {
        self.outbound_delay = delay;
        self
    }

    pub fn audience(&self) -> &[Chat] {
        &self.audience
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    /// Text broadcast with optional title and color (announcements, error reports).
    pub async fn broadcast(&self, text: &str, options: BroadcastOptions) -> Vec<PromptHandle> {
        self.send_message(
            text,
            MessageOptions {
                title: options.title,
                color: options.color,
                ..MessageOptions::default()
            },
        )
        .await
    }

    /// Sends a message with fields and buttons to the audience. Callback buttons register one
    /// action each, as does a reaction trigger. Send failures are logged, never returned.
    #[instrument(skip(self, content, options), fields(buttons = options.buttons.len()))]
    pub async fn send_message(&self, content: &str, options: MessageOptions) -> Vec<PromptHandle> {
        let mut controls = Vec::new();
        for button in &options.buttons {
            if let Some(control) = self.build_control(button).await {
                controls.push(control);
            }
        }

        let fields = options
            .fields
            .into_iter()
            .filter(|field| {
                let keep = !field.name.is_empty() && !field.value.is_empty();
                if !keep {
                    warn!(field = %field.name, "Field skipped, must have a name and a value");
                }
                keep
            })
            .collect();

        let base = Prompt {
            content: content.to_string(),
            title: options.title,
            color: Some(options.color.unwrap_or(Color::INFO)),
            fields,
            image: options.image,
            controls: Vec::new(),
        };

        let mut handles = Vec::new();
        for publication in build_publications(base, controls) {
            for chat in &self.audience {
                if !self.outbound_delay.is_zero() {
                    tokio::time::sleep(self.outbound_delay).await;
                }
                match self.transport.send_prompt(chat, &publication).await {
                    Ok(handle) => handles.push(handle),
                    Err(e) => error!(chat_id = chat.id, error = %e, "Error sending message"),
                }
            }
        }

        if let Some(trigger) = options.reaction {
            self.bind_reaction_trigger(trigger, &handles).await;
        }
        handles
    }

    async fn bind_reaction_trigger(&self, trigger: ReactionTrigger, handles: &[PromptHandle]) {
        if trigger.emoji.is_empty() || trigger.count == 0 {
            error!(action = %trigger.description, "Reaction trigger needs an emoji and a count of at least 1");
            return;
        }
        let action = Action::new(trigger.description, trigger.callback, trigger.options)
            .with_reaction(trigger.emoji, trigger.count);
        let description = action.description().to_string();
        match self.registry.register_for_reactions(Arc::new(action)).await {
            Ok(key) => {
                for handle in handles {
                    self.registry
                        .bind_reaction(handle.chat_id, &handle.message_id, key)
                        .await;
                }
            }
            Err(e) => error!(action = %description, error = %e, "Could not register reaction action"),
        }
    }

    /// Turns a button spec into a control, registering its action. `None` for invalid buttons.
    pub async fn build_control(&self, button: &ButtonSpec) -> Option<Control> {
        if button.label.trim().is_empty() {
            error!("Button must have a label");
            return None;
        }
        let label = truncate_label(&button.label);

        let (style, target) = if let Some(url) = &button.url {
            (ButtonStyle::Link, ControlTarget::Url(url.clone()))
        } else if let Some(callback) = &button.callback {
            let description = button
                .action_description
                .clone()
                .unwrap_or_else(|| button.label.clone());
            let style = if button.options.needs_confirmation {
                ButtonStyle::Danger
            } else if button.secondary {
                ButtonStyle::Secondary
            } else {
                ButtonStyle::Primary
            };
            let action = Arc::new(Action::new(description, callback.clone(), button.options.clone()));
            match self.registry.register(action).await {
                Ok(token) => (style, ControlTarget::Action(token)),
                Err(e) => {
                    error!(label = %label, error = %e, "Could not register button action");
                    return None;
                }
            }
        } else {
            error!(label = %label, "Button must have either a URL or a callback");
            return None;
        };

        Some(Control {
            label,
            emoji: button.emoji.clone(),
            style,
            target,
        })
    }

    /// Awaits `task`. A panic is logged and broadcast in red instead of dying with the task.
    /// Returns false when `task` panicked.
    pub async fn contain<F>(&self, context: &str, task: F) -> bool
    where
        F: Future<Output = ()>,
    {
        let Err(panic) = AssertUnwindSafe(task).catch_unwind().await else {
            return true;
        };
        let message = panic_message(panic.as_ref());
        error!(context = %context, error = %message, "Handler panicked");
        self.broadcast(
            &format!("Error handling {}:\n{}", context, message),
            BroadcastOptions::color(Color::ERROR),
        )
        .await;
        false
    }

    /// Synchronous, best-effort broadcast for a process that is about to exit.
    ///
    /// Runs on a dedicated thread with its own runtime so it can be called from anywhere,
    /// including inside an async context. Bounded by a timeout.
    pub fn final_broadcast(&self, text: &str) {
        let transport = self.transport.clone();
        let audience = self.audience.clone();
        let prompt = Prompt::text(text)
            .with_title("Bot stopping")
            .with_color(Color::ERROR);

        let worker = std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!(error = %e, "Could not start runtime for final broadcast");
                    return;
                }
            };
            runtime.block_on(async move {
                let send_all = async {
                    for chat in &audience {
                        if let Err(e) = transport.send_prompt(chat, &prompt).await {
                            error!(chat_id = chat.id, error = %e, "Final broadcast failed");
                        }
                    }
                };
                if tokio::time::timeout(FINAL_BROADCAST_TIMEOUT, send_all).await.is_err() {
                    error!("Final broadcast timed out");
                }
            });
        });

        if worker.join().is_err() {
            error!("Final broadcast thread panicked");
        }
    }
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() > MAX_LABEL_CHARS {
        warn!(label = %label, "Button label too long, truncating");
        let mut truncated: String = label.chars().take(TRUNCATED_LABEL_CHARS).collect();
        truncated.push_str("...");
        truncated
    } else {
        label.to_string()
    }
}

/// Splits controls over as many messages as needed; follow-up messages repeat the title and color.
fn build_publications(base: Prompt, controls: Vec<Control>) -> Vec<Prompt> {
    if controls.is_empty() {
        return vec![base];
    }
    let mut publications = Vec::new();
    for chunk in controls.chunks(CONTROLS_PER_MESSAGE) {
        let prompt = if publications.is_empty() {
            Prompt {
                controls: chunk.to_vec(),
                ..base.clone()
            }
        } else {
            Prompt {
                content: "Additional actions from previous message".to_string(),
                title: base.title.clone(),
                color: base.color,
                fields: Vec::new(),
                image: None,
                controls: chunk.to_vec(),
            }
        };
        publications.push(prompt);
    }
    publications
}
