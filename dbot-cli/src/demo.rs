//! Demo user bot: greets the channel with help buttons and reacts to mentions.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use dbot_core::{Color, DisplayPayload, InputSpec, PromptField, Reaction};
use dbot_interact::{
    action_fn, generate_token, poll_fn, ActionCallback, ActionOptions, AppEvents, Broadcaster,
    ButtonSpec, MessageOptions, PollAnswerSpec, PollAnswerState, PollEvent, PollMonitor,
    PollOptions, ReactionTrigger,
};
use tracing::{debug, info};

pub const MIN_RANDOM_LENGTH: usize = 1;
pub const MAX_RANDOM_LENGTH: usize = 100;
/// Reacting with this on the greeting shows the help.
pub const HELP_REACTION: &str = "👍";

/// Parses the requested random string length.
pub fn parse_length(raw: Option<&str>) -> Result<usize, String> {
    let error = || {
        format!(
            "String length must be between {} and {}",
            MIN_RANDOM_LENGTH, MAX_RANDOM_LENGTH
        )
    };
    let length: usize = raw.and_then(|s| s.trim().parse().ok()).ok_or_else(error)?;
    if (MIN_RANDOM_LENGTH..=MAX_RANDOM_LENGTH).contains(&length) {
        Ok(length)
    } else {
        Err(error())
    }
}

/// One line per answer: `text: votes`, most voted first.
pub fn format_results(answers: &[PollAnswerState]) -> String {
    let mut sorted: Vec<&PollAnswerState> = answers.iter().collect();
    sorted.sort_by(|a, b| b.vote_count.cmp(&a.vote_count).then(a.index.cmp(&b.index)));
    sorted
        .iter()
        .map(|a| format!("{}: {}", a.text, a.vote_count))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct DemoUserBot {
    name: String,
    me: Weak<DemoUserBot>,
    broadcaster: Arc<Broadcaster>,
    monitor: Arc<PollMonitor>,
}

impl DemoUserBot {
    pub fn new(name: impl Into<String>, broadcaster: Arc<Broadcaster>, monitor: Arc<PollMonitor>) -> Arc<Self> {
        let name = name.into();
        Arc::new_cyclic(|me| Self {
            name,
            me: me.clone(),
            broadcaster,
            monitor,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Buttons attached to the greeting and help messages.
    ///
    /// Callbacks hold a weak reference: the registry that stores them is owned by the
    /// broadcaster this bot holds.
    pub fn help_buttons(&self) -> Vec<ButtonSpec> {
        let me = self.me.clone();
        let send_message = action_fn(move |_| {
            let me = me.clone();
            async move {
                if let Some(bot) = me.upgrade() {
                    bot.broadcaster
                        .send_message("Here is a message", MessageOptions::default())
                        .await;
                }
                Ok(None)
            }
        });

        let random_string = action_fn(|inputs| async move {
            let payload = match parse_length(inputs.text("length")) {
                Ok(length) => DisplayPayload::text(format!("Random string: {}", generate_token(length))),
                Err(message) => DisplayPayload::text(message).with_color(Color::ERROR),
            };
            Ok(Some(payload))
        });

        let display_help = self.display_help_action();

        let me = self.me.clone();
        let start_poll = action_fn(move |_| {
            let me = me.clone();
            async move {
                let Some(bot) = me.upgrade() else {
                    return Ok(None);
                };
                let sent = bot.start_poll().await;
                Ok(Some(DisplayPayload::text(format!("Poll sent to {} chat(s)", sent))))
            }
        });

        vec![
            ButtonSpec::action("Test send message", send_message).with_emoji("🎥"),
            ButtonSpec::action("Generate a random string", random_string)
                .with_emoji("🎲")
                .with_options(ActionOptions {
                    inputs: vec![InputSpec::text("length", "String length").with_placeholder("10")],
                    ..ActionOptions::default()
                }),
            ButtonSpec::action("Display help", display_help)
                .with_emoji("📚")
                .with_options(ActionOptions {
                    announcement: true,
                    ..ActionOptions::default()
                }),
            ButtonSpec::action("Start a poll", start_poll)
                .with_emoji("📊")
                .with_options(ActionOptions {
                    needs_confirmation: true,
                    ..ActionOptions::default()
                }),
        ]
    }

    fn display_help_action(&self) -> Arc<dyn ActionCallback> {
        let me = self.me.clone();
        action_fn(move |_| {
            let me = me.clone();
            async move {
                if let Some(bot) = me.upgrade() {
                    bot.display_help().await;
                }
                Ok(None)
            }
        })
    }

    pub async fn display_help(&self) {
        self.broadcaster
            .send_message(
                "Demo bot\nUsage: mention me followed by a command.",
                MessageOptions {
                    title: Some("Bot Help".to_string()),
                    color: Some(Color::BLUE),
                    fields: vec![PromptField {
                        name: "@bot !help".to_string(),
                        value: "Show this help".to_string(),
                    }],
                    buttons: self.help_buttons(),
                    ..MessageOptions::default()
                },
            )
            .await;
    }

    /// Sends the demo poll to the audience; returns how many chats received it.
    pub async fn start_poll(&self) -> usize {
        let me = self.me.clone();
        let callback = poll_fn(move |event, poll, answers| {
            let me = me.clone();
            async move {
                let Some(bot) = me.upgrade() else {
                    return Ok(());
                };
                match event {
                    PollEvent::Update => {
                        debug!(poll = %poll.key(), "Demo poll tallies changed");
                    }
                    PollEvent::Reminder => {
                        bot.broadcaster
                            .send_message(
                                "The poll is still open, don't forget to vote!",
                                MessageOptions {
                                    title: Some("Reminder".to_string()),
                                    color: Some(Color::PURPLE),
                                    ..MessageOptions::default()
                                },
                            )
                            .await;
                    }
                    PollEvent::Complete => {
                        bot.broadcaster
                            .send_message(
                                &format_results(&answers),
                                MessageOptions {
                                    title: Some("Poll results".to_string()),
                                    color: Some(Color::INFO),
                                    ..MessageOptions::default()
                                },
                            )
                            .await;
                    }
                }
                Ok(())
            }
        });

        let answers = vec![
            PollAnswerSpec::new("Monday").with_emoji("1️⃣").with_id("mon"),
            PollAnswerSpec::new("Wednesday").with_emoji("2️⃣").with_id("wed"),
            PollAnswerSpec::new("Friday").with_emoji("3️⃣").with_id("fri"),
        ];
        let options = PollOptions {
            duration_hours: 24.0,
            remind_after_hours: 12.0,
            reminder_unique_voters_expected: 3,
            allow_multiselect: true,
            callback: Some(callback),
        };
        self.monitor
            .send_poll("Which day works best for the next meetup?", answers, options)
            .await
            .len()
    }
}

#[async_trait]
impl AppEvents for DemoUserBot {
    async fn on_connected(&self) {
        info!(name = %self.name, "Demo bot connected");
        self.broadcaster
            .send_message(
                &format!("Hello I'm {}", self.name),
                MessageOptions {
                    title: Some("Bot started".to_string()),
                    color: Some(Color::PURPLE),
                    buttons: self.help_buttons(),
                    reaction: Some(ReactionTrigger::new(
                        "Display help",
                        HELP_REACTION,
                        1,
                        self.display_help_action(),
                    )),
                    ..MessageOptions::default()
                },
            )
            .await;
    }

    async fn on_action_not_found(&self, token: &str) {
        debug!(token = %token, "Stale button pressed, posting the latest buttons");
        self.broadcaster
            .send_message(
                "Seems like you are trying to use buttons of a previous version of me :o",
                MessageOptions {
                    title: Some("Latest interaction buttons".to_string()),
                    buttons: self.help_buttons(),
                    ..MessageOptions::default()
                },
            )
            .await;
    }

    async fn on_mention(&self, text: &str) {
        if text.starts_with("!help") {
            self.display_help().await;
        } else {
            self.broadcaster
                .send_message(
                    &format!("Unknown command: {}", text),
                    MessageOptions {
                        title: Some("Unknown command".to_string()),
                        color: Some(Color::RED),
                        ..MessageOptions::default()
                    },
                )
                .await;
        }
    }

    async fn on_command(&self, text: &str) {
        if text.starts_with("!help") {
            self.display_help().await;
        }
    }

    async fn on_reaction(&self, reaction: &Reaction) {
        debug!(
            user_id = reaction.user.id,
            emoji = %reaction.emoji,
            count = reaction.count,
            "Reaction received"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_length_bounds() {
        assert_eq!(parse_length(Some("10")), Ok(10));
        assert_eq!(parse_length(Some(" 100 ")), Ok(100));
        assert!(parse_length(Some("0")).is_err());
        assert!(parse_length(Some("101")).is_err());
        assert!(parse_length(Some("ten")).is_err());
        assert_eq!(
            parse_length(None),
            Err("String length must be between 1 and 100".to_string())
        );
    }

    #[test]
    fn test_format_results_most_voted_first() {
        let answer = |index, text: &str, vote_count| PollAnswerState {
            index,
            id: index.to_string(),
            text: text.to_string(),
            vote_count,
            data: None,
        };
        let answers = vec![answer(0, "Monday", 1), answer(1, "Wednesday", 4), answer(2, "Friday", 1)];
        assert_eq!(format_results(&answers), "Wednesday: 4\nMonday: 1\nFriday: 1");
    }
}
