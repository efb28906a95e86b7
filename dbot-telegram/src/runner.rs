//! Update routing and the dispatcher loop.
//!
//! Button presses go to the [`InteractionDispatcher`], replies to pending forms are collected
//! until the form is complete, mentions and `!` commands go to [`AppEvents`], reactions are
//! tallied and dispatched, and poll updates feed the transport's poll cache that the
//! [`PollMonitor`] reads.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use dbot_core::{Reaction, ToCoreUser};
use dbot_interact::{AppEvents, InteractionDispatcher, PollMonitor};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, MaybeAnonymousUser, MessageReactionUpdated, Poll, PollAnswer};
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::{
    callback_interaction, core_chat, message_interaction, reaction_glyphs, TelegramUserWrapper,
};
use crate::connect::{connect_with_retry, ConnectRetry};
use crate::forms::FormStep;
use crate::reactions::ReactionBook;
use crate::transport::TelegramTransport;

/// Prefix of messages routed to [`AppEvents::on_command`].
pub const COMMAND_PREFIX: char = '!';

/// A text message addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// `@bot ...`, with the mention removed.
    Mention(String),
    /// `!...`, the full text.
    Command(String),
}

/// Classifies a message text. `None` when it is neither a mention nor a command.
pub fn classify_text(text: &str, bot_username: Option<&str>) -> Option<Incoming> {
    let trimmed = text.trim();
    if let Some(username) = bot_username.filter(|u| !u.is_empty()) {
        let tag = format!("@{}", username);
        if let Some(pos) = trimmed.find(&tag) {
            let mut stripped = String::with_capacity(trimmed.len());
            stripped.push_str(&trimmed[..pos]);
            stripped.push_str(&trimmed[pos + tag.len()..]);
            return Some(Incoming::Mention(stripped.trim().to_string()));
        }
    }
    if trimmed.starts_with(COMMAND_PREFIX) {
        return Some(Incoming::Command(trimmed.to_string()));
    }
    None
}

/// Routes Telegram updates to the interaction engine.
pub struct UpdateRouter {
    transport: Arc<TelegramTransport>,
    dispatcher: Arc<InteractionDispatcher>,
    events: Arc<dyn AppEvents>,
    /// Monitored chats; empty means every chat.
    chats: HashSet<i64>,
    reactions: ReactionBook,
    bot_username: RwLock<Option<String>>,
    sequence: AtomicU64,
}

impl UpdateRouter {
    pub fn new(
        transport: Arc<TelegramTransport>,
        dispatcher: Arc<InteractionDispatcher>,
        events: Arc<dyn AppEvents>,
        chats: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            transport,
            dispatcher,
            events,
            chats: chats.into_iter().collect(),
            reactions: ReactionBook::default(),
            bot_username: RwLock::new(None),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn is_monitored(&self, chat_id: i64) -> bool {
        self.chats.is_empty() || self.chats.contains(&chat_id)
    }

    pub async fn set_bot_username(&self, username: String) {
        *self.bot_username.write().await = Some(username);
    }

    pub async fn bot_username(&self) -> Option<String> {
        self.bot_username.read().await.clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.sequence.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Runs `task` for an update; a panic is broadcast to the audience instead of being lost.
    async fn contained<F>(&self, context: &str, task: F)
    where
        F: std::future::Future<Output = ()>,
    {
        self.dispatcher.broadcaster().contain(context, task).await;
    }

    pub async fn handle_callback(&self, bot: Bot, query: CallbackQuery) {
        // Stops the client-side spinner; the outcome is reported in chat.
        if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
            warn!(error = %e, "Failed to answer callback query");
        }
        let Some(token) = query.data.clone() else {
            return;
        };
        let Some(interaction) = callback_interaction(self.next_id("cb"), &query) else {
            debug!("Callback query without message, ignoring");
            return;
        };
        if !self.is_monitored(interaction.chat.id) {
            debug!(chat_id = interaction.chat.id, "Callback from unmonitored chat, ignoring");
            return;
        }
        info!(
            user_id = interaction.user.id,
            chat_id = interaction.chat.id,
            interaction_id = %interaction.id,
            "Received button press"
        );
        let outcome = self.dispatcher.on_trigger(&interaction, &token).await;
        debug!(interaction_id = %interaction.id, outcome = ?outcome, "Button press handled");
    }

    pub async fn handle_message(&self, msg: Message) {
        let Some(text) = msg.text() else {
            return;
        };
        if !self.is_monitored(msg.chat.id.0) {
            return;
        }
        let Some(interaction) = message_interaction(self.next_id("msg"), &msg) else {
            return;
        };

        match self.transport.continue_form(&interaction, text).await {
            Ok(Some(FormStep::Submit { token, fields })) => {
                let outcome = self
                    .dispatcher
                    .on_form_submit(&interaction, &token, &fields)
                    .await;
                debug!(interaction_id = %interaction.id, outcome = ?outcome, "Form submitted");
                return;
            }
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, user_id = interaction.user.id, "Failed to continue form");
                return;
            }
        }

        let username = self.bot_username().await;
        match classify_text(text, username.as_deref()) {
            Some(Incoming::Mention(stripped)) => {
                info!(user_id = interaction.user.id, chat_id = interaction.chat.id, "Bot mentioned");
                self.events.on_mention(&stripped).await;
            }
            Some(Incoming::Command(command)) => {
                info!(user_id = interaction.user.id, command = %command, "Command received");
                self.events.on_command(&command).await;
            }
            None => {}
        }
    }

    /// Tallies a reaction change and dispatches each newly added glyph. Anonymous reactions and
    /// custom or paid reaction types are ignored.
    pub async fn handle_reaction(&self, update: MessageReactionUpdated) {
        if !self.is_monitored(update.chat.id.0) {
            return;
        }
        let MaybeAnonymousUser::User(user) = &update.actor else {
            debug!(chat_id = update.chat.id.0, "Anonymous reaction, ignoring");
            return;
        };
        let user = TelegramUserWrapper(user).to_core();
        let old = reaction_glyphs(&update.old_reaction);
        let new = reaction_glyphs(&update.new_reaction);
        let added = self
            .reactions
            .apply(update.chat.id.0, update.message_id.0, user.id, &old, &new)
            .await;

        for (emoji, count) in added {
            let reaction = Reaction {
                chat: core_chat(&update.chat),
                message_id: update.message_id.0.to_string(),
                user: user.clone(),
                emoji,
                count,
            };
            let id = self.next_id("rx");
            let outcome = self.dispatcher.on_reaction(&id, &reaction).await;
            debug!(interaction_id = %id, emoji = %reaction.emoji, count, outcome = ?outcome, "Reaction handled");
        }
    }

    pub async fn handle_poll(&self, poll: Poll) {
        let counts: Vec<u32> = poll.options.iter().map(|o| o.voter_count).collect();
        let poll_id = poll.id.to_string();
        if !self
            .transport
            .polls()
            .apply_counts(&poll_id, &counts, poll.is_closed)
            .await
        {
            debug!(poll_id = %poll_id, "Update for unknown poll");
        }
    }

    pub async fn handle_poll_answer(&self, answer: PollAnswer) {
        let user_id = match &answer.voter {
            MaybeAnonymousUser::User(user) => user.id.0 as i64,
            MaybeAnonymousUser::Chat(chat) => chat.id.0,
        };
        let option_ids: Vec<usize> = answer.option_ids.iter().map(|&i| i as usize).collect();
        let poll_id = answer.poll_id.to_string();
        if !self
            .transport
            .polls()
            .apply_answer(&poll_id, user_id, option_ids)
            .await
        {
            debug!(poll_id = %poll_id, "Answer for unknown poll");
        }
    }
}

/// Connects, starts the poll monitor and dispatches updates until Ctrl-C.
///
/// Login (`get_me`) is retried per `retry` until it succeeds. The monitor only ticks while the
/// dispatcher runs. Message and button handlers run contained: a panic is broadcast.
#[instrument(skip_all)]
pub async fn run_repl(
    bot: Bot,
    router: Arc<UpdateRouter>,
    monitor: Arc<PollMonitor>,
    retry: ConnectRetry,
) -> Result<()> {
    if let Some(username) = connect_with_retry(&bot, &retry).await? {
        info!(username = %username, "Bot username set before dispatch");
        router.set_bot_username(username).await;
    }

    let (connected_tx, connected_rx) = watch::channel(true);
    let monitor_task = monitor.spawn(connected_rx);
    router.events.on_connected().await;

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let router = Arc::clone(&router);
            move |msg: Message| {
                let router = Arc::clone(&router);
                async move {
                    router.contained("message", router.handle_message(msg)).await;
                    respond(())
                }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let router = Arc::clone(&router);
            move |query: CallbackQuery, bot: Bot| {
                let router = Arc::clone(&router);
                async move {
                    // Actions may run long; keep the chat's update queue moving.
                    tokio::spawn(async move {
                        router
                            .contained("button press", router.handle_callback(bot, query))
                            .await;
                    });
                    respond(())
                }
            }
        }))
        .branch(Update::filter_message_reaction_updated().endpoint({
            let router = Arc::clone(&router);
            move |update: MessageReactionUpdated| {
                let router = Arc::clone(&router);
                async move {
                    router.contained("reaction", router.handle_reaction(update)).await;
                    respond(())
                }
            }
        }))
        .branch(Update::filter_poll().endpoint({
            let router = Arc::clone(&router);
            move |poll: Poll| {
                let router = Arc::clone(&router);
                async move {
                    router.handle_poll(poll).await;
                    respond(())
                }
            }
        }))
        .branch(Update::filter_poll_answer().endpoint({
            let router = Arc::clone(&router);
            move |answer: PollAnswer| {
                let router = Arc::clone(&router);
                async move {
                    router.handle_poll_answer(answer).await;
                    respond(())
                }
            }
        }));

    info!("Dispatching updates");
    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped");
    let _ = connected_tx.send(false);
    drop(connected_tx);
    if let Err(e) = monitor_task.await {
        error!(error = %e, "Poll monitor task failed");
    }
    Ok(())
}
