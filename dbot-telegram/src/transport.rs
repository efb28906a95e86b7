//! Teloxide-based implementation of [`Transport`] and [`PollTransport`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dbot_core::{
    Chat, DbotError, DisplayPayload, FormSpec, Interaction, PollHandle, PollRequest, PollSnapshot,
    PollTransport, Prompt, PromptHandle, Result, Transport,
};
use teloxide::prelude::*;
use teloxide::types::{ForceReply, InputPollOption, MessageId, ParseMode, ReplyParameters};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::forms::{FormBook, FormStep, PendingForm};
use crate::polls::PollBook;
use crate::render::{html_escape, keyboard, render_payload, render_prompt};

const WORKING_TEXT: &str = "Working…";

fn transport_err(e: teloxide::RequestError) -> DbotError {
    DbotError::Transport(e.to_string())
}

/// Parses a message id string into a Telegram [`MessageId`].
pub fn parse_message_id(s: &str) -> Result<MessageId> {
    s.parse::<i32>()
        .map(MessageId)
        .map_err(|_| DbotError::Transport(format!("Invalid message_id: {}", s)))
}

/// Expiry of a poll sent at `now` lasting `duration`. Errors when the instant is out of range.
pub fn poll_expiry(now: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(duration)
        .ok_or_else(|| DbotError::Transport(format!("Poll duration out of range: {}", duration)))
}

fn mention(interaction: &Interaction) -> String {
    format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        interaction.user.id,
        html_escape(&interaction.user.display_name())
    )
}

pub struct TelegramTransport {
    bot: Bot,
    /// Placeholder message per deferred interaction id.
    deferred: Mutex<HashMap<String, (i64, MessageId)>>,
    forms: FormBook,
    polls: PollBook,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            deferred: Mutex::new(HashMap::new()),
            forms: FormBook::default(),
            polls: PollBook::default(),
        }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub fn polls(&self) -> &PollBook {
        &self.polls
    }

    async fn send_html(
        &self,
        chat_id: i64,
        html: String,
        prompt: Option<&Prompt>,
        reply_to: Option<&str>,
    ) -> Result<Message> {
        let mut request = self
            .bot
            .send_message(ChatId(chat_id), html)
            .parse_mode(ParseMode::Html);
        if let Some(markup) = prompt.and_then(|p| keyboard(&p.controls)) {
            request = request.reply_markup(markup);
        }
        if let Some(id) = reply_to.and_then(|id| parse_message_id(id).ok()) {
            request = request.reply_parameters(ReplyParameters::new(id));
        }
        request.await.map_err(transport_err)
    }

    async fn ask(&self, interaction: &Interaction, question: String) -> Result<()> {
        self.bot
            .send_message(
                ChatId(interaction.chat.id),
                format!("{}\n{}", mention(interaction), question),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(ForceReply::new().selective())
            .await
            .map_err(transport_err)?;
        Ok(())
    }

    /// Feeds a text message to the sender's pending form, sending the next question or a
    /// cancellation notice. `None` when the sender has no pending form in that chat.
    pub async fn continue_form(&self, message: &Interaction, text: &str) -> Result<Option<FormStep>> {
        let Some(step) = self
            .forms
            .answer(message.chat.id, message.user.id, text)
            .await
        else {
            return Ok(None);
        };
        match &step {
            FormStep::Ask(question) => self.ask(message, question.clone()).await?,
            FormStep::Cancelled => {
                info!(chat_id = message.chat.id, user_id = message.user.id, "Form cancelled");
                self.send_html(message.chat.id, "Form cancelled.".to_string(), None, message.message_id.as_deref())
                    .await?;
            }
            FormStep::Submit { .. } => {}
        }
        Ok(Some(step))
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_prompt(&self, chat: &Chat, prompt: &Prompt) -> Result<PromptHandle> {
        let sent = self
            .send_html(chat.id, render_prompt(prompt), Some(prompt), None)
            .await?;
        Ok(PromptHandle {
            chat_id: chat.id,
            message_id: sent.id.0.to_string(),
        })
    }

    #[instrument(skip(self, interaction, form), fields(user_id = interaction.user.id, fields = form.fields.len()))]
    async fn show_form(&self, interaction: &Interaction, form: &FormSpec) -> Result<()> {
        let question = self
            .forms
            .open(
                interaction.chat.id,
                interaction.user.id,
                PendingForm::new(form.clone()),
            )
            .await;
        self.ask(interaction, question).await
    }

    async fn reply(&self, interaction: &Interaction, prompt: &Prompt, ephemeral: bool) -> Result<()> {
        if ephemeral {
            debug!("Ephemeral replies are not supported by Telegram, replying in chat");
        }
        self.send_html(
            interaction.chat.id,
            render_prompt(prompt),
            Some(prompt),
            interaction.message_id.as_deref(),
        )
        .await?;
        Ok(())
    }

    async fn defer_reply(&self, interaction: &Interaction, _ephemeral: bool) -> Result<()> {
        let sent = self
            .send_html(
                interaction.chat.id,
                WORKING_TEXT.to_string(),
                None,
                interaction.message_id.as_deref(),
            )
            .await?;
        self.deferred
            .lock()
            .await
            .insert(interaction.id.clone(), (interaction.chat.id, sent.id));
        Ok(())
    }

    async fn edit_reply(&self, interaction: &Interaction, payload: &DisplayPayload) -> Result<()> {
        let placeholder = self.deferred.lock().await.remove(&interaction.id);
        let html = render_payload(payload);
        match placeholder {
            Some((chat_id, message_id)) => {
                self.bot
                    .edit_message_text(ChatId(chat_id), message_id, html)
                    .parse_mode(ParseMode::Html)
                    .await
                    .map_err(transport_err)?;
            }
            None => {
                self.send_html(interaction.chat.id, html, None, interaction.message_id.as_deref())
                    .await?;
            }
        }
        Ok(())
    }

    async fn delete_reply(&self, interaction: &Interaction) -> Result<()> {
        if let Some((chat_id, message_id)) = self.deferred.lock().await.remove(&interaction.id) {
            self.bot
                .delete_message(ChatId(chat_id), message_id)
                .await
                .map_err(transport_err)?;
        }
        Ok(())
    }
}

#[async_trait]
impl PollTransport for TelegramTransport {
    async fn send_poll(&self, chat: &Chat, poll: &PollRequest) -> Result<PollHandle> {
        let labels: Vec<String> = poll
            .answers
            .iter()
            .map(|a| match &a.emoji {
                Some(emoji) => format!("{} {}", emoji, a.text),
                None => a.text.clone(),
            })
            .collect();
        let options: Vec<InputPollOption> = labels.iter().cloned().map(InputPollOption::new).collect();
        let expires_at = poll_expiry(Utc::now(), poll.duration)?;

        let sent = self
            .bot
            .send_poll(ChatId(chat.id), poll.question.clone(), options)
            .is_anonymous(false)
            .allows_multiple_answers(poll.allow_multiselect)
            .await
            .map_err(transport_err)?;
        let poll_id = sent
            .poll()
            .map(|p| p.id.to_string())
            .ok_or_else(|| DbotError::Transport("Sent message carries no poll".to_string()))?;

        let handle = PollHandle {
            chat_id: chat.id,
            message_id: sent.id.0.to_string(),
            poll_id,
        };
        self.polls
            .insert(handle.clone(), labels, expires_at)
            .await;
        info!(poll = %handle.key(), "Poll sent");
        Ok(handle)
    }

    async fn poll_snapshot(&self, poll: &PollHandle) -> Result<Option<PollSnapshot>> {
        Ok(self.polls.snapshot(poll).await)
    }

    async fn fetch_voters(&self, poll: &PollHandle, answer_index: usize) -> Result<Vec<i64>> {
        Ok(self.polls.voters(poll, answer_index).await)
    }

    async fn close_poll(&self, poll: &PollHandle) -> Result<()> {
        let message_id = parse_message_id(&poll.message_id)?;
        let stopped = self.bot.stop_poll(ChatId(poll.chat_id), message_id).await;
        self.polls.forget(poll).await;
        stopped.map_err(transport_err)?;
        Ok(())
    }

    async fn release_poll(&self, poll: &PollHandle) {
        self.polls.forget(poll).await;
    }
}
