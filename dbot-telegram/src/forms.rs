//! Forms emulated with sequential ForceReply questions.
//!
//! One pending form per (chat, user). Each reply answers the current field; `-` leaves it blank,
//! choice fields take comma-separated options and `/cancel` drops the form.

use std::collections::HashMap;

use dbot_core::{FieldValue, FormSpec, InputSpec, SubmittedValue};
use tokio::sync::Mutex;

use crate::render::html_escape;

pub const CANCEL_COMMAND: &str = "/cancel";
pub const BLANK_ANSWER: &str = "-";

/// What to do after a reply was applied to a pending form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormStep {
    /// Send this question (HTML) and wait for the next reply.
    Ask(String),
    /// Every field is answered.
    Submit { token: String, fields: Vec<FieldValue> },
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct PendingForm {
    form: FormSpec,
    answers: Vec<FieldValue>,
}

impl PendingForm {
    pub fn new(form: FormSpec) -> Self {
        Self {
            form,
            answers: Vec::new(),
        }
    }

    pub fn token(&self) -> &str {
        &self.form.token
    }

    /// Question for the field awaiting an answer.
    pub fn question(&self) -> String {
        match self.form.fields.get(self.answers.len()) {
            Some(spec) => self.question_for(spec),
            None => format!("<b>{}</b>", html_escape(&self.form.title)),
        }
    }

    fn question_for(&self, spec: &InputSpec) -> String {
        let mut lines = vec![
            format!(
                "<b>{}</b> ({}/{})",
                html_escape(&self.form.title),
                self.answers.len() + 1,
                self.form.fields.len()
            ),
            html_escape(&spec.label),
        ];
        if !spec.placeholder.is_empty() {
            lines.push(format!("<i>e.g. {}</i>", html_escape(&spec.placeholder)));
        }
        if let Some(choices) = &spec.choices {
            let options: Vec<String> = choices
                .options
                .iter()
                .map(|c| html_escape(&c.label))
                .collect();
            let hint = if choices.multiple { " (comma-separated)" } else { "" };
            lines.push(format!("Options: {}{}", options.join(", "), hint));
        }
        if let Some(default) = &spec.default_value {
            lines.push(format!("Default: {}", html_escape(default)));
        }
        lines.push(format!("Reply {} to leave blank, {} to abort.", BLANK_ANSWER, CANCEL_COMMAND));
        lines.join("\n")
    }

    /// Applies one reply.
    pub fn accept(&mut self, text: &str) -> FormStep {
        let text = text.trim();
        if text.eq_ignore_ascii_case(CANCEL_COMMAND) {
            return FormStep::Cancelled;
        }
        let Some(spec) = self.form.fields.get(self.answers.len()).cloned() else {
            return self.submit();
        };

        let value = if text.is_empty() || text == BLANK_ANSWER {
            let fallback: Vec<String> = spec.default_value.iter().cloned().collect();
            if spec.is_selector() {
                SubmittedValue::Selected(fallback)
            } else {
                SubmittedValue::Text(fallback.concat())
            }
        } else if let Some(choices) = &spec.choices {
            let mut values = Vec::new();
            for raw in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match choices.find(raw) {
                    Some(choice) => values.push(choice.value.clone()),
                    None => {
                        return FormStep::Ask(format!(
                            "Unknown option \"{}\".\n\n{}",
                            html_escape(raw),
                            self.question_for(&spec)
                        ))
                    }
                }
            }
            if !choices.multiple && values.len() > 1 {
                return FormStep::Ask(format!("Pick only one option.\n\n{}", self.question_for(&spec)));
            }
            SubmittedValue::Selected(values)
        } else {
            SubmittedValue::Text(text.to_string())
        };

        self.answers.push(FieldValue {
            id: spec.id.clone(),
            value,
        });
        if self.answers.len() >= self.form.fields.len() {
            self.submit()
        } else {
            FormStep::Ask(self.question())
        }
    }

    fn submit(&self) -> FormStep {
        FormStep::Submit {
            token: self.form.token.clone(),
            fields: self.answers.clone(),
        }
    }
}

/// Pending forms keyed by `(chat id, user id)`.
#[derive(Default)]
pub struct FormBook {
    pending: Mutex<HashMap<(i64, i64), PendingForm>>,
}

impl FormBook {
    /// Opens a form, replacing any form the user had pending in that chat. Returns the first question.
    pub async fn open(&self, chat_id: i64, user_id: i64, form: PendingForm) -> String {
        let question = form.question();
        self.pending.lock().await.insert((chat_id, user_id), form);
        question
    }

    pub async fn is_pending(&self, chat_id: i64, user_id: i64) -> bool {
        self.pending.lock().await.contains_key(&(chat_id, user_id))
    }

    /// Applies a reply to the user's pending form; `None` when there is none.
    pub async fn answer(&self, chat_id: i64, user_id: i64, text: &str) -> Option<FormStep> {
        let mut pending = self.pending.lock().await;
        let form = pending.get_mut(&(chat_id, user_id))?;
        let step = form.accept(text);
        if !matches!(step, FormStep::Ask(_)) {
            pending.remove(&(chat_id, user_id));
        }
        Some(step)
    }
}
