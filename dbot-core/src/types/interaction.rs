//! Inbound interaction: the context of a button press or form submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{chat::Chat, user::User};

/// What produced the interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionKind {
    Button,
    FormSubmit,
    /// A reaction added to a bot message.
    Reaction,
}

/// A single trigger event with the user and chat it came from.
///
/// `id` is transport-specific (e.g. a Telegram callback query id) and is what replies are keyed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub kind: InteractionKind,
    pub user: User,
    pub chat: Chat,
    /// Message carrying the control that was triggered, when known.
    pub message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A reaction glyph added by a user to a message, with the glyph's resulting count on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub chat: Chat,
    pub message_id: String,
    pub user: User,
    pub emoji: String,
    pub count: u32,
}

impl Reaction {
    /// Interaction context for running the action bound to the reacted message.
    pub fn to_interaction(&self, id: impl Into<String>) -> Interaction {
        Interaction {
            id: id.into(),
            kind: InteractionKind::Reaction,
            user: self.user.clone(),
            chat: self.chat.clone(),
            message_id: Some(self.message_id.clone()),
            created_at: Utc::now(),
        }
    }
}
