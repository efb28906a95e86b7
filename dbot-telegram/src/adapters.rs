//! Adapters from Telegram (teloxide) types to dbot_core types.

use chrono::Utc;
use dbot_core::{Chat, Interaction, InteractionKind, ToCoreUser, User};
use teloxide::types::{CallbackQuery, MaybeInaccessibleMessage, Message, ReactionType};

/// Wraps a teloxide User for conversion to core [`User`].
pub struct TelegramUserWrapper<'a>(pub &'a teloxide::types::User);

impl<'a> ToCoreUser for TelegramUserWrapper<'a> {
    fn to_core(&self) -> User {
        User {
            id: self.0.id.0 as i64,
            username: self.0.username.clone(),
            first_name: Some(self.0.first_name.clone()),
            last_name: self.0.last_name.clone(),
        }
    }
}

pub fn core_chat(chat: &teloxide::types::Chat) -> Chat {
    let chat_type = if chat.is_private() {
        "private"
    } else if chat.is_group() {
        "group"
    } else if chat.is_supergroup() {
        "supergroup"
    } else if chat.is_channel() {
        "channel"
    } else {
        "unknown"
    };
    Chat {
        id: chat.id.0,
        chat_type: chat_type.to_string(),
    }
}

/// Button press. `None` when the query carries no message (inline-mode buttons).
pub fn callback_interaction(id: String, query: &CallbackQuery) -> Option<Interaction> {
    let (chat, message_id) = match query.message.as_ref()? {
        MaybeInaccessibleMessage::Regular(m) => (core_chat(&m.chat), m.id.0.to_string()),
        MaybeInaccessibleMessage::Inaccessible(m) => (core_chat(&m.chat), m.message_id.0.to_string()),
    };
    Some(Interaction {
        id,
        kind: InteractionKind::Button,
        user: TelegramUserWrapper(&query.from).to_core(),
        chat,
        message_id: Some(message_id),
        created_at: Utc::now(),
    })
}

/// Interaction for a message that completes a form. `None` for messages without a sender.
pub fn message_interaction(id: String, msg: &Message) -> Option<Interaction> {
    let user = msg.from.as_ref()?;
    Some(Interaction {
        id,
        kind: InteractionKind::FormSubmit,
        user: TelegramUserWrapper(user).to_core(),
        chat: core_chat(&msg.chat),
        message_id: Some(msg.id.0.to_string()),
        created_at: Utc::now(),
    })
}

/// Glyphs of plain emoji reactions. Custom emoji and paid reactions have no glyph and are skipped.
pub fn reaction_glyphs(reactions: &[ReactionType]) -> Vec<String> {
    reactions
        .iter()
        .filter_map(|reaction| match reaction {
            ReactionType::Emoji { emoji } => Some(emoji.clone()),
            _ => None,
        })
        .collect()
}
