//! Prompt rendering: HTML text and inline keyboards.
//!
//! Telegram has no accent colors; error-colored prompts get a warning marker instead.

use dbot_core::{Color, Control, ControlTarget, DisplayPayload, Prompt, PromptField};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::warn;

/// Buttons per keyboard row.
pub const BUTTONS_PER_ROW: usize = 5;

const WARNING_MARKER: &str = "⚠️ ";

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_parts(
    title: Option<&str>,
    content: &str,
    color: Option<Color>,
    fields: &[PromptField],
) -> String {
    let marker = match color {
        Some(Color::ERROR) | Some(Color::RED) => WARNING_MARKER,
        _ => "",
    };
    let mut parts = Vec::new();
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        parts.push(format!("{}<b>{}</b>", marker, html_escape(title)));
    }
    if !content.is_empty() {
        if parts.is_empty() {
            parts.push(format!("{}{}", marker, html_escape(content)));
        } else {
            parts.push(html_escape(content));
        }
    }
    for field in fields {
        parts.push(format!("<b>{}</b>\n{}", html_escape(&field.name), html_escape(&field.value)));
    }
    if parts.is_empty() {
        // Telegram rejects empty messages.
        parts.push(format!("{}…", marker));
    }
    parts.join("\n\n")
}

pub fn render_prompt(prompt: &Prompt) -> String {
    let mut html = render_parts(prompt.title.as_deref(), &prompt.content, prompt.color, &prompt.fields);
    if let Some(image) = &prompt.image {
        html.push_str(&format!("\n\n<a href=\"{}\">🖼</a>", html_escape(image)));
    }
    html
}

pub fn render_payload(payload: &DisplayPayload) -> String {
    render_parts(payload.title.as_deref(), &payload.content, payload.color, &payload.fields)
}

fn button(control: &Control) -> Option<InlineKeyboardButton> {
    let label = match &control.emoji {
        Some(emoji) => format!("{} {}", emoji, control.label),
        None => control.label.clone(),
    };
    match &control.target {
        ControlTarget::Action(token) => Some(InlineKeyboardButton::callback(label, token.clone())),
        ControlTarget::Url(url) => match reqwest::Url::parse(url) {
            Ok(url) => Some(InlineKeyboardButton::url(label, url)),
            Err(e) => {
                warn!(url = %url, error = %e, "Invalid button URL, skipping button");
                None
            }
        },
    }
}

/// Inline keyboard of the prompt's controls, `None` when there are none.
pub fn keyboard(controls: &[Control]) -> Option<InlineKeyboardMarkup> {
    let buttons: Vec<InlineKeyboardButton> = controls.iter().filter_map(button).collect();
    if buttons.is_empty() {
        return None;
    }
    let rows: Vec<Vec<InlineKeyboardButton>> = buttons
        .chunks(BUTTONS_PER_ROW)
        .map(|row| row.to_vec())
        .collect();
    Some(InlineKeyboardMarkup::new(rows))
}
