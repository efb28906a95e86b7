//! Outbound content: prompts (message + controls), display payloads and their building blocks.

use serde::{Deserialize, Serialize};

/// RGB accent color of a prompt. Transports without colors may ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const INFO: Color = Color(0x0099ff);
    pub const ERROR: Color = Color(0x911515);
    pub const PURPLE: Color = Color(0x800080);
    pub const BLUE: Color = Color(0x0000ff);
    pub const RED: Color = Color(0xff0000);

    /// Parses `#rrggbb` or `rrggbb`.
    pub fn from_hex(s: &str) -> Option<Color> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        u32::from_str_radix(hex, 16).ok().map(Color)
    }

    pub fn to_hex(self) -> String {
        format!("#{:06x}", self.0)
    }
}

/// Visual weight of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Danger,
    Link,
}

/// What pressing a control does: trigger a registered action (by token) or open a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlTarget {
    Action(String),
    Url(String),
}

/// A trigger control (button) attached to a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub label: String,
    pub emoji: Option<String>,
    pub style: ButtonStyle,
    pub target: ControlTarget,
}

impl Control {
    pub fn action(label: impl Into<String>, token: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            label: label.into(),
            emoji: None,
            style,
            target: ControlTarget::Action(token.into()),
        }
    }

    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            emoji: None,
            style: ButtonStyle::Link,
            target: ControlTarget::Url(url.into()),
        }
    }

    /// Token of the action this control triggers, if any.
    pub fn token(&self) -> Option<&str> {
        match &self.target {
            ControlTarget::Action(token) => Some(token),
            ControlTarget::Url(_) => None,
        }
    }
}

/// Named field shown under the prompt content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptField {
    pub name: String,
    pub value: String,
}

/// Result an action callback wants shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPayload {
    pub content: String,
    pub title: Option<String>,
    pub color: Option<Color>,
    pub fields: Vec<PromptField>,
}

impl DisplayPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(PromptField {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

impl From<&str> for DisplayPayload {
    fn from(content: &str) -> Self {
        DisplayPayload::text(content)
    }
}

impl From<String> for DisplayPayload {
    fn from(content: String) -> Self {
        DisplayPayload::text(content)
    }
}

/// A message with zero or more controls and optional fields/image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub content: String,
    pub title: Option<String>,
    pub color: Option<Color>,
    pub fields: Vec<PromptField>,
    pub image: Option<String>,
    pub controls: Vec<Control>,
}

impl Prompt {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_control(mut self, control: Control) -> Self {
        self.controls.push(control);
        self
    }
}

impl From<DisplayPayload> for Prompt {
    fn from(payload: DisplayPayload) -> Self {
        Self {
            content: payload.content,
            title: payload.title,
            color: payload.color,
            fields: payload.fields,
            image: None,
            controls: Vec::new(),
        }
    }
}

/// Identifies a sent prompt (transport-specific message id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PromptHandle {
    pub chat_id: i64,
    pub message_id: String,
}
