//! Declared inputs and form submissions.

use serde::{Deserialize, Serialize};

/// One option of a selector input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputChoice {
    pub label: String,
    pub value: String,
}

impl InputChoice {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Enumerated choices of an input; `multiple` allows selecting several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceSet {
    pub options: Vec<InputChoice>,
    pub multiple: bool,
}

impl ChoiceSet {
    /// Finds the choice whose value or label matches `raw` (case-insensitive).
    pub fn find(&self, raw: &str) -> Option<&InputChoice> {
        let raw = raw.trim();
        self.options
            .iter()
            .find(|c| c.value.eq_ignore_ascii_case(raw) || c.label.eq_ignore_ascii_case(raw))
    }
}

/// An input an action declares; rendered as one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    pub id: String,
    pub label: String,
    pub placeholder: String,
    pub choices: Option<ChoiceSet>,
    pub default_value: Option<String>,
    pub required: bool,
    pub multiline: bool,
}

impl InputSpec {
    /// Required single-line text input.
    pub fn text(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            placeholder: String::new(),
            choices: None,
            default_value: None,
            required: true,
            multiline: false,
        }
    }

    /// Required selector input.
    pub fn select(
        id: impl Into<String>,
        label: impl Into<String>,
        options: Vec<InputChoice>,
        multiple: bool,
    ) -> Self {
        Self {
            choices: Some(ChoiceSet { options, multiple }),
            ..Self::text(id, label)
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    pub fn is_selector(&self) -> bool {
        self.choices.is_some()
    }
}

/// A form the transport should show; submissions come back with `token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSpec {
    pub token: String,
    pub title: String,
    pub fields: Vec<InputSpec>,
}

/// Raw submitted value of one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmittedValue {
    Text(String),
    Selected(Vec<String>),
}

impl SubmittedValue {
    pub fn is_blank(&self) -> bool {
        match self {
            SubmittedValue::Text(s) => s.trim().is_empty(),
            SubmittedValue::Selected(v) => v.iter().all(|s| s.trim().is_empty()),
        }
    }
}

/// One submitted form field, keyed by declared input id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub id: String,
    pub value: SubmittedValue,
}

impl FieldValue {
    pub fn text(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: SubmittedValue::Text(value.into()),
        }
    }

    pub fn selected(id: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            id: id.into(),
            value: SubmittedValue::Selected(values),
        }
    }
}
