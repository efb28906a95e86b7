//! Input collection for actions that declare inputs.

use std::collections::HashMap;

use dbot_core::{FieldValue, InputSpec, SubmittedValue};
use tracing::warn;

use super::MAX_INPUTS;

/// Value supplied for one declared input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputValue {
    Text(String),
    Selection(Vec<String>),
}

impl InputValue {
    /// Text value, or the first selected value for selectors.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            InputValue::Text(s) => Some(s),
            InputValue::Selection(values) => values.first().map(String::as_str),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            InputValue::Text(s) => vec![s.as_str()],
            InputValue::Selection(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// Inputs handed to an action callback, keyed by input id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvidedInputs(HashMap<String, InputValue>);

impl ProvidedInputs {
    pub fn get(&self, id: &str) -> Option<&InputValue> {
        self.0.get(id)
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.0.get(id).and_then(InputValue::as_text)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &InputValue)> {
        self.0.iter()
    }
}

impl FromIterator<(String, InputValue)> for ProvidedInputs {
    fn from_iter<T: IntoIterator<Item = (String, InputValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Tracks which declared inputs have been supplied.
#[derive(Debug, Clone, Default)]
pub struct InputCollector {
    expected: Vec<InputSpec>,
    provided: HashMap<String, InputValue>,
}

impl InputCollector {
    /// Keeps at most [`MAX_INPUTS`] declared inputs; the rest are dropped with a warning.
    pub fn new(mut expected: Vec<InputSpec>) -> Self {
        if expected.len() > MAX_INPUTS {
            warn!(
                declared = expected.len(),
                max = MAX_INPUTS,
                "Too many inputs, taking only the first {}",
                MAX_INPUTS
            );
            expected.truncate(MAX_INPUTS);
        }
        Self {
            expected,
            provided: HashMap::new(),
        }
    }

    pub fn expected(&self) -> &[InputSpec] {
        &self.expected
    }

    pub fn has_inputs(&self) -> bool {
        !self.expected.is_empty()
    }

    /// Overwrites any prior value for `id`.
    pub fn set_input(&mut self, id: impl Into<String>, value: InputValue) {
        self.provided.insert(id.into(), value);
    }

    /// True iff any declared input has no value.
    pub fn is_input_missing(&self) -> bool {
        self.expected
            .iter()
            .any(|spec| !self.provided.contains_key(&spec.id))
    }

    pub fn reset_inputs(&mut self) {
        self.provided.clear();
    }

    pub fn expected_ids(&self) -> Vec<String> {
        self.expected.iter().map(|spec| spec.id.clone()).collect()
    }

    /// Provided ids in declaration order, followed by undeclared ids (sorted).
    pub fn provided_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .expected
            .iter()
            .filter(|spec| self.provided.contains_key(&spec.id))
            .map(|spec| spec.id.clone())
            .collect();
        let mut extra: Vec<String> = self
            .provided
            .keys()
            .filter(|id| !self.expected.iter().any(|spec| &spec.id == *id))
            .cloned()
            .collect();
        extra.sort();
        ids.extend(extra);
        ids
    }

    pub fn missing_ids(&self) -> Vec<String> {
        self.expected
            .iter()
            .filter(|spec| !self.provided.contains_key(&spec.id))
            .map(|spec| spec.id.clone())
            .collect()
    }

    pub fn provided(&self) -> ProvidedInputs {
        ProvidedInputs(self.provided.clone())
    }

    /// Stores submitted form fields against the declared inputs.
    ///
    /// Unknown ids are ignored. A blank value leaves a required input unset; a blank optional
    /// input takes its default value (or empty). A single-select keeps only its first value.
    pub fn apply_submission(&mut self, fields: &[FieldValue]) {
        for field in fields {
            let Some(spec) = self.expected.iter().find(|spec| spec.id == field.id) else {
                warn!(input_id = %field.id, "Submitted field does not match any declared input");
                continue;
            };

            if field.value.is_blank() {
                if spec.required {
                    continue;
                }
                let fallback = spec.default_value.clone().unwrap_or_default();
                let value = if spec.is_selector() {
                    InputValue::Selection(if fallback.is_empty() { vec![] } else { vec![fallback] })
                } else {
                    InputValue::Text(fallback)
                };
                self.provided.insert(spec.id.clone(), value);
                continue;
            }

            let value = match (&spec.choices, &field.value) {
                (Some(choices), SubmittedValue::Selected(values)) => {
                    let mut values: Vec<String> = values
                        .iter()
                        .map(|v| v.trim())
                        .filter(|v| !v.is_empty())
                        .map(String::from)
                        .collect();
                    if !choices.multiple {
                        values.truncate(1);
                    }
                    InputValue::Selection(values)
                }
                (Some(_), SubmittedValue::Text(text)) => {
                    InputValue::Selection(vec![text.trim().to_string()])
                }
                (None, SubmittedValue::Text(text)) => InputValue::Text(text.clone()),
                (None, SubmittedValue::Selected(values)) => InputValue::Text(values.join(", ")),
            };
            self.provided.insert(spec.id.clone(), value);
        }
    }
}
