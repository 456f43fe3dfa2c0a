use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::spec::field::FieldId;

/// Raw value captured for one field.
///
/// Text covers most kinds, including signature data URIs and picked file
/// names; multi-choice answers carry the selected option labels. Bare JSON
/// numbers load as their decimal text, so `{"age": 42}` reaches validation
/// as `"42"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum AnswerValue {
    Flag(bool),
    Text(String),
    Choices(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAnswer {
    Flag(bool),
    Number(serde_json::Number),
    Text(String),
    Choices(Vec<String>),
}

impl<'de> Deserialize<'de> for AnswerValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawAnswer::deserialize(deserializer)? {
            RawAnswer::Flag(flag) => AnswerValue::Flag(flag),
            RawAnswer::Number(number) => AnswerValue::Text(number.to_string()),
            RawAnswer::Text(text) => AnswerValue::Text(text),
            RawAnswer::Choices(choices) => AnswerValue::Choices(choices),
        })
    }
}

impl AnswerValue {
    /// Empty text, an unchecked flag and an empty selection count as no answer.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Flag(flag) => !flag,
            AnswerValue::Text(text) => text.is_empty(),
            AnswerValue::Choices(choices) => choices.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Flag(flag) => write!(f, "{}", flag),
            AnswerValue::Text(text) => f.write_str(text),
            AnswerValue::Choices(choices) => f.write_str(&choices.join(", ")),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Text(value)
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        AnswerValue::Flag(value)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(value: Vec<String>) -> Self {
        AnswerValue::Choices(value)
    }
}

/// Answers keyed by field id for one completion session.
pub type AnswerMap = BTreeMap<FieldId, AnswerValue>;

/// Current error per field; recomputed on every change, never persisted.
pub type ErrorMap = BTreeMap<FieldId, FieldError>;

/// Why a value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    Required,
    Format,
}

impl ErrorReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorReason::Required => "required",
            ErrorReason::Format => "format",
        }
    }
}

/// Outcome of checking a single value against its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ErrorReason>,
}

impl ValidationResult {
    pub const OK: ValidationResult = ValidationResult {
        ok: true,
        reason: None,
    };

    pub fn fail(reason: ErrorReason) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
        }
    }
}

/// Error attached to a specific field for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub reason: ErrorReason,
    pub message: String,
}

/// Optional bookkeeping carried with a finished answer set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Meta {
    pub answered: usize,
    pub total: usize,
}

/// Answers handed to persistence once a session completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSet {
    pub form_id: String,
    pub answers: AnswerMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl AnswerSet {
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
