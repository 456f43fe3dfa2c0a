use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use time::{
    Date, PrimitiveDateTime, Time, format_description::well_known::Rfc3339, macros::format_description,
};

use crate::answers::{AnswerMap, AnswerValue, ErrorMap, ErrorReason, FieldError, ValidationResult};
use crate::spec::field::{FieldDefinition, FieldId, FieldKind};
use crate::spec::form::FormDocument;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9\s\-+()]{7,15}$").expect("phone pattern"));
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]*\.?[0-9]+$").expect("number pattern"));

pub const REQUIRED_MESSAGE: &str = "This field is mandatory.";

/// Checks one raw value against its field: required first, then the kind's format.
pub fn validate_value(field: &FieldDefinition, value: Option<&AnswerValue>) -> ValidationResult {
    let empty = value.is_none_or(AnswerValue::is_empty);
    if empty {
        return if field.required {
            ValidationResult::fail(ErrorReason::Required)
        } else {
            ValidationResult::OK
        };
    }

    match value {
        Some(value) if !matches_format(field.kind(), value) => {
            ValidationResult::fail(ErrorReason::Format)
        }
        _ => ValidationResult::OK,
    }
}

fn matches_format(kind: FieldKind, value: &AnswerValue) -> bool {
    let check: fn(&str) -> bool = match kind {
        FieldKind::Email => |text: &str| EMAIL.is_match(text),
        FieldKind::Phone => |text: &str| PHONE.is_match(text),
        FieldKind::Number => |text: &str| NUMBER.is_match(text),
        FieldKind::Date => is_date,
        FieldKind::Time => is_time,
        FieldKind::DateTime => is_date_time,
        _ => return true,
    };
    value.as_text().is_some_and(check)
}

fn is_date(text: &str) -> bool {
    Date::parse(text, format_description!("[year]-[month]-[day]")).is_ok()
}

fn is_time(text: &str) -> bool {
    Time::parse(text, format_description!("[hour]:[minute]")).is_ok()
        || Time::parse(text, format_description!("[hour]:[minute]:[second]")).is_ok()
}

fn is_date_time(text: &str) -> bool {
    PrimitiveDateTime::parse(text, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
        .is_ok()
        || PrimitiveDateTime::parse(
            text,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        )
        .is_ok()
        || time::OffsetDateTime::parse(text, &Rfc3339).is_ok()
}

/// Message shown next to a failing field.
pub fn error_message(field: &FieldDefinition, reason: ErrorReason) -> String {
    match reason {
        ErrorReason::Required => REQUIRED_MESSAGE.to_string(),
        ErrorReason::Format => field
            .error_message
            .clone()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| default_format_message(field.kind()).to_string()),
    }
}

fn default_format_message(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Email => "Please enter a valid email address.",
        FieldKind::Phone => "Please enter a valid phone number.",
        FieldKind::Number => "Please enter a valid number.",
        FieldKind::Date => "Please enter a valid date.",
        FieldKind::Time => "Please enter a valid time.",
        FieldKind::DateTime => "Please enter a valid date and time.",
        _ => "Please enter a valid value.",
    }
}

/// Validates and, on failure, builds the displayable error.
pub fn check_field(field: &FieldDefinition, value: Option<&AnswerValue>) -> Option<FieldError> {
    validate_value(field, value).reason.map(|reason| FieldError {
        reason,
        message: error_message(field, reason),
    })
}

/// Result of checking a whole answer map against a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormValidation {
    pub valid: bool,
    pub errors: ErrorMap,
    pub missing_required: Vec<FieldId>,
    pub unknown_fields: Vec<FieldId>,
}

impl FormValidation {
    /// First failing field in presentation order.
    pub fn first_error<'a>(&self, form: &'a FormDocument) -> Option<&'a FieldId> {
        form.field_ids().find(|id| self.errors.contains_key(*id))
    }
}

pub fn validate(form: &FormDocument, answers: &AnswerMap) -> FormValidation {
    let mut errors = ErrorMap::new();
    let mut missing_required = Vec::new();

    for field in &form.fields {
        if let Some(error) = check_field(field, answers.get(&field.id)) {
            if error.reason == ErrorReason::Required {
                missing_required.push(field.id.clone());
            }
            errors.insert(field.id.clone(), error);
        }
    }

    let unknown_fields: Vec<FieldId> = answers
        .keys()
        .filter(|key| !form.contains(key.as_str()))
        .cloned()
        .collect();

    FormValidation {
        valid: errors.is_empty() && unknown_fields.is_empty(),
        errors,
        missing_required,
        unknown_fields,
    }
}
