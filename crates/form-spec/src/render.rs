use serde_json::{Map, Value, json};

use crate::{
    answers::{AnswerValue, FieldError},
    spec::field::{FieldDefinition, FieldKind},
    stepper::{StepState, Stepper},
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Intro screen, nothing asked yet.
    Intro,
    /// More input is required.
    NeedInput,
    /// Answers were handed off.
    Submitted,
}

impl RenderStatus {
    /// Human-friendly label that matches the renderer requirements.
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Intro => "intro",
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Submitted => "submitted",
        }
    }
}

/// Progress counters exposed to renderers.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

/// Everything a presentation layer needs to draw one input control.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub kind: FieldKind,
    pub label: String,
    pub description: Option<String>,
    pub placeholder: Option<String>,
    pub required: bool,
    pub options: Option<Vec<String>>,
    pub bounds: Option<(i64, i64)>,
    pub accept: Option<Vec<String>>,
    pub current_value: Option<AnswerValue>,
    pub error: Option<FieldError>,
}

impl RenderField {
    fn new(field: &FieldDefinition, value: Option<&AnswerValue>, error: Option<&FieldError>) -> Self {
        Self {
            id: field.id.to_string(),
            kind: field.kind(),
            label: field.label.clone(),
            description: field.description.clone(),
            placeholder: field.placeholder.clone(),
            required: field.required,
            options: field.options().map(<[String]>::to_vec),
            bounds: field.shape.bounds(),
            accept: field.shape.allowed_mime_types().map(<[String]>::to_vec),
            current_value: value.cloned(),
            error: error.cloned(),
        }
    }
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_title: String,
    pub form_description: String,
    pub status: RenderStatus,
    /// Index of the current guided step.
    pub step: Option<usize>,
    pub progress: RenderProgress,
    pub fields: Vec<RenderField>,
}

/// Build the renderer payload for the fields the respondent currently sees.
pub fn build_render_payload(stepper: &Stepper<'_>) -> RenderPayload {
    let form = stepper.form();
    let progress = stepper.progress();
    let status = match stepper.state() {
        StepState::Intro => RenderStatus::Intro,
        StepState::Submitted => RenderStatus::Submitted,
        StepState::Answering(_) | StepState::Review => RenderStatus::NeedInput,
    };
    let step = match stepper.state() {
        StepState::Answering(index) => Some(index),
        _ => None,
    };

    let fields = stepper
        .visible_fields()
        .iter()
        .map(|field| {
            RenderField::new(
                field,
                stepper.value(field.id.as_str()),
                stepper.error(field.id.as_str()),
            )
        })
        .collect();

    RenderPayload {
        form_title: form.title.clone(),
        form_description: form.description.clone(),
        status,
        step,
        progress: RenderProgress {
            answered: progress.answered,
            total: progress.total,
        },
        fields,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(field.id.clone()));
            map.insert("type".into(), Value::String(field.kind.as_str().into()));
            map.insert("label".into(), Value::String(field.label.clone()));
            map.insert(
                "description".into(),
                field
                    .description
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            if let Some(placeholder) = &field.placeholder {
                map.insert("placeholder".into(), Value::String(placeholder.clone()));
            }
            map.insert("required".into(), Value::Bool(field.required));
            if let Some(options) = &field.options {
                map.insert("options".into(), json!(options));
            }
            if let Some((min_value, max_value)) = field.bounds {
                map.insert("min_value".into(), json!(min_value));
                map.insert("max_value".into(), json!(max_value));
            }
            if let Some(accept) = &field.accept {
                map.insert("allowed_mime_types".into(), json!(accept));
            }
            if let Some(value) = &field.current_value {
                map.insert("current_value".into(), json!(value));
            }
            if let Some(error) = &field.error {
                map.insert(
                    "error".into(),
                    json!({ "reason": error.reason.as_str(), "message": error.message }),
                );
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_title": payload.form_title,
        "form_description": payload.form_description,
        "status": payload.status.as_str(),
        "step": payload.step,
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "fields": fields,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {}", payload.form_title));
    if !payload.form_description.is_empty() {
        lines.push(payload.form_description.clone());
    }
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));

    for field in &payload.fields {
        let mut entry = match payload.step {
            Some(index) => format!("{}/{} {}", index + 1, payload.progress.total, field.label),
            None => format!(" - {}", field.label),
        };
        if field.required {
            entry.push_str(" *");
        }
        if let Some(hint) = input_hint(field) {
            entry.push(' ');
            entry.push_str(&hint);
        }
        lines.push(entry);
        if let Some(description) = &field.description {
            lines.push(format!("  {}", description));
        }
        if let Some(value) = &field.current_value {
            lines.push(format!("  Current value: {}", value_to_display(field.kind, value)));
        }
        if let Some(error) = &field.error {
            lines.push(format!("  Error: {}", error.message));
        }
    }

    lines.join("\n")
}

/// Short inline hint describing what the control expects.
pub fn input_hint(field: &RenderField) -> Option<String> {
    match field.kind {
        FieldKind::SingleSelect | FieldKind::SingleChoice => {
            field.options.as_ref().map(|options| format!("({})", options.join("/")))
        }
        FieldKind::MultiChoice => field
            .options
            .as_ref()
            .map(|options| format!("(any of: {})", options.join(", "))),
        FieldKind::Scale => field
            .bounds
            .map(|(min_value, max_value)| format!("({}-{})", min_value, max_value)),
        FieldKind::File => field
            .accept
            .as_ref()
            .map(|accept| format!("(file: {})", accept.join(", "))),
        FieldKind::Date => Some("(YYYY-MM-DD)".into()),
        FieldKind::Time => Some("(HH:MM)".into()),
        FieldKind::DateTime => Some("(YYYY-MM-DDTHH:MM)".into()),
        _ => field.placeholder.as_ref().map(|hint| format!("(e.g. {})", hint)),
    }
}

fn value_to_display(kind: FieldKind, value: &AnswerValue) -> String {
    match (kind, value) {
        (FieldKind::Signature, AnswerValue::Text(text)) if !text.is_empty() => {
            "[signature captured]".to_string()
        }
        _ => value.to_string(),
    }
}
