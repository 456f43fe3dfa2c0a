#![allow(missing_docs)]

pub mod answers;
pub mod builder;
pub mod render;
pub mod spec;
pub mod stepper;
pub mod store;
pub mod validate;

pub use answers::{
    AnswerMap, AnswerSet, AnswerValue, ErrorMap, ErrorReason, FieldError, Meta, ValidationResult,
};
pub use builder::{Builder, FieldIdGenerator, FieldPatch};
pub use render::{
    RenderField, RenderPayload, RenderProgress, RenderStatus, build_render_payload, render_json_ui,
    render_text,
};
pub use spec::{
    Attention, FieldDefinition, FieldId, FieldKind, FieldShape, FormDocument, IntegrityError,
    PublishIssue, accepts_file, defaults_for,
};
pub use stepper::{Advance, Flavor, StepState, Stepper, StepperOptions, Submission};
pub use store::{FormPatch, FormStore, MemoryStore, StorageError, StoredForm, StoredResponse};
pub use validate::{FormValidation, check_field, error_message, validate, validate_value};

/// JSON Schema describing a stored [`FormDocument`].
pub fn form_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(FormDocument)).unwrap_or_default()
}
