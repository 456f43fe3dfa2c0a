pub mod field;
pub mod form;

pub use field::{
    Attention, FieldDefinition, FieldId, FieldKind, FieldShape, accepts_file, defaults_for,
};
pub use form::{FormDocument, IntegrityError, PublishIssue};
