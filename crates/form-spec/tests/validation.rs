use serde_json::{Value, json};

use form_spec::{
    AnswerMap, ErrorReason, FieldId, FieldKind, FormDocument, form_schema, validate,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "contact_form" => include_str!("../tests/fixtures/contact_form.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn contact_form() -> FormDocument {
    serde_json::from_str(fixture("contact_form")).expect("deserialize")
}

fn answers(value: Value) -> AnswerMap {
    serde_json::from_value(value).expect("answers")
}

#[test]
fn fixture_hydrates_with_kind_specific_attributes() {
    let form = contact_form();
    assert!(form.check_integrity().is_ok());
    assert_eq!(form.len(), 6);
    assert_eq!(form.field("urgency").and_then(|f| f.shape.bounds()), Some((1, 5)));
    assert_eq!(
        form.field("topic").and_then(|f| f.options()).map(<[String]>::len),
        Some(3)
    );
    assert_eq!(form.field("attachment").map(|f| f.kind()), Some(FieldKind::File));
}

#[test]
fn attribute_names_round_trip_losslessly() {
    let form = contact_form();
    let original: Value = serde_json::from_str(fixture("contact_form")).expect("json");
    let reserialized = serde_json::to_value(&form).expect("serialize");
    assert_eq!(reserialized, original);
}

#[test]
fn validation_reports_missing() {
    let form = contact_form();
    let result = validate(&form, &AnswerMap::new());
    assert!(!result.valid);
    assert_eq!(
        result.missing_required,
        vec![FieldId::from("name"), FieldId::from("email"), FieldId::from("topic")]
    );
    assert_eq!(result.first_error(&form), Some(&FieldId::from("name")));
}

#[test]
fn validation_uses_override_message_for_format() {
    let form = contact_form();
    let result = validate(
        &form,
        &answers(json!({ "name": "Ada", "email": "ada@", "topic": "Sales" })),
    );
    let error = &result.errors[&FieldId::from("email")];
    assert_eq!(error.reason, ErrorReason::Format);
    assert_eq!(error.message, "We need a working email address.");
    assert!(result.missing_required.is_empty());
}

#[test]
fn validation_flags_unknown_fields() {
    let form = contact_form();
    let result = validate(
        &form,
        &answers(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "topic": "Support",
            "favourite_color": "green"
        })),
    );
    assert!(result.errors.is_empty());
    assert_eq!(result.unknown_fields, vec![FieldId::from("favourite_color")]);
    assert!(!result.valid);
}

#[test]
fn complete_answers_are_valid() {
    let form = contact_form();
    let result = validate(
        &form,
        &answers(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "phone": "555-123-4567",
            "topic": "Support",
            "urgency": "4",
            "attachment": "diagram.pdf"
        })),
    );
    assert!(result.valid, "{:?}", result);
}

#[test]
fn numeric_answers_are_checked_as_text() {
    let form = contact_form();
    let result = validate(
        &form,
        &answers(json!({
            "name": "Ada",
            "email": 42,
            "phone": 5551234567u64,
            "topic": "Support",
            "urgency": 4
        })),
    );
    assert_eq!(result.errors.len(), 1, "{:?}", result);
    assert_eq!(result.errors[&FieldId::from("email")].reason, ErrorReason::Format);
    assert!(result.missing_required.is_empty());
}

#[test]
fn schema_describes_fields() {
    let schema = form_schema();
    let text = schema.to_string();
    assert!(text.contains("fields"));
    assert!(text.contains("min_value"));
    assert!(text.contains("allowed_mime_types"));
}
