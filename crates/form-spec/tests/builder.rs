use form_spec::{Builder, FieldIdGenerator, FieldKind, FieldPatch, FieldShape, FormDocument};

fn four_fields() -> Builder {
    let mut builder = Builder::new().with_ids(FieldIdGenerator::with_prefix("q"));
    for label in ["A", "B", "C", "D"] {
        let id = builder.add_field(FieldKind::ShortText);
        builder.update_field(id.as_str(), FieldPatch::new().label(label));
    }
    builder
}

fn labels(document: &FormDocument) -> Vec<&str> {
    document.fields.iter().map(|field| field.label.as_str()).collect()
}

#[test]
fn add_then_remove_restores_document() {
    let mut builder = four_fields();
    let before = builder.document().clone();

    let id = builder.add_field(FieldKind::Signature);
    assert_eq!(builder.document().len(), before.len() + 1);
    assert!(before.field(id.as_str()).is_none());

    assert!(builder.remove_field(id.as_str()));
    assert_eq!(builder.document(), &before);
}

#[test]
fn rapid_additions_never_collide() {
    let mut builder = Builder::new();
    let mut seen = std::collections::BTreeSet::new();
    for kind in FieldKind::ALL.into_iter().cycle().take(200) {
        assert!(seen.insert(builder.add_field(kind)));
    }
    assert!(builder.document().check_integrity().is_ok());
}

#[test]
fn move_first_to_third() {
    let mut builder = four_fields();
    assert!(builder.move_field(0, 2));
    assert_eq!(labels(builder.document()), vec!["B", "C", "A", "D"]);
}

#[test]
fn move_out_of_range_keeps_document() {
    let mut builder = four_fields();
    let before = builder.document().clone();
    assert!(!builder.move_field(0, 99));
    assert_eq!(builder.document(), &before);
}

#[test]
fn duplicate_copies_everything_but_identity() {
    let mut builder = four_fields();
    let scale = builder.add_field(FieldKind::Scale);
    builder.update_field(
        scale.as_str(),
        FieldPatch::new()
            .label("Rate us")
            .description("Be honest")
            .required(true)
            .bounds(0, 5),
    );
    let index = builder.document().position(scale.as_str()).expect("position");

    let copy = builder.duplicate_field(index).expect("duplicate");
    let document = builder.document();
    assert_eq!(document.len(), 6);
    let original = &document.fields[index];
    let duplicate = &document.fields[index + 1];
    assert_eq!(duplicate.id, copy);
    assert_eq!(duplicate.label, "Rate us (copy)");
    assert_eq!(duplicate.description, original.description);
    assert_eq!(duplicate.required, original.required);
    assert_eq!(
        duplicate.shape,
        FieldShape::Scale {
            min_value: 0,
            max_value: 5
        }
    );
}

#[test]
fn issues_surface_choice_fields_without_options() {
    let mut builder = four_fields();
    builder.set_title("Survey");
    assert!(builder.issues().is_empty());

    let choice = builder.add_field(FieldKind::SingleChoice);
    builder.update_field(choice.as_str(), FieldPatch::new().options(Vec::<String>::new()));
    let issues = builder.issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].field.as_ref(), Some(&choice));
}

#[test]
fn kind_change_replaces_inapplicable_attributes() {
    let mut builder = four_fields();
    let id = builder.document().fields[0].id.clone();
    builder.update_field(id.as_str(), FieldPatch::new().kind(FieldKind::File));
    let field = &builder.document().fields[0];
    assert_eq!(field.kind(), FieldKind::File);
    assert_eq!(field.label, "A");
    assert!(field.shape.allowed_mime_types().is_some());
}
