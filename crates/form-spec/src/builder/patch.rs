use serde::{Deserialize, Serialize};

use crate::spec::field::{FieldDefinition, FieldKind, FieldShape};

/// Partial attributes merged into an existing field.
///
/// Text attributes set to an empty string clear the stored value.
/// Kind-specific attributes that do not apply to the field's (possibly new)
/// kind are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub kind: Option<FieldKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_mime_types: Option<Vec<String>>,
}

impl FieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn bounds(mut self, min_value: i64, max_value: i64) -> Self {
        self.min_value = Some(min_value);
        self.max_value = Some(max_value);
        self
    }

    pub fn allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_mime_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Merges into `field` and returns the names of attributes that were skipped.
    pub(crate) fn apply(self, field: &mut FieldDefinition) -> Vec<&'static str> {
        let mut skipped = Vec::new();

        if let Some(kind) = self.kind {
            field.shape = FieldShape::for_kind_from(kind, &field.shape);
        }
        if let Some(label) = self.label {
            field.label = label;
        }
        if let Some(description) = self.description {
            field.description = non_empty(description);
        }
        if let Some(placeholder) = self.placeholder {
            field.placeholder = non_empty(placeholder);
        }
        if let Some(required) = self.required {
            field.required = required;
        }
        if let Some(message) = self.error_message {
            field.error_message = non_empty(message);
        }

        if let Some(options) = self.options {
            match field.shape.options_mut() {
                Some(current) => *current = options,
                None => skipped.push("options"),
            }
        }

        if self.min_value.is_some() || self.max_value.is_some() {
            match &mut field.shape {
                FieldShape::Scale {
                    min_value,
                    max_value,
                } => {
                    let next_min = self.min_value.unwrap_or(*min_value);
                    let next_max = self.max_value.unwrap_or(*max_value);
                    if next_min < next_max {
                        *min_value = next_min;
                        *max_value = next_max;
                    } else {
                        skipped.push("min_value/max_value");
                    }
                }
                _ => skipped.push("min_value/max_value"),
            }
        }

        if let Some(types) = self.allowed_mime_types {
            match &mut field.shape {
                FieldShape::File { allowed_mime_types } => *allowed_mime_types = types,
                _ => skipped.push("allowed_mime_types"),
            }
        }

        skipped
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::field::defaults_for;

    #[test]
    fn merges_only_given_attributes() {
        let mut field = defaults_for(FieldKind::Email, "e".into());
        let before = field.clone();
        let skipped = FieldPatch::new()
            .label("Work email")
            .required(true)
            .apply(&mut field);
        assert!(skipped.is_empty());
        assert_eq!(field.label, "Work email");
        assert!(field.required);
        assert_eq!(field.id, before.id);
        assert_eq!(field.placeholder, before.placeholder);
    }

    #[test]
    fn empty_text_clears_optional_attributes() {
        let mut field = defaults_for(FieldKind::ShortText, "t".into());
        FieldPatch::new().placeholder("").apply(&mut field);
        assert!(field.placeholder.is_none());
    }

    #[test]
    fn scale_bounds_must_stay_ordered() {
        let mut field = defaults_for(FieldKind::Scale, "s".into());
        assert_eq!(
            FieldPatch::new().bounds(5, 5).apply(&mut field),
            vec!["min_value/max_value"]
        );
        assert_eq!(field.shape.bounds(), Some((1, 10)));

        let mut patch = FieldPatch::new();
        patch.max_value = Some(5);
        assert!(patch.apply(&mut field).is_empty());
        assert_eq!(field.shape.bounds(), Some((1, 5)));
    }

    #[test]
    fn inapplicable_attributes_are_skipped() {
        let mut field = defaults_for(FieldKind::Number, "n".into());
        let skipped = FieldPatch::new()
            .options(["a", "b"])
            .allowed_mime_types(["image/*"])
            .apply(&mut field);
        assert_eq!(skipped, vec!["options", "allowed_mime_types"]);
        assert_eq!(field.shape, FieldShape::Number);
    }

    #[test]
    fn kind_change_then_kind_attributes() {
        let mut field = defaults_for(FieldKind::ShortText, "t".into());
        let skipped = FieldPatch::new()
            .kind(FieldKind::MultiChoice)
            .options(["red", "green", "blue"])
            .apply(&mut field);
        assert!(skipped.is_empty());
        assert_eq!(field.kind(), FieldKind::MultiChoice);
        assert_eq!(field.options().map(<[String]>::len), Some(3));
    }
}
