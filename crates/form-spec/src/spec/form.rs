use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::field::{Attention, FieldDefinition, FieldId};

/// Top-level form definition. Field order is presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FormDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

/// Problems found when hydrating a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("duplicate field id '{0}'")]
    DuplicateId(FieldId),
    #[error("field '{id}' has scale bounds {min_value}..{max_value}; min must be below max")]
    InvalidScale {
        id: FieldId,
        min_value: i64,
        max_value: i64,
    },
}

/// Publish-readiness finding for a single field, or for the form itself
/// when `field` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldId>,
    #[serde(flatten)]
    pub attention: Attention,
}

impl FormDocument {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            fields: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, id: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.id.as_str() == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.id.as_str() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &FieldId> {
        self.fields.iter().map(|field| &field.id)
    }

    /// Checks the invariants a stored document may have lost outside the builder.
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.id.as_str()) {
                return Err(IntegrityError::DuplicateId(field.id.clone()));
            }
            if let Some((min_value, max_value)) = field.shape.bounds()
                && min_value >= max_value
            {
                return Err(IntegrityError::InvalidScale {
                    id: field.id.clone(),
                    min_value,
                    max_value,
                });
            }
        }
        Ok(())
    }

    /// Everything that should be fixed before the form goes out to respondents.
    pub fn publish_issues(&self) -> Vec<PublishIssue> {
        let mut issues = Vec::new();
        if self.title.trim().is_empty() {
            issues.push(PublishIssue {
                field: None,
                attention: Attention::MissingLabel,
            });
        }
        for field in &self.fields {
            issues.extend(field.attention().into_iter().map(|attention| PublishIssue {
                field: Some(field.id.clone()),
                attention,
            }));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::field::{FieldKind, defaults_for};

    fn doc_with(ids: &[&str]) -> FormDocument {
        let mut doc = FormDocument::new("Survey", "");
        doc.fields = ids
            .iter()
            .map(|id| defaults_for(FieldKind::ShortText, (*id).into()))
            .collect();
        doc
    }

    #[test]
    fn integrity_rejects_duplicate_ids() {
        assert!(doc_with(&["a", "b"]).check_integrity().is_ok());
        assert_eq!(
            doc_with(&["a", "b", "a"]).check_integrity(),
            Err(IntegrityError::DuplicateId("a".into()))
        );
    }

    #[test]
    fn integrity_rejects_inverted_scale() {
        let mut doc = doc_with(&[]);
        let mut field = defaults_for(FieldKind::Scale, "rate".into());
        field.shape = crate::spec::field::FieldShape::Scale {
            min_value: 5,
            max_value: 5,
        };
        doc.fields.push(field);
        assert!(matches!(
            doc.check_integrity(),
            Err(IntegrityError::InvalidScale { .. })
        ));
    }

    #[test]
    fn publish_issues_flag_untitled_form() {
        let mut doc = doc_with(&["a"]);
        assert!(doc.publish_issues().is_empty());
        doc.title = "  ".into();
        let issues = doc.publish_issues();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].field.is_none());
    }

    #[test]
    fn lookup_helpers_follow_field_order() {
        let doc = doc_with(&["a", "b", "c"]);
        assert_eq!(doc.position("c"), Some(2));
        assert!(doc.contains("b"));
        assert!(doc.field("z").is_none());
        let ids: Vec<&str> = doc.field_ids().map(FieldId::as_str).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
