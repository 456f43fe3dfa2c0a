use uuid::Uuid;

use crate::spec::field::FieldId;
use crate::spec::form::FormDocument;

/// Mints field identifiers for one builder session.
///
/// Ids combine a random per-session prefix with a counter, so rapid
/// successive additions never collide and deleted ids are never re-issued.
#[derive(Debug, Clone)]
pub struct FieldIdGenerator {
    prefix: String,
    counter: u64,
}

impl FieldIdGenerator {
    pub fn new() -> Self {
        let session = Uuid::new_v4().simple().to_string();
        Self::with_prefix(format!("f{}", &session[..8]))
    }

    /// Deterministic generator, mostly useful in tests.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
        }
    }

    /// Next identifier not already present in `document`.
    pub fn next_id(&mut self, document: &FormDocument) -> FieldId {
        loop {
            self.counter += 1;
            let candidate = format!("{}-{}", self.prefix, self.counter);
            if !document.contains(&candidate) {
                return FieldId::new(candidate);
            }
        }
    }
}

impl Default for FieldIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::field::{FieldKind, defaults_for};

    #[test]
    fn successive_ids_are_distinct() {
        let mut ids = FieldIdGenerator::new();
        let doc = FormDocument::default();
        let first = ids.next_id(&doc);
        let second = ids.next_id(&doc);
        assert_ne!(first, second);
        assert!(first.as_str().starts_with('f'));
    }

    #[test]
    fn skips_ids_taken_by_hydrated_fields() {
        let mut doc = FormDocument::default();
        doc.fields.push(defaults_for(FieldKind::ShortText, "t-1".into()));
        let mut ids = FieldIdGenerator::with_prefix("t");
        assert_eq!(ids.next_id(&doc).as_str(), "t-2");
    }
}
