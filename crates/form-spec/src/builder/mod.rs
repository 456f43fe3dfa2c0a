//! Structural editing of a [`FormDocument`].
//!
//! Every operation is total: an unknown id or an out-of-range index leaves
//! the document untouched and is reported as `false`/`None` rather than an
//! error. Persistence happens only through [`Builder::save`].

mod ids;
mod patch;

pub use ids::FieldIdGenerator;
pub use patch::FieldPatch;

use crate::spec::field::{FieldDefinition, FieldId, FieldKind, defaults_for};
use crate::spec::form::{FormDocument, IntegrityError, PublishIssue};
use crate::store::{FormPatch, FormStore, StorageError, StoredForm};

/// One editing session over a form document.
#[derive(Debug, Clone)]
pub struct Builder {
    form_id: Option<String>,
    document: FormDocument,
    selected: Option<usize>,
    ids: FieldIdGenerator,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Empty document, as on "new form".
    pub fn new() -> Self {
        Self::from_document(FormDocument::default())
    }

    /// Starts from an unsaved document, rejecting duplicate ids and bad
    /// scale bounds the same way [`Builder::open`] does.
    pub fn with_document(document: FormDocument) -> Result<Self, IntegrityError> {
        document.check_integrity()?;
        Ok(Self::from_document(document))
    }

    /// Hydrates from storage, as on "edit existing form".
    pub fn open(stored: StoredForm) -> Result<Self, IntegrityError> {
        let mut builder = Self::with_document(stored.document)?;
        builder.form_id = Some(stored.id);
        Ok(builder)
    }

    fn from_document(document: FormDocument) -> Self {
        Self {
            form_id: None,
            document,
            selected: None,
            ids: FieldIdGenerator::new(),
        }
    }

    pub fn with_ids(mut self, ids: FieldIdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Storage id once the form has been saved or opened.
    pub fn form_id(&self) -> Option<&str> {
        self.form_id.as_deref()
    }

    pub fn document(&self) -> &FormDocument {
        &self.document
    }

    pub fn into_document(self) -> FormDocument {
        self.document
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_field(&self) -> Option<&FieldDefinition> {
        self.selected.and_then(|index| self.document.fields.get(index))
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index < self.document.len() {
            self.selected = Some(index);
            true
        } else {
            false
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.document.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.document.description = description.into();
    }

    /// Appends a default field of `kind` and selects it.
    pub fn add_field(&mut self, kind: FieldKind) -> FieldId {
        let id = self.ids.next_id(&self.document);
        self.document.fields.push(defaults_for(kind, id.clone()));
        self.selected = Some(self.document.len() - 1);
        tracing::debug!(field_id = %id, kind = %kind, "field added");
        id
    }

    /// Deletes the field with `id`; unknown ids are a no-op.
    pub fn remove_field(&mut self, id: &str) -> bool {
        let Some(index) = self.document.position(id) else {
            tracing::debug!(field_id = id, "remove ignored: unknown field");
            return false;
        };
        self.document.fields.remove(index);
        let len = self.document.len();
        self.selected = match self.selected {
            _ if len == 0 => None,
            Some(selected) if selected == index => Some(index.min(len - 1)),
            Some(selected) if selected > index => Some(selected - 1),
            other => other,
        };
        tracing::debug!(field_id = id, index, "field removed");
        true
    }

    /// Merges `patch` into the field with `id`; unknown ids are a no-op.
    pub fn update_field(&mut self, id: &str, patch: FieldPatch) -> bool {
        let Some(field) = self
            .document
            .fields
            .iter_mut()
            .find(|field| field.id.as_str() == id)
        else {
            tracing::debug!(field_id = id, "update ignored: unknown field");
            return false;
        };
        let skipped = patch.apply(field);
        if !skipped.is_empty() {
            tracing::debug!(field_id = id, ?skipped, "attributes not applied");
        }
        true
    }

    /// Moves the field at `from` to `to`; the moved field becomes selected.
    pub fn move_field(&mut self, from: usize, to: usize) -> bool {
        let len = self.document.len();
        if from >= len || to >= len {
            tracing::debug!(from, to, len, "move ignored: index out of range");
            return false;
        }
        let field = self.document.fields.remove(from);
        self.document.fields.insert(to, field);
        self.selected = Some(to);
        true
    }

    /// Inserts a deep copy of the field at `index` right after it.
    pub fn duplicate_field(&mut self, index: usize) -> Option<FieldId> {
        let Some(original) = self.document.fields.get(index) else {
            tracing::debug!(index, "duplicate ignored: index out of range");
            return None;
        };
        let mut copy = original.clone();
        copy.id = self.ids.next_id(&self.document);
        copy.label = format!("{} (copy)", copy.label);
        let id = copy.id.clone();
        self.document.fields.insert(index + 1, copy);
        self.selected = Some(index + 1);
        Some(id)
    }

    pub fn issues(&self) -> Vec<PublishIssue> {
        self.document.publish_issues()
    }

    /// Creates the form on first save, updates it afterwards.
    pub async fn save<S>(&mut self, store: &S, owner_id: &str) -> Result<StoredForm, StorageError>
    where
        S: FormStore + ?Sized,
    {
        let stored = match &self.form_id {
            Some(form_id) => {
                store
                    .update(form_id, FormPatch::replace_with(&self.document))
                    .await?
            }
            None => store.create(owner_id, self.document.clone()).await?,
        };
        tracing::info!(form_id = %stored.id, fields = self.document.len(), "form saved");
        self.form_id = Some(stored.id.clone());
        Ok(stored)
    }
}
