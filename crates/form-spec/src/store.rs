use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::answers::AnswerMap;
use crate::spec::field::FieldDefinition;
use crate::spec::form::FormDocument;

/// Errors raised by a [`FormStore`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No form with the given id.
    #[error("form not found: {form_id}")]
    NotFound { form_id: String },

    /// Backend-specific failure (I/O, serialization, lock poisoning, ...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A form as kept by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredForm {
    pub id: String,
    pub owner_id: String,
    pub document: FormDocument,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update of a stored form; `None` leaves the attribute as stored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldDefinition>>,
}

impl FormPatch {
    /// Patch replacing every attribute with the given document's.
    pub fn replace_with(document: &FormDocument) -> Self {
        Self {
            title: Some(document.title.clone()),
            description: Some(document.description.clone()),
            fields: Some(document.fields.clone()),
        }
    }

    pub fn apply(self, document: &mut FormDocument) {
        if let Some(title) = self.title {
            document.title = title;
        }
        if let Some(description) = self.description {
            document.description = description;
        }
        if let Some(fields) = self.fields {
            document.fields = fields;
        }
    }
}

/// A submitted answer set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub id: String,
    pub form_id: String,
    pub answers: AnswerMap,
    pub submitted_at: String,
}

/// Remote store for forms and their responses.
///
/// The builder and the stepper only talk to storage through this trait and
/// only at their edges (save, submit, load).
#[async_trait]
pub trait FormStore: Send + Sync {
    async fn create(&self, owner_id: &str, document: FormDocument)
    -> Result<StoredForm, StorageError>;

    /// Returns `Err(StorageError::NotFound)` for unknown ids.
    async fn read(&self, form_id: &str) -> Result<StoredForm, StorageError>;

    async fn update(&self, form_id: &str, patch: FormPatch) -> Result<StoredForm, StorageError>;

    async fn delete(&self, form_id: &str) -> Result<(), StorageError>;

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<StoredForm>, StorageError>;

    async fn save_response(
        &self,
        form_id: &str,
        answers: AnswerMap,
    ) -> Result<StoredResponse, StorageError>;
}

/// Current time as RFC 3339.
pub fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}

pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Default)]
struct MemoryState {
    forms: BTreeMap<String, StoredForm>,
    responses: Vec<StoredResponse>,
}

/// In-process store, used for previews and tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|err| StorageError::Backend(format!("memory store poisoned: {}", err)))
    }

    pub fn responses_for(&self, form_id: &str) -> Vec<StoredResponse> {
        self.lock()
            .map(|state| {
                state
                    .responses
                    .iter()
                    .filter(|response| response.form_id == form_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl FormStore for MemoryStore {
    async fn create(
        &self,
        owner_id: &str,
        document: FormDocument,
    ) -> Result<StoredForm, StorageError> {
        let now = timestamp();
        let form = StoredForm {
            id: new_record_id(),
            owner_id: owner_id.to_string(),
            document,
            created_at: now.clone(),
            updated_at: now,
        };
        self.lock()?.forms.insert(form.id.clone(), form.clone());
        Ok(form)
    }

    async fn read(&self, form_id: &str) -> Result<StoredForm, StorageError> {
        self.lock()?
            .forms
            .get(form_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                form_id: form_id.to_string(),
            })
    }

    async fn update(&self, form_id: &str, patch: FormPatch) -> Result<StoredForm, StorageError> {
        let mut state = self.lock()?;
        let form = state
            .forms
            .get_mut(form_id)
            .ok_or_else(|| StorageError::NotFound {
                form_id: form_id.to_string(),
            })?;
        patch.apply(&mut form.document);
        form.updated_at = timestamp();
        Ok(form.clone())
    }

    async fn delete(&self, form_id: &str) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state
            .forms
            .remove(form_id)
            .ok_or_else(|| StorageError::NotFound {
                form_id: form_id.to_string(),
            })?;
        state.responses.retain(|response| response.form_id != form_id);
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<StoredForm>, StorageError> {
        Ok(self
            .lock()?
            .forms
            .values()
            .filter(|form| form.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn save_response(
        &self,
        form_id: &str,
        answers: AnswerMap,
    ) -> Result<StoredResponse, StorageError> {
        let mut state = self.lock()?;
        if !state.forms.contains_key(form_id) {
            return Err(StorageError::NotFound {
                form_id: form_id.to_string(),
            });
        }
        let response = StoredResponse {
            id: new_record_id(),
            form_id: form_id.to_string(),
            answers,
            submitted_at: timestamp(),
        };
        state.responses.push(response.clone());
        tracing::info!(form_id, response_id = %response.id, "response stored");
        Ok(response)
    }
}
