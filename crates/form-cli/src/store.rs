use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use form_spec::store::{new_record_id, timestamp};
use form_spec::{
    AnswerMap, FormDocument, FormPatch, FormStore, StorageError, StoredForm, StoredResponse,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// File-backed [`FormStore`] laid out as
/// `forms/<id>.json` and `responses/<form-id>/<response-id>.json`.
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn forms_dir(&self) -> PathBuf {
        self.root.join("forms")
    }

    fn form_path(&self, form_id: &str) -> Result<PathBuf, StorageError> {
        ensure_record_id(form_id)?;
        Ok(self.forms_dir().join(format!("{}.json", form_id)))
    }

    fn responses_dir(&self, form_id: &str) -> Result<PathBuf, StorageError> {
        ensure_record_id(form_id)?;
        Ok(self.root.join("responses").join(form_id))
    }

    fn load_form(&self, form_id: &str) -> Result<StoredForm, StorageError> {
        let path = self.form_path(form_id)?;
        match fs::read_to_string(&path) {
            Ok(contents) => parse(&path, &contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound {
                form_id: form_id.to_string(),
            }),
            Err(err) => Err(backend(&path, err)),
        }
    }

    fn write_form(&self, form: &StoredForm) -> Result<(), StorageError> {
        let path = self.form_path(&form.id)?;
        write_json(&path, form)
    }

    /// Responses stored for `form_id`, oldest first.
    pub fn responses(&self, form_id: &str) -> Result<Vec<StoredResponse>, StorageError> {
        let dir = self.responses_dir(form_id)?;
        let mut responses: Vec<StoredResponse> = read_json_dir(&dir)?;
        responses.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(responses)
    }
}

#[async_trait]
impl FormStore for JsonDirStore {
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
        self.write_form(&form)?;
        tracing::debug!(form_id = %form.id, root = %self.root.display(), "form file created");
        Ok(form)
    }

    async fn read(&self, form_id: &str) -> Result<StoredForm, StorageError> {
        self.load_form(form_id)
    }

    async fn update(&self, form_id: &str, patch: FormPatch) -> Result<StoredForm, StorageError> {
        let mut form = self.load_form(form_id)?;
        patch.apply(&mut form.document);
        form.updated_at = timestamp();
        self.write_form(&form)?;
        Ok(form)
    }

    async fn delete(&self, form_id: &str) -> Result<(), StorageError> {
        let path = self.form_path(form_id)?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    form_id: form_id.to_string(),
                });
            }
            Err(err) => return Err(backend(&path, err)),
        }
        let responses = self.responses_dir(form_id)?;
        if responses.exists() {
            fs::remove_dir_all(&responses).map_err(|err| backend(&responses, err))?;
        }
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<StoredForm>, StorageError> {
        let mut forms: Vec<StoredForm> = read_json_dir(&self.forms_dir())?;
        forms.retain(|form| form.owner_id == owner_id);
        forms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(forms)
    }

    async fn save_response(
        &self,
        form_id: &str,
        answers: AnswerMap,
    ) -> Result<StoredResponse, StorageError> {
        self.load_form(form_id)?;
        let response = StoredResponse {
            id: new_record_id(),
            form_id: form_id.to_string(),
            answers,
            submitted_at: timestamp(),
        };
        let path = self
            .responses_dir(form_id)?
            .join(format!("{}.json", response.id));
        write_json(&path, &response)?;
        tracing::info!(form_id, response_id = %response.id, "response stored");
        Ok(response)
    }
}

/// Record ids become file names; anything that could escape the store root
/// is rejected.
fn ensure_record_id(id: &str) -> Result<(), StorageError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::Backend(format!("invalid record id '{}'", id)))
    }
}

fn backend(path: &Path, err: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(format!("{}: {}", path.display(), err))
}

fn parse<T: DeserializeOwned>(path: &Path, contents: &str) -> Result<T, StorageError> {
    serde_json::from_str(contents).map_err(|err| backend(path, err))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| backend(parent, err))?;
    }
    let contents = serde_json::to_string_pretty(value).map_err(|err| backend(path, err))?;
    fs::write(path, contents).map_err(|err| backend(path, err))
}

fn read_json_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StorageError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(backend(dir, err)),
    };
    let mut records = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| backend(dir, err))?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let contents = fs::read_to_string(&path).map_err(|err| backend(&path, err))?;
        records.push(parse(&path, &contents)?);
    }
    Ok(records)
}
