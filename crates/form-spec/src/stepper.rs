//! Guided completion of a form.
//!
//! The stepper owns the answer and error maps of one completion session and
//! reads the form it was created with. Validation failures are data in the
//! error map; only persistence failures surface as `Err`.
//!
//! Reaching [`StepState::Submitted`] and delivering the answers are separate
//! steps: a guided session gets there through [`Stepper::advance`], a review
//! session through [`Stepper::submit`]. Either way the answers are handed to
//! storage exactly once, by the first successful `submit`.

use serde::Serialize;

use crate::answers::{AnswerMap, AnswerSet, AnswerValue, ErrorMap, FieldError, Meta};
use crate::spec::field::{FieldDefinition, FieldId};
use crate::spec::form::FormDocument;
use crate::store::{FormStore, StorageError, StoredResponse};
use crate::validate::check_field;

/// How fields are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    /// One field at a time.
    Guided,
    /// All fields at once, validated together on submit.
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepperOptions {
    pub flavor: Flavor,
    /// Start on an intro screen. Only meaningful for [`Flavor::Guided`].
    pub show_intro: bool,
}

impl StepperOptions {
    pub fn guided() -> Self {
        Self {
            flavor: Flavor::Guided,
            show_intro: true,
        }
    }

    pub fn review() -> Self {
        Self {
            flavor: Flavor::Review,
            show_intro: false,
        }
    }

    pub fn show_intro(mut self, show_intro: bool) -> Self {
        self.show_intro = show_intro;
        self
    }
}

impl Default for StepperOptions {
    fn default() -> Self {
        Self::guided()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum StepState {
    Intro,
    Answering(usize),
    Review,
    Submitted,
}

/// Result of an [`Stepper::advance`] attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Now answering the field at this index.
    Moved(usize),
    /// The current field failed validation; its error is in the error map.
    Blocked(FieldId),
    /// The last field and the whole form passed; the session is now
    /// [`StepState::Submitted`] and [`Stepper::submit`] delivers the answers.
    Submitted,
    /// Nothing to advance from in the current state.
    Ignored,
}

/// Result of a [`Stepper::submit`] call that reached no storage failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Submitted(StoredResponse),
    /// At least one field failed; all failures are in the error map.
    Blocked { first_invalid: FieldId },
    /// Submit is only available on the last guided step, in review, or
    /// once the session is submitted.
    NotReady,
}

#[derive(Debug, Clone)]
pub struct Stepper<'f> {
    form: &'f FormDocument,
    options: StepperOptions,
    state: StepState,
    answers: AnswerMap,
    errors: ErrorMap,
    response: Option<StoredResponse>,
}

impl<'f> Stepper<'f> {
    pub fn new(form: &'f FormDocument, options: StepperOptions) -> Self {
        Self {
            form,
            options,
            state: Self::initial_state(options),
            answers: AnswerMap::new(),
            errors: ErrorMap::new(),
            response: None,
        }
    }

    /// Starts with answers restored from an earlier session.
    pub fn with_answers(mut self, answers: AnswerMap) -> Self {
        for (id, value) in answers {
            self.set_value(id.as_str(), value);
        }
        self
    }

    fn initial_state(options: StepperOptions) -> StepState {
        match options.flavor {
            Flavor::Guided if options.show_intro => StepState::Intro,
            _ => Self::first_answering_state(options),
        }
    }

    fn first_answering_state(options: StepperOptions) -> StepState {
        match options.flavor {
            Flavor::Guided => StepState::Answering(0),
            Flavor::Review => StepState::Review,
        }
    }

    pub fn form(&self) -> &'f FormDocument {
        self.form
    }

    pub fn options(&self) -> StepperOptions {
        self.options
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn value(&self, id: &str) -> Option<&AnswerValue> {
        self.answers.get(id)
    }

    pub fn error(&self, id: &str) -> Option<&FieldError> {
        self.errors.get(id)
    }

    pub fn is_submitted(&self) -> bool {
        self.state == StepState::Submitted
    }

    /// Stored record, once [`Stepper::submit`] has delivered the answers.
    pub fn response(&self) -> Option<&StoredResponse> {
        self.response.as_ref()
    }

    /// Field shown in the current guided step.
    pub fn current_field(&self) -> Option<&'f FieldDefinition> {
        match self.state {
            StepState::Answering(index) => self.form.fields.get(index),
            _ => None,
        }
    }

    /// Fields the respondent currently sees.
    pub fn visible_fields(&self) -> &'f [FieldDefinition] {
        match self.state {
            StepState::Answering(index) if index < self.form.len() => {
                &self.form.fields[index..=index]
            }
            StepState::Review => &self.form.fields,
            _ => &[],
        }
    }

    /// Leaves the intro screen.
    pub fn begin(&mut self) -> bool {
        if self.state != StepState::Intro {
            return false;
        }
        self.state = Self::first_answering_state(self.options);
        true
    }

    /// Records a value and re-validates that field. Unknown ids and
    /// changes after submission are ignored.
    pub fn set_value(&mut self, id: &str, value: impl Into<AnswerValue>) -> Option<&FieldError> {
        if self.is_submitted() {
            tracing::debug!(field_id = id, "value ignored: already submitted");
            return None;
        }
        let form = self.form;
        let Some(field) = form.field(id) else {
            tracing::debug!(field_id = id, "value ignored: unknown field");
            return None;
        };
        self.answers.insert(field.id.clone(), value.into());
        self.refresh_error(field);
        self.errors.get(id)
    }

    fn refresh_error(&mut self, field: &FieldDefinition) -> bool {
        match check_field(field, self.answers.get(&field.id)) {
            Some(error) => {
                self.errors.insert(field.id.clone(), error);
                false
            }
            None => {
                self.errors.remove(&field.id);
                true
            }
        }
    }

    /// Gates the current guided step on its field's validity. A valid last
    /// field runs the whole-form gate and, if that passes, submits the session.
    pub fn advance(&mut self) -> Advance {
        let index = match self.state {
            StepState::Intro => {
                self.begin();
                return Advance::Moved(0);
            }
            StepState::Answering(index) => index,
            StepState::Review | StepState::Submitted => return Advance::Ignored,
        };
        let form = self.form;
        let Some(field) = form.fields.get(index) else {
            return self.finish();
        };
        if !self.refresh_error(field) {
            tracing::debug!(field_id = %field.id, index, "advance blocked");
            return Advance::Blocked(field.id.clone());
        }
        if index + 1 < form.len() {
            self.state = StepState::Answering(index + 1);
            Advance::Moved(index + 1)
        } else {
            self.finish()
        }
    }

    fn finish(&mut self) -> Advance {
        if let Some(first_invalid) = self.gate() {
            return Advance::Blocked(first_invalid);
        }
        self.state = StepState::Submitted;
        tracing::debug!(answers = self.answers.len(), "session submitted");
        Advance::Submitted
    }

    /// Whole-form check; a guided session is moved back to the first failure.
    fn gate(&mut self) -> Option<FieldId> {
        let first_invalid = self.check_all()?;
        if let (Flavor::Guided, Some(index)) =
            (self.options.flavor, self.form.position(first_invalid.as_str()))
        {
            self.state = StepState::Answering(index);
        }
        tracing::debug!(field_id = %first_invalid, errors = self.errors.len(), "submit blocked");
        Some(first_invalid)
    }

    /// Steps back one field without validating.
    pub fn retreat(&mut self) -> bool {
        match self.state {
            StepState::Answering(index) if index > 0 => {
                self.state = StepState::Answering(index - 1);
                true
            }
            _ => false,
        }
    }

    /// Validates every field in one pass and returns the first failing one.
    pub fn check_all(&mut self) -> Option<FieldId> {
        let form = self.form;
        let mut first_invalid = None;
        for field in &form.fields {
            if !self.refresh_error(field) && first_invalid.is_none() {
                first_invalid = Some(field.id.clone());
            }
        }
        first_invalid
    }

    /// Hands the answers to storage.
    ///
    /// From the last guided step or from review this runs the whole-form gate
    /// first; a session already [`StepState::Submitted`] goes straight to
    /// storage. On a storage error nothing in the session changes, so the
    /// call can be retried without re-answering. Once delivered, further
    /// calls return the stored response without saving again. Taking
    /// `&mut self` keeps the session frozen while the call is pending.
    pub async fn submit<S>(&mut self, store: &S, form_id: &str) -> Result<Submission, StorageError>
    where
        S: FormStore + ?Sized,
    {
        if let Some(response) = &self.response {
            return Ok(Submission::Submitted(response.clone()));
        }
        match self.state {
            StepState::Submitted => {}
            StepState::Answering(index) if index + 1 >= self.form.len() => {
                if let Some(first_invalid) = self.gate() {
                    return Ok(Submission::Blocked { first_invalid });
                }
            }
            StepState::Review => {
                if let Some(first_invalid) = self.gate() {
                    return Ok(Submission::Blocked { first_invalid });
                }
            }
            StepState::Intro | StepState::Answering(_) => return Ok(Submission::NotReady),
        }

        let response = store.save_response(form_id, self.answers.clone()).await?;
        self.state = StepState::Submitted;
        self.response = Some(response.clone());
        tracing::info!(form_id, response_id = %response.id, "form submitted");
        Ok(Submission::Submitted(response))
    }

    /// Clears answers, errors and any delivered response and starts over at
    /// the first answering state.
    pub fn reset(&mut self) {
        self.answers.clear();
        self.errors.clear();
        self.response = None;
        self.state = Self::first_answering_state(self.options);
    }

    /// Fields holding a valid, non-empty answer.
    pub fn answered_count(&self) -> usize {
        self.form
            .fields
            .iter()
            .filter(|field| {
                self.answers
                    .get(&field.id)
                    .is_some_and(|value| !value.is_empty())
                    && !self.errors.contains_key(&field.id)
            })
            .count()
    }

    pub fn progress(&self) -> Meta {
        Meta {
            answered: self.answered_count(),
            total: self.form.len(),
        }
    }

    /// First field, in form order, currently holding an error.
    pub fn first_error(&self) -> Option<&'f FieldId> {
        self.form
            .fields
            .iter()
            .map(|field| &field.id)
            .find(|id| self.errors.contains_key(*id))
    }

    pub fn answer_set(&self, form_id: impl Into<String>) -> AnswerSet {
        AnswerSet {
            form_id: form_id.into(),
            answers: self.answers.clone(),
            meta: Some(self.progress()),
        }
    }
}
