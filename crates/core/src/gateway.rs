//! Submission gateway: the validation boundary in front of persistence.
//!
//! Responsibilities:
//! - Shape-validate every outgoing record against its model before it is
//!   forwarded; a record violating model invariants never reaches the
//!   store
//! - Generate document ids for new records and inject them into the
//!   stored document, the way the catalog has always carried `trial_id`
//! - Classify failures as retryable (store outage) or not (bad record),
//!   so the screens can offer retry only where it can help
//!
//! The gateway never retries on its own; retry is a user action.

use std::sync::Arc;

use chrono::Utc;
use curenet_records::{EventSeverity, HealthRecord, TrialId, TrialRecord, TrialStatus};
use serde_json::Value;
use uuid::Uuid;

use crate::constants::{
    APPOINTMENTS_COLLECTION, DOCUMENTS_COLLECTION, PATIENTS_COLLECTION, REPORTS_COLLECTION,
    TRIALS_COLLECTION,
};
use crate::store::{DocumentStore, StoreError};

/// What kind of record a submission carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionKind {
    /// A new trial, filed by clinic staff.
    Trial,
    /// A patient's health record, created at signup or edited later.
    Profile,
    /// An appointment booking request.
    Appointment,
    /// An adverse-event report.
    Report,
    /// Uploaded document metadata.
    Document,
}

/// Errors surfaced by the submission gateway.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// The record failed shape or invariant validation. Not retryable:
    /// the user must correct it first.
    #[error("record rejected: {}", reasons.join("; "))]
    Rejected { reasons: Vec<String> },
    /// The persistence collaborator failed.
    #[error("submission failed: {0}")]
    Store(#[from] StoreError),
}

impl SubmissionError {
    /// Whether a user-initiated retry of the same submission could
    /// succeed without changing the record.
    pub fn retryable(&self) -> bool {
        match self {
            SubmissionError::Rejected { .. } => false,
            SubmissionError::Store(err) => err.is_retryable(),
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        SubmissionError::Rejected {
            reasons: vec![reason.into()],
        }
    }
}

/// Type alias for Results that can fail with a [`SubmissionError`].
pub type SubmissionResult<T> = Result<T, SubmissionError>;

/// Id of a stored document, as returned to the submitting screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordId(String);

impl RecordId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The validation boundary between flows and the document store.
#[derive(Clone)]
pub struct SubmissionGateway {
    store: Arc<dyn DocumentStore>,
}

impl SubmissionGateway {
    /// Creates a gateway over the given store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Validates `payload` against the model for `kind` and forwards it.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::Rejected` when the payload fails shape or
    /// invariant validation (nothing is forwarded), or
    /// `SubmissionError::Store` when the collaborator fails.
    pub fn submit(&self, kind: SubmissionKind, payload: Value) -> SubmissionResult<RecordId> {
        match kind {
            SubmissionKind::Trial => self.submit_trial(payload),
            SubmissionKind::Profile => self.submit_profile(payload),
            SubmissionKind::Appointment => self.submit_appointment(payload),
            SubmissionKind::Report => self.submit_report(payload),
            SubmissionKind::Document => self.submit_document(payload),
        }
    }

    /// Moves a trial to a new status.
    ///
    /// Status transitions are the only expected mutation of a trial after
    /// creation, and a terminal status is final.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::Rejected` when the trial is unknown or
    /// already terminal, or `SubmissionError::Store` on collaborator
    /// failure.
    pub fn transition_trial_status(
        &self,
        trial_id: &TrialId,
        new_status: TrialStatus,
    ) -> SubmissionResult<()> {
        let document = self
            .store
            .get(TRIALS_COLLECTION, trial_id.as_str())?
            .ok_or_else(|| {
                SubmissionError::rejected(format!("trial `{trial_id}` not found in the catalog"))
            })?;
        let trial =
            TrialRecord::from_document(document).map_err(|err| SubmissionError::rejected(err.to_string()))?;

        if trial.status.is_terminal() {
            return Err(SubmissionError::rejected(format!(
                "trial `{trial_id}` is already {} and cannot change status",
                trial.status.to_wire()
            )));
        }

        self.store.update(
            TRIALS_COLLECTION,
            trial_id.as_str(),
            serde_json::json!({
                "status": new_status.to_wire(),
                "updated_at": Utc::now(),
            }),
        )?;
        tracing::info!(trial = %trial_id, status = new_status.to_wire(), "trial status transitioned");
        Ok(())
    }

    fn submit_trial(&self, payload: Value) -> SubmissionResult<RecordId> {
        let mut trial = TrialRecord::from_document(payload)
            .map_err(|err| SubmissionError::rejected(err.to_string()))?;
        trial.validate().map_err(reject_constraints)?;

        // New submissions get a generated catalog id; the id is stored
        // inside the document as well, mirroring how the catalog is keyed.
        let id = match &trial.trial_id {
            Some(id) => id.as_str().to_owned(),
            None => {
                let generated = Uuid::new_v4().simple().to_string();
                trial.trial_id =
                    Some(TrialId::new(&generated).map_err(|err| SubmissionError::rejected(err.to_string()))?);
                generated
            }
        };
        let now = Utc::now();
        trial.created_at.get_or_insert(now);
        trial.updated_at.get_or_insert(now);

        let document = trial
            .to_document()
            .map_err(|err| SubmissionError::rejected(err.to_string()))?;
        self.store.set(TRIALS_COLLECTION, &id, document)?;
        Ok(RecordId(id))
    }

    fn submit_profile(&self, payload: Value) -> SubmissionResult<RecordId> {
        let record = HealthRecord::from_document(payload)
            .map_err(|err| SubmissionError::rejected(err.to_string()))?;
        record.validate().map_err(reject_constraints)?;

        let id = record.id.as_str().to_owned();
        let document = record
            .to_document()
            .map_err(|err| SubmissionError::rejected(err.to_string()))?;
        self.store.set(PATIENTS_COLLECTION, &id, document)?;
        Ok(RecordId(id))
    }

    fn submit_appointment(&self, payload: Value) -> SubmissionResult<RecordId> {
        let fields = object_fields(&payload)?;
        let mut reasons = Vec::new();
        for field in ["trial_id", "appointment_date", "appointment_time", "preferred_location"] {
            if non_empty_str(fields, field).is_none() {
                reasons.push(format!("`{field}` is required"));
            }
        }
        if fields.get("agree_to_terms").and_then(Value::as_bool) != Some(true) {
            reasons.push("consent (`agree_to_terms`) must be given".to_owned());
        }
        if !reasons.is_empty() {
            return Err(SubmissionError::Rejected { reasons });
        }

        self.store_generated(APPOINTMENTS_COLLECTION, payload)
    }

    fn submit_report(&self, payload: Value) -> SubmissionResult<RecordId> {
        let fields = object_fields(&payload)?;
        let mut reasons = Vec::new();
        for field in ["trial_id", "effect_date", "description"] {
            if non_empty_str(fields, field).is_none() {
                reasons.push(format!("`{field}` is required"));
            }
        }
        match non_empty_str(fields, "severity") {
            Some(raw) if EventSeverity::from_wire(raw).is_some() => {}
            Some(raw) => reasons.push(format!("unknown severity `{raw}`")),
            None => reasons.push("`severity` is required".to_owned()),
        }
        if !reasons.is_empty() {
            return Err(SubmissionError::Rejected { reasons });
        }

        self.store_generated(REPORTS_COLLECTION, payload)
    }

    fn submit_document(&self, payload: Value) -> SubmissionResult<RecordId> {
        let fields = object_fields(&payload)?;
        let mut reasons = Vec::new();
        for field in ["document_name", "file_ref"] {
            if non_empty_str(fields, field).is_none() {
                reasons.push(format!("`{field}` is required"));
            }
        }
        if !reasons.is_empty() {
            return Err(SubmissionError::Rejected { reasons });
        }

        self.store_generated(DOCUMENTS_COLLECTION, payload)
    }

    fn store_generated(&self, collection: &str, payload: Value) -> SubmissionResult<RecordId> {
        let id = Uuid::new_v4().simple().to_string();
        self.store.set(collection, &id, payload)?;
        Ok(RecordId(id))
    }
}

fn object_fields(
    payload: &Value,
) -> SubmissionResult<&serde_json::Map<String, Value>> {
    payload
        .as_object()
        .ok_or_else(|| SubmissionError::rejected("submission payload must be a JSON object"))
}

fn non_empty_str<'a>(
    fields: &'a serde_json::Map<String, Value>,
    field: &str,
) -> Option<&'a str> {
    fields
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn reject_constraints(err: curenet_records::RecordError) -> SubmissionError {
    match err {
        curenet_records::RecordError::Constraint { violations } => {
            SubmissionError::Rejected { reasons: violations }
        }
        other => SubmissionError::rejected(other.to_string()),
    }
}
