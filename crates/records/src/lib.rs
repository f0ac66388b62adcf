//! Record models for the CureNet patient/trial portal core.
//!
//! This crate provides the two persisted document shapes the core reads and
//! writes, plus their invariant validation:
//! - [`HealthRecord`]: a patient's structured medical profile
//! - [`TrialRecord`]: a clinical trial's eligibility and operational profile
//!
//! This crate focuses on:
//! - field-for-field compatibility with the existing store documents
//!   (screens outside this core read the same documents directly)
//! - serialisation/deserialisation with path-aware parse diagnostics
//! - invariant validation before anything crosses the submission boundary
//!
//! It deliberately knows nothing about the store itself, the matching
//! engine, or any workflow; those live in `curenet-core`.

pub mod health;
pub mod trial;

pub use health::{
    BloodPressureReading, Diagnosis, FamilyHistoryEntry, Gender, GeneticAbnormality, HealthRecord,
    HeartRateReading, Immunization, Medication, Participation, Reading, Severity,
};
pub use trial::{
    AdverseEvent, ContactInfo, Criterion, EventSeverity, Phase, StudyResult, TrialLocation,
    TrialRecord, TrialStatus,
};

// The id and rating newtypes live in `curenet-types`; re-exported here so
// record consumers need only this crate.
pub use curenet_types::{PatientId, Rating, TrialId};

/// Errors returned by the record models.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// A stored document could not be parsed into the model.
    ///
    /// The message carries the JSON path to the offending field.
    #[error("invalid document at `{path}`: {message}")]
    Parse { path: String, message: String },

    /// The record parsed but violates one or more model invariants.
    #[error("record violates invariants: {}", violations.join("; "))]
    Constraint { violations: Vec<String> },

    /// The model could not be rendered back into a document.
    #[error("failed to render document: {0}")]
    Render(#[from] serde_json::Error),
}

/// Type alias for Results that can fail with a [`RecordError`].
pub type RecordResult<T> = Result<T, RecordError>;

/// Parse a stored JSON document into a model type, with path diagnostics.
pub(crate) fn parse_document<T: serde::de::DeserializeOwned>(
    document: serde_json::Value,
) -> RecordResult<T> {
    let deserializer = document;
    serde_path_to_error::deserialize(deserializer).map_err(|err| RecordError::Parse {
        path: err.path().to_string(),
        message: err.inner().to_string(),
    })
}
