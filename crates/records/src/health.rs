//! Health record model: one patient's structured medical profile.
//!
//! Responsibilities:
//! - Define the persisted `patients` document shape, field-for-field
//! - Parse and render store documents with path-aware diagnostics
//! - Validate the physiological and demographic invariants before a record
//!   is allowed across the submission boundary
//!
//! Notes:
//! - One record exists per authenticated patient (keyed by the auth id)
//! - Measurement series are append-only; readings are never overwritten
//! - Records are never hard-deleted: diagnostic history must survive

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use curenet_types::{PatientId, Rating, TrialId};
use serde::{Deserialize, Serialize};

use crate::{parse_document, RecordError, RecordResult};

/// Accepted age band, inclusive.
pub const AGE_RANGE: std::ops::RangeInclusive<u32> = 0..=120;
/// Plausible height readings, centimetres.
pub const HEIGHT_CM_RANGE: std::ops::RangeInclusive<f64> = 50.0..=250.0;
/// Plausible weight readings, kilograms.
pub const WEIGHT_KG_RANGE: std::ops::RangeInclusive<f64> = 20.0..=300.0;
/// Plausible heart-rate readings, beats per minute.
pub const HEART_RATE_BPM_RANGE: std::ops::RangeInclusive<f64> = 30.0..=200.0;
/// Plausible diastolic (low) blood pressure, mmHg.
pub const BP_LOW_RANGE: std::ops::RangeInclusive<f64> = 40.0..=150.0;
/// Plausible systolic (high) blood pressure, mmHg.
pub const BP_HIGH_RANGE: std::ops::RangeInclusive<f64> = 80.0..=250.0;

/// Patient gender as captured at signup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

/// Severity of a diagnosed condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

/// A single timestamped measurement (height or weight).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub date: DateTime<Utc>,
    pub value: f64,
}

/// A heart-rate sample with the averaged band recorded by the device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeartRateReading {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub time: DateTime<Utc>,
}

/// A blood-pressure sample; `low` is diastolic, `high` is systolic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BloodPressureReading {
    pub low: f64,
    pub high: f64,
    pub time: DateTime<Utc>,
}

/// One diagnosed condition. Disease names are free text, not deduplicated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub disease: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub severity: Severity,
}

fn default_active() -> bool {
    true
}

/// A condition reported in the patient's family history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FamilyHistoryEntry {
    pub disease: String,
    pub relation: String,
}

/// A recorded immunisation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Immunization {
    pub date: DateTime<Utc>,
    pub vaccine: String,
}

/// A current or past medication course.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub medicine: String,
    pub dosage: String,
    pub start_date: DateTime<Utc>,
    /// `None` while the course is ongoing; the store carries a JSON null.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub side_effects: BTreeSet<String>,
}

/// A detected genetic abnormality.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneticAbnormality {
    pub gene_affected: String,
    pub date_detected: DateTime<Utc>,
}

/// One completed or ongoing trial participation.
///
/// References the trial by document id only; the trial itself may have been
/// withdrawn from the catalog, which consumers must treat as a display gap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participation {
    pub trial_id: TrialId,
    pub participation_start: DateTime<Utc>,
    #[serde(default)]
    pub participation_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub matched_criteria: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

/// A patient's structured medical profile, as stored in the `patients`
/// collection.
///
/// Field names and nesting match the live store documents exactly; screens
/// outside this core read the same documents directly. Unknown fields in a
/// stored document are tolerated and dropped on re-render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    /// The auth collaborator's identity for the owning patient.
    pub id: PatientId,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    #[serde(default)]
    pub has_guardian: bool,
    #[serde(default)]
    pub height: Vec<Reading>,
    #[serde(default)]
    pub weight: Vec<Reading>,
    #[serde(default)]
    pub heart_rate: Vec<HeartRateReading>,
    #[serde(default)]
    pub blood_pressure: Vec<BloodPressureReading>,
    #[serde(default)]
    pub family_history: Vec<FamilyHistoryEntry>,
    #[serde(default)]
    pub diagnoses: Vec<Diagnosis>,
    #[serde(default)]
    pub immunizations: Vec<Immunization>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub allergies: BTreeSet<String>,
    #[serde(default)]
    pub genetic_abnormalities: Vec<GeneticAbnormality>,
    #[serde(default)]
    pub approved_trials: Vec<TrialId>,
    #[serde(default)]
    pub participation: Vec<Participation>,
    #[serde(default)]
    pub patient_symptoms: BTreeSet<String>,
    #[serde(default)]
    pub additional_comments: Vec<String>,
}

impl HealthRecord {
    /// Parses a stored `patients` document.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Parse` with the JSON path of the offending
    /// field when the document does not fit the model.
    pub fn from_document(document: serde_json::Value) -> RecordResult<Self> {
        parse_document(document)
    }

    /// Renders the record back into a store document.
    pub fn to_document(&self) -> RecordResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Returns the set of disease names from the patient's diagnoses.
    ///
    /// Duplicate names collapse; an empty set means no condition-based
    /// match can be asserted for this patient.
    pub fn disease_names(&self) -> BTreeSet<String> {
        self.diagnoses
            .iter()
            .map(|d| d.disease.trim().to_owned())
            .filter(|d| !d.is_empty())
            .collect()
    }

    /// Validates the record's demographic and physiological invariants.
    ///
    /// All violations are collected so a caller can surface them together.
    /// Ratings are range-checked at construction and need no re-check here.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Constraint` listing every violated invariant.
    pub fn validate(&self) -> RecordResult<()> {
        let mut violations = Vec::new();

        if !AGE_RANGE.contains(&self.age) {
            violations.push(format!("age {} outside accepted range 0-120", self.age));
        }

        for reading in &self.height {
            if !HEIGHT_CM_RANGE.contains(&reading.value) {
                violations.push(format!(
                    "height reading {} cm outside plausible range 50-250",
                    reading.value
                ));
            }
        }

        for reading in &self.weight {
            if !WEIGHT_KG_RANGE.contains(&reading.value) {
                violations.push(format!(
                    "weight reading {} kg outside plausible range 20-300",
                    reading.value
                ));
            }
        }

        for reading in &self.heart_rate {
            for (label, value) in [
                ("avg", reading.avg),
                ("min", reading.min),
                ("max", reading.max),
            ] {
                if !HEART_RATE_BPM_RANGE.contains(&value) {
                    violations.push(format!(
                        "heart rate {label} {value} bpm outside plausible range 30-200"
                    ));
                }
            }
        }

        for reading in &self.blood_pressure {
            if !BP_LOW_RANGE.contains(&reading.low) {
                violations.push(format!(
                    "diastolic pressure {} mmHg outside plausible range 40-150",
                    reading.low
                ));
            }
            if !BP_HIGH_RANGE.contains(&reading.high) {
                violations.push(format!(
                    "systolic pressure {} mmHg outside plausible range 80-250",
                    reading.high
                ));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(RecordError::Constraint { violations })
        }
    }
}
