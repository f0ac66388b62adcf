//! Trial record model: a clinical trial's eligibility and operational data.
//!
//! Responsibilities:
//! - Define the persisted `trials` document shape, field-for-field
//! - Provide wire enums (`Phase`, `TrialStatus`, `EventSeverity`) with
//!   explicit wire-string translation
//! - Validate the structural invariants a trial must satisfy before it is
//!   accepted at the submission boundary
//!
//! Notes:
//! - Trials are created by clinic staff and never deleted; after creation
//!   the only expected mutation is a `status` transition
//! - `matching_criteria` is the coarse tag set the matching engine
//!   intersects with a patient's disease names

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use curenet_types::{NonEmptyText, TrialId};
use serde::{Deserialize, Serialize};

use crate::{parse_document, RecordError, RecordResult};

// ============================================================================
// Wire enums
// ============================================================================

/// Regulatory phase of a trial, including the combined designs the registry
/// uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    I,
    II,
    III,
    IV,
    ItoII,
    IItoIII,
    IIItoIV,
}

impl Phase {
    /// Convert to the registry wire string.
    pub fn to_wire(self) -> &'static str {
        match self {
            Phase::I => "Phase I",
            Phase::II => "Phase II",
            Phase::III => "Phase III",
            Phase::IV => "Phase IV",
            Phase::ItoII => "Phase I/II",
            Phase::IItoIII => "Phase II/III",
            Phase::IIItoIV => "Phase III/IV",
        }
    }

    /// Parse from the registry wire string.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "Phase I" => Some(Phase::I),
            "Phase II" => Some(Phase::II),
            "Phase III" => Some(Phase::III),
            "Phase IV" => Some(Phase::IV),
            "Phase I/II" => Some(Phase::ItoII),
            "Phase II/III" => Some(Phase::IItoIII),
            "Phase III/IV" => Some(Phase::IIItoIV),
            _ => None,
        }
    }
}

impl Serialize for Phase {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_wire())
    }
}

impl<'de> Deserialize<'de> for Phase {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Phase::from_wire(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown trial phase: {s}")))
    }
}

/// Recruitment status of a trial.
///
/// `completed`, `terminated` and `withdrawn` are terminal: a trial never
/// leaves them, and a transition out of them is rejected at the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrialStatus {
    NotYetRecruiting,
    Recruiting,
    EnrollingByInvitation,
    ActiveNotRecruiting,
    Completed,
    Suspended,
    Terminated,
    Withdrawn,
}

impl TrialStatus {
    /// Convert to the wire string stored in trial documents.
    pub fn to_wire(self) -> &'static str {
        match self {
            TrialStatus::NotYetRecruiting => "not_yet_recruiting",
            TrialStatus::Recruiting => "recruiting",
            TrialStatus::EnrollingByInvitation => "enrolling_by_invitation",
            TrialStatus::ActiveNotRecruiting => "active_not_recruiting",
            TrialStatus::Completed => "completed",
            TrialStatus::Suspended => "suspended",
            TrialStatus::Terminated => "terminated",
            TrialStatus::Withdrawn => "withdrawn",
        }
    }

    /// Parse from a stored wire string.
    ///
    /// The legacy store value `"approved"` is accepted as an alias of
    /// `recruiting`; existing documents still carry it.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "not_yet_recruiting" => Some(TrialStatus::NotYetRecruiting),
            "recruiting" | "approved" => Some(TrialStatus::Recruiting),
            "enrolling_by_invitation" => Some(TrialStatus::EnrollingByInvitation),
            "active_not_recruiting" => Some(TrialStatus::ActiveNotRecruiting),
            "completed" => Some(TrialStatus::Completed),
            "suspended" => Some(TrialStatus::Suspended),
            "terminated" => Some(TrialStatus::Terminated),
            "withdrawn" => Some(TrialStatus::Withdrawn),
            _ => None,
        }
    }

    /// Whether the status is final. Terminal trials are never reopened.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TrialStatus::Completed | TrialStatus::Terminated | TrialStatus::Withdrawn
        )
    }
}

impl Serialize for TrialStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_wire())
    }
}

impl<'de> Deserialize<'de> for TrialStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TrialStatus::from_wire(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown trial status: {s}")))
    }
}

/// Severity of an adverse event, as reported by patients or recorded
/// against the trial. Wider than diagnosis severity: patients can report a
/// life-threatening reaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventSeverity {
    Mild,
    Moderate,
    Severe,
    LifeThreatening,
}

impl EventSeverity {
    /// Convert to the wire string.
    pub fn to_wire(self) -> &'static str {
        match self {
            EventSeverity::Mild => "mild",
            EventSeverity::Moderate => "moderate",
            EventSeverity::Severe => "severe",
            EventSeverity::LifeThreatening => "life-threatening",
        }
    }

    /// Parse from a wire string. Both spellings of the last band appear in
    /// stored documents.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "mild" => Some(EventSeverity::Mild),
            "moderate" => Some(EventSeverity::Moderate),
            "severe" => Some(EventSeverity::Severe),
            "life-threatening" | "life_threatening" => Some(EventSeverity::LifeThreatening),
            _ => None,
        }
    }
}

impl Serialize for EventSeverity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_wire())
    }
}

impl<'de> Deserialize<'de> for EventSeverity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EventSeverity::from_wire(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown event severity: {s}")))
    }
}

// ============================================================================
// Nested document shapes
// ============================================================================

/// One free-text eligibility criterion. Blank criterion text is rejected
/// at parse time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub criterion: NonEmptyText,
}

/// A site where the trial runs. Every trial carries at least one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialLocation {
    pub location_id: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

/// Public contact details for the trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: String,
    pub email: String,
    pub website: String,
}

/// A published study result. Append-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudyResult {
    pub date: DateTime<Utc>,
    pub result_summary: String,
    pub outcome: String,
}

/// An adverse event recorded against the trial. Append-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdverseEvent {
    pub date: DateTime<Utc>,
    pub event_description: String,
    pub severity: EventSeverity,
}

/// A clinical trial's eligibility and operational profile, as stored in the
/// `trials` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// External registry identifier, e.g. `NCT00543210`.
    #[serde(rename = "NCTID")]
    pub nctid: String,
    /// Store document id; absent on a submission, injected by the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_id: Option<TrialId>,
    pub phase: Phase,
    pub title: String,
    pub brief_summary: String,
    pub drug: String,
    pub description: String,
    pub disease_targeted: String,
    #[serde(default)]
    pub inclusion_criteria: Vec<Criterion>,
    #[serde(default)]
    pub exclusion_criteria: Vec<Criterion>,
    pub enrollment_capacity: u32,
    pub sponsor: String,
    #[serde(default)]
    pub locations: Vec<TrialLocation>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: TrialStatus,
    pub contact_info: ContactInfo,
    #[serde(default)]
    pub data_security_details: String,
    #[serde(default)]
    pub study_results: Vec<StudyResult>,
    #[serde(default)]
    pub adverse_events: Vec<AdverseEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub additional_comments: Vec<String>,
    #[serde(default)]
    pub matching_criteria: BTreeSet<String>,
}

impl TrialRecord {
    /// Parses a stored `trials` document.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Parse` with the JSON path of the offending
    /// field when the document does not fit the model.
    pub fn from_document(document: serde_json::Value) -> RecordResult<Self> {
        parse_document(document)
    }

    /// Renders the trial back into a store document.
    pub fn to_document(&self) -> RecordResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// The coarse condition tags the matching engine intersects with a
    /// patient's disease names: `matching_criteria` plus the targeted
    /// disease.
    pub fn condition_tags(&self) -> BTreeSet<String> {
        let mut tags = self.matching_criteria.clone();
        let targeted = self.disease_targeted.trim();
        if !targeted.is_empty() {
            tags.insert(targeted.to_owned());
        }
        tags
    }

    /// Validates the structural invariants of the trial.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Constraint` listing every violated invariant.
    pub fn validate(&self) -> RecordResult<()> {
        let mut violations = Vec::new();

        if self.enrollment_capacity == 0 {
            violations.push("enrollment_capacity must be greater than zero".to_owned());
        }
        if self.locations.is_empty() {
            violations.push("a trial requires at least one location".to_owned());
        }
        if self.start_date >= self.end_date {
            violations.push(format!(
                "start_date {} is not before end_date {}",
                self.start_date, self.end_date
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(RecordError::Constraint { violations })
        }
    }
}
