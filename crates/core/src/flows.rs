//! The portal's concrete intake flows.
//!
//! Each flow is a [`FlowSpec`] handed to the shared [`Workflow`] machine;
//! the screens own nothing but field binding. The step sequences and
//! required fields mirror the shipped booking, upload, reporting and
//! signup screens.

use curenet_records::{EventSeverity, HealthRecord};
use serde_json::Value;

use crate::gateway::SubmissionKind;
use crate::workflow::{FlowSpec, StepData, StepDef, Workflow};

/// Appointment booking: pick a trial, pick a date and site, then confirm
/// a time slot and consent.
pub fn appointment_flow() -> Workflow {
    Workflow::new(FlowSpec {
        name: "appointment",
        kind: SubmissionKind::Appointment,
        steps: vec![
            StepDef {
                name: "trial-selection",
                validate: |data| require_fields(data, &["trial_id"]),
            },
            StepDef {
                name: "schedule",
                validate: |data| require_fields(data, &["appointment_date", "preferred_location"]),
            },
            StepDef {
                name: "confirmation",
                validate: validate_appointment_confirmation,
            },
        ],
    })
}

/// Document upload: describe the document, then bind the file.
pub fn document_flow() -> Workflow {
    Workflow::new(FlowSpec {
        name: "document-upload",
        kind: SubmissionKind::Document,
        steps: vec![
            StepDef {
                name: "document-details",
                validate: |data| require_fields(data, &["document_name", "category"]),
            },
            StepDef {
                name: "file-binding",
                validate: |data| require_fields(data, &["file_ref"]),
            },
        ],
    })
}

/// Adverse-event report: pick the trial, describe the effect, optionally
/// attach evidence.
pub fn adverse_event_flow() -> Workflow {
    Workflow::new(FlowSpec {
        name: "adverse-event-report",
        kind: SubmissionKind::Report,
        steps: vec![
            StepDef {
                name: "trial-selection",
                validate: |data| require_fields(data, &["trial_id"]),
            },
            StepDef {
                name: "effect-details",
                validate: validate_effect_details,
            },
            // Images, medical-attention and medication-change flags are
            // all optional; the step gates nothing.
            StepDef {
                name: "attachments",
                validate: |_| Ok(()),
            },
        ],
    })
}

/// Signup: account details first, then the full medical history, which is
/// validated as one health-record schema at submit time rather than per
/// accordion section.
pub fn signup_flow() -> Workflow {
    Workflow::new(FlowSpec {
        name: "signup",
        kind: SubmissionKind::Profile,
        steps: vec![
            StepDef {
                name: "account",
                validate: validate_account,
            },
            StepDef {
                name: "medical-history",
                validate: validate_medical_history,
            },
        ],
    })
}

fn validate_appointment_confirmation(data: &StepData) -> Result<(), Vec<String>> {
    let mut reasons = missing_fields(data, &["appointment_time"]);
    if data.get("agree_to_terms").and_then(Value::as_bool) != Some(true) {
        reasons.push("consent (`agree_to_terms`) must be given".to_owned());
    }
    ok_or(reasons)
}

fn validate_effect_details(data: &StepData) -> Result<(), Vec<String>> {
    let mut reasons = missing_fields(data, &["effect_date", "description"]);
    match non_empty_str(data, "severity") {
        Some(raw) if EventSeverity::from_wire(raw).is_some() => {}
        Some(raw) => reasons.push(format!("unknown severity `{raw}`")),
        None => reasons.push("`severity` is required".to_owned()),
    }
    ok_or(reasons)
}

fn validate_account(data: &StepData) -> Result<(), Vec<String>> {
    let mut reasons = Vec::new();
    match non_empty_str(data, "email") {
        Some(email) if email.contains('@') => {}
        Some(_) => reasons.push("`email` must be a valid email address".to_owned()),
        None => reasons.push("`email` is required".to_owned()),
    }
    match data.get("password").and_then(Value::as_str) {
        Some(password) if password.chars().count() >= 8 => {}
        Some(_) => reasons.push("`password` must be at least 8 characters".to_owned()),
        None => reasons.push("`password` is required".to_owned()),
    }
    match non_empty_str(data, "name") {
        Some(name) if name.chars().count() >= 2 => {}
        Some(_) => reasons.push("`name` must be at least 2 characters".to_owned()),
        None => reasons.push("`name` is required".to_owned()),
    }
    ok_or(reasons)
}

/// The whole accumulated form must parse as a health record and satisfy
/// its invariants; height and weight need at least one reading each, as
/// the signup form has always required.
fn validate_medical_history(data: &StepData) -> Result<(), Vec<String>> {
    let record = match HealthRecord::from_document(Value::Object(data.clone())) {
        Ok(record) => record,
        Err(err) => return Err(vec![err.to_string()]),
    };

    let mut reasons = Vec::new();
    if let Err(curenet_records::RecordError::Constraint { violations }) = record.validate() {
        reasons.extend(violations);
    }
    if record.height.is_empty() {
        reasons.push("at least one height reading is required".to_owned());
    }
    if record.weight.is_empty() {
        reasons.push("at least one weight reading is required".to_owned());
    }
    ok_or(reasons)
}

fn missing_fields(data: &StepData, fields: &[&str]) -> Vec<String> {
    fields
        .iter()
        .filter(|field| non_empty_str(data, field).is_none())
        .map(|field| format!("`{field}` is required"))
        .collect()
}

fn require_fields(data: &StepData, fields: &[&str]) -> Result<(), Vec<String>> {
    ok_or(missing_fields(data, fields))
}

fn non_empty_str<'a>(data: &'a StepData, field: &str) -> Option<&'a str> {
    data.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn ok_or(reasons: Vec<String>) -> Result<(), Vec<String>> {
    if reasons.is_empty() {
        Ok(())
    } else {
        Err(reasons)
    }
}
