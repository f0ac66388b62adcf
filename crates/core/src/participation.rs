//! Participation history.
//!
//! A patient's health record carries its own participation entries; this
//! module resolves each entry's trial reference against the trial
//! collection so the history screen can show titles, sponsors and phases
//! alongside the patient's own dates and feedback.

use curenet_records::{HealthRecord, Participation, TrialRecord};
use serde::Serialize;

use crate::constants::TRIALS_COLLECTION;
use crate::store::{DocumentStore, StoreResult};

/// One history row: the patient's own entry plus the referenced trial,
/// when it could be resolved.
#[derive(Debug, Serialize)]
pub struct ParticipationView {
    pub entry: Participation,
    /// `None` when the referenced trial is missing or unreadable; the
    /// entry still renders from the patient's own data.
    pub trial: Option<TrialRecord>,
}

/// Resolves a patient's participation entries against the trial
/// collection, preserving the order they appear in the record.
///
/// A dangling or unparseable trial reference is logged and surfaced as a
/// row with `trial: None` rather than dropped; the patient's history must
/// never shrink because trial data rotted.
///
/// # Errors
///
/// Returns a `StoreError` only when the store itself fails.
pub fn participation_history(
    patient: &HealthRecord,
    store: &dyn DocumentStore,
) -> StoreResult<Vec<ParticipationView>> {
    let mut views = Vec::with_capacity(patient.participation.len());
    for entry in &patient.participation {
        let trial = resolve_trial(store, entry.trial_id.as_str())?;
        views.push(ParticipationView {
            entry: entry.clone(),
            trial,
        });
    }
    Ok(views)
}

fn resolve_trial(store: &dyn DocumentStore, trial_id: &str) -> StoreResult<Option<TrialRecord>> {
    let Some(document) = store.get(TRIALS_COLLECTION, trial_id)? else {
        tracing::warn!(trial = trial_id, "participation references a missing trial");
        return Ok(None);
    };
    match TrialRecord::from_document(document) {
        Ok(trial) => Ok(Some(trial)),
        Err(err) => {
            tracing::warn!(trial = trial_id, error = %err, "stored trial does not parse");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError, StoreResult};
    use serde_json::{json, Value};

    fn patient_with_history(trial_ids: &[&str]) -> HealthRecord {
        let participation: Vec<Value> = trial_ids
            .iter()
            .map(|id| {
                json!({
                    "trial_id": id,
                    "participation_start": "2025-03-01T00:00:00Z",
                    "participation_end": "2025-09-01T00:00:00Z",
                    "matched_criteria": ["Asthma"],
                    "patient_feedback": "Symptoms improved",
                    "rating": 8
                })
            })
            .collect();
        HealthRecord::from_document(json!({
            "id": "uid-1",
            "name": "Ashley",
            "age": 34,
            "gender": "female",
            "participation": participation
        }))
        .expect("fixture parses")
    }

    fn trial_document(id: &str) -> Value {
        json!({
            "NCTID": format!("NCT-{id}"),
            "trial_id": id,
            "phase": "Phase II",
            "title": "Inhaled corticosteroid dose comparison",
            "brief_summary": "Comparing maintenance doses.",
            "drug": "Budesonide",
            "description": "Twelve-week randomised comparison.",
            "disease_targeted": "Asthma",
            "inclusion_criteria": [{"criterion": "Adults 18-65"}],
            "exclusion_criteria": [],
            "enrollment_capacity": 120,
            "sponsor": "Hopkins Pulmonary",
            "locations": [{
                "location_id": "L1",
                "address": "600 N Wolfe St",
                "city": "Baltimore",
                "state": "MD",
                "country": "US"
            }],
            "start_date": "2025-01-01T00:00:00Z",
            "end_date": "2026-01-01T00:00:00Z",
            "status": "recruiting",
            "contact_info": {
                "phone": "410-555-0100",
                "email": "pulmonary@example.org",
                "website": "https://example.org"
            },
            "matching_criteria": ["Asthma"]
        })
    }

    #[test]
    fn resolves_each_entry_in_record_order() {
        let store = MemoryStore::new();
        store
            .set(TRIALS_COLLECTION, "t1", trial_document("t1"))
            .expect("should store");
        store
            .set(TRIALS_COLLECTION, "t2", trial_document("t2"))
            .expect("should store");

        let patient = patient_with_history(&["t2", "t1"]);
        let views = participation_history(&patient, &store).expect("store is fine");
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].entry.trial_id.as_str(), "t2");
        assert_eq!(views[1].entry.trial_id.as_str(), "t1");
        assert!(views.iter().all(|v| v.trial.is_some()));
    }

    #[test]
    fn dangling_reference_keeps_the_row_without_a_trial() {
        let store = MemoryStore::new();
        let patient = patient_with_history(&["ghost"]);
        let views = participation_history(&patient, &store).expect("store is fine");
        assert_eq!(views.len(), 1);
        assert!(views[0].trial.is_none());
        assert_eq!(views[0].entry.rating.map(curenet_types::Rating::get), Some(8));
    }

    #[test]
    fn unparseable_trial_keeps_the_row_without_a_trial() {
        let store = MemoryStore::new();
        store
            .set(TRIALS_COLLECTION, "t1", json!({"title": 42}))
            .expect("should store");
        let patient = patient_with_history(&["t1"]);
        let views = participation_history(&patient, &store).expect("store is fine");
        assert_eq!(views.len(), 1);
        assert!(views[0].trial.is_none());
    }

    #[test]
    fn store_failure_propagates() {
        struct DownStore;
        impl DocumentStore for DownStore {
            fn get(&self, _: &str, _: &str) -> StoreResult<Option<Value>> {
                Err(StoreError::Unavailable("backend down".into()))
            }
            fn query(&self, _: &str, _: &[crate::store::Filter], _: usize) -> StoreResult<Vec<Value>> {
                Err(StoreError::Unavailable("backend down".into()))
            }
            fn set(&self, _: &str, _: &str, _: Value) -> StoreResult<()> {
                Err(StoreError::Unavailable("backend down".into()))
            }
            fn update(&self, _: &str, _: &str, _: Value) -> StoreResult<()> {
                Err(StoreError::Unavailable("backend down".into()))
            }
        }

        let patient = patient_with_history(&["t1"]);
        let err = participation_history(&patient, &DownStore).expect_err("store is down");
        assert!(err.is_retryable());
    }
}
