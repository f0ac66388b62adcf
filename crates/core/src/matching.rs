//! Patient-trial matching engine.
//!
//! Responsibilities:
//! - Derive the patient's disease-name set from their diagnoses
//! - Query the trial catalog collaborator for open trials whose condition
//!   tags intersect that set ("any match" semantics)
//! - Score each candidate as an overlap percentage and order the result
//!
//! The engine is a pure read: it never mutates the patient, the catalog,
//! or any session state, and it never returns a partial result when the
//! catalog fails.

use std::collections::BTreeSet;
use std::sync::Arc;

use curenet_records::{HealthRecord, TrialRecord, TrialStatus};
use serde::Serialize;

use crate::config::CoreConfig;
use crate::constants::TRIALS_COLLECTION;
use crate::store::{DocumentStore, Filter, StoreError, StoreResult};

/// Errors surfaced by the matching engine.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// The caller asked for zero candidates.
    #[error("match limit must be greater than zero")]
    InvalidLimit,
    /// The catalog collaborator failed; no partial result is returned.
    #[error("trial catalog query failed: {0}")]
    QueryFailed(#[from] StoreError),
}

/// Type alias for Results that can fail with a [`MatchError`].
pub type MatchOutcome<T> = Result<T, MatchError>;

/// One candidate trial with its overlap score. Serialisable as-is for the
/// dashboard's candidate list.
#[derive(Clone, Debug, Serialize)]
pub struct TrialMatch {
    pub trial: TrialRecord,
    /// Overlap percentage in 0..=100; see [`MatchingEngine`] for the rule.
    pub score: u8,
}

/// The queryable trial catalog collaborator.
///
/// Implementations return trials whose status is one of `statuses` and
/// whose condition tags intersect `conditions`, up to `limit` of them.
/// How a backend arranges that (pre-filtering, indexing) is its business;
/// the engine re-checks the intersection it relies on.
pub trait TrialCatalog {
    fn open_trials_matching(
        &self,
        statuses: &[TrialStatus],
        conditions: &BTreeSet<String>,
        limit: usize,
    ) -> StoreResult<Vec<TrialRecord>>;
}

/// Adapts any [`DocumentStore`] to the [`TrialCatalog`] contract.
///
/// Per recruitable status, the store is asked for trials whose
/// `matching_criteria` contains any of the conditions (the backend's
/// array-contains-any predicate), plus one equality query per condition
/// on `disease_targeted`, each capped at `limit`. The store predicate is
/// a pre-filter only: results are deduplicated and the case-folded tag
/// intersection is re-checked in-process, so an over-eager backend never
/// produces a false match. Documents that do not parse as trials are
/// logged and skipped rather than failing the whole query.
pub struct StoreCatalog {
    store: Arc<dyn DocumentStore>,
}

impl StoreCatalog {
    /// Creates a catalog over the given store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

impl TrialCatalog for StoreCatalog {
    fn open_trials_matching(
        &self,
        statuses: &[TrialStatus],
        conditions: &BTreeSet<String>,
        limit: usize,
    ) -> StoreResult<Vec<TrialRecord>> {
        let wanted = fold_set(conditions);
        let condition_values: Vec<String> = conditions.iter().cloned().collect();
        let mut found = Vec::new();
        let mut seen = BTreeSet::new();

        for status in statuses {
            let status_filter = Filter::Eq("status".into(), status.to_wire().into());
            let mut queries = vec![vec![
                status_filter.clone(),
                Filter::ArrayContainsAny("matching_criteria".into(), condition_values.clone()),
            ]];
            // A trial may carry the condition only as its targeted disease.
            for condition in conditions {
                queries.push(vec![
                    status_filter.clone(),
                    Filter::Eq("disease_targeted".into(), condition.as_str().into()),
                ]);
            }

            for filters in &queries {
                for document in self.store.query(TRIALS_COLLECTION, filters, limit)? {
                    let trial = match TrialRecord::from_document(document) {
                        Ok(trial) => trial,
                        Err(err) => {
                            tracing::warn!(error = %err, "skipping unparseable trial document");
                            continue;
                        }
                    };
                    let key = trial
                        .trial_id
                        .as_ref()
                        .map(|id| id.as_str().to_owned())
                        .unwrap_or_else(|| trial.nctid.clone());
                    if !seen.insert(key) {
                        continue;
                    }
                    let tags = fold_set(&trial.condition_tags());
                    if tags.intersection(&wanted).next().is_some() {
                        found.push(trial);
                        if limit > 0 && found.len() == limit {
                            return Ok(found);
                        }
                    }
                }
            }
        }

        Ok(found)
    }
}

/// Computes ranked candidate trials for a patient.
#[derive(Clone, Debug)]
pub struct MatchingEngine {
    recruitable: Vec<TrialStatus>,
}

impl MatchingEngine {
    /// Creates an engine using the host-resolved configuration.
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            recruitable: config.recruitable_statuses().to_vec(),
        }
    }

    /// Finds up to `limit` candidate trials for `patient`, best first.
    ///
    /// The patient's disease names are collected as a set (duplicates
    /// count once); an empty set yields an empty result without touching
    /// the catalog, since no condition-based match can be asserted. Each
    /// candidate's score is `round(100 * |tags ∩ diseases| / |tags|)`
    /// where tags are the trial's condition tags. Ordering is score
    /// descending, then trial `start_date` descending (the most recently
    /// opened trial ranks first), then trial id for determinism.
    ///
    /// # Errors
    ///
    /// Returns `MatchError::InvalidLimit` for `limit == 0` and
    /// `MatchError::QueryFailed` when the catalog collaborator fails.
    pub fn find_candidate_trials(
        &self,
        patient: &HealthRecord,
        catalog: &dyn TrialCatalog,
        limit: usize,
    ) -> MatchOutcome<Vec<TrialMatch>> {
        if limit == 0 {
            return Err(MatchError::InvalidLimit);
        }

        let diseases = patient.disease_names();
        if diseases.is_empty() {
            return Ok(Vec::new());
        }
        let wanted = fold_set(&diseases);

        let trials = catalog.open_trials_matching(&self.recruitable, &diseases, limit)?;

        let mut matches: Vec<TrialMatch> = trials
            .into_iter()
            .filter_map(|trial| {
                let tags = fold_set(&trial.condition_tags());
                if tags.is_empty() {
                    return None;
                }
                let overlap = tags.intersection(&wanted).count();
                if overlap == 0 {
                    return None;
                }
                let score = ((overlap as f64 / tags.len() as f64) * 100.0).round() as u8;
                tracing::debug!(
                    trial = trial.trial_id.as_ref().map(|id| id.as_str()).unwrap_or(&trial.nctid),
                    overlap,
                    score,
                    "scored candidate trial"
                );
                Some(TrialMatch { trial, score })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(b.trial.start_date.cmp(&a.trial.start_date))
                .then_with(|| id_key(&a.trial).cmp(&id_key(&b.trial)))
        });
        matches.truncate(limit);

        Ok(matches)
    }
}

fn id_key(trial: &TrialRecord) -> &str {
    trial
        .trial_id
        .as_ref()
        .map(|id| id.as_str())
        .unwrap_or(&trial.nctid)
}

/// ASCII-case-folds a tag set for comparison. Tag text is free-form and
/// entered by different parties; `Asthma` and `asthma` must meet.
fn fold_set(set: &BTreeSet<String>) -> BTreeSet<String> {
    set.iter().map(|s| s.to_ascii_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn patient_with(diseases: &[&str]) -> HealthRecord {
        let diagnoses: Vec<_> = diseases
            .iter()
            .map(|d| json!({"disease": d, "active": true, "severity": "mild"}))
            .collect();
        HealthRecord::from_document(json!({
            "id": "uid-1",
            "name": "Ashley",
            "age": 34,
            "gender": "female",
            "diagnoses": diagnoses
        }))
        .expect("valid patient")
    }

    fn trial_document(
        id: &str,
        status: &str,
        start_date: &str,
        tags: &[&str],
    ) -> serde_json::Value {
        json!({
            "NCTID": format!("NCT-{id}"),
            "trial_id": id,
            "phase": "Phase II",
            "title": format!("Trial {id}"),
            "brief_summary": "s",
            "drug": "d",
            "description": "d",
            "disease_targeted": "",
            "enrollment_capacity": 10,
            "sponsor": "s",
            "locations": [{
                "location_id": "L1", "address": "a", "city": "c",
                "state": "st", "country": "co"
            }],
            "start_date": start_date,
            "end_date": "2030-01-01T00:00:00Z",
            "status": status,
            "contact_info": {"phone": "p", "email": "e", "website": "w"},
            "matching_criteria": tags
        })
    }

    fn seeded_catalog(trials: &[serde_json::Value]) -> StoreCatalog {
        let store = Arc::new(MemoryStore::new());
        for trial in trials {
            let id = trial["trial_id"].as_str().expect("id");
            store
                .set(TRIALS_COLLECTION, id, trial.clone())
                .expect("should store");
        }
        StoreCatalog::new(store)
    }

    fn engine() -> MatchingEngine {
        MatchingEngine::new(&CoreConfig::default())
    }

    struct FailingCatalog;

    impl TrialCatalog for FailingCatalog {
        fn open_trials_matching(
            &self,
            _statuses: &[TrialStatus],
            _conditions: &BTreeSet<String>,
            _limit: usize,
        ) -> StoreResult<Vec<TrialRecord>> {
            Err(StoreError::Unavailable("catalog offline".into()))
        }
    }

    #[test]
    fn scenario_a_returns_only_the_intersecting_recruiting_trial() {
        let catalog = seeded_catalog(&[
            trial_document("X", "recruiting", "2024-01-01T00:00:00Z", &["Asthma", "COPD"]),
            trial_document("Y", "recruiting", "2024-01-01T00:00:00Z", &["Diabetes"]),
        ]);
        let matches = engine()
            .find_candidate_trials(&patient_with(&["Asthma"]), &catalog, 5)
            .expect("should match");
        assert_eq!(matches.len(), 1);
        assert_eq!(id_key(&matches[0].trial), "X");
        assert_eq!(matches[0].score, 50);
    }

    #[test]
    fn empty_diagnoses_yield_empty_result() {
        let catalog = seeded_catalog(&[trial_document(
            "X",
            "recruiting",
            "2024-01-01T00:00:00Z",
            &["Asthma"],
        )]);
        let matches = engine()
            .find_candidate_trials(&patient_with(&[]), &catalog, 5)
            .expect("should succeed");
        assert!(matches.is_empty());
    }

    #[test]
    fn non_recruiting_trials_are_never_candidates() {
        let catalog = seeded_catalog(&[
            trial_document("X", "completed", "2024-01-01T00:00:00Z", &["Asthma"]),
            trial_document("Z", "suspended", "2024-01-01T00:00:00Z", &["Asthma"]),
        ]);
        let matches = engine()
            .find_candidate_trials(&patient_with(&["Asthma"]), &catalog, 5)
            .expect("should succeed");
        assert!(matches.is_empty());
    }

    #[test]
    fn result_never_exceeds_limit() {
        let trials: Vec<_> = (0..8)
            .map(|i| {
                trial_document(
                    &format!("t{i}"),
                    "recruiting",
                    "2024-01-01T00:00:00Z",
                    &["Asthma"],
                )
            })
            .collect();
        let catalog = seeded_catalog(&trials);
        let matches = engine()
            .find_candidate_trials(&patient_with(&["Asthma"]), &catalog, 3)
            .expect("should succeed");
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let catalog = seeded_catalog(&[]);
        let err = engine()
            .find_candidate_trials(&patient_with(&["Asthma"]), &catalog, 0)
            .expect_err("should reject");
        assert!(matches!(err, MatchError::InvalidLimit));
    }

    #[test]
    fn duplicate_diagnoses_count_once_in_scoring() {
        let catalog = seeded_catalog(&[trial_document(
            "X",
            "recruiting",
            "2024-01-01T00:00:00Z",
            &["Asthma", "COPD"],
        )]);
        let matches = engine()
            .find_candidate_trials(&patient_with(&["Asthma", "asthma", "ASTHMA"]), &catalog, 5)
            .expect("should match");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].score, 50);
    }

    #[test]
    fn stronger_overlap_ranks_first_then_newest_start_date() {
        let catalog = seeded_catalog(&[
            // Full overlap, older.
            trial_document("full", "recruiting", "2023-01-01T00:00:00Z", &["Asthma"]),
            // Half overlap, newer.
            trial_document(
                "half",
                "recruiting",
                "2025-01-01T00:00:00Z",
                &["Asthma", "COPD"],
            ),
            // Same half overlap, older: loses the tie on start_date.
            trial_document(
                "half-old",
                "recruiting",
                "2022-01-01T00:00:00Z",
                &["Asthma", "Bronchitis"],
            ),
        ]);
        let matches = engine()
            .find_candidate_trials(&patient_with(&["Asthma"]), &catalog, 5)
            .expect("should match");
        let order: Vec<_> = matches.iter().map(|m| id_key(&m.trial)).collect();
        assert_eq!(order, vec!["full", "half", "half-old"]);
        assert_eq!(matches[0].score, 100);
        assert_eq!(
            matches[1].trial.start_date,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
    }

    /// Store double that records every query it is asked to run.
    struct RecordingStore {
        inner: MemoryStore,
        queries: std::sync::Mutex<Vec<(Vec<Filter>, usize)>>,
    }

    impl RecordingStore {
        fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                queries: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    impl crate::store::DocumentStore for RecordingStore {
        fn get(&self, collection: &str, id: &str) -> StoreResult<Option<serde_json::Value>> {
            self.inner.get(collection, id)
        }
        fn query(
            &self,
            collection: &str,
            filters: &[Filter],
            limit: usize,
        ) -> StoreResult<Vec<serde_json::Value>> {
            self.queries
                .lock()
                .unwrap()
                .push((filters.to_vec(), limit));
            self.inner.query(collection, filters, limit)
        }
        fn set(&self, collection: &str, id: &str, document: serde_json::Value) -> StoreResult<()> {
            self.inner.set(collection, id, document)
        }
        fn update(&self, collection: &str, id: &str, partial: serde_json::Value) -> StoreResult<()> {
            self.inner.update(collection, id, partial)
        }
    }

    #[test]
    fn catalog_prefilters_with_array_contains_any_and_limit() {
        let inner = MemoryStore::new();
        let doc = trial_document("X", "recruiting", "2024-01-01T00:00:00Z", &["Asthma"]);
        inner
            .set(TRIALS_COLLECTION, "X", doc)
            .expect("should store");
        let store = Arc::new(RecordingStore::new(inner));
        let catalog = StoreCatalog::new(store.clone());

        let conditions: BTreeSet<String> = ["Asthma".to_owned()].into();
        let trials = catalog
            .open_trials_matching(&[TrialStatus::Recruiting], &conditions, 3)
            .expect("should query");
        assert_eq!(trials.len(), 1);

        let queries = store.queries.lock().unwrap();
        assert!(queries.iter().all(|(_, limit)| *limit == 3));
        assert!(queries.iter().any(|(filters, _)| {
            filters.iter().any(|f| matches!(
                f,
                Filter::ArrayContainsAny(field, values)
                    if field == "matching_criteria" && values.contains(&"Asthma".to_owned())
            ))
        }));
        assert!(queries.iter().any(|(filters, _)| {
            filters
                .iter()
                .any(|f| matches!(f, Filter::Eq(field, _) if field == "disease_targeted"))
        }));
    }

    #[test]
    fn catalog_failure_surfaces_and_returns_nothing() {
        let err = engine()
            .find_candidate_trials(&patient_with(&["Asthma"]), &FailingCatalog, 5)
            .expect_err("should fail");
        assert!(matches!(err, MatchError::QueryFailed(_)));
    }

    #[test]
    fn targeted_disease_counts_as_a_condition_tag() {
        let mut doc = trial_document("X", "recruiting", "2024-01-01T00:00:00Z", &[]);
        doc["disease_targeted"] = json!("Asthma");
        let catalog = seeded_catalog(&[doc]);
        let matches = engine()
            .find_candidate_trials(&patient_with(&["Asthma"]), &catalog, 5)
            .expect("should match");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].score, 100);
    }
}
