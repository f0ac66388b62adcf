//! Authentication boundary.
//!
//! The auth collaborator yields an opaque authenticated identity; the core
//! uses it only to scope which health record is active. Identity is always
//! passed explicitly into services rather than read from a process-wide
//! session singleton, so tests can run several sessions side by side.

use curenet_records::HealthRecord;
use curenet_types::PatientId;

use crate::constants::PATIENTS_COLLECTION;
use crate::store::{DocumentStore, StoreResult};

/// The external authentication collaborator.
pub trait AuthProvider {
    /// The currently signed-in identity, if any.
    fn current_user(&self) -> Option<PatientId>;
}

/// Fixed-identity provider for tests and single-user embedding.
#[derive(Clone, Debug, Default)]
pub struct StaticAuth {
    identity: Option<PatientId>,
}

impl StaticAuth {
    /// A provider that always reports the given identity.
    pub fn signed_in(identity: PatientId) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    /// A provider with nobody signed in.
    pub fn signed_out() -> Self {
        Self { identity: None }
    }
}

impl AuthProvider for StaticAuth {
    fn current_user(&self) -> Option<PatientId> {
        self.identity.clone()
    }
}

/// Loads the health record of the currently signed-in patient.
///
/// Returns `Ok(None)` when nobody is signed in, when the patient has no
/// record yet (a fresh account), or when the stored record does not parse;
/// the last case is logged and treated as absent rather than failing the
/// whole session.
///
/// # Errors
///
/// Returns a `StoreError` only when the store itself fails.
pub fn active_health_record(
    auth: &dyn AuthProvider,
    store: &dyn DocumentStore,
) -> StoreResult<Option<HealthRecord>> {
    let Some(identity) = auth.current_user() else {
        return Ok(None);
    };

    let Some(document) = store.get(PATIENTS_COLLECTION, identity.as_str())? else {
        return Ok(None);
    };

    match HealthRecord::from_document(document) {
        Ok(record) => Ok(Some(record)),
        Err(err) => {
            tracing::warn!(patient = %identity, error = %err, "failed to parse stored health record");
            Ok(None)
        }
    }
}
