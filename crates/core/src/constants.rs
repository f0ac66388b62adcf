//! Store collection names.
//!
//! These are shared with the screens outside this core that read the same
//! documents directly; renaming one is a data migration, not a refactor.

/// One health record per authenticated patient, keyed by the auth identity.
pub const PATIENTS_COLLECTION: &str = "patients";

/// The trial catalog. Documents are keyed by their generated `trial_id`.
pub const TRIALS_COLLECTION: &str = "trials";

/// Booked appointment requests.
pub const APPOINTMENTS_COLLECTION: &str = "appointments";

/// Adverse-event reports filed by participating patients.
pub const REPORTS_COLLECTION: &str = "reports";

/// Uploaded document metadata.
pub const DOCUMENTS_COLLECTION: &str = "documents";
