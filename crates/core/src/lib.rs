//! # Curenet Core
//!
//! Core business logic for the Curenet clinical-trials portal.
//!
//! This crate contains the behaviour shared by the patient and clinic
//! surfaces:
//! - Trial matching against a patient's health record
//! - The gated multi-step intake flows and the machine that runs them
//! - Submission of completed flows into the document store
//! - Participation-history resolution
//!
//! Persistence and authentication are collaborators behind the
//! [`store::DocumentStore`] and [`auth::AuthProvider`] traits; the record
//! schemas themselves live in `curenet-records`.
//!
//! **No UI concerns**: screens bind fields into a [`workflow::Workflow`]
//! and render the errors it returns; nothing here knows about rendering,
//! routing, or timers.

pub mod auth;
pub mod config;
pub mod constants;
pub mod flows;
pub mod gateway;
pub mod matching;
pub mod participation;
pub mod store;
pub mod workflow;

pub use auth::{active_health_record, AuthProvider, StaticAuth};
pub use config::{ConfigError, CoreConfig};
pub use flows::{adverse_event_flow, appointment_flow, document_flow, signup_flow};
pub use gateway::{RecordId, SubmissionError, SubmissionGateway, SubmissionKind, SubmissionResult};
pub use matching::{MatchError, MatchOutcome, MatchingEngine, StoreCatalog, TrialCatalog, TrialMatch};
pub use participation::{participation_history, ParticipationView};
pub use store::{DocumentStore, Filter, MemoryStore, StoreError, StoreResult};
pub use workflow::{FlowSpec, StepDef, Workflow, WorkflowError, WorkflowResult};
