//! Reusable multi-step form controller.
//!
//! Every gated intake flow in the portal (appointment booking, document
//! upload, adverse-event reporting, signup) is the same machine: a linear
//! sequence of named steps, a per-step validator gating forward movement,
//! free backward movement, and a single submission of the accumulated data
//! at the final step. This module implements that machine once; the
//! concrete flows in [`crate::flows`] only supply step definitions.
//!
//! Each session owns its own `Workflow`; abandoning one discards the
//! accumulated data with no persistence side effect. Nothing is committed
//! until `submit` succeeds.

use serde_json::Value;

use crate::gateway::{RecordId, SubmissionError, SubmissionGateway, SubmissionKind};

/// The accumulated field→value mapping a flow gathers across its steps.
pub type StepData = serde_json::Map<String, Value>;

/// Per-step validation: `Ok` to let the user move on, or the list of
/// reasons blocking them.
pub type StepValidator = fn(&StepData) -> Result<(), Vec<String>>;

/// One named, gated step of a flow.
pub struct StepDef {
    pub name: &'static str,
    pub validate: StepValidator,
}

/// A complete flow definition: what it submits as, and its step sequence.
pub struct FlowSpec {
    pub name: &'static str,
    pub kind: SubmissionKind,
    pub steps: Vec<StepDef>,
}

/// Errors surfaced by a workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The active step's validator rejected the current data. Local and
    /// recoverable: the user corrects the fields and tries again.
    #[error("step {step} (`{name}`) rejected input: {}", reasons.join("; "))]
    ValidationFailed {
        step: usize,
        name: &'static str,
        reasons: Vec<String>,
    },
    /// `submit` was called before the final step.
    #[error("cannot submit at step {current} of {total}")]
    NotAtFinalStep { current: usize, total: usize },
    /// `submit` was called again after a successful submission. Nothing
    /// is forwarded twice.
    #[error("flow already submitted; reset it to start another")]
    AlreadySubmitted,
    /// The submission gateway refused or failed; the machine stays at the
    /// final step so the user can correct or retry.
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// Type alias for Results that can fail with a [`WorkflowError`].
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// A linear, gated, multi-step form flow.
pub struct Workflow {
    spec: FlowSpec,
    current_step: usize,
    step_data: StepData,
    submitted: bool,
}

impl Workflow {
    /// Starts a flow at its first step with no accumulated data.
    ///
    /// # Panics
    ///
    /// Panics if the spec has no steps; a zero-step flow is a programming
    /// error in the flow definition, not a runtime condition.
    pub fn new(spec: FlowSpec) -> Self {
        assert!(!spec.steps.is_empty(), "a flow needs at least one step");
        Self {
            spec,
            current_step: 1,
            step_data: StepData::new(),
            submitted: false,
        }
    }

    /// The active step, 1-based.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Total number of steps in this flow.
    pub fn step_count(&self) -> usize {
        self.spec.steps.len()
    }

    /// Name of the active step.
    pub fn step_name(&self) -> &'static str {
        self.spec.steps[self.current_step - 1].name
    }

    /// Whether the flow has been submitted.
    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// The accumulated data so far.
    pub fn data(&self) -> &StepData {
        &self.step_data
    }

    /// Records a field value bound from the active screen.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.step_data.insert(field.into(), value);
    }

    /// Clears a field.
    pub fn remove(&mut self, field: &str) {
        self.step_data.remove(field);
    }

    /// Moves forward one step if the active step's validator accepts the
    /// current data. Already at the last step, a valid `advance` stays
    /// there.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` with the blocking reasons; the step and
    /// the data are left untouched, however often this is retried.
    pub fn advance(&mut self) -> WorkflowResult<usize> {
        self.check_step(self.current_step)?;
        self.current_step = (self.current_step + 1).min(self.step_count());
        Ok(self.current_step)
    }

    /// Moves back one step, clamped at the first. Going back never
    /// validates and never loses data.
    pub fn retreat(&mut self) -> usize {
        self.current_step = self.current_step.saturating_sub(1).max(1);
        self.current_step
    }

    /// Submits the accumulated data as one record through the gateway.
    ///
    /// Valid only at the final step and only once. Every step is
    /// re-validated first, so a field hollowed out after an earlier
    /// `advance` is still caught here. On gateway failure the machine
    /// stays at the final step with `submitted` unset, so the user can
    /// retry without losing anything.
    ///
    /// # Errors
    ///
    /// `NotAtFinalStep`, `AlreadySubmitted`, `ValidationFailed`, or a
    /// wrapped `SubmissionError`.
    pub fn submit(&mut self, gateway: &SubmissionGateway) -> WorkflowResult<RecordId> {
        if self.submitted {
            return Err(WorkflowError::AlreadySubmitted);
        }
        if self.current_step != self.step_count() {
            return Err(WorkflowError::NotAtFinalStep {
                current: self.current_step,
                total: self.step_count(),
            });
        }
        for step in 1..=self.step_count() {
            self.check_step(step)?;
        }

        let record_id = gateway.submit(self.spec.kind, Value::Object(self.step_data.clone()))?;
        self.submitted = true;
        tracing::info!(flow = self.spec.name, record = %record_id, "flow submitted");
        Ok(record_id)
    }

    /// Returns the machine to its initial state: first step, empty data,
    /// unsubmitted. Hosts call this after showing their success state.
    pub fn reset(&mut self) {
        self.current_step = 1;
        self.step_data.clear();
        self.submitted = false;
    }

    fn check_step(&self, step: usize) -> WorkflowResult<()> {
        let def = &self.spec.steps[step - 1];
        (def.validate)(&self.step_data).map_err(|reasons| WorkflowError::ValidationFailed {
            step,
            name: def.name,
            reasons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn requires_first(data: &StepData) -> Result<(), Vec<String>> {
        match data.get("first").and_then(Value::as_str) {
            Some(s) if !s.is_empty() => Ok(()),
            _ => Err(vec!["`first` is required".into()]),
        }
    }

    fn requires_second(data: &StepData) -> Result<(), Vec<String>> {
        match data.get("second").and_then(Value::as_str) {
            Some(s) if !s.is_empty() => Ok(()),
            _ => Err(vec!["`second` is required".into()]),
        }
    }

    /// Two-step flow used only by these tests. Submits as a document so
    /// the gateway's lightest shape check applies.
    fn two_step_flow() -> Workflow {
        Workflow::new(FlowSpec {
            name: "test-flow",
            kind: SubmissionKind::Document,
            steps: vec![
                StepDef {
                    name: "one",
                    validate: requires_first,
                },
                StepDef {
                    name: "two",
                    validate: requires_second,
                },
            ],
        })
    }

    fn gateway() -> SubmissionGateway {
        SubmissionGateway::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn starts_at_step_one_with_empty_data() {
        let flow = two_step_flow();
        assert_eq!(flow.current_step(), 1);
        assert_eq!(flow.step_name(), "one");
        assert!(flow.data().is_empty());
        assert!(!flow.is_submitted());
    }

    #[test]
    fn advance_is_gated_by_the_active_validator() {
        let mut flow = two_step_flow();
        let err = flow.advance().expect_err("nothing entered yet");
        assert!(matches!(
            err,
            WorkflowError::ValidationFailed { step: 1, name: "one", .. }
        ));

        flow.insert("first", json!("value"));
        assert_eq!(flow.advance().expect("should advance"), 2);
    }

    #[test]
    fn repeated_invalid_advance_never_progresses() {
        let mut flow = two_step_flow();
        for _ in 0..5 {
            flow.advance().expect_err("still invalid");
            assert_eq!(flow.current_step(), 1);
        }
        assert!(flow.data().is_empty());
    }

    #[test]
    fn retreat_then_advance_round_trips_without_data_loss() {
        let mut flow = two_step_flow();
        flow.insert("first", json!("value"));
        flow.advance().expect("should advance");
        assert_eq!(flow.current_step(), 2);

        assert_eq!(flow.retreat(), 1);
        assert_eq!(flow.data().get("first"), Some(&json!("value")));
        assert_eq!(flow.advance().expect("same data still valid"), 2);
    }

    #[test]
    fn retreat_clamps_at_the_first_step() {
        let mut flow = two_step_flow();
        assert_eq!(flow.retreat(), 1);
        assert_eq!(flow.retreat(), 1);
    }

    #[test]
    fn submit_below_the_final_step_is_rejected_unconditionally() {
        let mut flow = two_step_flow();
        flow.insert("first", json!("value"));
        flow.insert("second", json!("value"));
        let err = flow.submit(&gateway()).expect_err("still at step 1");
        assert!(matches!(
            err,
            WorkflowError::NotAtFinalStep { current: 1, total: 2 }
        ));
    }

    #[test]
    fn submit_revalidates_every_step() {
        let mut flow = two_step_flow();
        flow.insert("first", json!("value"));
        flow.advance().expect("should advance");
        // Hollow out the step-1 field after passing its gate.
        flow.insert("first", json!(""));
        flow.insert("second", json!("value"));
        let err = flow.submit(&gateway()).expect_err("step 1 no longer valid");
        assert!(matches!(err, WorkflowError::ValidationFailed { step: 1, .. }));
        assert!(!flow.is_submitted());
    }

    #[test]
    fn successful_submit_marks_the_flow_and_blocks_duplicates() {
        let store = Arc::new(MemoryStore::new());
        let gateway = SubmissionGateway::new(store.clone());
        let mut flow = two_step_flow();
        flow.insert("first", json!("value"));
        flow.insert("second", json!("value"));
        flow.insert("document_name", json!("consent form"));
        flow.insert("file_ref", json!("blob-1"));
        flow.advance().expect("should advance");

        flow.submit(&gateway).expect("should submit");
        assert!(flow.is_submitted());
        assert_eq!(store.len("documents"), 1);

        let err = flow.submit(&gateway).expect_err("already submitted");
        assert!(matches!(err, WorkflowError::AlreadySubmitted));
        assert_eq!(store.len("documents"), 1);
    }

    #[test]
    fn reset_returns_to_the_initial_state() {
        let mut flow = two_step_flow();
        flow.insert("first", json!("value"));
        flow.advance().expect("should advance");
        flow.reset();
        assert_eq!(flow.current_step(), 1);
        assert!(flow.data().is_empty());
        assert!(!flow.is_submitted());
    }

    #[test]
    fn advance_at_the_final_step_stays_there() {
        let mut flow = two_step_flow();
        flow.insert("first", json!("value"));
        flow.insert("second", json!("value"));
        flow.advance().expect("to step 2");
        assert_eq!(flow.advance().expect("valid, clamps"), 2);
    }
}
