//! Core runtime configuration.
//!
//! Configuration is resolved once by the host and passed into services,
//! rather than read from ambient process state during request handling.
//! There is deliberately little of it: the statuses the matching engine
//! treats as open for enrolment, and the default candidate-list size.

use curenet_records::TrialStatus;

/// Errors raised while constructing a [`CoreConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidInput(String),
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    recruitable_statuses: Vec<TrialStatus>,
    default_match_limit: usize,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Rejects an empty status set, a terminal status in the set (a
    /// completed or withdrawn trial is never a candidate), and a zero
    /// default limit.
    pub fn new(
        recruitable_statuses: Vec<TrialStatus>,
        default_match_limit: usize,
    ) -> Result<Self, ConfigError> {
        if recruitable_statuses.is_empty() {
            return Err(ConfigError::InvalidInput(
                "recruitable_statuses cannot be empty".into(),
            ));
        }
        if let Some(status) = recruitable_statuses.iter().find(|s| s.is_terminal()) {
            return Err(ConfigError::InvalidInput(format!(
                "terminal status `{}` cannot be recruitable",
                status.to_wire()
            )));
        }
        if default_match_limit == 0 {
            return Err(ConfigError::InvalidInput(
                "default_match_limit must be greater than zero".into(),
            ));
        }
        Ok(Self {
            recruitable_statuses,
            default_match_limit,
        })
    }

    /// Statuses treated as open for enrolment by the matching engine.
    pub fn recruitable_statuses(&self) -> &[TrialStatus] {
        &self.recruitable_statuses
    }

    /// Candidate-list size used when a caller does not pass its own.
    pub fn default_match_limit(&self) -> usize {
        self.default_match_limit
    }
}

impl Default for CoreConfig {
    /// Recruiting trials only, five candidates: the defaults the patient
    /// dashboard has always used.
    fn default() -> Self {
        Self {
            recruitable_statuses: vec![TrialStatus::Recruiting],
            default_match_limit: 5,
        }
    }
}
