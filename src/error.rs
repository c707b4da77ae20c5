//! Custom error types for the calorimetry core.
//!
//! This module defines `CalorError`, the single error type shared by the validator,
//! the state machine, the calculator, the persistence sink and the transport adapter.
//! Using the `thiserror` crate, each failure class of the acquisition pipeline gets a
//! variant with a readable message.
//!
//! ## Error Hierarchy
//!
//! - **`MalformedPayload`**: An inbound message failed validation. The message is
//!   dropped and logged; ingestion continues with the next one.
//! - **`InvalidTransition`**: A mode or lock command was issued in a state with no
//!   defined transition. Surfaced to the caller, state is left untouched.
//! - **`Indeterminate`**: The calculator could not produce heat values (masses are
//!   non-positive). The ingestion path records 0/0 for that reading.
//! - **`PersistenceUnavailable`**: The sink is missing (feature not compiled in) or a
//!   write failed. Logged, never rolls back the in-memory append.
//! - **`TransportDisconnected`**: The inbound message source went away. The core keeps
//!   its last known state.
//!
//! None of these are fatal; all of them degrade to "no state change" or
//! "best-effort record".

use crate::experiment::state::{Control, ExperimentPhase, LockState};
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, CalorError>;

/// Where a rejected command was issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOrigin {
    /// Rejected by the experiment phase axis.
    Phase(ExperimentPhase),
    /// Rejected by the lock axis.
    Lock(LockState),
}

impl std::fmt::Display for TransitionOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionOrigin::Phase(phase) => write!(f, "phase {phase}"),
            TransitionOrigin::Lock(lock) => write!(f, "lock state {lock}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CalorError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid transition: {command} is not allowed in {from}{}", reason_suffix(.reason))]
    InvalidTransition {
        from: TransitionOrigin,
        command: Control,
        reason: Option<&'static str>,
    },

    #[error("Heat values indeterminate: {0}")]
    Indeterminate(String),

    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("Transport disconnected: {0}")]
    TransportDisconnected(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Calorimeter actor is not running")]
    ActorUnavailable,
}

fn reason_suffix(reason: &Option<&'static str>) -> String {
    reason.map(|r| format!(" ({r})")).unwrap_or_default()
}

impl From<figment::Error> for CalorError {
    fn from(value: figment::Error) -> Self {
        CalorError::Config(Box::new(value))
    }
}

impl CalorError {
    /// Whether the pipeline keeps running after this error.
    ///
    /// Only configuration problems stop the process, and only at startup.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CalorError::Config(_) | CalorError::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_message_names_state_and_command() {
        let err = CalorError::InvalidTransition {
            from: TransitionOrigin::Lock(LockState::Unlocked),
            command: Control::Unlock,
            reason: None,
        };
        assert_eq!(
            err.to_string(),
            "Invalid transition: unlock is not allowed in lock state unlocked"
        );

        let err = CalorError::InvalidTransition {
            from: TransitionOrigin::Phase(ExperimentPhase::Mixing),
            command: Control::StopAndLock,
            reason: Some("no reading to capture"),
        };
        assert!(err.to_string().ends_with("(no reading to capture)"));
    }

    #[test]
    fn only_configuration_errors_are_fatal() {
        assert!(CalorError::MalformedPayload("x".into()).is_recoverable());
        assert!(CalorError::PersistenceUnavailable("x".into()).is_recoverable());
        assert!(!CalorError::Configuration("x".into()).is_recoverable());
    }
}
