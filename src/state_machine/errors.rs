use thiserror::Error;

/// Error types for lifecycle transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("Invalid state transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Exit status of '{name}' is already set to {exit_code}")]
    ExitStatusAlreadySet { name: String, exit_code: String },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
