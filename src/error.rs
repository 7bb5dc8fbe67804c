//! Error types for the batch engine.
//!
//! Step faults never escape a step: they are caught at the step boundary and
//! recorded on the [`StepExecution`](crate::models::StepExecution). The errors
//! that do reach a launch caller are the ones raised before any step runs:
//! parameter validation, job configuration and launch preconditions.

use crate::state_machine::StateMachineError;
use thiserror::Error;

/// Parameters rejected by a [`JobParametersValidator`](crate::job::JobParametersValidator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The JobParameters do not contain required keys: {missing:?}")]
    MissingRequiredKeys { missing: Vec<String> },

    #[error("The JobParameters contains keys that are not explicitly optional or required: {unknown:?}")]
    UnrecognizedKeys { unknown: Vec<String> },

    #[error("Invalid job parameter '{key}': {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error("Invalid job parameters: {0}")]
    Invalid(String),
}

/// Problems in a job or step definition, detected before anything executes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Job '{job}' has no steps")]
    EmptyJob { job: String },

    #[error("Job '{job}' declares step '{step}' more than once")]
    DuplicateStep { job: String, step: String },

    #[error("Job '{job}' has a transition from '{from}' on '{pattern}' to unknown step '{target}'")]
    UnknownTransitionTarget {
        job: String,
        from: String,
        pattern: String,
        target: String,
    },

    #[error("Job '{job}' has a transition from unknown step '{from}'")]
    UnknownTransitionSource { job: String, from: String },

    #[error("Step '{step}' is missing a required component: {component}")]
    MissingComponent { step: String, component: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A completion policy misbehaved. The chunk step converts this into a step failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Completion policy '{policy}' failed: {reason}")]
    Failed { policy: String, reason: String },

    #[error("Completion policy used before start()")]
    NotStarted,
}

/// A fault raised by a tasklet, reader, processor or writer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("Tasklet failed: {0}")]
    Tasklet(String),

    #[error("Item read failed: {0}")]
    Read(String),

    #[error("Item processing failed: {0}")]
    Process(String),

    #[error("Chunk write failed: {0}")]
    Write(String),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("Skip limit of {limit} exceeded")]
    SkipLimitExceeded { limit: usize },

    #[error("Execution context error: {0}")]
    Context(String),

    #[error("Promotion of key '{key}' failed: not present in the step context")]
    MissingPromotionKey { key: String },

    #[error("Step panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    StateMachine(#[from] StateMachineError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl StepError {
    pub fn tasklet(message: impl Into<String>) -> Self {
        Self::Tasklet(message.into())
    }

    pub fn read(message: impl Into<String>) -> Self {
        Self::Read(message.into())
    }

    pub fn process(message: impl Into<String>) -> Self {
        Self::Process(message.into())
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::Write(message.into())
    }

    /// Whether a skip policy may consider this fault at all. Write faults are
    /// never skippable because the chunk is the unit of atomicity.
    pub fn is_item_fault(&self) -> bool {
        matches!(self, Self::Read(_) | Self::Process(_))
    }
}

/// Failures of the execution-record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Job instance {0} not found")]
    InstanceNotFound(uuid::Uuid),

    #[error("Job execution {0} not found")]
    ExecutionNotFound(uuid::Uuid),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(error: serde_json::Error) -> Self {
        RepositoryError::Serialization(error.to_string())
    }
}

/// Errors surfaced to whoever launches a job.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Invalid parameters for job '{job_name}': {source}")]
    InvalidParameters {
        job_name: String,
        #[source]
        source: ValidationError,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("No job registered under the name '{0}'")]
    NoSuchJob(String),

    #[error("A job instance already exists and is complete for job '{job_name}' with parameters {parameters}")]
    InstanceAlreadyComplete {
        job_name: String,
        parameters: String,
    },

    #[error("A job execution for job '{job_name}' is already running: {execution_id}")]
    ExecutionAlreadyRunning {
        job_name: String,
        execution_id: uuid::Uuid,
    },

    #[error("Job '{job_name}' is not restartable")]
    NotRestartable { job_name: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    StateMachine(#[from] StateMachineError),

    #[error("Job execution task failed: {0}")]
    Join(String),
}

pub type BatchResult<T> = std::result::Result<T, BatchError>;
pub type StepResult<T> = std::result::Result<T, StepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_message_lists_keys() {
        let error = ValidationError::MissingRequiredKeys {
            missing: vec!["name".to_string()],
        };
        assert!(error.to_string().contains("name"));
    }

    #[test]
    fn test_item_faults_are_distinguished_from_write_faults() {
        assert!(StepError::read("boom").is_item_fault());
        assert!(StepError::process("boom").is_item_fault());
        assert!(!StepError::write("boom").is_item_fault());
        assert!(!StepError::tasklet("boom").is_item_fault());
    }

    #[test]
    fn test_policy_error_converts_into_step_error() {
        let step_error: StepError = PolicyError::NotStarted.into();
        assert!(matches!(step_error, StepError::Policy(PolicyError::NotStarted)));
    }
}
