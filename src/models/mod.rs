//! # Execution Models
//!
//! Data carried through a job run: parameters, the instance they identify,
//! execution records for the job and its steps, their execution contexts and
//! exit statuses.

pub mod execution_context;
pub mod exit_status;
pub mod job_execution;
pub mod job_instance;
pub mod job_parameters;
pub mod step_execution;

pub use execution_context::ExecutionContext;
pub use exit_status::ExitStatus;
pub use job_execution::JobExecution;
pub use job_instance::JobInstance;
pub use job_parameters::{JobParameter, JobParameters, JobParametersBuilder, ParameterValue};
pub use step_execution::{StepContribution, StepExecution};
