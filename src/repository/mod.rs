//! # Job Repository
//!
//! Store of job instances, job executions and step executions. The launcher
//! writes through it at every status change and after every committed chunk,
//! and reads it back to decide whether a launch is new, a restart, already
//! running or already complete.

pub mod in_memory;
pub mod serializer;

pub use in_memory::InMemoryJobRepository;
pub use serializer::{ExecutionContextSerializer, JsonExecutionContextSerializer};

use crate::error::RepositoryError;
use crate::models::{JobExecution, JobInstance, JobParameters, StepExecution};
use async_trait::async_trait;
use uuid::Uuid;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Instance of `job_name` whose identifying parameters match `parameters`
    async fn find_job_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> RepositoryResult<Option<JobInstance>>;

    /// Create a new instance. Fails if a matching instance already exists.
    async fn create_job_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> RepositoryResult<JobInstance>;

    /// Most recently created instance of `job_name`
    async fn last_job_instance(&self, job_name: &str) -> RepositoryResult<Option<JobInstance>>;

    /// Insert or update a job execution, without its step executions
    async fn save_job_execution(&self, execution: &JobExecution) -> RepositoryResult<()>;

    /// A job execution with its step executions attached
    async fn get_job_execution(&self, execution_id: Uuid) -> RepositoryResult<JobExecution>;

    /// Executions of an instance in creation order
    async fn job_executions(&self, instance_id: Uuid) -> RepositoryResult<Vec<JobExecution>>;

    async fn last_job_execution(&self, instance_id: Uuid) -> RepositoryResult<Option<JobExecution>> {
        Ok(self.job_executions(instance_id).await?.pop())
    }

    /// Insert or update a step execution
    async fn save_step_execution(&self, execution: &StepExecution) -> RepositoryResult<()>;

    /// Latest execution of a step across every execution of an instance
    async fn last_step_execution(
        &self,
        instance_id: Uuid,
        step_name: &str,
    ) -> RepositoryResult<Option<StepExecution>>;
}
