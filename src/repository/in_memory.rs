//! In-memory [`JobRepository`].
//!
//! Execution contexts are stored encoded through an
//! [`ExecutionContextSerializer`], so everything read back is a detached copy
//! and a serializer that cannot round-trip a context is caught here rather
//! than in a durable store.

use super::{ExecutionContextSerializer, JobRepository, JsonExecutionContextSerializer, RepositoryResult};
use crate::error::RepositoryError;
use crate::models::{ExecutionContext, JobExecution, JobInstance, JobParameters, StepExecution};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

struct Stored<T> {
    record: T,
    context: Vec<u8>,
    sequence: u64,
}

pub struct InMemoryJobRepository {
    instances: RwLock<Vec<JobInstance>>,
    job_executions: DashMap<Uuid, Stored<JobExecution>>,
    step_executions: DashMap<Uuid, Stored<StepExecution>>,
    sequence: AtomicU64,
    serializer: Arc<dyn ExecutionContextSerializer>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::with_serializer(Arc::new(JsonExecutionContextSerializer::new()))
    }

    pub fn with_serializer(serializer: Arc<dyn ExecutionContextSerializer>) -> Self {
        Self {
            instances: RwLock::new(Vec::new()),
            job_executions: DashMap::new(),
            step_executions: DashMap::new(),
            sequence: AtomicU64::new(0),
            serializer,
        }
    }

    pub fn instance_count(&self) -> usize {
        self.instances.read().len()
    }

    pub fn job_execution_count(&self) -> usize {
        self.job_executions.len()
    }

    /// Stored copy of a step execution, for inspection
    pub fn step_execution(&self, id: Uuid) -> Option<StepExecution> {
        let stored = self.step_executions.get(&id)?;
        self.restore_step(&stored).ok()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    fn restore_context(&self, bytes: &[u8]) -> RepositoryResult<ExecutionContext> {
        self.serializer.deserialize(bytes)
    }

    fn restore_step(&self, stored: &Stored<StepExecution>) -> RepositoryResult<StepExecution> {
        let mut step = stored.record.clone();
        step.execution_context = self.restore_context(&stored.context)?;
        Ok(step)
    }

    fn steps_of(&self, job_execution_id: Uuid) -> RepositoryResult<Vec<StepExecution>> {
        let mut steps: Vec<(u64, StepExecution)> = self
            .step_executions
            .iter()
            .filter(|entry| entry.record.job_execution_id == job_execution_id)
            .map(|entry| Ok((entry.sequence, self.restore_step(entry.value())?)))
            .collect::<RepositoryResult<_>>()?;
        steps.sort_by_key(|(sequence, _)| *sequence);
        Ok(steps.into_iter().map(|(_, step)| step).collect())
    }

    fn restore_job(&self, stored: &Stored<JobExecution>) -> RepositoryResult<JobExecution> {
        let mut execution = stored.record.clone();
        execution.execution_context = self.restore_context(&stored.context)?;
        execution.step_executions = self.steps_of(execution.id)?;
        Ok(execution)
    }
}

impl Default for InMemoryJobRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryJobRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryJobRepository")
            .field("instances", &self.instance_count())
            .field("job_executions", &self.job_executions.len())
            .field("step_executions", &self.step_executions.len())
            .finish()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn find_job_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> RepositoryResult<Option<JobInstance>> {
        Ok(self
            .instances
            .read()
            .iter()
            .find(|instance| instance.matches(job_name, parameters))
            .cloned())
    }

    async fn create_job_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> RepositoryResult<JobInstance> {
        let mut instances = self.instances.write();
        if instances
            .iter()
            .any(|instance| instance.matches(job_name, parameters))
        {
            return Err(RepositoryError::Storage(format!(
                "job instance for '{job_name}' with parameters {parameters} already exists"
            )));
        }
        let instance = JobInstance::new(job_name, parameters);
        debug!(job_name, instance_id = %instance.instance_id, "Created job instance");
        instances.push(instance.clone());
        Ok(instance)
    }

    async fn last_job_instance(&self, job_name: &str) -> RepositoryResult<Option<JobInstance>> {
        Ok(self
            .instances
            .read()
            .iter()
            .rev()
            .find(|instance| instance.job_name == job_name)
            .cloned())
    }

    async fn save_job_execution(&self, execution: &JobExecution) -> RepositoryResult<()> {
        let context = self.serializer.serialize(&execution.execution_context)?;
        let mut record = execution.clone();
        record.execution_context = ExecutionContext::new();
        record.step_executions.clear();

        let sequence = self
            .job_executions
            .get(&execution.id)
            .map(|existing| existing.sequence)
            .unwrap_or_else(|| self.next_sequence());
        self.job_executions.insert(
            execution.id,
            Stored {
                record,
                context,
                sequence,
            },
        );
        Ok(())
    }

    async fn get_job_execution(&self, execution_id: Uuid) -> RepositoryResult<JobExecution> {
        let stored = self
            .job_executions
            .get(&execution_id)
            .ok_or(RepositoryError::ExecutionNotFound(execution_id))?;
        self.restore_job(&stored)
    }

    async fn job_executions(&self, instance_id: Uuid) -> RepositoryResult<Vec<JobExecution>> {
        let mut matching: Vec<(u64, Uuid)> = self
            .job_executions
            .iter()
            .filter(|entry| entry.record.instance.instance_id == instance_id)
            .map(|entry| (entry.sequence, *entry.key()))
            .collect();
        matching.sort_by_key(|(sequence, _)| *sequence);

        let mut executions = Vec::with_capacity(matching.len());
        for (_, id) in matching {
            if let Some(stored) = self.job_executions.get(&id) {
                executions.push(self.restore_job(&stored)?);
            }
        }
        Ok(executions)
    }

    async fn save_step_execution(&self, execution: &StepExecution) -> RepositoryResult<()> {
        let context = self.serializer.serialize(&execution.execution_context)?;
        let mut record = execution.clone();
        record.execution_context = ExecutionContext::new();

        let sequence = self
            .step_executions
            .get(&execution.id)
            .map(|existing| existing.sequence)
            .unwrap_or_else(|| self.next_sequence());
        self.step_executions.insert(
            execution.id,
            Stored {
                record,
                context,
                sequence,
            },
        );
        Ok(())
    }

    async fn last_step_execution(
        &self,
        instance_id: Uuid,
        step_name: &str,
    ) -> RepositoryResult<Option<StepExecution>> {
        let job_ids: Vec<Uuid> = self
            .job_executions
            .iter()
            .filter(|entry| entry.record.instance.instance_id == instance_id)
            .map(|entry| *entry.key())
            .collect();

        let latest = self
            .step_executions
            .iter()
            .filter(|entry| {
                entry.record.step_name == step_name
                    && job_ids.contains(&entry.record.job_execution_id)
            })
            .max_by_key(|entry| entry.sequence)
            .map(|entry| self.restore_step(entry.value()))
            .transpose()?;
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobParametersBuilder;
    use crate::state_machine::{BatchStatus, ExecutionEvent};

    fn params(name: &str) -> JobParameters {
        JobParametersBuilder::new().add_string("name", name).build()
    }

    #[tokio::test]
    async fn test_instances_are_keyed_by_identifying_parameters() {
        let repository = InMemoryJobRepository::new();
        let created = repository
            .create_job_instance("job1", &params("a"))
            .await
            .unwrap();

        let found = repository
            .find_job_instance("job1", &params("a"))
            .await
            .unwrap();
        assert_eq!(found, Some(created));
        assert!(repository
            .find_job_instance("job1", &params("b"))
            .await
            .unwrap()
            .is_none());
        assert!(repository
            .create_job_instance("job1", &params("a"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_job_execution_round_trip_with_steps_and_context() {
        let repository = InMemoryJobRepository::new();
        let instance = repository
            .create_job_instance("job1", &params("a"))
            .await
            .unwrap();
        let mut execution = JobExecution::new(instance, params("a"));
        execution.execution_context.put_string("user.name", "erin");
        repository.save_job_execution(&execution).await.unwrap();

        let mut step = StepExecution::new("step1", execution.id);
        step.execution_context.put_long("reader.read.count", 3);
        repository.save_step_execution(&step).await.unwrap();

        let loaded = repository.get_job_execution(execution.id).await.unwrap();
        assert_eq!(loaded.execution_context.get_string("user.name"), Some("erin"));
        assert_eq!(loaded.step_executions.len(), 1);
        assert_eq!(
            loaded.step_executions[0]
                .execution_context
                .get_long("reader.read.count"),
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_updates_keep_creation_order() {
        let repository = InMemoryJobRepository::new();
        let instance = repository
            .create_job_instance("job1", &params("a"))
            .await
            .unwrap();
        let mut first = JobExecution::new(instance.clone(), params("a"));
        let second = JobExecution::new(instance.clone(), params("a"));
        repository.save_job_execution(&first).await.unwrap();
        repository.save_job_execution(&second).await.unwrap();

        first.transition(ExecutionEvent::Start).unwrap();
        repository.save_job_execution(&first).await.unwrap();

        let last = repository
            .last_job_execution(instance.instance_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.id, second.id);
        let all = repository.job_executions(instance.instance_id).await.unwrap();
        assert_eq!(all[0].status(), BatchStatus::Started);
    }

    #[tokio::test]
    async fn test_last_step_execution_spans_job_executions() {
        let repository = InMemoryJobRepository::new();
        let instance = repository
            .create_job_instance("job1", &params("a"))
            .await
            .unwrap();
        let first = JobExecution::new(instance.clone(), params("a"));
        let second = JobExecution::new(instance.clone(), params("a"));
        repository.save_job_execution(&first).await.unwrap();
        repository.save_job_execution(&second).await.unwrap();

        let mut old = StepExecution::new("step1", first.id);
        old.read_count = 1;
        repository.save_step_execution(&old).await.unwrap();
        let mut new = StepExecution::new("step1", second.id);
        new.read_count = 2;
        repository.save_step_execution(&new).await.unwrap();

        let latest = repository
            .last_step_execution(instance.instance_id, "step1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.read_count, 2);
        assert!(repository
            .last_step_execution(instance.instance_id, "step2")
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_get_missing_execution() {
        let repository = InMemoryJobRepository::new();
        let missing = Uuid::new_v4();
        let result = tokio_test::block_on(repository.get_job_execution(missing));
        assert_eq!(result.unwrap_err(), RepositoryError::ExecutionNotFound(missing));
    }
}
