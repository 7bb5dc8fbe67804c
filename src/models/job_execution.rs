use super::{ExecutionContext, ExitStatus, JobInstance, JobParameters, StepExecution};
use crate::state_machine::{determine_target_state, BatchStatus, ExecutionEvent, StateMachineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record of one launch attempt of a [`JobInstance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobExecution {
    pub id: Uuid,
    pub instance: JobInstance,
    pub parameters: JobParameters,
    status: BatchStatus,
    pub exit_status: ExitStatus,
    pub step_executions: Vec<StepExecution>,
    pub execution_context: ExecutionContext,
    pub create_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    pub failure_messages: Vec<String>,
}

impl JobExecution {
    pub fn new(instance: JobInstance, parameters: JobParameters) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            instance,
            parameters,
            status: BatchStatus::Starting,
            exit_status: ExitStatus::unknown(),
            step_executions: Vec::new(),
            execution_context: ExecutionContext::new(),
            create_time: now,
            start_time: None,
            end_time: None,
            last_updated: now,
            failure_messages: Vec::new(),
        }
    }

    pub fn job_name(&self) -> &str {
        &self.instance.job_name
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    /// Apply a lifecycle event, stamping start and end times
    pub fn transition(&mut self, event: ExecutionEvent) -> StateMachineResult<BatchStatus> {
        let target = determine_target_state(self.status, &event)?;
        let now = Utc::now();
        if target == BatchStatus::Started {
            self.start_time = Some(now);
            self.exit_status = ExitStatus::executing();
        }
        if target.is_terminal() {
            self.end_time = Some(now);
        }
        if let Some(message) = event.error_message() {
            self.failure_messages.push(message.to_string());
        }
        self.status = target;
        self.last_updated = now;
        Ok(target)
    }

    /// Most recent execution of the named step within this job execution
    pub fn step_execution(&self, step_name: &str) -> Option<&StepExecution> {
        self.step_executions
            .iter()
            .rev()
            .find(|s| s.step_name == step_name)
    }

    /// Names of executed steps in execution order
    pub fn step_names(&self) -> Vec<&str> {
        self.step_executions
            .iter()
            .map(|s| s.step_name.as_str())
            .collect()
    }

    /// Job-level failures followed by every step's failures
    pub fn all_failure_messages(&self) -> Vec<String> {
        self.failure_messages
            .iter()
            .cloned()
            .chain(
                self.step_executions
                    .iter()
                    .flat_map(|s| s.failure_messages.iter().cloned()),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobParametersBuilder;

    fn execution() -> JobExecution {
        let params = JobParametersBuilder::new().add_string("name", "a").build();
        JobExecution::new(JobInstance::new("job1", &params), params)
    }

    #[test]
    fn test_lifecycle() {
        let mut job = execution();
        assert_eq!(job.status(), BatchStatus::Starting);
        assert!(job.is_running());

        job.transition(ExecutionEvent::Start).unwrap();
        assert!(job.start_time.is_some());
        assert!(job.exit_status.is_running());

        job.transition(ExecutionEvent::Complete).unwrap();
        assert_eq!(job.status(), BatchStatus::Completed);
        assert!(!job.is_running());
        assert!(job.end_time.is_some());
    }

    #[test]
    fn test_step_lookup_returns_latest() {
        let mut job = execution();
        let mut first = StepExecution::new("step1", job.id);
        first.read_count = 1;
        let mut second = StepExecution::new("step1", job.id);
        second.read_count = 2;
        job.step_executions.push(first);
        job.step_executions.push(second);

        assert_eq!(job.step_execution("step1").map(|s| s.read_count), Some(2));
        assert!(job.step_execution("step2").is_none());
        assert_eq!(job.step_names(), vec!["step1", "step1"]);
    }

    #[test]
    fn test_failure_messages_include_steps() {
        let mut job = execution();
        job.failure_messages.push("job level".into());
        let mut step = StepExecution::new("step1", job.id);
        step.add_failure("step level");
        job.step_executions.push(step);

        assert_eq!(
            job.all_failure_messages(),
            vec!["job level".to_string(), "step level".to_string()]
        );
    }
}
