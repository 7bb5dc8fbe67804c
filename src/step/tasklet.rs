//! Tasklet steps: a single callable unit repeated until it reports finished.

use super::{Step, StepExecutionListener, StepOutcome, StepScope};
use crate::error::StepResult;
use crate::models::{ExecutionContext, JobParameters, StepContribution, StepExecution};
use crate::repeat::RepeatStatus;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// What a tasklet can see and touch while it runs: its own step execution
/// (including the step context) plus a read-only view of the job.
pub struct ChunkContext<'a> {
    step_execution: &'a mut StepExecution,
    scope: &'a StepScope<'a>,
}

impl<'a> ChunkContext<'a> {
    pub fn new(step_execution: &'a mut StepExecution, scope: &'a StepScope<'a>) -> Self {
        Self {
            step_execution,
            scope,
        }
    }

    pub fn step_name(&self) -> &str {
        &self.step_execution.step_name
    }

    pub fn job_name(&self) -> &str {
        self.scope.job_name
    }

    pub fn step_execution(&self) -> &StepExecution {
        self.step_execution
    }

    pub fn step_context(&self) -> &ExecutionContext {
        &self.step_execution.execution_context
    }

    pub fn step_context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.step_execution.execution_context
    }

    pub fn job_parameters(&self) -> &JobParameters {
        self.scope.parameters
    }

    /// The job context as it stood when the step started
    pub fn job_context(&self) -> &ExecutionContext {
        self.scope.job_context
    }

    pub fn is_stop_requested(&self) -> bool {
        self.scope.stop_signal.is_stop_requested()
    }
}

/// Unit of work run by a [`TaskletStep`]
#[async_trait]
pub trait Tasklet: Send + Sync {
    async fn execute(
        &self,
        contribution: &mut StepContribution,
        chunk_context: &mut ChunkContext<'_>,
    ) -> StepResult<RepeatStatus>;
}

/// Adapts a plain closure into a [`Tasklet`]
pub struct FunctionTasklet<F> {
    function: F,
}

impl<F> FunctionTasklet<F>
where
    F: Fn(&mut StepContribution, &mut ChunkContext<'_>) -> StepResult<RepeatStatus> + Send + Sync,
{
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

#[async_trait]
impl<F> Tasklet for FunctionTasklet<F>
where
    F: Fn(&mut StepContribution, &mut ChunkContext<'_>) -> StepResult<RepeatStatus> + Send + Sync,
{
    async fn execute(
        &self,
        contribution: &mut StepContribution,
        chunk_context: &mut ChunkContext<'_>,
    ) -> StepResult<RepeatStatus> {
        (self.function)(contribution, chunk_context)
    }
}

/// Step that calls its tasklet repeatedly while it returns
/// [`RepeatStatus::Continuable`]. Each call is committed on its own.
pub struct TaskletStep {
    name: String,
    tasklet: Arc<dyn Tasklet>,
    listeners: Vec<Arc<dyn StepExecutionListener>>,
    allow_start_if_complete: bool,
}

impl TaskletStep {
    pub fn new(name: impl Into<String>, tasklet: Arc<dyn Tasklet>) -> Self {
        Self {
            name: name.into(),
            tasklet,
            listeners: Vec::new(),
            allow_start_if_complete: false,
        }
    }

    pub(crate) fn with_listeners(mut self, listeners: Vec<Arc<dyn StepExecutionListener>>) -> Self {
        self.listeners = listeners;
        self
    }

    pub(crate) fn with_allow_start_if_complete(mut self, allow: bool) -> Self {
        self.allow_start_if_complete = allow;
        self
    }
}

impl std::fmt::Debug for TaskletStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskletStep")
            .field("name", &self.name)
            .field("listeners", &self.listeners.len())
            .field("allow_start_if_complete", &self.allow_start_if_complete)
            .finish()
    }
}

#[async_trait]
impl Step for TaskletStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn listeners(&self) -> &[Arc<dyn StepExecutionListener>] {
        &self.listeners
    }

    fn allow_start_if_complete(&self) -> bool {
        self.allow_start_if_complete
    }

    async fn do_execute(
        &self,
        step_execution: &mut StepExecution,
        scope: &StepScope<'_>,
    ) -> StepResult<StepOutcome> {
        let mut exit_status = None;
        loop {
            if scope.stop_signal.is_stop_requested() {
                info!(step_name = %self.name, "Stop requested, leaving tasklet loop");
                return Ok(StepOutcome::Stopped);
            }

            let mut contribution = StepContribution::new();
            let result = {
                let mut chunk_context = ChunkContext::new(step_execution, scope);
                self.tasklet
                    .execute(&mut contribution, &mut chunk_context)
                    .await
            };
            let status = match result {
                Ok(status) => status,
                Err(error) => {
                    step_execution.rollback_count += 1;
                    return Err(error);
                }
            };

            step_execution.apply_contribution(&contribution);
            step_execution.commit_count += 1;
            if let Some(chosen) = contribution.take_exit_status() {
                exit_status = Some(chosen);
            }
            scope.repository.save_step_execution(step_execution).await?;
            debug!(
                step_name = %self.name,
                commit_count = step_execution.commit_count,
                ?status,
                "Tasklet iteration committed"
            );

            if !status.is_continuable() {
                return Ok(StepOutcome::Completed { exit_status });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepError;
    use crate::models::ExitStatus;
    use crate::repository::InMemoryJobRepository;
    use crate::step::StopSignal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    async fn run_body(step: &TaskletStep, stop: &StopSignal) -> (StepExecution, StepResult<StepOutcome>) {
        let repository = InMemoryJobRepository::new();
        let parameters = JobParameters::new();
        let job_context = ExecutionContext::new();
        let mut execution = StepExecution::new(step.name(), Uuid::new_v4());
        let scope = StepScope {
            job_name: "job",
            job_execution_id: execution.job_execution_id,
            parameters: &parameters,
            job_context: &job_context,
            stop_signal: stop,
            repository: &repository,
        };
        let outcome = step.do_execute(&mut execution, &scope).await;
        (execution, outcome)
    }

    #[tokio::test]
    async fn test_repeats_until_finished() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let step = TaskletStep::new(
            "repeat",
            Arc::new(FunctionTasklet::new(move |_, _| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(RepeatStatus::continue_if(n < 3))
            })),
        );

        let (execution, outcome) = run_body(&step, &StopSignal::new()).await;
        assert_eq!(outcome, Ok(StepOutcome::completed()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(execution.commit_count, 3);
    }

    #[tokio::test]
    async fn test_tasklet_writes_step_context_and_exit_status() {
        let step = TaskletStep::new(
            "writer",
            Arc::new(FunctionTasklet::new(|contribution, ctx| {
                ctx.step_context_mut().put_string("user.name", "carol");
                contribution.set_exit_status(ExitStatus::new("CUSTOM"));
                Ok(RepeatStatus::Finished)
            })),
        );

        let (execution, outcome) = run_body(&step, &StopSignal::new()).await;
        assert_eq!(
            outcome,
            Ok(StepOutcome::Completed {
                exit_status: Some(ExitStatus::new("CUSTOM"))
            })
        );
        assert_eq!(
            execution.execution_context.get_string("user.name"),
            Some("carol")
        );
    }

    #[tokio::test]
    async fn test_failure_counts_a_rollback() {
        let step = TaskletStep::new(
            "fails",
            Arc::new(FunctionTasklet::new(|_, _| Err(StepError::tasklet("nope")))),
        );

        let (execution, outcome) = run_body(&step, &StopSignal::new()).await;
        assert_eq!(outcome, Err(StepError::tasklet("nope")));
        assert_eq!(execution.rollback_count, 1);
        assert_eq!(execution.commit_count, 0);
    }

    #[tokio::test]
    async fn test_stop_is_honored_between_calls() {
        let stop = StopSignal::new();
        let trigger = stop.clone();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let step = TaskletStep::new(
            "endless",
            Arc::new(FunctionTasklet::new(move |_, _| {
                if counter.fetch_add(1, Ordering::SeqCst) == 1 {
                    trigger.request_stop();
                }
                Ok(RepeatStatus::Continuable)
            })),
        );

        let (execution, outcome) = run_body(&step, &stop).await;
        assert_eq!(outcome, Ok(StepOutcome::Stopped));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(execution.commit_count, 2);
    }
}
