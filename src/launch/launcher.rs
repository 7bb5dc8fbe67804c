//! # Job Launcher
//!
//! Turns a job definition plus parameters into a finished [`JobExecution`]:
//!
//! 1. Apply the job's incrementer, then its validator. An invalid parameter
//!    set is rejected before any instance lookup or step execution.
//! 2. Resolve the job instance. A running execution or a completed instance
//!    refuses the launch; a failed or stopped one is restarted.
//! 3. Walk the flow from the start step, running each step through
//!    [`execute_step`] and routing on its exit status.
//! 4. Give the job the final status and exit status chosen by the flow.

use crate::constants::events;
use crate::error::{BatchError, BatchResult};
use crate::job::{FlowDecision, Job};
use crate::logging::log_job_operation;
use crate::models::{ExitStatus, JobExecution, JobParameters, StepExecution};
use crate::repository::JobRepository;
use crate::state_machine::{BatchStatus, ExecutionEvent};
use crate::step::{execute_step, StepRunContext, StopSignal};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Launches jobs against a [`JobRepository`]
#[derive(Clone)]
pub struct JobLauncher {
    repository: Arc<dyn JobRepository>,
    // Serializes instance resolution so two launches with the same
    // parameters cannot both create or restart the instance.
    launch_lock: Arc<Mutex<()>>,
}

impl JobLauncher {
    pub fn new(repository: Arc<dyn JobRepository>) -> Self {
        Self {
            repository,
            launch_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn repository(&self) -> &Arc<dyn JobRepository> {
        &self.repository
    }

    /// Launch `job` and wait for it to finish
    pub async fn run(&self, job: &Job, parameters: JobParameters) -> BatchResult<JobExecution> {
        self.run_with_signal(job, parameters, StopSignal::new()).await
    }

    /// Launch `job`, honoring `stop_signal` between units of work
    #[instrument(skip_all, fields(job_name = %job.name()))]
    pub async fn run_with_signal(
        &self,
        job: &Job,
        parameters: JobParameters,
        stop_signal: StopSignal,
    ) -> BatchResult<JobExecution> {
        log_job_operation(
            events::JOB_LAUNCH_REQUESTED,
            job.name(),
            None,
            "REQUESTED",
            Some(&parameters.to_string()),
        );

        let parameters = self.next_parameters(job, parameters).await?;
        job.validate_parameters(&parameters)
            .map_err(|source| BatchError::InvalidParameters {
                job_name: job.name().to_string(),
                source,
            })?;

        let (mut execution, restarting) = self.create_execution(job, parameters).await?;
        if restarting {
            log_job_operation(
                events::JOB_RESTARTED,
                job.name(),
                Some(&execution.id.to_string()),
                "RESTARTING",
                Some(&execution.parameters.to_string()),
            );
        }

        self.execute(job, &mut execution, restarting, &stop_signal)
            .await?;
        Ok(execution)
    }

    /// Apply the incrementer to the previous run's parameters overlaid with
    /// the supplied ones
    async fn next_parameters(
        &self,
        job: &Job,
        supplied: JobParameters,
    ) -> BatchResult<JobParameters> {
        let Some(incrementer) = job.incrementer() else {
            return Ok(supplied);
        };

        let previous = match self.repository.last_job_instance(job.name()).await? {
            Some(instance) => self
                .repository
                .last_job_execution(instance.instance_id)
                .await?
                .map(|execution| execution.parameters),
            None => None,
        };
        let base = match previous {
            Some(previous) => previous.merge(&supplied),
            None => supplied,
        };
        let next = incrementer.get_next(Some(&base));
        debug!(parameters = %next, "Incremented job parameters");
        Ok(next)
    }

    /// New execution for a new or restartable instance. The flag tells
    /// whether this is a restart.
    async fn create_execution(
        &self,
        job: &Job,
        parameters: JobParameters,
    ) -> BatchResult<(JobExecution, bool)> {
        let _guard = self.launch_lock.lock().await;

        let existing = self
            .repository
            .find_job_instance(job.name(), &parameters)
            .await?;
        let Some(instance) = existing else {
            let instance = self
                .repository
                .create_job_instance(job.name(), &parameters)
                .await?;
            let execution = JobExecution::new(instance, parameters);
            self.repository.save_job_execution(&execution).await?;
            return Ok((execution, false));
        };

        let last = self
            .repository
            .last_job_execution(instance.instance_id)
            .await?;
        let mut execution = JobExecution::new(instance, parameters);
        let restarting = match last {
            None => false,
            Some(last) if last.is_running() => {
                return Err(BatchError::ExecutionAlreadyRunning {
                    job_name: job.name().to_string(),
                    execution_id: last.id,
                });
            }
            Some(last) if !last.status().is_restartable() => {
                return Err(BatchError::InstanceAlreadyComplete {
                    job_name: job.name().to_string(),
                    parameters: execution.parameters.to_string(),
                });
            }
            Some(_) if !job.is_restartable() => {
                return Err(BatchError::NotRestartable {
                    job_name: job.name().to_string(),
                });
            }
            Some(last) => {
                execution.execution_context = last.execution_context.clone();
                execution.execution_context.clear_dirty();
                true
            }
        };
        self.repository.save_job_execution(&execution).await?;
        Ok((execution, restarting))
    }

    async fn execute(
        &self,
        job: &Job,
        execution: &mut JobExecution,
        restarting: bool,
        stop_signal: &StopSignal,
    ) -> BatchResult<()> {
        execution.transition(ExecutionEvent::Start)?;
        for listener in job.listeners() {
            listener.before_job(execution);
        }
        self.repository.save_job_execution(execution).await?;
        log_job_operation(
            events::JOB_STARTED,
            job.name(),
            Some(&execution.id.to_string()),
            "STARTED",
            None,
        );

        let (status, exit_status, failure) =
            self.walk_flow(job, execution, restarting, stop_signal).await?;

        let (event, operation) = match status {
            BatchStatus::Completed => (ExecutionEvent::Complete, events::JOB_COMPLETED),
            BatchStatus::Stopped => (ExecutionEvent::Stop, events::JOB_STOPPED),
            _ => (
                ExecutionEvent::fail_with_error(
                    failure.unwrap_or_else(|| exit_status.exit_description.clone()),
                ),
                events::JOB_FAILED,
            ),
        };
        execution.transition(event)?;
        execution.exit_status = exit_status;
        for listener in job.listeners().iter().rev() {
            listener.after_job(execution);
        }
        self.repository.save_job_execution(execution).await?;

        log_job_operation(
            operation,
            job.name(),
            Some(&execution.id.to_string()),
            &execution.status().to_string(),
            Some(&execution.exit_status.to_string()),
        );
        Ok(())
    }

    /// Run steps along the flow until it finishes. Returns the job's final
    /// status, exit status and, for failures, a message naming the step.
    async fn walk_flow(
        &self,
        job: &Job,
        execution: &mut JobExecution,
        restarting: bool,
        stop_signal: &StopSignal,
    ) -> BatchResult<(BatchStatus, ExitStatus, Option<String>)> {
        let mut current = job.flow().start().to_string();
        loop {
            if stop_signal.is_stop_requested() {
                info!(next_step = %current, "Stop requested, ending job before next step");
                return Ok((BatchStatus::Stopped, ExitStatus::stopped(), None));
            }

            let step = job.step(&current).cloned().ok_or_else(|| {
                crate::error::ConfigurationError::Invalid(format!(
                    "job '{}' routes to undeclared step '{current}'",
                    job.name()
                ))
            })?;

            let previous = if restarting {
                self.repository
                    .last_step_execution(execution.instance.instance_id, &current)
                    .await?
            } else {
                None
            };

            let (step_status, step_exit) = match previous {
                Some(done)
                    if done.status() == BatchStatus::Completed
                        && !step.allow_start_if_complete() =>
                {
                    info!(step_name = %current, "Step already complete, skipping on restart");
                    log_job_operation(
                        events::STEP_SKIPPED_COMPLETE,
                        job.name(),
                        Some(&execution.id.to_string()),
                        "COMPLETED",
                        Some(&current),
                    );
                    let exit = done
                        .exit_status()
                        .cloned()
                        .unwrap_or_else(ExitStatus::completed);
                    (BatchStatus::Completed, exit)
                }
                previous => {
                    let mut step_execution = match previous {
                        Some(earlier) => earlier.for_restart(execution.id),
                        None => StepExecution::new(current.clone(), execution.id),
                    };
                    self.repository.save_step_execution(&step_execution).await?;
                    execute_step(
                        step.as_ref(),
                        &mut step_execution,
                        StepRunContext {
                            job_name: &execution.instance.job_name,
                            job_execution_id: execution.id,
                            parameters: &execution.parameters,
                            job_context: &mut execution.execution_context,
                            stop_signal,
                            repository: self.repository.as_ref(),
                        },
                    )
                    .await?;

                    let outcome = (
                        step_execution.status(),
                        step_execution
                            .exit_status()
                            .cloned()
                            .unwrap_or_else(|| ExitStatus::for_status(step_execution.status())),
                    );
                    execution.step_executions.push(step_execution);
                    self.repository.save_job_execution(execution).await?;
                    outcome
                }
            };

            match job.flow().resolve(&current, step_status, &step_exit) {
                FlowDecision::Next(next) => {
                    debug!(
                        operation = events::FLOW_TRANSITION,
                        from = %current,
                        to = %next,
                        exit_code = %step_exit.exit_code,
                        "Following transition"
                    );
                    current = next;
                }
                FlowDecision::Finish {
                    status,
                    exit_status,
                } => {
                    let failure = (status == BatchStatus::Failed).then(|| {
                        format!(
                            "Step '{current}' ended with {}",
                            step_exit.exit_code
                        )
                    });
                    if status == BatchStatus::Failed {
                        warn!(step_name = %current, exit_status = %step_exit, "Job ends in failure");
                    }
                    return Ok((status, exit_status, failure));
                }
            }
        }
    }
}

impl std::fmt::Debug for JobLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobLauncher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepError;
    use crate::job::{require_keys, JobBuilder};
    use crate::models::JobParametersBuilder;
    use crate::repeat::RepeatStatus;
    use crate::repository::InMemoryJobRepository;
    use crate::step::{FunctionTasklet, StepBuilder, TaskletStep};

    fn ok_step(name: &str) -> TaskletStep {
        StepBuilder::new(name)
            .tasklet(FunctionTasklet::new(|_, _| Ok(RepeatStatus::Finished)))
            .build()
    }

    fn failing_step(name: &str) -> TaskletStep {
        StepBuilder::new(name)
            .tasklet(FunctionTasklet::new(|_, _| Err(StepError::tasklet("fault"))))
            .build()
    }

    fn launcher() -> JobLauncher {
        JobLauncher::new(Arc::new(InMemoryJobRepository::new()))
    }

    #[tokio::test]
    async fn test_sequential_job_completes() {
        let job = JobBuilder::new("seq")
            .start(ok_step("a"))
            .next(ok_step("b"))
            .build()
            .unwrap();

        let execution = launcher().run(&job, JobParameters::new()).await.unwrap();
        assert_eq!(execution.status(), BatchStatus::Completed);
        assert_eq!(execution.exit_status.exit_code, "COMPLETED");
        assert_eq!(execution.step_names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_failed_step_without_transition_fails_job() {
        let job = JobBuilder::new("seq")
            .start(failing_step("a"))
            .next(ok_step("b"))
            .build()
            .unwrap();

        let execution = launcher().run(&job, JobParameters::new()).await.unwrap();
        assert_eq!(execution.status(), BatchStatus::Failed);
        assert_eq!(execution.step_names(), vec!["a"]);
        assert!(!execution.failure_messages.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_parameters_run_nothing() {
        let job = JobBuilder::new("validated")
            .start(ok_step("a"))
            .validator(require_keys(["name"]))
            .build()
            .unwrap();
        let repository = Arc::new(InMemoryJobRepository::new());
        let launcher = JobLauncher::new(repository.clone());

        let result = launcher.run(&job, JobParameters::new()).await;
        assert!(matches!(result, Err(BatchError::InvalidParameters { .. })));
        assert_eq!(repository.instance_count(), 0);
    }

    #[tokio::test]
    async fn test_completed_instance_cannot_be_relaunched() {
        let job = JobBuilder::new("once").start(ok_step("a")).build().unwrap();
        let launcher = launcher();
        let params = JobParametersBuilder::new().add_string("name", "x").build();

        launcher.run(&job, params.clone()).await.unwrap();
        let again = launcher.run(&job, params).await;
        assert!(matches!(again, Err(BatchError::InstanceAlreadyComplete { .. })));
    }

    #[tokio::test]
    async fn test_non_restartable_job_refuses_restart() {
        let job = JobBuilder::new("fragile")
            .start(failing_step("a"))
            .restartable(false)
            .build()
            .unwrap();
        let launcher = launcher();

        let first = launcher.run(&job, JobParameters::new()).await.unwrap();
        assert_eq!(first.status(), BatchStatus::Failed);
        let again = launcher.run(&job, JobParameters::new()).await;
        assert!(matches!(again, Err(BatchError::NotRestartable { .. })));
    }

    #[tokio::test]
    async fn test_stop_before_launch_stops_job() {
        let job = JobBuilder::new("stoppable").start(ok_step("a")).build().unwrap();
        let signal = StopSignal::new();
        signal.request_stop();

        let execution = launcher()
            .run_with_signal(&job, JobParameters::new(), signal)
            .await
            .unwrap();
        assert_eq!(execution.status(), BatchStatus::Stopped);
        assert!(execution.step_executions.is_empty());
    }
}
