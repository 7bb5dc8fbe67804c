//! Callbacks around a step execution.

use crate::error::{StepError, StepResult};
use crate::models::{ExecutionContext, ExitStatus, StepExecution};
use crate::utils::ExitCodePattern;
use crate::constants::exit_codes;
use tracing::{debug, info};

/// Hooks invoked before and after every execution of a step.
///
/// `after_step` sees the exit status the step is about to finish with and may
/// return another one, which is combined with it through
/// [`ExitStatus::and`]. `on_step_finished` runs once every `after_step` has
/// returned, with the exit status the step actually finishes with, and is the
/// only place a step may write to the job's execution context. Its writes are
/// kept only if every listener's `on_step_finished` succeeds.
pub trait StepExecutionListener: Send + Sync {
    fn before_step(&self, step_execution: &mut StepExecution) -> StepResult<()> {
        let _ = step_execution;
        Ok(())
    }

    fn after_step(
        &self,
        step_execution: &mut StepExecution,
        exit_status: &ExitStatus,
        job_context: &ExecutionContext,
    ) -> StepResult<Option<ExitStatus>> {
        let _ = (step_execution, exit_status, job_context);
        Ok(None)
    }

    fn on_step_finished(
        &self,
        step_execution: &StepExecution,
        exit_status: &ExitStatus,
        job_context: &mut ExecutionContext,
    ) -> StepResult<()> {
        let _ = (step_execution, exit_status, job_context);
        Ok(())
    }
}

/// Copies selected keys from the step context into the job context when the
/// step finishes with one of the configured exit codes.
#[derive(Debug, Clone)]
pub struct ExecutionContextPromotionListener {
    keys: Vec<String>,
    statuses: Vec<ExitCodePattern>,
    strict: bool,
}

impl ExecutionContextPromotionListener {
    /// Promote `keys` when the step completes
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            statuses: vec![ExitCodePattern::new(exit_codes::COMPLETED)],
            strict: false,
        }
    }

    /// Exit code patterns that trigger promotion; `*` and `?` wildcards allowed
    pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statuses = statuses
            .into_iter()
            .map(|s| ExitCodePattern::new(s.into()))
            .collect();
        self
    }

    /// Fail the step when a key to promote is missing from the step context
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl StepExecutionListener for ExecutionContextPromotionListener {
    fn on_step_finished(
        &self,
        step_execution: &StepExecution,
        exit_status: &ExitStatus,
        job_context: &mut ExecutionContext,
    ) -> StepResult<()> {
        if !self
            .statuses
            .iter()
            .any(|pattern| pattern.matches(&exit_status.exit_code))
        {
            return Ok(());
        }

        for key in &self.keys {
            match step_execution.execution_context.get(key) {
                Some(value) => {
                    debug!(key = %key, step_name = %step_execution.step_name, "Promoting context key to job");
                    job_context.put_value(key.clone(), value.clone());
                }
                None if self.strict => {
                    return Err(StepError::MissingPromotionKey { key: key.clone() });
                }
                None => {}
            }
        }
        Ok(())
    }
}

/// Logs when a step starts and ends
#[derive(Debug, Clone, Default)]
pub struct LoggingStepListener;

impl StepExecutionListener for LoggingStepListener {
    fn before_step(&self, step_execution: &mut StepExecution) -> StepResult<()> {
        info!("{} has been started", step_execution.step_name);
        Ok(())
    }

    fn after_step(
        &self,
        step_execution: &mut StepExecution,
        exit_status: &ExitStatus,
        _job_context: &ExecutionContext,
    ) -> StepResult<Option<ExitStatus>> {
        info!(
            read_count = step_execution.read_count,
            write_count = step_execution.write_count,
            commit_count = step_execution.commit_count,
            "{} has ended with {}",
            step_execution.step_name,
            exit_status
        );
        Ok(None)
    }
}
