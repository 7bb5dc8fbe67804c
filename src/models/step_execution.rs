use super::{ExecutionContext, ExitStatus};
use crate::constants::exit_codes;
use crate::state_machine::{
    determine_target_state, BatchStatus, ExecutionEvent, StateMachineError, StateMachineResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record of one execution of one step.
///
/// Owned by exactly one [`JobExecution`](super::JobExecution). The exit status
/// is written once, when the step finishes, and is read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecution {
    pub id: Uuid,
    pub job_execution_id: Uuid,
    pub step_name: String,
    status: BatchStatus,
    exit_status: Option<ExitStatus>,
    pub read_count: usize,
    pub write_count: usize,
    pub filter_count: usize,
    pub commit_count: usize,
    pub rollback_count: usize,
    pub read_skip_count: usize,
    pub process_skip_count: usize,
    pub execution_context: ExecutionContext,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    pub failure_messages: Vec<String>,
}

impl StepExecution {
    pub fn new(step_name: impl Into<String>, job_execution_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_execution_id,
            step_name: step_name.into(),
            status: BatchStatus::Starting,
            exit_status: None,
            read_count: 0,
            write_count: 0,
            filter_count: 0,
            commit_count: 0,
            rollback_count: 0,
            read_skip_count: 0,
            process_skip_count: 0,
            execution_context: ExecutionContext::new(),
            start_time: None,
            end_time: None,
            last_updated: Utc::now(),
            failure_messages: Vec::new(),
        }
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    /// Apply a lifecycle event, stamping start and end times
    pub fn transition(&mut self, event: ExecutionEvent) -> StateMachineResult<BatchStatus> {
        let target = determine_target_state(self.status, &event)?;
        let now = Utc::now();
        if target == BatchStatus::Started {
            self.start_time = Some(now);
        }
        if target.is_terminal() {
            self.end_time = Some(now);
        }
        if let Some(message) = event.error_message() {
            self.add_failure(message);
        }
        self.status = target;
        self.last_updated = now;
        Ok(target)
    }

    /// The exit status, once the step has finished
    pub fn exit_status(&self) -> Option<&ExitStatus> {
        self.exit_status.as_ref()
    }

    /// Exit code used for flow routing; `EXECUTING` until the step finishes
    pub fn exit_code(&self) -> &str {
        self.exit_status
            .as_ref()
            .map(|s| s.exit_code.as_str())
            .unwrap_or(exit_codes::EXECUTING)
    }

    /// Record the final exit status. Fails if it was already recorded.
    pub fn set_exit_status(&mut self, exit_status: ExitStatus) -> StateMachineResult<()> {
        if let Some(existing) = &self.exit_status {
            return Err(StateMachineError::ExitStatusAlreadySet {
                name: self.step_name.clone(),
                exit_code: existing.exit_code.clone(),
            });
        }
        self.exit_status = Some(exit_status);
        Ok(())
    }

    pub fn add_failure(&mut self, message: impl Into<String>) {
        self.failure_messages.push(message.into());
    }

    pub fn skip_count(&self) -> usize {
        self.read_skip_count + self.process_skip_count
    }

    /// Fold a committed contribution into the running totals
    pub fn apply_contribution(&mut self, contribution: &StepContribution) {
        self.read_count += contribution.read_count;
        self.write_count += contribution.write_count;
        self.filter_count += contribution.filter_count;
        self.read_skip_count += contribution.read_skip_count;
        self.process_skip_count += contribution.process_skip_count;
        self.last_updated = Utc::now();
    }

    /// Copy of this execution for a restart: same step, fresh identity, the
    /// previous context carried over.
    pub fn for_restart(&self, job_execution_id: Uuid) -> Self {
        let mut restarted = Self::new(self.step_name.clone(), job_execution_id);
        restarted.execution_context = self.execution_context.clone();
        restarted.execution_context.clear_dirty();
        restarted
    }
}

/// Counts and exit status accumulated by one unit of step work (a chunk or a
/// tasklet call) before it is committed to the [`StepExecution`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepContribution {
    pub read_count: usize,
    pub write_count: usize,
    pub filter_count: usize,
    pub read_skip_count: usize,
    pub process_skip_count: usize,
    exit_status: Option<ExitStatus>,
}

impl StepContribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_read_count(&mut self) {
        self.read_count += 1;
    }

    pub fn increment_write_count(&mut self, count: usize) {
        self.write_count += count;
    }

    pub fn increment_filter_count(&mut self) {
        self.filter_count += 1;
    }

    /// Let the unit of work choose the exit status the step will report
    pub fn set_exit_status(&mut self, exit_status: ExitStatus) {
        self.exit_status = Some(exit_status);
    }

    pub fn exit_status(&self) -> Option<&ExitStatus> {
        self.exit_status.as_ref()
    }

    pub fn take_exit_status(&mut self) -> Option<ExitStatus> {
        self.exit_status.take()
    }
}
