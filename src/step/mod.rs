//! # Steps
//!
//! A step is one stage of a job. Two kinds ship with the engine:
//!
//! - [`TaskletStep`] repeats a single [`Tasklet`] until it reports
//!   [`RepeatStatus::Finished`](crate::repeat::RepeatStatus::Finished)
//! - [`ChunkOrientedStep`] reads, processes and writes items in chunks sized
//!   by a [`CompletionPolicy`](crate::repeat::CompletionPolicy)
//!
//! Both are driven by [`execute_step`], which owns the lifecycle shared by all
//! steps: state transitions, listener callbacks, fault capture and the
//! one-time assignment of the exit status.

pub mod builder;
pub mod chunk;
pub mod listener;
pub mod runner;
pub mod skip;
pub mod tasklet;

pub use builder::{SimpleStepBuilder, StepBuilder, TaskletStepBuilder};
pub use chunk::ChunkOrientedStep;
pub use listener::{
    ExecutionContextPromotionListener, LoggingStepListener, StepExecutionListener,
};
pub use runner::{execute_step, StepRunContext};
pub use skip::{AlwaysSkipItemSkipPolicy, LimitCheckingSkipPolicy, NeverSkipItemSkipPolicy, SkipPolicy};
pub use tasklet::{ChunkContext, FunctionTasklet, Tasklet, TaskletStep};

use crate::error::StepResult;
use crate::models::{ExecutionContext, ExitStatus, JobParameters, StepExecution};
use crate::repository::JobRepository;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Cooperative stop request shared between a launcher and a running job.
///
/// Steps check the signal between units of work (tasklet calls and chunks),
/// never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Read-only view of the surrounding job handed to a running step body.
///
/// The job context is exposed immutably here; steps write to the job context
/// only through promotion at step end.
pub struct StepScope<'a> {
    pub job_name: &'a str,
    pub job_execution_id: Uuid,
    pub parameters: &'a JobParameters,
    pub job_context: &'a ExecutionContext,
    pub stop_signal: &'a StopSignal,
    pub repository: &'a dyn JobRepository,
}

/// How a step body finished when it did not fault
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// All work done. An exit status chosen by the step body, if any,
    /// replaces the default `COMPLETED`.
    Completed { exit_status: Option<ExitStatus> },
    /// A stop request was honored between units of work
    Stopped,
}

impl StepOutcome {
    pub fn completed() -> Self {
        Self::Completed { exit_status: None }
    }
}

/// One stage of a job
#[async_trait]
pub trait Step: Send + Sync {
    /// Unique name within the owning job
    fn name(&self) -> &str;

    /// Listeners called around every execution of this step
    fn listeners(&self) -> &[Arc<dyn StepExecutionListener>] {
        &[]
    }

    /// Whether a restart re-runs this step even if a previous execution of
    /// the same job instance completed it
    fn allow_start_if_complete(&self) -> bool {
        false
    }

    /// Run the step body. Counts and the step context are updated in place;
    /// status transitions and the exit status belong to [`execute_step`].
    async fn do_execute(
        &self,
        step_execution: &mut StepExecution,
        scope: &StepScope<'_>,
    ) -> StepResult<StepOutcome>;
}
