//! Lifecycle shared by every step kind.

use super::{Step, StepOutcome, StepScope, StopSignal};
use crate::constants::events;
use crate::error::{BatchResult, StepError};
use crate::logging::log_step_operation;
use crate::models::{ExecutionContext, ExitStatus, JobParameters, StepExecution};
use crate::repository::JobRepository;
use crate::state_machine::{BatchStatus, ExecutionEvent};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{error, instrument, warn};
use uuid::Uuid;

/// Everything a step needs from the job execution that runs it
pub struct StepRunContext<'a> {
    pub job_name: &'a str,
    pub job_execution_id: Uuid,
    pub parameters: &'a JobParameters,
    pub job_context: &'a mut ExecutionContext,
    pub stop_signal: &'a StopSignal,
    pub repository: &'a dyn JobRepository,
}

/// Run one step execution to a terminal status.
///
/// Faults and panics raised by the step body or its listeners are recorded on
/// the step execution and never returned. The only errors returned are
/// failures to persist the execution.
#[instrument(
    skip_all,
    fields(
        job_name = %ctx.job_name,
        step_name = %step.name(),
        step_execution_id = %step_execution.id
    )
)]
pub async fn execute_step(
    step: &dyn Step,
    step_execution: &mut StepExecution,
    ctx: StepRunContext<'_>,
) -> BatchResult<()> {
    let StepRunContext {
        job_name,
        job_execution_id,
        parameters,
        job_context,
        stop_signal,
        repository,
    } = ctx;

    if stop_signal.is_stop_requested() {
        step_execution.transition(ExecutionEvent::Stop)?;
        step_execution.set_exit_status(
            ExitStatus::stopped().add_description("Stop requested before the step started"),
        )?;
        repository.save_step_execution(step_execution).await?;
        log_step_operation(
            events::STEP_STOPPED,
            job_name,
            step.name(),
            "STOPPED",
            Some("stop requested before start"),
        );
        return Ok(());
    }

    step_execution.transition(ExecutionEvent::Start)?;
    repository.save_step_execution(step_execution).await?;
    log_step_operation(events::STEP_STARTED, job_name, step.name(), "STARTED", None);

    let outcome = match run_before_listeners(step, step_execution) {
        Ok(()) => {
            let scope = StepScope {
                job_name,
                job_execution_id,
                parameters,
                job_context: &*job_context,
                stop_signal,
                repository,
            };
            AssertUnwindSafe(step.do_execute(step_execution, &scope))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(StepError::Panicked(panic_message(panic.as_ref()))))
        }
        Err(error) => Err(error),
    };

    let mut failures = Vec::new();
    let (mut status, mut exit_status) = match outcome {
        Ok(StepOutcome::Completed { exit_status }) => (
            BatchStatus::Completed,
            exit_status.unwrap_or_else(ExitStatus::completed),
        ),
        Ok(StepOutcome::Stopped) => (BatchStatus::Stopped, ExitStatus::stopped()),
        Err(fault) => {
            error!(error = %fault, "Step failed");
            failures.push(fault.to_string());
            (
                BatchStatus::Failed,
                ExitStatus::failed().add_description(fault.to_string()),
            )
        }
    };

    // After-callbacks run in reverse registration order
    for listener in step.listeners().iter().rev() {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            listener.after_step(step_execution, &exit_status, &*job_context)
        }))
        .unwrap_or_else(|panic| Err(StepError::Panicked(panic_message(panic.as_ref()))));

        match result {
            Ok(Some(returned)) => exit_status = exit_status.and(returned),
            Ok(None) => {}
            Err(fault) => {
                warn!(error = %fault, "Step listener failed after step");
                failures.push(fault.to_string());
                status = BatchStatus::Failed;
                exit_status = exit_status.and(ExitStatus::failed().add_description(fault.to_string()));
            }
        }
    }

    // Job context writes see the final exit status and land all or nothing
    let mut staged = job_context.clone();
    let finished = step.listeners().iter().try_for_each(|listener| {
        std::panic::catch_unwind(AssertUnwindSafe(|| {
            listener.on_step_finished(&*step_execution, &exit_status, &mut staged)
        }))
        .unwrap_or_else(|panic| Err(StepError::Panicked(panic_message(panic.as_ref()))))
    });
    match finished {
        Ok(()) => *job_context = staged,
        Err(fault) => {
            warn!(error = %fault, "Step listener failed while finishing step");
            failures.push(fault.to_string());
            status = BatchStatus::Failed;
            exit_status = exit_status.and(ExitStatus::failed().add_description(fault.to_string()));
        }
    }

    let (event, operation) = match status {
        BatchStatus::Completed => (ExecutionEvent::Complete, events::STEP_COMPLETED),
        BatchStatus::Stopped => (ExecutionEvent::Stop, events::STEP_STOPPED),
        _ => (
            ExecutionEvent::fail_with_error(failures.join("; ")),
            events::STEP_FAILED,
        ),
    };
    step_execution.transition(event)?;
    let summary = exit_status.to_string();
    step_execution.set_exit_status(exit_status)?;
    repository.save_step_execution(step_execution).await?;

    log_step_operation(
        operation,
        job_name,
        step.name(),
        &status.to_string(),
        Some(&summary),
    );
    Ok(())
}

fn run_before_listeners(step: &dyn Step, step_execution: &mut StepExecution) -> Result<(), StepError> {
    for listener in step.listeners() {
        std::panic::catch_unwind(AssertUnwindSafe(|| listener.before_step(step_execution)))
            .unwrap_or_else(|panic| Err(StepError::Panicked(panic_message(panic.as_ref()))))?;
    }
    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}
