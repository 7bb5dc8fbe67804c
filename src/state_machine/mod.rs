//! Lifecycle state machine for job and step executions.
//!
//! Both execution kinds share one transition table: `STARTING -> STARTED`
//! followed by exactly one terminal transition. A step that faults before it
//! starts may go straight to `FAILED`, and a stop request observed before any
//! work begins goes straight to `STOPPED`.

pub mod errors;
pub mod events;
pub mod states;

pub use errors::{StateMachineError, StateMachineResult};
pub use events::ExecutionEvent;
pub use states::BatchStatus;

/// Determine the target status for `event` applied in `current`
pub fn determine_target_state(
    current: BatchStatus,
    event: &ExecutionEvent,
) -> StateMachineResult<BatchStatus> {
    let target = match (current, event) {
        (BatchStatus::Starting, ExecutionEvent::Start) => BatchStatus::Started,

        (BatchStatus::Started, ExecutionEvent::Complete) => BatchStatus::Completed,

        (BatchStatus::Started, ExecutionEvent::Fail(_)) => BatchStatus::Failed,
        (BatchStatus::Starting, ExecutionEvent::Fail(_)) => BatchStatus::Failed,

        (BatchStatus::Started, ExecutionEvent::Stop) => BatchStatus::Stopped,
        (BatchStatus::Starting, ExecutionEvent::Stop) => BatchStatus::Stopped,

        (from, _) => {
            return Err(StateMachineError::InvalidTransition {
                from: from.to_string(),
                event: event.event_type().to_string(),
            })
        }
    };

    Ok(target)
}
