//! # System Constants
//!
//! Well-known exit codes, context keys and lifecycle event names used across
//! the batch engine.

/// Exit codes carried by [`ExitStatus`](crate::models::ExitStatus)
pub mod exit_codes {
    pub const UNKNOWN: &str = "UNKNOWN";
    pub const EXECUTING: &str = "EXECUTING";
    pub const COMPLETED: &str = "COMPLETED";
    pub const NOOP: &str = "NOOP";
    pub const FAILED: &str = "FAILED";
    pub const STOPPED: &str = "STOPPED";
}

/// Lifecycle events emitted through the structured logging helpers
pub mod events {
    pub const JOB_LAUNCH_REQUESTED: &str = "job.launch_requested";
    pub const JOB_STARTED: &str = "job.started";
    pub const JOB_COMPLETED: &str = "job.completed";
    pub const JOB_FAILED: &str = "job.failed";
    pub const JOB_STOPPED: &str = "job.stopped";
    pub const JOB_RESTARTED: &str = "job.restarted";

    pub const STEP_STARTED: &str = "step.started";
    pub const STEP_SKIPPED_COMPLETE: &str = "step.skipped_complete";
    pub const STEP_COMPLETED: &str = "step.completed";
    pub const STEP_FAILED: &str = "step.failed";
    pub const STEP_STOPPED: &str = "step.stopped";

    pub const CHUNK_COMMITTED: &str = "chunk.committed";
    pub const CHUNK_ROLLED_BACK: &str = "chunk.rolled_back";

    pub const FLOW_TRANSITION: &str = "flow.transition";
}

/// Keys written into execution contexts by the engine itself
pub mod context_keys {
    /// Number of items a restartable reader has handed out
    pub const READ_COUNT_SUFFIX: &str = "read.count";
}

/// Well-known job parameter keys
pub mod parameter_keys {
    /// Key bumped by [`RunIdIncrementer`](crate::job::RunIdIncrementer)
    pub const RUN_ID: &str = "run.id";

    /// Key stamped by [`TimestampIncrementer`](crate::job::TimestampIncrementer)
    pub const CURRENT_DATE: &str = "currentDate";
}

/// Process exit codes for the launch surface
pub mod process_exit {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const JOB_NOT_PROVIDED: i32 = 2;
    pub const NO_SUCH_JOB: i32 = 2;
}

/// System-wide limits
pub mod system {
    /// Exclusive bound for the random chunk size policy in the samples
    pub const SAMPLE_MAX_RANDOM_CHUNK: usize = 20;

    /// Maximum length of an exit description before truncation
    pub const MAX_EXIT_DESCRIPTION_LENGTH: usize = 2500;
}
