//! Mapping from job outcomes to process exit codes.

use crate::constants::{exit_codes, process_exit};
use crate::error::{BatchError, BatchResult};
use crate::models::JobExecution;
use crate::state_machine::BatchStatus;
use std::collections::HashMap;

/// Well-known exit code used when the requested job is not registered
pub const NO_SUCH_JOB: &str = "NO_SUCH_JOB";
/// Well-known exit code used when no job name was given
pub const JOB_NOT_PROVIDED: &str = "JOB_NOT_PROVIDED";

/// Maps exit codes to process exit codes: `COMPLETED` is 0, an unknown job is
/// 2 and anything else is 1 unless a custom mapping says otherwise. For a
/// finished job, an unmapped exit code follows the job's status instead.
#[derive(Debug, Clone)]
pub struct ExitCodeMapper {
    mapping: HashMap<String, i32>,
}

impl Default for ExitCodeMapper {
    fn default() -> Self {
        let mapping = HashMap::from([
            (exit_codes::COMPLETED.to_string(), process_exit::SUCCESS),
            (exit_codes::FAILED.to_string(), process_exit::FAILURE),
            (JOB_NOT_PROVIDED.to_string(), process_exit::JOB_NOT_PROVIDED),
            (NO_SUCH_JOB.to_string(), process_exit::NO_SUCH_JOB),
        ]);
        Self { mapping }
    }
}

impl ExitCodeMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a mapping, e.g. for a custom step exit code
    pub fn with_mapping(mut self, exit_code: impl Into<String>, process_code: i32) -> Self {
        self.mapping.insert(exit_code.into(), process_code);
        self
    }

    pub fn int_value(&self, exit_code: &str) -> i32 {
        self.mapping
            .get(exit_code)
            .copied()
            .unwrap_or(process_exit::FAILURE)
    }

    /// Exit code for the result of a launch
    pub fn for_result(&self, result: &BatchResult<JobExecution>) -> i32 {
        match result {
            Ok(execution) => match self.mapping.get(&execution.exit_status.exit_code) {
                Some(code) => *code,
                None if execution.status() == BatchStatus::Completed => process_exit::SUCCESS,
                None => process_exit::FAILURE,
            },
            Err(BatchError::NoSuchJob(_)) => self.int_value(NO_SUCH_JOB),
            Err(_) => process_exit::FAILURE,
        }
    }
}
