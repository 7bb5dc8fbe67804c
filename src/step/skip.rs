//! Skip policies for item-level faults in chunk steps.
//!
//! Only read and process faults are ever offered to a skip policy. A write
//! fault always rolls the chunk back and fails the step.

use crate::error::{StepError, StepResult};

/// Decides whether a faulty item may be skipped
pub trait SkipPolicy: Send + Sync {
    /// `skip_count` is the number of items already skipped in this step
    /// execution. Returning an error fails the step with that error.
    fn should_skip(&self, error: &StepError, skip_count: usize) -> StepResult<bool>;
}

/// Skips item faults until `skip_limit` items have been skipped, then fails
/// with [`StepError::SkipLimitExceeded`].
#[derive(Debug, Clone)]
pub struct LimitCheckingSkipPolicy {
    skip_limit: usize,
}

impl LimitCheckingSkipPolicy {
    pub fn new(skip_limit: usize) -> Self {
        Self { skip_limit }
    }

    pub fn skip_limit(&self) -> usize {
        self.skip_limit
    }
}

impl SkipPolicy for LimitCheckingSkipPolicy {
    fn should_skip(&self, error: &StepError, skip_count: usize) -> StepResult<bool> {
        if !error.is_item_fault() {
            return Ok(false);
        }
        if skip_count < self.skip_limit {
            Ok(true)
        } else {
            Err(StepError::SkipLimitExceeded {
                limit: self.skip_limit,
            })
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlwaysSkipItemSkipPolicy;

impl SkipPolicy for AlwaysSkipItemSkipPolicy {
    fn should_skip(&self, error: &StepError, _skip_count: usize) -> StepResult<bool> {
        Ok(error.is_item_fault())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NeverSkipItemSkipPolicy;

impl SkipPolicy for NeverSkipItemSkipPolicy {
    fn should_skip(&self, _error: &StepError, _skip_count: usize) -> StepResult<bool> {
        Ok(false)
    }
}
