use serde::{Deserialize, Serialize};

/// Outcome of one iteration of repeated work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepeatStatus {
    /// More work is available; call again
    Continuable,
    /// Work is done
    Finished,
}

impl RepeatStatus {
    pub fn is_continuable(&self) -> bool {
        matches!(self, Self::Continuable)
    }

    pub fn continue_if(continuable: bool) -> Self {
        if continuable {
            Self::Continuable
        } else {
            Self::Finished
        }
    }

    /// Continuable only while both sides are
    pub fn and(self, continuable: bool) -> Self {
        Self::continue_if(self.is_continuable() && continuable)
    }
}

/// State of one run of a repeat loop (one chunk, for a chunk step).
///
/// Policies may keep their counters here or on themselves; the engine only
/// guarantees a fresh context per chunk.
#[derive(Debug, Clone, Default)]
pub struct RepeatContext {
    started_count: usize,
    complete_only: bool,
    terminate_only: bool,
}

impl RepeatContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of iterations counted so far
    pub fn started_count(&self) -> usize {
        self.started_count
    }

    pub fn increment_count(&mut self) {
        self.started_count += 1;
    }

    /// Ask the loop to finish after the current iteration
    pub fn set_complete_only(&mut self) {
        self.complete_only = true;
    }

    pub fn is_complete_only(&self) -> bool {
        self.complete_only
    }

    /// Ask the loop to finish and the enclosing step to stop. A chunk step
    /// commits the open chunk and then ends STOPPED.
    pub fn set_terminate_only(&mut self) {
        self.terminate_only = true;
        self.complete_only = true;
    }

    pub fn is_terminate_only(&self) -> bool {
        self.terminate_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_status_and() {
        assert_eq!(
            RepeatStatus::Continuable.and(true),
            RepeatStatus::Continuable
        );
        assert_eq!(RepeatStatus::Continuable.and(false), RepeatStatus::Finished);
        assert_eq!(RepeatStatus::Finished.and(true), RepeatStatus::Finished);
    }

    #[test]
    fn test_terminate_implies_complete() {
        let mut ctx = RepeatContext::new();
        ctx.set_terminate_only();
        assert!(ctx.is_complete_only());
        assert!(ctx.is_terminate_only());
    }
}
