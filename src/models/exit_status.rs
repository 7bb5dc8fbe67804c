use crate::constants::{exit_codes, system::MAX_EXIT_DESCRIPTION_LENGTH};
use crate::state_machine::BatchStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exit code plus free-form description produced when a step or job finishes.
///
/// Flow transitions match on [`exit_code`](Self::exit_code). Codes outside the
/// well-known set are allowed so steps can steer their own routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExitStatus {
    pub exit_code: String,
    pub exit_description: String,
}

impl ExitStatus {
    pub fn new(exit_code: impl Into<String>) -> Self {
        Self {
            exit_code: exit_code.into(),
            exit_description: String::new(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(exit_codes::UNKNOWN)
    }

    pub fn executing() -> Self {
        Self::new(exit_codes::EXECUTING)
    }

    pub fn completed() -> Self {
        Self::new(exit_codes::COMPLETED)
    }

    pub fn noop() -> Self {
        Self::new(exit_codes::NOOP)
    }

    pub fn failed() -> Self {
        Self::new(exit_codes::FAILED)
    }

    pub fn stopped() -> Self {
        Self::new(exit_codes::STOPPED)
    }

    /// Default exit status for a terminal batch status
    pub fn for_status(status: BatchStatus) -> Self {
        match status {
            BatchStatus::Completed => Self::completed(),
            BatchStatus::Failed => Self::failed(),
            BatchStatus::Stopped => Self::stopped(),
            BatchStatus::Starting | BatchStatus::Started => Self::executing(),
        }
    }

    /// Append to the description, separated by "; "
    pub fn add_description(mut self, description: impl AsRef<str>) -> Self {
        let description = description.as_ref();
        if description.is_empty() {
            return self;
        }
        if self.exit_description.is_empty() {
            self.exit_description = description.to_string();
        } else if !self.exit_description.contains(description) {
            self.exit_description.push_str("; ");
            self.exit_description.push_str(description);
        }
        if self.exit_description.len() > MAX_EXIT_DESCRIPTION_LENGTH {
            let mut cut = MAX_EXIT_DESCRIPTION_LENGTH;
            while !self.exit_description.is_char_boundary(cut) {
                cut -= 1;
            }
            self.exit_description.truncate(cut);
        }
        self
    }

    /// Combine with another status: the more severe code wins and the
    /// descriptions are concatenated.
    pub fn and(self, other: ExitStatus) -> ExitStatus {
        let self_wins = match self.severity().cmp(&other.severity()) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.exit_code >= other.exit_code,
        };
        let (winner, loser) = if self_wins { (self, other) } else { (other, self) };
        winner.add_description(loser.exit_description)
    }

    /// Whether the status still describes work in progress
    pub fn is_running(&self) -> bool {
        self.exit_code == exit_codes::EXECUTING || self.exit_code == exit_codes::UNKNOWN
    }

    fn severity(&self) -> u8 {
        match self.exit_code.as_str() {
            exit_codes::EXECUTING => 1,
            exit_codes::COMPLETED => 2,
            exit_codes::NOOP => 3,
            exit_codes::STOPPED => 4,
            exit_codes::FAILED => 5,
            exit_codes::UNKNOWN => 6,
            _ => 7,
        }
    }
}

impl Default for ExitStatus {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exit_description.is_empty() {
            write!(f, "exitCode={}", self.exit_code)
        } else {
            write!(
                f,
                "exitCode={};exitDescription={}",
                self.exit_code, self.exit_description
            )
        }
    }
}
