//! # Flow Resolution
//!
//! After a step finishes, the flow picks what runs next from the step's exit
//! code:
//!
//! 1. Explicit transitions declared from that step are tried from most to
//!    least specific pattern; the first match wins.
//! 2. Otherwise a sequential `next` step runs, but only if the step completed.
//! 3. Otherwise the job ends with the step's status and exit status.

use crate::constants::exit_codes;
use crate::models::ExitStatus;
use crate::state_machine::BatchStatus;
use crate::utils::ExitCodePattern;
use std::collections::HashMap;
use std::fmt;

/// Where a transition leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionTarget {
    Step(String),
    /// End the job as COMPLETED
    End,
    /// End the job as FAILED
    Fail,
    /// End the job as STOPPED, leaving it restartable
    Stop,
}

impl fmt::Display for TransitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step(name) => write!(f, "{name}"),
            Self::End => write!(f, "END"),
            Self::Fail => write!(f, "FAIL"),
            Self::Stop => write!(f, "STOP"),
        }
    }
}

/// A routing rule from one step on an exit-code pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: String,
    pub pattern: ExitCodePattern,
    pub target: TransitionTarget,
}

impl Transition {
    pub fn new(
        from: impl Into<String>,
        pattern: impl Into<ExitCodePattern>,
        target: TransitionTarget,
    ) -> Self {
        Self {
            from: from.into(),
            pattern: pattern.into(),
            target,
        }
    }
}

/// Result of resolving a finished step against the flow
#[derive(Debug, Clone, PartialEq)]
pub enum FlowDecision {
    Next(String),
    Finish {
        status: BatchStatus,
        exit_status: ExitStatus,
    },
}

/// Routing table of a job
#[derive(Debug, Clone, Default)]
pub struct Flow {
    start: String,
    sequence: HashMap<String, String>,
    transitions: HashMap<String, Vec<Transition>>,
}

impl Flow {
    pub(crate) fn new(
        start: String,
        sequence: HashMap<String, String>,
        transitions: Vec<Transition>,
    ) -> Self {
        let mut by_source: HashMap<String, Vec<Transition>> = HashMap::new();
        for transition in transitions {
            let rules = by_source.entry(transition.from.clone()).or_default();
            // First declaration of a pattern wins
            if !rules.iter().any(|t| t.pattern == transition.pattern) {
                rules.push(transition);
            }
        }
        for rules in by_source.values_mut() {
            rules.sort_by(|a, b| a.pattern.cmp_specificity(&b.pattern));
        }
        Self {
            start,
            sequence,
            transitions: by_source,
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    /// Sequential successor of a step, if one was declared
    pub fn next_of(&self, step_name: &str) -> Option<&str> {
        self.sequence.get(step_name).map(String::as_str)
    }

    /// Explicit transitions from a step, most specific first
    pub fn transitions_from(&self, step_name: &str) -> &[Transition] {
        self.transitions
            .get(step_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every transition in the flow
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values().flatten()
    }

    /// Decide what follows a finished step
    pub fn resolve(
        &self,
        step_name: &str,
        status: BatchStatus,
        exit_status: &ExitStatus,
    ) -> FlowDecision {
        if let Some(transition) = self
            .transitions_from(step_name)
            .iter()
            .find(|t| t.pattern.matches(&exit_status.exit_code))
        {
            return match &transition.target {
                TransitionTarget::Step(next) => FlowDecision::Next(next.clone()),
                TransitionTarget::End => FlowDecision::Finish {
                    status: BatchStatus::Completed,
                    exit_status: ExitStatus::completed(),
                },
                TransitionTarget::Fail => FlowDecision::Finish {
                    status: BatchStatus::Failed,
                    exit_status: ExitStatus::new(exit_codes::FAILED).add_description(format!(
                        "Flow failed at step '{step_name}' on exit code {}",
                        exit_status.exit_code
                    )),
                },
                TransitionTarget::Stop => FlowDecision::Finish {
                    status: BatchStatus::Stopped,
                    exit_status: ExitStatus::stopped(),
                },
            };
        }

        if status == BatchStatus::Completed {
            if let Some(next) = self.next_of(step_name) {
                return FlowDecision::Next(next.to_string());
            }
        }

        FlowDecision::Finish {
            status,
            exit_status: exit_status.clone(),
        }
    }
}
