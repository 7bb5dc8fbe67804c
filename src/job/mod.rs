//! # Jobs
//!
//! A [`Job`] is a named, ordered set of steps plus the [`Flow`] that routes
//! between them. Jobs are immutable once built with [`JobBuilder`]; the
//! launcher reads them to drive a [`JobExecution`](crate::models::JobExecution).

pub mod builder;
pub mod flow;
pub mod incrementer;
pub mod listener;
pub mod validator;

pub use builder::{JobBuilder, TransitionBuilder};
pub use flow::{Flow, FlowDecision, Transition, TransitionTarget};
pub use incrementer::{JobParametersIncrementer, RunIdIncrementer, TimestampIncrementer};
pub use listener::{JobExecutionListener, LoggingJobListener};
pub use validator::{
    require_keys, CompositeJobParametersValidator, DefaultJobParametersValidator,
    JobParametersValidator,
};

use crate::error::ValidationError;
use crate::models::JobParameters;
use crate::step::Step;
use std::sync::Arc;

/// Immutable job definition
pub struct Job {
    name: String,
    steps: Vec<Arc<dyn Step>>,
    flow: Flow,
    validator: Option<Arc<dyn JobParametersValidator>>,
    incrementer: Option<Arc<dyn JobParametersIncrementer>>,
    listeners: Vec<Arc<dyn JobExecutionListener>>,
    restartable: bool,
}

impl Job {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Steps in declaration order
    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Option<&Arc<dyn Step>> {
        self.steps.iter().find(|step| step.name() == name)
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    pub fn incrementer(&self) -> Option<&dyn JobParametersIncrementer> {
        self.incrementer.as_deref()
    }

    pub fn listeners(&self) -> &[Arc<dyn JobExecutionListener>] {
        &self.listeners
    }

    pub fn is_restartable(&self) -> bool {
        self.restartable
    }

    /// Run the configured validator, if any
    pub fn validate_parameters(&self, parameters: &JobParameters) -> Result<(), ValidationError> {
        match &self.validator {
            Some(validator) => validator.validate(parameters),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("steps", &self.step_names())
            .field("flow", &self.flow)
            .field("has_validator", &self.validator.is_some())
            .field("has_incrementer", &self.incrementer.is_some())
            .field("restartable", &self.restartable)
            .finish()
    }
}
