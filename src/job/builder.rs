//! Fluent job definition.
//!
//! ```rust,no_run
//! use batch_core::job::JobBuilder;
//! use batch_core::repeat::RepeatStatus;
//! use batch_core::step::{FunctionTasklet, StepBuilder};
//! use std::sync::Arc;
//!
//! let pass = Arc::new(
//!     StepBuilder::new("passStep")
//!         .tasklet(FunctionTasklet::new(|_, _| Ok(RepeatStatus::Finished)))
//!         .build(),
//! );
//! let job = JobBuilder::new("passSuccessFailJob")
//!     .start(pass.clone())
//!     .on("FAILED")
//!     .to_named("failStep")
//!     .from(pass)
//!     .on("*")
//!     .to_named("successStep")
//!     .build();
//! assert!(job.is_err(), "failStep and successStep were never declared");
//! ```

use super::{
    Flow, Job, JobExecutionListener, JobParametersIncrementer, JobParametersValidator, Transition,
    TransitionTarget,
};
use crate::error::ConfigurationError;
use crate::step::Step;
use std::collections::HashMap;
use std::sync::Arc;

/// Anything that can be placed in a job: a concrete step, or a shared one
/// already referenced elsewhere in the flow.
pub trait IntoStep {
    fn into_step(self) -> Arc<dyn Step>;
}

impl<S: Step + 'static> IntoStep for S {
    fn into_step(self) -> Arc<dyn Step> {
        Arc::new(self)
    }
}

impl IntoStep for Arc<dyn Step> {
    fn into_step(self) -> Arc<dyn Step> {
        self
    }
}

impl<S: Step + 'static> IntoStep for Arc<S> {
    fn into_step(self) -> Arc<dyn Step> {
        self
    }
}

pub struct JobBuilder {
    name: String,
    steps: Vec<Arc<dyn Step>>,
    start: Option<String>,
    current: Option<String>,
    sequence: HashMap<String, String>,
    transitions: Vec<Transition>,
    validator: Option<Arc<dyn JobParametersValidator>>,
    incrementer: Option<Arc<dyn JobParametersIncrementer>>,
    listeners: Vec<Arc<dyn JobExecutionListener>>,
    restartable: bool,
    error: Option<ConfigurationError>,
}

impl JobBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            start: None,
            current: None,
            sequence: HashMap::new(),
            transitions: Vec::new(),
            validator: None,
            incrementer: None,
            listeners: Vec::new(),
            restartable: true,
            error: None,
        }
    }

    pub fn validator<V: JobParametersValidator + 'static>(mut self, validator: V) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn incrementer<I: JobParametersIncrementer + 'static>(mut self, incrementer: I) -> Self {
        self.incrementer = Some(Arc::new(incrementer));
        self
    }

    pub fn listener<L: JobExecutionListener + 'static>(mut self, listener: L) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Whether a failed or stopped instance may be launched again
    pub fn restartable(mut self, restartable: bool) -> Self {
        self.restartable = restartable;
        self
    }

    /// First step of the job
    pub fn start(mut self, step: impl IntoStep) -> Self {
        let name = self.register(step.into_step());
        self.start = Some(name.clone());
        self.current = Some(name);
        self
    }

    /// Run `step` after the current one when the current one completes
    pub fn next(mut self, step: impl IntoStep) -> Self {
        let name = self.register(step.into_step());
        match self.current.take() {
            Some(previous) => {
                self.sequence.insert(previous, name.clone());
            }
            None => self.start = Some(name.clone()),
        }
        self.current = Some(name);
        self
    }

    /// Declare a transition from the current step on an exit-code pattern
    pub fn on(self, pattern: impl Into<String>) -> TransitionBuilder {
        TransitionBuilder {
            builder: self,
            pattern: pattern.into(),
        }
    }

    /// Make an already declared step the current one, to add more transitions
    pub fn from(mut self, step: impl IntoStep) -> Self {
        let name = self.register(step.into_step());
        self.current = Some(name);
        self
    }

    /// Like [`from`](Self::from), referring to the step by name
    pub fn from_named(mut self, name: impl Into<String>) -> Self {
        self.current = Some(name.into());
        self
    }

    pub fn build(self) -> Result<Job, ConfigurationError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let start = self.start.ok_or_else(|| ConfigurationError::EmptyJob {
            job: self.name.clone(),
        })?;

        let known = |name: &str| self.steps.iter().any(|step| step.name() == name);
        for transition in &self.transitions {
            if !known(&transition.from) {
                return Err(ConfigurationError::UnknownTransitionSource {
                    job: self.name.clone(),
                    from: transition.from.clone(),
                });
            }
            if let TransitionTarget::Step(target) = &transition.target {
                if !known(target) {
                    return Err(ConfigurationError::UnknownTransitionTarget {
                        job: self.name.clone(),
                        from: transition.from.clone(),
                        pattern: transition.pattern.to_string(),
                        target: target.clone(),
                    });
                }
            }
        }

        Ok(Job {
            flow: Flow::new(start, self.sequence, self.transitions),
            name: self.name,
            steps: self.steps,
            validator: self.validator,
            incrementer: self.incrementer,
            listeners: self.listeners,
            restartable: self.restartable,
        })
    }

    /// Add a step unless the very same step is already present. A different
    /// step under an existing name is a configuration error.
    fn register(&mut self, step: Arc<dyn Step>) -> String {
        let name = step.name().to_string();
        match self.steps.iter().find(|existing| existing.name() == name) {
            Some(existing) => {
                let same = std::ptr::eq(
                    Arc::as_ptr(existing) as *const (),
                    Arc::as_ptr(&step) as *const (),
                );
                if !same && self.error.is_none() {
                    self.error = Some(ConfigurationError::DuplicateStep {
                        job: self.name.clone(),
                        step: name.clone(),
                    });
                }
            }
            None => self.steps.push(step),
        }
        name
    }

    fn add_transition(mut self, pattern: String, target: TransitionTarget) -> Self {
        match &self.current {
            Some(from) => self
                .transitions
                .push(Transition::new(from.clone(), pattern, target)),
            None => {
                if self.error.is_none() {
                    self.error = Some(ConfigurationError::Invalid(format!(
                        "job '{}': transition on '{pattern}' declared before any step",
                        self.name
                    )));
                }
            }
        }
        self
    }
}

/// Pending transition awaiting its target
pub struct TransitionBuilder {
    builder: JobBuilder,
    pattern: String,
}

impl TransitionBuilder {
    /// Route to `step`, which becomes the current step
    pub fn to(self, step: impl IntoStep) -> JobBuilder {
        let mut builder = self.builder;
        let name = builder.register(step.into_step());
        let mut builder = builder.add_transition(self.pattern, TransitionTarget::Step(name.clone()));
        builder.current = Some(name);
        builder
    }

    /// Route to a step declared elsewhere in the job
    pub fn to_named(self, name: impl Into<String>) -> JobBuilder {
        let name = name.into();
        let mut builder = self
            .builder
            .add_transition(self.pattern, TransitionTarget::Step(name.clone()));
        builder.current = Some(name);
        builder
    }

    /// End the job as COMPLETED
    pub fn end(self) -> JobBuilder {
        self.builder.add_transition(self.pattern, TransitionTarget::End)
    }

    /// End the job as FAILED
    pub fn fail(self) -> JobBuilder {
        self.builder.add_transition(self.pattern, TransitionTarget::Fail)
    }

    /// End the job as STOPPED
    pub fn stop(self) -> JobBuilder {
        self.builder.add_transition(self.pattern, TransitionTarget::Stop)
    }
}
