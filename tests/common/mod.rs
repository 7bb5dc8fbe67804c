//! Shared helpers for integration tests

#![allow(dead_code)]

pub mod strategies;

use async_trait::async_trait;
use batch_core::error::{StepError, StepResult};
use batch_core::item::{Chunk, ItemWriter};
use batch_core::launch::JobLauncher;
use batch_core::models::{ExitStatus, JobParameters, JobParametersBuilder};
use batch_core::repeat::RepeatStatus;
use batch_core::repository::InMemoryJobRepository;
use batch_core::step::{FunctionTasklet, StepBuilder, TaskletStep};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// A launcher together with the repository it writes to
pub fn launcher() -> (Arc<InMemoryJobRepository>, JobLauncher) {
    let repository = Arc::new(InMemoryJobRepository::new());
    let launcher = JobLauncher::new(repository.clone());
    (repository, launcher)
}

pub fn params(pairs: &[(&str, &str)]) -> JobParameters {
    pairs
        .iter()
        .fold(JobParametersBuilder::new(), |builder, (key, value)| {
            builder.add_string(*key, *value)
        })
        .build()
}

/// Order in which steps ran, shared between steps of one job
#[derive(Debug, Clone, Default)]
pub struct Trail {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Trail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

/// Step that records its name and completes
pub fn recording_step(name: &str, trail: &Trail) -> TaskletStep {
    let trail = trail.clone();
    let step_name = name.to_string();
    StepBuilder::new(name)
        .tasklet(FunctionTasklet::new(move |_, _| {
            trail.record(step_name.clone());
            Ok(RepeatStatus::Finished)
        }))
        .build()
}

/// Step that records its name and completes with a custom exit code
pub fn exit_code_step(name: &str, exit_code: &str, trail: &Trail) -> TaskletStep {
    let trail = trail.clone();
    let step_name = name.to_string();
    let exit_code = exit_code.to_string();
    StepBuilder::new(name)
        .tasklet(FunctionTasklet::new(move |contribution, _| {
            trail.record(step_name.clone());
            contribution.set_exit_status(ExitStatus::new(exit_code.clone()));
            Ok(RepeatStatus::Finished)
        }))
        .build()
}

/// Step that records its name and fails
pub fn failing_step(name: &str, trail: &Trail) -> TaskletStep {
    let trail = trail.clone();
    let step_name = name.to_string();
    StepBuilder::new(name)
        .tasklet(FunctionTasklet::new(move |_, _| {
            trail.record(step_name.clone());
            Err(StepError::tasklet(format!("{step_name} failed")))
        }))
        .build()
}

/// Switch flipped by a test to make a step or writer fail
#[derive(Debug, Clone)]
pub struct FailureSwitch {
    failing: Arc<AtomicBool>,
}

impl FailureSwitch {
    pub fn on() -> Self {
        Self {
            failing: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn off(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    pub fn is_on(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }
}

/// Step that fails while its switch is on and counts every run
pub fn switchable_step(name: &str, switch: &FailureSwitch, runs: Arc<AtomicUsize>) -> TaskletStep {
    let switch = switch.clone();
    StepBuilder::new(name)
        .tasklet(FunctionTasklet::new(move |_, _| {
            runs.fetch_add(1, Ordering::SeqCst);
            if switch.is_on() {
                Err(StepError::tasklet("switched to fail"))
            } else {
                Ok(RepeatStatus::Finished)
            }
        }))
        .build()
}

/// Writer that collects items and fails on any chunk containing `poison`
/// while its switch is on
#[derive(Debug, Clone)]
pub struct PoisonWriter {
    poison: i64,
    switch: FailureSwitch,
    written: Arc<Mutex<Vec<Vec<i64>>>>,
}

impl PoisonWriter {
    pub fn new(poison: i64, switch: &FailureSwitch) -> Self {
        Self {
            poison,
            switch: switch.clone(),
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn chunks(&self) -> Vec<Vec<i64>> {
        self.written.lock().clone()
    }

    pub fn items(&self) -> Vec<i64> {
        self.written.lock().iter().flatten().copied().collect()
    }
}

#[async_trait]
impl ItemWriter<i64> for PoisonWriter {
    async fn write(&self, chunk: &Chunk<i64>) -> StepResult<()> {
        if self.switch.is_on() && chunk.iter().any(|item| *item == self.poison) {
            return Err(StepError::write(format!("poisoned by {}", self.poison)));
        }
        self.written.lock().push(chunk.items().to_vec());
        Ok(())
    }
}
