//! Sharing data between steps through the job execution context

mod common;

use batch_core::error::StepError;
use batch_core::job::JobBuilder;
use batch_core::models::ExitStatus;
use batch_core::repeat::RepeatStatus;
use batch_core::state_machine::BatchStatus;
use batch_core::step::{ExecutionContextPromotionListener, FunctionTasklet, StepBuilder, TaskletStep};
use common::*;
use parking_lot::Mutex;
use std::sync::Arc;

fn writer_step(name: &str, entries: &[(&str, &str)]) -> ContextWriter {
    let entries: Vec<(String, String)> = entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ContextWriter::new(name, entries)
}

/// Step writing fixed entries into its own context, with a configurable listener
struct ContextWriter {
    name: String,
    entries: Vec<(String, String)>,
    exit_code: Option<String>,
}

impl ContextWriter {
    fn new(name: &str, entries: Vec<(String, String)>) -> Self {
        Self {
            name: name.to_string(),
            entries,
            exit_code: None,
        }
    }

    fn exit_code(mut self, code: &str) -> Self {
        self.exit_code = Some(code.to_string());
        self
    }

    fn promoting(self, listener: ExecutionContextPromotionListener) -> TaskletStep {
        let entries = self.entries;
        let exit_code = self.exit_code;
        StepBuilder::new(self.name)
            .tasklet(FunctionTasklet::new(move |contribution, context| {
                for (key, value) in &entries {
                    context.step_context_mut().put_string(key.clone(), value.clone());
                }
                if let Some(code) = &exit_code {
                    contribution.set_exit_status(ExitStatus::new(code.clone()));
                }
                Ok(RepeatStatus::Finished)
            }))
            .listener(listener)
            .build()
    }
}

fn reader_step(name: &str, key: &'static str, seen: Arc<Mutex<Option<String>>>) -> TaskletStep {
    StepBuilder::new(name)
        .tasklet(FunctionTasklet::new(move |_, context| {
            *seen.lock() = context.job_context().get_string(key).map(str::to_string);
            Ok(RepeatStatus::Finished)
        }))
        .build()
}

#[tokio::test]
async fn test_promoted_key_is_visible_to_later_steps() {
    let seen = Arc::new(Mutex::new(None));
    let job = JobBuilder::new("promote")
        .start(
            writer_step("produce", &[("user.name", "alice"), ("private", "x")])
                .promoting(ExecutionContextPromotionListener::new(["user.name"])),
        )
        .next(reader_step("consume", "user.name", seen.clone()))
        .build()
        .unwrap();

    let (_, launcher) = launcher();
    let execution = launcher.run(&job, params(&[])).await.unwrap();

    assert_eq!(execution.status(), BatchStatus::Completed);
    assert_eq!(seen.lock().as_deref(), Some("alice"));
    assert_eq!(execution.execution_context.get_string("user.name"), Some("alice"));
    assert!(!execution.execution_context.contains_key("private"));
}

#[tokio::test]
async fn test_unlisted_exit_code_is_not_promoted() {
    let seen = Arc::new(Mutex::new(None));
    let job = JobBuilder::new("no-promote")
        .start(
            writer_step("produce", &[("user.name", "bob")])
                .exit_code("PARTIAL")
                .promoting(ExecutionContextPromotionListener::new(["user.name"])),
        )
        .on("PARTIAL")
        .to(reader_step("consume", "user.name", seen.clone()))
        .build()
        .unwrap();

    let (_, launcher) = launcher();
    launcher.run(&job, params(&[])).await.unwrap();

    assert_eq!(*seen.lock(), None);
}

#[tokio::test]
async fn test_wildcard_statuses_promote() {
    let seen = Arc::new(Mutex::new(None));
    let job = JobBuilder::new("wildcard-promote")
        .start(
            writer_step("produce", &[("user.name", "carol")])
                .exit_code("PARTIAL")
                .promoting(
                    ExecutionContextPromotionListener::new(["user.name"])
                        .with_statuses(["COMPLETED", "PART*"]),
                ),
        )
        .on("PARTIAL")
        .to(reader_step("consume", "user.name", seen.clone()))
        .build()
        .unwrap();

    let (_, launcher) = launcher();
    launcher.run(&job, params(&[])).await.unwrap();

    assert_eq!(seen.lock().as_deref(), Some("carol"));
}

#[tokio::test]
async fn test_strict_promotion_of_missing_key_fails_step() {
    let job = JobBuilder::new("strict-promote")
        .start(
            writer_step("produce", &[])
                .promoting(ExecutionContextPromotionListener::new(["absent"]).strict(true)),
        )
        .build()
        .unwrap();

    let (_, launcher) = launcher();
    let execution = launcher.run(&job, params(&[])).await.unwrap();
    let step = execution.step_execution("produce").unwrap();

    assert_eq!(step.status(), BatchStatus::Failed);
    assert_eq!(execution.status(), BatchStatus::Failed);
    let expected = StepError::MissingPromotionKey {
        key: "absent".to_string(),
    }
    .to_string();
    assert!(step.failure_messages.iter().any(|m| m.contains(&expected)));
}

#[tokio::test]
async fn test_job_context_survives_restart() {
    let switch = FailureSwitch::on();
    let seen = Arc::new(Mutex::new(None));
    let job = JobBuilder::new("context-restart")
        .start(
            writer_step("produce", &[("token", "t-1")])
                .promoting(ExecutionContextPromotionListener::new(["token"])),
        )
        .next(switchable_step("flaky", &switch, Arc::new(Default::default())))
        .next(reader_step("consume", "token", seen.clone()))
        .build()
        .unwrap();

    let (_, launcher) = launcher();
    launcher.run(&job, params(&[])).await.unwrap();
    switch.off();
    let second = launcher.run(&job, params(&[])).await.unwrap();

    assert_eq!(second.status(), BatchStatus::Completed);
    assert_eq!(seen.lock().as_deref(), Some("t-1"));
}
