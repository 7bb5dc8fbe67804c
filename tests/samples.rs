//! The demonstration jobs, launched through the operator

use batch_core::error::{BatchError, ValidationError};
use batch_core::launch::{ExitCodeMapper, JobOperator};
use batch_core::repository::InMemoryJobRepository;
use batch_core::samples::{
    sample_registry, CHUNK_JOB, CHUNK_JOB_ITEMS, JOB1, PASS_SUCCESS_FAIL_JOB, USER_NAME_KEY,
};
use batch_core::state_machine::BatchStatus;
use std::collections::HashMap;
use std::sync::Arc;

fn operator() -> JobOperator {
    JobOperator::new(
        Arc::new(sample_registry().unwrap()),
        Arc::new(InMemoryJobRepository::new()),
        2,
    )
}

fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_job1_promotes_test_parameter() {
    let operator = operator();
    let execution = operator
        .start(JOB1, &args(&[("name", "tester"), ("test", "hello")]))
        .await
        .unwrap();

    assert_eq!(execution.status(), BatchStatus::Completed);
    assert_eq!(execution.step_names(), vec!["step1", "step2"]);
    assert_eq!(
        execution.execution_context.get_string(USER_NAME_KEY),
        Some("hello")
    );
    assert!(execution.parameters.get_date_time("currentDate").is_some());
}

#[tokio::test]
async fn test_job1_requires_name() {
    let result = operator().start(JOB1, &args(&[("test", "hello")])).await;

    assert!(matches!(
        result,
        Err(BatchError::InvalidParameters {
            source: ValidationError::MissingRequiredKeys { .. },
            ..
        })
    ));
    assert_eq!(ExitCodeMapper::new().for_result(&result), 1);
}

#[tokio::test]
async fn test_job1_runs_again_with_a_new_timestamp() {
    let operator = operator();
    let params = args(&[("name", "tester"), ("test", "hello")]);
    let first = operator.start(JOB1, &params).await.unwrap();
    let second = operator.start(JOB1, &params).await.unwrap();

    assert_eq!(second.status(), BatchStatus::Completed);
    assert_ne!(first.instance.instance_id, second.instance.instance_id);
}

#[tokio::test]
async fn test_chunk_job_reads_every_item() {
    let execution = operator().start(CHUNK_JOB, &HashMap::new()).await.unwrap();
    let step = execution.step_execution("step3").unwrap();

    assert_eq!(execution.status(), BatchStatus::Completed);
    assert_eq!(step.read_count, CHUNK_JOB_ITEMS);
    assert_eq!(step.write_count, CHUNK_JOB_ITEMS);
    assert!(step.commit_count >= CHUNK_JOB_ITEMS / 20);
    assert!(step.commit_count <= CHUNK_JOB_ITEMS);
}

#[tokio::test]
async fn test_pass_success_fail_job_takes_failure_branch() {
    let execution = operator()
        .start(PASS_SUCCESS_FAIL_JOB, &HashMap::new())
        .await
        .unwrap();

    assert_eq!(execution.step_names(), vec!["passStep", "failStep"]);
    assert_eq!(
        execution.step_execution("passStep").unwrap().status(),
        BatchStatus::Failed
    );
    assert_eq!(execution.status(), BatchStatus::Completed);
    assert_eq!(ExitCodeMapper::new().for_result(&Ok(execution)), 0);
}

#[tokio::test]
async fn test_unknown_job_maps_to_exit_code_two() {
    let result = operator().start("noSuchJob", &HashMap::new()).await;
    assert!(matches!(result, Err(BatchError::NoSuchJob(_))));
    assert_eq!(ExitCodeMapper::new().for_result(&result), 2);
}

#[tokio::test]
async fn test_background_jobs_can_be_stopped() {
    let operator = operator();
    let handle = operator.start_async(CHUNK_JOB, &HashMap::new()).unwrap();
    handle.stop();
    let execution = handle.wait().await.unwrap();

    assert!(matches!(
        execution.status(),
        BatchStatus::Stopped | BatchStatus::Completed
    ));
}
