//! # Sample Jobs
//!
//! Three small jobs exercising the main features of the engine. They are
//! registered by [`sample_registry`] and can be run from the
//! `batch-launcher` binary.
//!
//! - `job1`: two tasklet steps sharing a value through context promotion,
//!   guarded by a validator and stamped by a timestamp incrementer
//! - `chunkJob`: 100 random UUID strings written in randomly sized chunks
//! - `passSuccessFailJob`: exit-status routing after a failing step

use crate::constants::system::SAMPLE_MAX_RANDOM_CHUNK;
use crate::error::{ConfigurationError, StepError};
use crate::item::{ListItemReader, LoggingItemWriter};
use crate::job::{
    CompositeJobParametersValidator, DefaultJobParametersValidator, Job, JobBuilder,
    LoggingJobListener, TimestampIncrementer,
};
use crate::launch::JobRegistry;
use crate::repeat::{RandomChunkSizePolicy, RepeatStatus};
use crate::step::{
    ExecutionContextPromotionListener, FunctionTasklet, LoggingStepListener, StepBuilder,
    TaskletStep,
};
use tracing::{info, warn};
use uuid::Uuid;

pub const JOB1: &str = "job1";
pub const CHUNK_JOB: &str = "chunkJob";
pub const PASS_SUCCESS_FAIL_JOB: &str = "passSuccessFailJob";

/// Context key step1 writes and step2 reads after promotion
pub const USER_NAME_KEY: &str = "user.name";

/// Number of items the chunk job reads
pub const CHUNK_JOB_ITEMS: usize = 100;

/// `step1` copies the `test` parameter into its context under `user.name`;
/// the promotion listener lifts it into the job context where `step2` reads it.
/// Requires a `name` parameter.
pub fn job1() -> Result<Job, ConfigurationError> {
    let step1 = StepBuilder::new("step1")
        .tasklet(FunctionTasklet::new(|_, context| {
            let name = context.job_parameters().get_value("name").map(ToString::to_string);
            match context.job_parameters().get_value("test").map(ToString::to_string) {
                Some(test) => {
                    context.step_context_mut().put_string(USER_NAME_KEY, test.clone());
                    info!(name = ?name, test = %test, step_context = %context.step_context(), "hello, world");
                }
                None => warn!(name = ?name, "No 'test' parameter given, nothing to promote"),
            }
            Ok(RepeatStatus::Finished)
        }))
        .listener(ExecutionContextPromotionListener::new([USER_NAME_KEY]))
        .build();

    let step2 = StepBuilder::new("step2")
        .tasklet(FunctionTasklet::new(|_, context| {
            let user_name = context.job_context().get_string(USER_NAME_KEY).map(str::to_string);
            info!(job_context = %context.job_context(), user_name = ?user_name, "hello, world2");
            Ok(RepeatStatus::Finished)
        }))
        .build();

    JobBuilder::new(JOB1)
        .start(step1)
        .next(step2)
        .validator(
            CompositeJobParametersValidator::new()
                .with(DefaultJobParametersValidator::new(["name"], [""])),
        )
        .incrementer(TimestampIncrementer::new())
        .build()
}

/// Reads fresh UUIDs on every execution and writes them in chunks whose size
/// is drawn at random below 20, with a draw of 0 closing after one item.
pub fn chunk_job() -> Result<Job, ConfigurationError> {
    let step3 = StepBuilder::new("step3")
        .chunk_with_policy::<String, _, _>(|| RandomChunkSizePolicy::new(SAMPLE_MAX_RANDOM_CHUNK))
        .reader(|_| {
            let uuids = (0..CHUNK_JOB_ITEMS)
                .map(|_| Uuid::new_v4().to_string())
                .collect();
            Ok(ListItemReader::new(uuids))
        })
        .writer(LoggingItemWriter::new("chunkWriter"))
        .listener(LoggingStepListener)
        .build()?;

    JobBuilder::new(CHUNK_JOB)
        .start(step3)
        .listener(LoggingJobListener)
        .build()
}

/// `passStep` always fails, so the job is routed to `failStep`. The `*`
/// route to `successStep` is only taken if `passStep` is changed to succeed.
pub fn pass_success_fail_job() -> Result<Job, ConfigurationError> {
    let pass_step = StepBuilder::new("passStep")
        .tasklet(FunctionTasklet::new(|_, _| {
            info!("PASS");
            Err(StepError::tasklet("passStep always fails"))
        }))
        .build();

    JobBuilder::new(PASS_SUCCESS_FAIL_JOB)
        .start(pass_step)
        .on("FAILED")
        .to(printing_step("failStep", "FAIL"))
        .from_named("passStep")
        .on("*")
        .to(printing_step("successStep", "SUCCESS"))
        .build()
}

fn printing_step(name: &str, message: &'static str) -> TaskletStep {
    StepBuilder::new(name)
        .tasklet(FunctionTasklet::new(move |_, _| {
            info!("{message}");
            Ok(RepeatStatus::Finished)
        }))
        .build()
}

/// A registry holding all three sample jobs
pub fn sample_registry() -> Result<JobRegistry, ConfigurationError> {
    let registry = JobRegistry::new();
    registry.register(job1()?)?;
    registry.register(chunk_job()?)?;
    registry.register(pass_success_fail_job()?)?;
    Ok(registry)
}
