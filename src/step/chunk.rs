//! # Chunk-Oriented Steps
//!
//! Items are read and processed one at a time and written in batches. A
//! chunk closes when its [`CompletionPolicy`] says so or when the reader is
//! exhausted. Each chunk is one transaction: the counts gathered in its
//! [`StepContribution`] are applied to the step execution only after the
//! writer succeeds. A writer failure rolls the chunk back and fails the step.

use super::{SkipPolicy, Step, StepExecutionListener, StepOutcome, StepScope};
use crate::constants::events;
use crate::error::{StepError, StepResult};
use crate::item::{Chunk, ItemProcessor, ItemReader, ItemWriter};
use crate::models::{StepContribution, StepExecution};
use crate::repeat::{CompletionPolicy, RepeatContext, RepeatStatus};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds the reader for one step execution. The reader is created when the
/// step starts, so it can depend on the job parameters.
pub type ReaderFactory<I> =
    Arc<dyn Fn(&StepScope<'_>) -> StepResult<Box<dyn ItemReader<I>>> + Send + Sync>;

/// Builds a fresh completion policy for one step execution
pub type PolicyFactory = Arc<dyn Fn() -> Box<dyn CompletionPolicy> + Send + Sync>;

/// Step that moves items from a reader through a processor to a writer
pub struct ChunkOrientedStep<I, O> {
    name: String,
    reader_factory: ReaderFactory<I>,
    processor: Arc<dyn ItemProcessor<I, O>>,
    writer: Arc<dyn ItemWriter<O>>,
    policy_factory: PolicyFactory,
    skip_policy: Option<Arc<dyn SkipPolicy>>,
    listeners: Vec<Arc<dyn StepExecutionListener>>,
    allow_start_if_complete: bool,
}

impl<I, O> ChunkOrientedStep<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        reader_factory: ReaderFactory<I>,
        processor: Arc<dyn ItemProcessor<I, O>>,
        writer: Arc<dyn ItemWriter<O>>,
        policy_factory: PolicyFactory,
        skip_policy: Option<Arc<dyn SkipPolicy>>,
        listeners: Vec<Arc<dyn StepExecutionListener>>,
        allow_start_if_complete: bool,
    ) -> Self {
        Self {
            name,
            reader_factory,
            processor,
            writer,
            policy_factory,
            skip_policy,
            listeners,
            allow_start_if_complete,
        }
    }

    /// Offer an item fault to the skip policy. `Ok(())` means the item is
    /// skipped; otherwise the returned error fails the step.
    fn skip_or_fail(
        &self,
        error: StepError,
        step_execution: &StepExecution,
        contribution: &StepContribution,
    ) -> StepResult<()> {
        let Some(policy) = &self.skip_policy else {
            return Err(error);
        };
        let skipped_so_far = step_execution.skip_count()
            + contribution.read_skip_count
            + contribution.process_skip_count;
        if policy.should_skip(&error, skipped_so_far)? {
            warn!(step_name = %self.name, error = %error, "Skipping faulty item");
            Ok(())
        } else {
            Err(error)
        }
    }

    async fn process_chunks(
        &self,
        reader: &mut dyn ItemReader<I>,
        policy: &mut dyn CompletionPolicy,
        step_execution: &mut StepExecution,
        scope: &StepScope<'_>,
    ) -> StepResult<StepOutcome> {
        let parent = RepeatContext::new();
        loop {
            if scope.stop_signal.is_stop_requested() {
                info!(step_name = %self.name, "Stop requested between chunks");
                return Ok(StepOutcome::Stopped);
            }

            let mut context = policy.start(&parent)?;
            let mut contribution = StepContribution::new();
            let mut outputs = Vec::new();
            let mut exhausted = false;
            let mut terminated = false;

            loop {
                let item = match reader.read().await {
                    Ok(Some(item)) => item,
                    Ok(None) => {
                        exhausted = true;
                        break;
                    }
                    Err(error) => {
                        self.skip_or_fail(error, step_execution, &contribution)?;
                        contribution.read_skip_count += 1;
                        continue;
                    }
                };
                contribution.increment_read_count();

                match self.processor.process(item).await {
                    Ok(Some(output)) => outputs.push(output),
                    Ok(None) => contribution.increment_filter_count(),
                    Err(error) => {
                        self.skip_or_fail(error, step_execution, &contribution)?;
                        contribution.process_skip_count += 1;
                    }
                }

                policy.update(&mut context)?;
                if context.is_terminate_only() {
                    terminated = true;
                    break;
                }
                if policy.is_complete_for_result(&context, RepeatStatus::Continuable)? {
                    break;
                }
            }

            let touched = contribution.read_count > 0 || contribution.read_skip_count > 0;
            if !outputs.is_empty() {
                let chunk = Chunk::new(outputs);
                if let Err(error) = self.writer.write(&chunk).await {
                    step_execution.rollback_count += 1;
                    warn!(
                        step_name = %self.name,
                        operation = events::CHUNK_ROLLED_BACK,
                        items = chunk.len(),
                        error = %error,
                        "Chunk write failed, rolling back"
                    );
                    return Err(error);
                }
                contribution.increment_write_count(chunk.len());
            }

            if touched {
                step_execution.apply_contribution(&contribution);
                step_execution.commit_count += 1;
                reader.update(&mut step_execution.execution_context)?;
                scope.repository.save_step_execution(step_execution).await?;
                debug!(
                    step_name = %self.name,
                    operation = events::CHUNK_COMMITTED,
                    read = contribution.read_count,
                    written = contribution.write_count,
                    filtered = contribution.filter_count,
                    commit_count = step_execution.commit_count,
                    "Chunk committed"
                );
            }

            if exhausted {
                return Ok(StepOutcome::completed());
            }
            if terminated {
                info!(
                    step_name = %self.name,
                    policy = policy.name(),
                    "Completion policy terminated the step"
                );
                return Ok(StepOutcome::Stopped);
            }
        }
    }
}

impl<I, O> std::fmt::Debug for ChunkOrientedStep<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkOrientedStep")
            .field("name", &self.name)
            .field("skip_policy", &self.skip_policy.is_some())
            .field("listeners", &self.listeners.len())
            .field("allow_start_if_complete", &self.allow_start_if_complete)
            .finish()
    }
}

#[async_trait]
impl<I, O> Step for ChunkOrientedStep<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn listeners(&self) -> &[Arc<dyn StepExecutionListener>] {
        &self.listeners
    }

    fn allow_start_if_complete(&self) -> bool {
        self.allow_start_if_complete
    }

    async fn do_execute(
        &self,
        step_execution: &mut StepExecution,
        scope: &StepScope<'_>,
    ) -> StepResult<StepOutcome> {
        let mut reader = (self.reader_factory)(scope)?;
        reader.open(&step_execution.execution_context)?;
        let mut policy = (self.policy_factory)();
        debug!(step_name = %self.name, policy = policy.name(), "Chunk step opened");

        let result = self
            .process_chunks(reader.as_mut(), policy.as_mut(), step_execution, scope)
            .await;
        let closed = reader.close();
        let outcome = result?;
        closed?;
        Ok(outcome)
    }
}
