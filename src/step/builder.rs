//! Fluent construction of steps.
//!
//! ```rust,no_run
//! use batch_core::item::{ListItemReader, LoggingItemWriter};
//! use batch_core::repeat::RepeatStatus;
//! use batch_core::step::{FunctionTasklet, StepBuilder};
//!
//! let tasklet_step = StepBuilder::new("greet")
//!     .tasklet(FunctionTasklet::new(|_, _| Ok(RepeatStatus::Finished)))
//!     .build();
//!
//! let chunk_step = StepBuilder::new("copy")
//!     .chunk::<String>(10)
//!     .reader(|_| Ok(ListItemReader::new(vec!["a".to_string(), "b".to_string()])))
//!     .writer(LoggingItemWriter::new("copy"))
//!     .build()
//!     .expect("reader and writer are set");
//! ```

use super::chunk::{PolicyFactory, ReaderFactory};
use super::{
    ChunkOrientedStep, LimitCheckingSkipPolicy, SkipPolicy, StepExecutionListener, StepScope,
    Tasklet, TaskletStep,
};
use crate::error::{ConfigurationError, StepResult};
use crate::item::{ItemProcessor, ItemReader, ItemWriter, PassThroughItemProcessor};
use crate::repeat::{CompletionPolicy, SimpleCompletionPolicy};
use std::sync::Arc;

/// Entry point holding the settings shared by every step kind
pub struct StepBuilder {
    name: String,
    listeners: Vec<Arc<dyn StepExecutionListener>>,
    allow_start_if_complete: bool,
}

impl StepBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listeners: Vec::new(),
            allow_start_if_complete: false,
        }
    }

    pub fn listener<L: StepExecutionListener + 'static>(mut self, listener: L) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn allow_start_if_complete(mut self, allow: bool) -> Self {
        self.allow_start_if_complete = allow;
        self
    }

    pub fn tasklet<T: Tasklet + 'static>(self, tasklet: T) -> TaskletStepBuilder {
        TaskletStepBuilder {
            common: self,
            tasklet: Arc::new(tasklet),
        }
    }

    /// Chunk step closing a chunk every `chunk_size` items
    pub fn chunk<T: Send + Sync + 'static>(self, chunk_size: usize) -> SimpleStepBuilder<T, T> {
        SimpleStepBuilder::new(
            self,
            Arc::new(move || {
                Box::new(SimpleCompletionPolicy::new(chunk_size)) as Box<dyn CompletionPolicy>
            }),
            (chunk_size == 0).then(|| "chunk size must be at least 1".to_string()),
        )
    }

    /// Chunk step whose chunk boundaries come from a custom policy. The
    /// factory runs once per step execution.
    pub fn chunk_with_policy<T, P, F>(self, factory: F) -> SimpleStepBuilder<T, T>
    where
        T: Send + Sync + 'static,
        P: CompletionPolicy + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        SimpleStepBuilder::new(
            self,
            Arc::new(move || Box::new(factory()) as Box<dyn CompletionPolicy>),
            None,
        )
    }
}

pub struct TaskletStepBuilder {
    common: StepBuilder,
    tasklet: Arc<dyn Tasklet>,
}

impl TaskletStepBuilder {
    pub fn listener<L: StepExecutionListener + 'static>(mut self, listener: L) -> Self {
        self.common = self.common.listener(listener);
        self
    }

    pub fn allow_start_if_complete(mut self, allow: bool) -> Self {
        self.common = self.common.allow_start_if_complete(allow);
        self
    }

    pub fn build(self) -> TaskletStep {
        TaskletStep::new(self.common.name, self.tasklet)
            .with_listeners(self.common.listeners)
            .with_allow_start_if_complete(self.common.allow_start_if_complete)
    }
}

/// Builder for [`ChunkOrientedStep`]. Items pass through unchanged until a
/// processor is set; set the processor before the writer, since changing the
/// output type discards a writer of the old type.
pub struct SimpleStepBuilder<I, O> {
    common: StepBuilder,
    policy_factory: PolicyFactory,
    reader: Option<ReaderFactory<I>>,
    processor: Arc<dyn ItemProcessor<I, O>>,
    writer: Option<Arc<dyn ItemWriter<O>>>,
    skip_policy: Option<Arc<dyn SkipPolicy>>,
    invalid: Option<String>,
}

impl<T: Send + Sync + 'static> SimpleStepBuilder<T, T> {
    fn new(common: StepBuilder, policy_factory: PolicyFactory, invalid: Option<String>) -> Self {
        Self {
            common,
            policy_factory,
            reader: None,
            processor: Arc::new(PassThroughItemProcessor),
            writer: None,
            skip_policy: None,
            invalid,
        }
    }
}

impl<I, O> SimpleStepBuilder<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    /// Reader factory, invoked at the start of every step execution
    pub fn reader<R, F>(mut self, factory: F) -> Self
    where
        R: ItemReader<I> + 'static,
        F: Fn(&StepScope<'_>) -> StepResult<R> + Send + Sync + 'static,
    {
        self.reader = Some(Arc::new(move |scope: &StepScope<'_>| {
            factory(scope).map(|reader| Box::new(reader) as Box<dyn ItemReader<I>>)
        }));
        self
    }

    pub fn processor<O2, P>(self, processor: P) -> SimpleStepBuilder<I, O2>
    where
        O2: Send + Sync + 'static,
        P: ItemProcessor<I, O2> + 'static,
    {
        SimpleStepBuilder {
            common: self.common,
            policy_factory: self.policy_factory,
            reader: self.reader,
            processor: Arc::new(processor),
            writer: None,
            skip_policy: self.skip_policy,
            invalid: self.invalid,
        }
    }

    pub fn writer<W: ItemWriter<O> + 'static>(mut self, writer: W) -> Self {
        self.writer = Some(Arc::new(writer));
        self
    }

    pub fn skip_policy<P: SkipPolicy + 'static>(mut self, policy: P) -> Self {
        self.skip_policy = Some(Arc::new(policy));
        self
    }

    /// Skip up to `limit` read or process faults
    pub fn skip_limit(self, limit: usize) -> Self {
        self.skip_policy(LimitCheckingSkipPolicy::new(limit))
    }

    pub fn listener<L: StepExecutionListener + 'static>(mut self, listener: L) -> Self {
        self.common = self.common.listener(listener);
        self
    }

    pub fn allow_start_if_complete(mut self, allow: bool) -> Self {
        self.common = self.common.allow_start_if_complete(allow);
        self
    }

    pub fn build(self) -> Result<ChunkOrientedStep<I, O>, ConfigurationError> {
        let name = self.common.name;
        if let Some(reason) = self.invalid {
            return Err(ConfigurationError::Invalid(format!("step '{name}': {reason}")));
        }
        let reader = self.reader.ok_or_else(|| ConfigurationError::MissingComponent {
            step: name.clone(),
            component: "reader".to_string(),
        })?;
        let writer = self.writer.ok_or_else(|| ConfigurationError::MissingComponent {
            step: name.clone(),
            component: "writer".to_string(),
        })?;

        Ok(ChunkOrientedStep::new(
            name,
            reader,
            self.processor,
            writer,
            self.policy_factory,
            self.skip_policy,
            self.common.listeners,
            self.common.allow_start_if_complete,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{FunctionItemProcessor, ListItemReader, ListItemWriter};
    use crate::repeat::RepeatStatus;
    use crate::step::{FunctionTasklet, LoggingStepListener, Step};

    #[test]
    fn test_tasklet_step_settings() {
        let step = StepBuilder::new("step1")
            .listener(LoggingStepListener)
            .tasklet(FunctionTasklet::new(|_, _| Ok(RepeatStatus::Finished)))
            .allow_start_if_complete(true)
            .build();

        assert_eq!(step.name(), "step1");
        assert_eq!(step.listeners().len(), 1);
        assert!(step.allow_start_if_complete());
    }

    #[test]
    fn test_chunk_step_requires_reader_and_writer() {
        let missing_reader = StepBuilder::new("chunk")
            .chunk::<u8>(5)
            .writer(ListItemWriter::new())
            .build();
        assert_eq!(
            missing_reader.unwrap_err(),
            ConfigurationError::MissingComponent {
                step: "chunk".into(),
                component: "reader".into()
            }
        );

        let missing_writer = StepBuilder::new("chunk")
            .chunk::<u8>(5)
            .reader(|_| Ok(ListItemReader::new(vec![1u8])))
            .build();
        assert!(matches!(
            missing_writer,
            Err(ConfigurationError::MissingComponent { ref component, .. }) if component == "writer"
        ));
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let result = StepBuilder::new("chunk")
            .chunk::<u8>(0)
            .reader(|_| Ok(ListItemReader::new(vec![1u8])))
            .writer(ListItemWriter::new())
            .build();
        assert!(matches!(result, Err(ConfigurationError::Invalid(_))));
    }

    #[test]
    fn test_processor_changes_output_type() {
        let step = StepBuilder::new("lengths")
            .chunk::<String>(2)
            .reader(|_| Ok(ListItemReader::new(vec!["a".to_string()])))
            .processor(FunctionItemProcessor::new(|s: String| Ok(Some(s.len()))))
            .writer(ListItemWriter::<usize>::new())
            .skip_limit(3)
            .build()
            .unwrap();
        assert_eq!(step.name(), "lengths");
    }
}
