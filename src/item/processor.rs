use crate::error::StepResult;
use async_trait::async_trait;
use std::marker::PhantomData;

/// Transforms one item. Returning `Ok(None)` filters the item out of the chunk.
#[async_trait]
pub trait ItemProcessor<I: Send, O: Send>: Send + Sync {
    async fn process(&self, item: I) -> StepResult<Option<O>>;
}

/// Hands items through unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughItemProcessor;

#[async_trait]
impl<T: Send + 'static> ItemProcessor<T, T> for PassThroughItemProcessor {
    async fn process(&self, item: T) -> StepResult<Option<T>> {
        Ok(Some(item))
    }
}

/// Adapts a plain function into a processor
pub struct FunctionItemProcessor<F, I, O> {
    function: F,
    _marker: PhantomData<fn(I) -> O>,
}

impl<F, I, O> FunctionItemProcessor<F, I, O>
where
    F: Fn(I) -> StepResult<Option<O>> + Send + Sync,
{
    pub fn new(function: F) -> Self {
        Self {
            function,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, I, O> ItemProcessor<I, O> for FunctionItemProcessor<F, I, O>
where
    F: Fn(I) -> StepResult<Option<O>> + Send + Sync,
    I: Send + 'static,
    O: Send + 'static,
{
    async fn process(&self, item: I) -> StepResult<Option<O>> {
        (self.function)(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepError;

    #[tokio::test]
    async fn test_function_processor_filters_and_fails() {
        let processor = FunctionItemProcessor::new(|n: i32| match n {
            n if n < 0 => Err(StepError::process("negative")),
            n if n % 2 == 0 => Ok(None),
            n => Ok(Some(n * 10)),
        });

        assert_eq!(processor.process(3).await.unwrap(), Some(30));
        assert_eq!(processor.process(4).await.unwrap(), None);
        assert!(processor.process(-1).await.is_err());
    }

    #[tokio::test]
    async fn test_pass_through() {
        let processor = PassThroughItemProcessor;
        assert_eq!(
            ItemProcessor::<&str, &str>::process(&processor, "x")
                .await
                .unwrap(),
            Some("x")
        );
    }
}
