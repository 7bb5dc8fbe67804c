use crate::constants::context_keys::READ_COUNT_SUFFIX;
use crate::error::{StepError, StepResult};
use crate::models::ExecutionContext;
use async_trait::async_trait;
use std::collections::VecDeque;
use tracing::debug;

/// Source of items for a chunk step.
///
/// `read` returns `Ok(None)` once the input is exhausted. Readers that can
/// resume after a failure record their position in `update` and restore it in
/// `open`; the step calls `update` only after a chunk has been committed, so
/// the recorded position never runs ahead of what was written.
#[async_trait]
pub trait ItemReader<T: Send>: Send {
    async fn read(&mut self) -> StepResult<Option<T>>;

    /// Restore state from the step's execution context before the first read
    fn open(&mut self, context: &ExecutionContext) -> StepResult<()> {
        let _ = context;
        Ok(())
    }

    /// Save state into the step's execution context at a chunk commit
    fn update(&mut self, context: &mut ExecutionContext) -> StepResult<()> {
        let _ = context;
        Ok(())
    }

    fn close(&mut self) -> StepResult<()> {
        Ok(())
    }
}

fn read_count_key(name: &str) -> String {
    format!("{name}.{READ_COUNT_SUFFIX}")
}

fn restored_read_count(name: &str, context: &ExecutionContext) -> StepResult<usize> {
    match context.get_long(&read_count_key(name)) {
        Some(count) if count >= 0 => Ok(count as usize),
        Some(count) => Err(StepError::Context(format!(
            "negative read count {count} for reader '{name}'"
        ))),
        None => Ok(0),
    }
}

/// Reads from an in-memory list; restartable by item count
#[derive(Debug, Clone)]
pub struct ListItemReader<T> {
    name: String,
    items: VecDeque<T>,
    read_count: usize,
}

impl<T> ListItemReader<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self::with_name("ListItemReader", items)
    }

    /// A distinct name keeps the saved position of two readers in one step apart
    pub fn with_name(name: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            name: name.into(),
            items: items.into(),
            read_count: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

#[async_trait]
impl<T: Send + 'static> ItemReader<T> for ListItemReader<T> {
    async fn read(&mut self) -> StepResult<Option<T>> {
        let item = self.items.pop_front();
        if item.is_some() {
            self.read_count += 1;
        }
        Ok(item)
    }

    fn open(&mut self, context: &ExecutionContext) -> StepResult<()> {
        let resume_at = restored_read_count(&self.name, context)?;
        if resume_at > 0 {
            debug!(reader = %self.name, resume_at, "Resuming list reader");
        }
        while self.read_count < resume_at {
            if self.items.pop_front().is_none() {
                break;
            }
            self.read_count += 1;
        }
        Ok(())
    }

    fn update(&mut self, context: &mut ExecutionContext) -> StepResult<()> {
        context.put_long(read_count_key(&self.name), self.read_count as i64);
        Ok(())
    }
}

/// Reads from any iterator; restartable by skipping already-read items
pub struct IteratorItemReader<I> {
    name: String,
    iter: I,
    read_count: usize,
}

impl<I> IteratorItemReader<I> {
    pub fn new(iter: I) -> Self {
        Self::with_name("IteratorItemReader", iter)
    }

    pub fn with_name(name: impl Into<String>, iter: I) -> Self {
        Self {
            name: name.into(),
            iter,
            read_count: 0,
        }
    }
}

#[async_trait]
impl<I, T> ItemReader<T> for IteratorItemReader<I>
where
    I: Iterator<Item = T> + Send + 'static,
    T: Send + 'static,
{
    async fn read(&mut self) -> StepResult<Option<T>> {
        let item = self.iter.next();
        if item.is_some() {
            self.read_count += 1;
        }
        Ok(item)
    }

    fn open(&mut self, context: &ExecutionContext) -> StepResult<()> {
        let resume_at = restored_read_count(&self.name, context)?;
        while self.read_count < resume_at {
            if self.iter.next().is_none() {
                break;
            }
            self.read_count += 1;
        }
        Ok(())
    }

    fn update(&mut self, context: &mut ExecutionContext) -> StepResult<()> {
        context.put_long(read_count_key(&self.name), self.read_count as i64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_reader_drains_in_order() {
        let mut reader = ListItemReader::new(vec![1, 2, 3]);
        assert_eq!(reader.read().await.unwrap(), Some(1));
        assert_eq!(reader.read().await.unwrap(), Some(2));
        assert_eq!(reader.read().await.unwrap(), Some(3));
        assert_eq!(reader.read().await.unwrap(), None);
        assert_eq!(reader.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_reader_resumes_from_saved_position() {
        let mut first = ListItemReader::new(vec!["a", "b", "c", "d"]);
        first.read().await.unwrap();
        first.read().await.unwrap();
        let mut ctx = ExecutionContext::new();
        first.update(&mut ctx).unwrap();
        assert_eq!(ctx.get_long("ListItemReader.read.count"), Some(2));

        let mut second = ListItemReader::new(vec!["a", "b", "c", "d"]);
        second.open(&ctx).unwrap();
        assert_eq!(second.read().await.unwrap(), Some("c"));
        assert_eq!(second.remaining(), 1);
    }

    #[tokio::test]
    async fn test_iterator_reader_resumes() {
        let mut ctx = ExecutionContext::new();
        ctx.put_long("numbers.read.count", 3);

        let mut reader = IteratorItemReader::with_name("numbers", 0..5);
        reader.open(&ctx).unwrap();
        assert_eq!(reader.read().await.unwrap(), Some(3));
        assert_eq!(reader.read().await.unwrap(), Some(4));
        assert_eq!(reader.read().await.unwrap(), None);
    }

    #[test]
    fn test_negative_saved_count_is_rejected() {
        let mut ctx = ExecutionContext::new();
        ctx.put_long("ListItemReader.read.count", -1);
        let mut reader = ListItemReader::new(vec![1]);
        assert!(matches!(reader.open(&ctx), Err(StepError::Context(_))));
    }
}
