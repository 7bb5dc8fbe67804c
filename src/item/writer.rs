use crate::error::StepResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::info;

/// Items handed to a writer in one call
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<T> {
    items: Vec<T>,
}

impl<T> Chunk<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Receives each completed chunk. A chunk is written as a whole: an error
/// means nothing from this chunk may be considered applied.
#[async_trait]
pub trait ItemWriter<T: Send + Sync>: Send + Sync {
    async fn write(&self, chunk: &Chunk<T>) -> StepResult<()>;
}

/// Collects every written chunk in memory
#[derive(Debug)]
pub struct ListItemWriter<T> {
    chunks: Arc<Mutex<Vec<Vec<T>>>>,
}

impl<T> Default for ListItemWriter<T> {
    fn default() -> Self {
        Self {
            chunks: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T> Clone for ListItemWriter<T> {
    fn clone(&self) -> Self {
        Self {
            chunks: Arc::clone(&self.chunks),
        }
    }
}

impl<T: Clone> ListItemWriter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each write call's items, in call order
    pub fn chunks(&self) -> Vec<Vec<T>> {
        self.chunks.lock().clone()
    }

    /// All written items, flattened
    pub fn written_items(&self) -> Vec<T> {
        self.chunks.lock().iter().flatten().cloned().collect()
    }

    pub fn write_calls(&self) -> usize {
        self.chunks.lock().len()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> ItemWriter<T> for ListItemWriter<T> {
    async fn write(&self, chunk: &Chunk<T>) -> StepResult<()> {
        self.chunks.lock().push(chunk.items().to_vec());
        Ok(())
    }
}

/// Logs every item of every chunk
#[derive(Debug, Default, Clone)]
pub struct LoggingItemWriter {
    label: String,
}

impl LoggingItemWriter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl<T: Debug + Send + Sync + 'static> ItemWriter<T> for LoggingItemWriter {
    async fn write(&self, chunk: &Chunk<T>) -> StepResult<()> {
        info!(writer = %self.label, size = chunk.len(), "Writing chunk");
        for (index, item) in chunk.iter().enumerate() {
            info!(writer = %self.label, index, item = ?item, "Chunk item");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_writer_records_calls() {
        let writer = ListItemWriter::new();
        let handle = writer.clone();

        writer.write(&Chunk::new(vec![1, 2])).await.unwrap();
        writer.write(&Chunk::new(vec![3])).await.unwrap();

        assert_eq!(handle.write_calls(), 2);
        assert_eq!(handle.chunks(), vec![vec![1, 2], vec![3]]);
        assert_eq!(handle.written_items(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_logging_writer_accepts_any_debug_item() {
        let writer = LoggingItemWriter::new("test");
        writer
            .write(&Chunk::new(vec!["a".to_string(), "b".to_string()]))
            .await
            .unwrap();
    }
}
