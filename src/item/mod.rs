//! # Item Abstractions
//!
//! The three roles of a chunk-oriented step: a reader that hands out items one
//! at a time until exhausted, an optional processor that transforms or filters
//! them, and a writer that receives each completed chunk as one batch.

pub mod processor;
pub mod reader;
pub mod writer;

pub use processor::{FunctionItemProcessor, ItemProcessor, PassThroughItemProcessor};
pub use reader::{ItemReader, IteratorItemReader, ListItemReader};
pub use writer::{Chunk, ItemWriter, ListItemWriter, LoggingItemWriter};
