//! Repeat-loop primitives: iteration status, per-chunk context and the
//! completion policies that decide when a chunk is full.

pub mod context;
pub mod policy;

pub use context::{RepeatContext, RepeatStatus};
pub use policy::{
    CompletionPolicy, CompositeCompletionPolicy, RandomChunkSizePolicy, SimpleCompletionPolicy,
    TimeoutTerminationPolicy,
};
