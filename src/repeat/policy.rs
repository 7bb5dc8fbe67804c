//! # Completion Policies
//!
//! A [`CompletionPolicy`] decides when a chunk has accumulated enough items.
//! The chunk step builds a fresh policy for every step execution, calls
//! [`start`](CompletionPolicy::start) at the beginning of each chunk,
//! [`update`](CompletionPolicy::update) after each item read, and asks
//! [`is_complete`](CompletionPolicy::is_complete) after every update.

use super::{RepeatContext, RepeatStatus};
use crate::error::PolicyError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::debug;

/// Strategy deciding when a repeat loop (a chunk) is finished
pub trait CompletionPolicy: Send {
    /// Reset state for a new chunk and return the chunk's context
    fn start(&mut self, parent: &RepeatContext) -> Result<RepeatContext, PolicyError>;

    /// Record one more item
    fn update(&mut self, context: &mut RepeatContext) -> Result<(), PolicyError>;

    /// Whether the chunk is full
    fn is_complete(&self, context: &RepeatContext) -> Result<bool, PolicyError>;

    /// Whether the chunk is full given the last read result. A `Finished`
    /// result (reader exhausted) always completes the chunk.
    fn is_complete_for_result(
        &self,
        context: &RepeatContext,
        result: RepeatStatus,
    ) -> Result<bool, PolicyError> {
        if !result.is_continuable() {
            return Ok(true);
        }
        self.is_complete(context)
    }

    /// Name used in logs and errors
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Completes after a fixed number of items
#[derive(Debug, Clone)]
pub struct SimpleCompletionPolicy {
    chunk_size: usize,
}

impl SimpleCompletionPolicy {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl CompletionPolicy for SimpleCompletionPolicy {
    fn start(&mut self, _parent: &RepeatContext) -> Result<RepeatContext, PolicyError> {
        Ok(RepeatContext::new())
    }

    fn update(&mut self, context: &mut RepeatContext) -> Result<(), PolicyError> {
        context.increment_count();
        Ok(())
    }

    fn is_complete(&self, context: &RepeatContext) -> Result<bool, PolicyError> {
        Ok(context.is_complete_only() || context.started_count() >= self.chunk_size)
    }

    fn name(&self) -> &'static str {
        "SimpleCompletionPolicy"
    }
}

/// Draws a new threshold below an exclusive `bound` at the start of every
/// chunk. A draw of 0 closes the chunk after one item, so thresholds fall in
/// `1..bound` (`1` when `bound` is 1).
#[derive(Debug)]
pub struct RandomChunkSizePolicy {
    bound: usize,
    threshold: Option<usize>,
    processed: usize,
    rng: StdRng,
}

impl RandomChunkSizePolicy {
    pub fn new(bound: usize) -> Self {
        Self::with_rng(bound, StdRng::from_entropy())
    }

    /// Deterministic sizing, for tests and reproducible runs
    pub fn with_seed(bound: usize, seed: u64) -> Self {
        Self::with_rng(bound, StdRng::seed_from_u64(seed))
    }

    fn with_rng(bound: usize, rng: StdRng) -> Self {
        Self {
            bound: bound.max(1),
            threshold: None,
            processed: 0,
            rng,
        }
    }

    /// Threshold drawn for the current chunk
    pub fn current_threshold(&self) -> Option<usize> {
        self.threshold
    }
}

impl CompletionPolicy for RandomChunkSizePolicy {
    fn start(&mut self, _parent: &RepeatContext) -> Result<RepeatContext, PolicyError> {
        let threshold = self.rng.gen_range(0..self.bound).max(1);
        debug!(threshold, "Random chunk size drawn");
        self.threshold = Some(threshold);
        self.processed = 0;
        Ok(RepeatContext::new())
    }

    fn update(&mut self, context: &mut RepeatContext) -> Result<(), PolicyError> {
        self.processed += 1;
        context.increment_count();
        Ok(())
    }

    fn is_complete(&self, context: &RepeatContext) -> Result<bool, PolicyError> {
        let threshold = self.threshold.ok_or(PolicyError::NotStarted)?;
        Ok(context.is_complete_only() || self.processed >= threshold)
    }

    fn name(&self) -> &'static str {
        "RandomChunkSizePolicy"
    }
}

/// Completes once the chunk has been open for longer than a timeout
#[derive(Debug, Clone)]
pub struct TimeoutTerminationPolicy {
    timeout: Duration,
    started_at: Option<Instant>,
}

impl TimeoutTerminationPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            started_at: None,
        }
    }
}

impl CompletionPolicy for TimeoutTerminationPolicy {
    fn start(&mut self, _parent: &RepeatContext) -> Result<RepeatContext, PolicyError> {
        self.started_at = Some(Instant::now());
        Ok(RepeatContext::new())
    }

    fn update(&mut self, context: &mut RepeatContext) -> Result<(), PolicyError> {
        context.increment_count();
        Ok(())
    }

    fn is_complete(&self, context: &RepeatContext) -> Result<bool, PolicyError> {
        let started_at = self.started_at.ok_or(PolicyError::NotStarted)?;
        Ok(context.is_complete_only() || started_at.elapsed() >= self.timeout)
    }

    fn name(&self) -> &'static str {
        "TimeoutTerminationPolicy"
    }
}

/// Completes as soon as any child policy completes
pub struct CompositeCompletionPolicy {
    policies: Vec<Box<dyn CompletionPolicy>>,
    contexts: Vec<RepeatContext>,
}

impl CompositeCompletionPolicy {
    pub fn new(policies: Vec<Box<dyn CompletionPolicy>>) -> Self {
        Self {
            policies,
            contexts: Vec::new(),
        }
    }
}

impl std::fmt::Debug for CompositeCompletionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeCompletionPolicy")
            .field(
                "policies",
                &self.policies.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl CompletionPolicy for CompositeCompletionPolicy {
    fn start(&mut self, parent: &RepeatContext) -> Result<RepeatContext, PolicyError> {
        self.contexts = self
            .policies
            .iter_mut()
            .map(|policy| policy.start(parent))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RepeatContext::new())
    }

    fn update(&mut self, context: &mut RepeatContext) -> Result<(), PolicyError> {
        if self.contexts.len() != self.policies.len() {
            return Err(PolicyError::NotStarted);
        }
        for (policy, child) in self.policies.iter_mut().zip(self.contexts.iter_mut()) {
            policy.update(child)?;
        }
        context.increment_count();
        Ok(())
    }

    fn is_complete(&self, context: &RepeatContext) -> Result<bool, PolicyError> {
        if context.is_complete_only() {
            return Ok(true);
        }
        if self.contexts.len() != self.policies.len() {
            return Err(PolicyError::NotStarted);
        }
        for (policy, child) in self.policies.iter().zip(self.contexts.iter()) {
            if policy.is_complete(child)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn name(&self) -> &'static str {
        "CompositeCompletionPolicy"
    }
}
