#![allow(clippy::doc_markdown)] // Allow technical terms in docs without backticks
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Batch Core
//!
//! Batch job execution engine: named jobs made of steps, run against a job
//! repository that records every instance and execution.
//!
//! ## Overview
//!
//! A [`Job`](job::Job) is a flow of [`Step`](step::Step)s. Each step is either
//! a **tasklet step**, calling one unit of work until it reports it is
//! finished, or a **chunk-oriented step**, reading items one at a time,
//! processing them, and writing them in chunks whose boundaries come from a
//! [`CompletionPolicy`](repeat::CompletionPolicy).
//!
//! Steps finish with an [`ExitStatus`](models::ExitStatus). The job routes on
//! that exit code, with `*` and `?` wildcards, to the next step or to a
//! terminal outcome. Values written to a step's execution context can be
//! promoted into the job context for later steps to read.
//!
//! Jobs are identified by their name and identifying parameters. Launching a
//! failed or stopped instance again restarts it; launching a completed one is
//! refused.
//!
//! ## Module Organization
//!
//! - [`models`] - Parameters, instances, executions, contexts and exit statuses
//! - [`state_machine`] - Execution lifecycle states and transitions
//! - [`repeat`] - Repeat status and chunk completion policies
//! - [`item`] - Reader, processor and writer abstractions
//! - [`step`] - Step execution: tasklets, chunks, listeners, skip policies
//! - [`job`] - Job definitions, flows, validators and incrementers
//! - [`repository`] - Execution record storage
//! - [`launch`] - Launcher, operator, registry and parameter conversion
//! - [`samples`] - Demonstration jobs
//! - [`config`] - Configuration management
//! - [`logging`] - Tracing setup and lifecycle logging
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batch_core::job::JobBuilder;
//! use batch_core::launch::JobLauncher;
//! use batch_core::models::JobParametersBuilder;
//! use batch_core::repeat::RepeatStatus;
//! use batch_core::repository::InMemoryJobRepository;
//! use batch_core::step::{FunctionTasklet, StepBuilder};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let job = JobBuilder::new("hello")
//!     .start(
//!         StepBuilder::new("greet")
//!             .tasklet(FunctionTasklet::new(|_, _| Ok(RepeatStatus::Finished)))
//!             .build(),
//!     )
//!     .build()?;
//!
//! let launcher = JobLauncher::new(Arc::new(InMemoryJobRepository::new()));
//! let parameters = JobParametersBuilder::new().add_string("name", "world").build();
//! let execution = launcher.run(&job, parameters).await?;
//! println!("{} finished with {}", job.name(), execution.exit_status);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod item;
pub mod job;
pub mod launch;
pub mod logging;
pub mod models;
pub mod repeat;
pub mod repository;
pub mod samples;
pub mod state_machine;
pub mod step;
pub mod utils;

pub use config::BatchConfig;
pub use error::{BatchError, BatchResult, ConfigurationError, StepError, ValidationError};
pub use job::{Job, JobBuilder};
pub use launch::{JobLauncher, JobOperator, JobRegistry};
pub use models::{ExitStatus, JobExecution, JobParameters, StepExecution};
pub use repository::{InMemoryJobRepository, JobRepository};
pub use state_machine::BatchStatus;
pub use step::{Step, StepBuilder};
