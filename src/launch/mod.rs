//! # Launch Surface
//!
//! Everything needed to run a job from outside the engine:
//!
//! - [`JobLauncher`] runs a [`Job`](crate::job::Job) against a repository
//! - [`JobRegistry`] and [`JobOperator`] launch registered jobs by name,
//!   inline or in the background
//! - [`converter`] turns `key=value` strings into typed parameters
//! - [`ExitCodeMapper`] maps a finished execution to a process exit code

pub mod converter;
pub mod exit_codes;
pub mod launcher;
pub mod operator;
pub mod registry;

pub use converter::{parameters_from_args, parameters_from_pairs, parameters_to_args};
pub use exit_codes::ExitCodeMapper;
pub use launcher::JobLauncher;
pub use operator::{JobExecutionHandle, JobOperator};
pub use registry::JobRegistry;
