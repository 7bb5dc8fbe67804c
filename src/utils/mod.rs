//! Small helpers shared across modules.

pub mod pattern;

pub use pattern::ExitCodePattern;
