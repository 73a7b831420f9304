//! Pipeline module.
//!
//! This module provides the cleaning pipeline orchestrator and its progress
//! reporting types.

mod builder;
pub mod progress;

pub use builder::{CleaningOutcome, Pipeline, PipelineBuilder};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
