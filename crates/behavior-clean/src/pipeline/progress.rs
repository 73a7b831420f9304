//! Progress reporting for the cleaning pipeline.
//!
//! The pipeline emits a [`ProgressUpdate`] when each stage starts and when it
//! finishes, the finishing update carrying the stage's row counts.
//!
//! # Example
//!
//! ```rust,ignore
//! use behavior_clean::Pipeline;
//!
//! let outcome = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(df)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the cleaning pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Dropping records missing core fields and filling optional ones
    MissingValues,
    /// Removing exact and logical duplicates
    Deduplication,
    /// Validating identifiers, capping prices, rounding amounts
    NumericNormalization,
    /// Validating timestamps and deriving calendar columns
    TemporalNormalization,
    /// Upper-casing device names
    DeviceNormalization,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MissingValues => "Handling Missing Values",
            Self::Deduplication => "Removing Duplicates",
            Self::NumericNormalization => "Normalizing Numeric Fields",
            Self::TemporalNormalization => "Normalizing Timestamps",
            Self::DeviceNormalization => "Normalizing Devices",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Returns the typical weight of this stage in the overall run (0.0 - 1.0).
    ///
    /// Weights of the processing stages sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::MissingValues => 0.25,
            Self::Deduplication => 0.20,
            Self::NumericNormalization => 0.25,
            Self::TemporalNormalization => 0.25,
            Self::DeviceNormalization => 0.05,
            Self::Complete => 0.0,
            Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::MissingValues => 0.0,
            Self::Deduplication => 0.25,
            Self::NumericNormalization => 0.45,
            Self::TemporalNormalization => 0.70,
            Self::DeviceNormalization => 0.95,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: PipelineStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,

    /// Rows handed to the stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_before: Option<usize>,

    /// Rows the stage handed on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_after: Option<usize>,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage.
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            rows_before: None,
            rows_after: None,
        }
    }

    /// Creates a stage-finished update carrying the stage's row counts.
    pub fn finished(stage: PipelineStage, rows_before: usize, rows_after: usize) -> Self {
        let message = format!(
            "{}: {} -> {} rows",
            stage.display_name(),
            rows_before,
            rows_after
        );
        Self {
            rows_before: Some(rows_before),
            rows_after: Some(rows_after),
            ..Self::new(stage, 1.0, message)
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Complete, 1.0, message)
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
            rows_before: None,
            rows_after: None,
        }
    }
}

/// Trait for receiving progress updates during a run.
///
/// Implementations must be `Send + Sync` so a pipeline can run on a worker
/// thread while updates are consumed elsewhere.
pub trait ProgressReporter: Send + Sync {
    /// Called at the start and end of each stage.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
