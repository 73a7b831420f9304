//! Cleaning stages.
//!
//! Each stage takes ownership of the table produced by its predecessor and
//! hands back a new table together with a typed report:
//!
//! - [`MissingValueStage`]: drop records missing a core field, fill the rest
//! - [`DeduplicationStage`]: exact then logical keep-first deduplication
//! - [`NumericNormalizationStage`]: ID validation, price capping, amount rounding
//! - [`TemporalNormalizationStage`]: epoch validation and calendar columns
//! - [`DeviceCaseStage`]: optional upper-casing of the `device` column
//!
//! Stages never fail on bad row values; they drop, fill, or clamp them.
//! The only errors they raise are schema errors and the undefined median
//! fill.

mod dedup;
mod device;
mod missing;
mod numeric;
mod temporal;

pub use dedup::DeduplicationStage;
pub use device::DeviceCaseStage;
pub use missing::MissingValueStage;
pub use numeric::NumericNormalizationStage;
pub use temporal::TemporalNormalizationStage;

use crate::error::Result;
use crate::pipeline::PipelineStage;
use polars::prelude::*;

/// A single table-to-table cleaning step.
pub trait CleaningStage {
    /// What the stage reports about its run.
    type Report;

    /// Which pipeline stage this is, for progress and summaries.
    fn stage(&self) -> PipelineStage;

    /// Run the stage over `df`, returning the cleaned table and a report.
    fn apply(&self, df: DataFrame) -> Result<(DataFrame, Self::Report)>;
}
