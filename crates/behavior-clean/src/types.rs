//! Report types produced by the cleaning stages.
//!
//! Every stage returns its output table together with one of the typed
//! reports below. The reports are serializable so they can be printed,
//! written as JSON, or forwarded to any other reporting layer; nothing in
//! them is fed back into the pipeline.

use crate::pipeline::PipelineStage;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ============================================================================
// Stage Reports
// ============================================================================

/// One optional-column fill performed by the missing-value stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRecord {
    /// Column that was filled.
    pub column: String,
    /// Value written into the missing cells (as displayed to users).
    pub fill_value: String,
    /// Number of cells filled.
    pub filled: usize,
}

/// Outcome of the missing-value stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingValueReport {
    /// Records dropped because a core field was missing.
    pub core_missing_dropped: usize,
    /// Per-column fills, in the order they were applied.
    pub fills: Vec<FillRecord>,
}

impl MissingValueReport {
    /// Total number of cells filled across all columns.
    pub fn total_filled(&self) -> usize {
        self.fills.iter().map(|f| f.filled).sum()
    }

    /// The fill record for a column, if that column needed filling.
    pub fn fill_for(&self, column: &str) -> Option<&FillRecord> {
        self.fills.iter().find(|f| f.column == column)
    }
}

/// Outcome of the deduplication stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupReport {
    /// Records removed as exact copies of an earlier record.
    pub exact_removed: usize,
    /// Records removed as logical duplicates of an earlier event.
    pub logical_removed: usize,
}

impl DedupReport {
    pub fn total_removed(&self) -> usize {
        self.exact_removed + self.logical_removed
    }
}

/// What happened to one numeric column during numeric normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnAdjustment {
    /// Column name.
    pub column: String,
    /// Rows dropped because the value was missing or out of range.
    pub rows_dropped: usize,
    /// Missing or unparsable values replaced with zero.
    pub filled_zero: usize,
    /// Negative values clamped to zero.
    pub negatives_clamped: usize,
    /// Values clamped down to the quantile cap.
    pub capped: usize,
    /// Non-integral values rounded to an integer.
    pub rounded: usize,
}

impl ColumnAdjustment {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ..Self::default()
        }
    }
}

/// Outcome of the numeric normalization stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericReport {
    /// Per-column adjustments in processing order.
    pub columns: Vec<ColumnAdjustment>,
    /// Price cap computed for this run; `None` when the table was empty.
    pub price_cap: Option<f64>,
    /// Quantile the price cap was computed at.
    pub price_quantile: f64,
}

impl NumericReport {
    /// Adjustments for a column, if the stage touched it.
    pub fn column(&self, name: &str) -> Option<&ColumnAdjustment> {
        self.columns.iter().find(|c| c.column == name)
    }

    /// Total rows dropped by ID validation.
    pub fn rows_dropped(&self) -> usize {
        self.columns.iter().map(|c| c.rows_dropped).sum()
    }
}

/// Outcome of the temporal normalization stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalReport {
    /// The cutoff every row was compared against.
    pub run_time: NaiveDateTime,
    /// Rows dropped for a missing, unparsable, or non-positive timestamp.
    pub invalid_dropped: usize,
    /// Rows dropped for a behavior time later than the cutoff.
    pub future_dropped: usize,
    /// Earliest behavior time on the cleaned table.
    pub earliest: Option<NaiveDateTime>,
    /// Latest behavior time on the cleaned table.
    pub latest: Option<NaiveDateTime>,
}

impl TemporalReport {
    pub fn new(run_time: NaiveDateTime) -> Self {
        Self {
            run_time,
            invalid_dropped: 0,
            future_dropped: 0,
            earliest: None,
            latest: None,
        }
    }
}

/// Outcome of the device case normalization step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCaseReport {
    /// Values whose case changed.
    pub values_changed: usize,
}

// ============================================================================
// Run Summary Types
// ============================================================================

/// Row-count telemetry for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    /// Which stage ran.
    pub stage: PipelineStage,
    /// Rows handed to the stage by its predecessor.
    pub rows_before: usize,
    /// Rows the stage handed on.
    pub rows_after: usize,
    /// Wall-clock time spent in the stage.
    pub duration_ms: u64,
}

impl StageSummary {
    pub fn rows_dropped(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}

/// Everything a pipeline run reports about itself.
///
/// # Example
///
/// ```rust,ignore
/// let outcome = Pipeline::builder().build()?.process(df)?;
/// let report = &outcome.report;
/// println!("{} -> {} rows in {}ms", report.rows_before, report.rows_after, report.duration_ms);
/// if let Some(cap) = report.numeric.price_cap {
///     println!("price capped at {:.2}", cap);
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// The "now" used as the future-timestamp cutoff.
    pub run_time: NaiveDateTime,
    /// Total execution time in milliseconds.
    pub duration_ms: u64,
    /// Rows in the raw table.
    pub rows_before: usize,
    /// Rows in the cleaned table.
    pub rows_after: usize,
    /// Column names of the cleaned table, in order.
    pub columns: Vec<String>,
    /// Per-stage row counts, in execution order.
    pub stages: Vec<StageSummary>,
    pub missing: MissingValueReport,
    pub duplicates: DedupReport,
    pub numeric: NumericReport,
    pub temporal: TemporalReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceCaseReport>,
    /// Warnings and notes generated during the run.
    pub warnings: Vec<String>,
}

impl CleaningReport {
    /// Number of rows removed over the whole run.
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }

    /// Percentage of rows removed over the whole run.
    pub fn rows_removed_percentage(&self) -> f32 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_removed() as f32 / self.rows_before as f32) * 100.0
        }
    }

    /// Summary for one stage, if it ran.
    pub fn stage(&self, stage: PipelineStage) -> Option<&StageSummary> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Add a warning to the report.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

// ============================================================================
// Tests
// ============================================================================
