//! User-Behavior Cleaning Pipeline Library
//!
//! A batch cleaning library for e-commerce user-behavior event tables, built
//! with Rust and Polars.
//!
//! # Overview
//!
//! Raw event tables are noisy: missing fields, duplicate events, malformed
//! numbers, impossible IDs, outlier prices and future timestamps. The
//! pipeline runs a fixed sequence of stages over one in-memory table:
//!
//! - **Missing values**: drop records missing a core field, fill the rest
//! - **Deduplication**: exact duplicates first, then logical duplicates
//! - **Numeric normalization**: ID validation, quantile price cap, integer amounts
//! - **Temporal normalization**: epoch validation and date/hour/weekday columns
//! - **Device normalization**: optional upper-casing of device names
//!
//! Bad row values never fail a run; they are dropped, filled, or clamped.
//! A run fails only on a schema error or an undefined median fill.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use behavior_clean::{Pipeline, PipelineConfig, io};
//!
//! let df = io::load_table("data/user_behavior.csv")?;
//!
//! let outcome = Pipeline::builder()
//!     .config(PipelineConfig::builder().price_quantile(0.99).build()?)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(df)?;
//!
//! println!("{} -> {} rows", outcome.report.rows_before, outcome.report.rows_after);
//! let mut cleaned = outcome.data;
//! io::write_table(&mut cleaned, "data/user_behavior_cleaned.csv")?;
//! ```
//!
//! # Configuration
//!
//! Use [`PipelineConfig`] to customize cleaning behavior:
//!
//! ```rust,ignore
//! use behavior_clean::config::*;
//!
//! let config = PipelineConfig::builder()
//!     .price_quantile(0.95)            // Cap prices at the 95th percentile
//!     .fill_sentinel("unknown")        // Fill for address/device/comment
//!     .run_time(fixed_now)             // Reproducible future-timestamp cutoff
//!     .normalize_device_case(true)
//!     .build()?;
//! ```
//!
//! # Running Stages Individually
//!
//! Every stage implements [`stages::CleaningStage`] and can be applied on
//! its own:
//!
//! ```rust,ignore
//! use behavior_clean::stages::{CleaningStage, DeduplicationStage};
//!
//! let (deduped, report) = DeduplicationStage::new().apply(df)?;
//! println!("{} exact, {} logical", report.exact_removed, report.logical_removed);
//! ```

pub mod coercer;
pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod reporting;
pub mod schema;
pub mod stages;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use coercer::FieldCoercer;
pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use error::{CleaningError, Result as CleaningResult, ResultExt};
pub use pipeline::{
    CleaningOutcome, ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineStage,
    ProgressReporter, ProgressUpdate,
};
pub use reporting::{MissingStat, ReportGenerator, RunReport};
pub use stages::{
    CleaningStage, DeduplicationStage, DeviceCaseStage, MissingValueStage,
    NumericNormalizationStage, TemporalNormalizationStage,
};
pub use types::{
    CleaningReport, ColumnAdjustment, DedupReport, DeviceCaseReport, FillRecord,
    MissingValueReport, NumericReport, StageSummary, TemporalReport,
};
