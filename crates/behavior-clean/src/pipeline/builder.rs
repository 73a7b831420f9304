//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! running the cleaning stages over one in-memory table.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::schema::validate_input_schema;
use crate::stages::{
    CleaningStage, DeduplicationStage, DeviceCaseStage, MissingValueStage,
    NumericNormalizationStage, TemporalNormalizationStage,
};
use crate::types::{CleaningReport, StageSummary};
use crate::utils::column_names;
use chrono::Utc;
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Share of dropped rows above which the run report carries a warning.
const HIGH_DROP_WARNING_PCT: f32 = 30.0;

/// The cleaned table and everything the run reported about itself.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    /// The cleaned table.
    pub data: DataFrame,
    /// Per-stage counts, the price cap and run warnings.
    pub report: CleaningReport,
}

/// The main cleaning pipeline.
///
/// Runs Missing -> Dedup -> Numeric -> Temporal (-> Device) over one table.
/// Each stage takes ownership of its predecessor's output; no stage can be
/// skipped or reordered because each relies on the invariants the previous
/// ones established.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use behavior_clean::{Pipeline, PipelineConfig};
///
/// let outcome = Pipeline::builder()
///     .config(PipelineConfig::builder().price_quantile(0.95).build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process(dataframe)?;
///
/// println!("price cap: {:?}", outcome.report.numeric.price_cap);
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Ensure Pipeline is Send (can be moved to a worker thread)
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Clean a raw table.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::Schema`](crate::CleaningError::Schema) when an
    /// input column is absent and
    /// [`CleaningError::UndefinedFillValue`](crate::CleaningError::UndefinedFillValue)
    /// when `sex` needs filling but has no present values. Bad row values never
    /// fail a run.
    pub fn process(&self, df: DataFrame) -> Result<CleaningOutcome> {
        match self.process_internal(df) {
            Ok(outcome) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(outcome)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    /// Run one stage, recording its row counts.
    fn run_stage<S: CleaningStage>(
        &self,
        stage: &S,
        df: DataFrame,
        summaries: &mut Vec<StageSummary>,
    ) -> Result<(DataFrame, S::Report)> {
        let kind = stage.stage();
        let rows_before = df.height();
        self.report_progress(ProgressUpdate::new(
            kind,
            0.0,
            format!("{}...", kind.display_name()),
        ));

        let started = Instant::now();
        let (df, report) = stage
            .apply(df)
            .map_err(|e| e.with_context(format!("Stage '{}' failed", kind.display_name())))?;

        let summary = StageSummary {
            stage: kind,
            rows_before,
            rows_after: df.height(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "{}: {} -> {} rows",
            kind.display_name(),
            summary.rows_before,
            summary.rows_after
        );
        self.report_progress(ProgressUpdate::finished(kind, rows_before, summary.rows_after));
        summaries.push(summary);

        Ok((df, report))
    }

    fn process_internal(&self, df: DataFrame) -> Result<CleaningOutcome> {
        let start_time = Instant::now();
        // "now" is sampled once so every row meets the same cutoff.
        let run_time = self
            .config
            .run_time
            .unwrap_or_else(|| Utc::now().naive_utc());

        info!("Starting cleaning pipeline (run time {})...", run_time);
        validate_input_schema(&df)?;
        let rows_before = df.height();
        let mut stages = Vec::with_capacity(5);

        let (df, missing) = self.run_stage(
            &MissingValueStage::new(self.config.fill_sentinel.clone()),
            df,
            &mut stages,
        )?;
        let (df, duplicates) = self.run_stage(&DeduplicationStage::new(), df, &mut stages)?;
        let (df, numeric) = self.run_stage(
            &NumericNormalizationStage::new(self.config.price_quantile),
            df,
            &mut stages,
        )?;
        let (df, temporal) =
            self.run_stage(&TemporalNormalizationStage::new(run_time), df, &mut stages)?;

        let (df, device) = if self.config.normalize_device_case {
            let (df, report) = self.run_stage(
                &DeviceCaseStage::new(self.config.fill_sentinel.clone()),
                df,
                &mut stages,
            )?;
            (df, Some(report))
        } else {
            (df, None)
        };

        let mut report = CleaningReport {
            run_time,
            duration_ms: start_time.elapsed().as_millis() as u64,
            rows_before,
            rows_after: df.height(),
            columns: column_names(&df),
            stages,
            missing,
            duplicates,
            numeric,
            temporal,
            device,
            warnings: Vec::new(),
        };
        Self::add_warnings(&mut report);

        info!(
            "Pipeline complete: {} -> {} rows in {}ms",
            report.rows_before, report.rows_after, report.duration_ms
        );

        Ok(CleaningOutcome { data: df, report })
    }

    fn add_warnings(report: &mut CleaningReport) {
        if report.rows_before > 0 && report.rows_after == 0 {
            report.add_warning("Every record was dropped; the cleaned table is empty");
        } else if report.rows_removed_percentage() > HIGH_DROP_WARNING_PCT {
            let pct = report.rows_removed_percentage();
            report.add_warning(format!(
                "{:.1}% of records were dropped ({} of {})",
                pct,
                report.rows_removed(),
                report.rows_before
            ));
        }

        if report.temporal.future_dropped > 0 {
            report.add_warning(format!(
                "{} records had timestamps later than the run time {}",
                report.temporal.future_dropped, report.run_time
            ));
        }

        for warning in &report.warnings {
            warn!("{}", warning);
        }
    }
}

/// Builder for creating a [`Pipeline`] with custom configuration.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Ensure PipelineBuilder is Send (can be moved to another thread during construction)
static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, crate::config::ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}
