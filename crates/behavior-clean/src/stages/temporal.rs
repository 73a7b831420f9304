//! Temporal normalization.
//!
//! Turns the raw epoch-seconds `timestamp` into a UTC `behavior_time` plus
//! `date`, `hour` and `weekday` columns, dropping rows whose timestamp is
//! missing, non-positive once truncated to whole seconds, or later than the
//! run's "now".

use super::CleaningStage;
use crate::coercer::FieldCoercer;
use crate::error::Result;
use crate::pipeline::PipelineStage;
use crate::schema::{BEHAVIOR_TIME, DATE, HOUR, TIMESTAMP, WEEKDAY, require_columns};
use crate::types::TemporalReport;
use crate::utils::filter_rows;
use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use polars::prelude::*;
use tracing::{debug, info};

const SECONDS_PER_DAY: i64 = 86_400;

/// Validates epoch timestamps and derives calendar columns.
///
/// Every row is compared against the same cutoff, fixed when the stage is
/// built. Fractional seconds are truncated.
#[derive(Debug, Clone, Copy)]
pub struct TemporalNormalizationStage {
    run_time: NaiveDateTime,
}

impl TemporalNormalizationStage {
    /// Build a stage that rejects behavior times later than `run_time` (UTC).
    pub fn new(run_time: NaiveDateTime) -> Self {
        Self { run_time }
    }

    /// Build a stage whose cutoff is the current wall-clock time.
    pub fn now() -> Self {
        Self::new(Utc::now().naive_utc())
    }

    pub fn run_time(&self) -> NaiveDateTime {
        self.run_time
    }

    /// Classify one raw timestamp.
    fn classify(&self, raw: Option<f64>) -> Verdict {
        // Truncate first so a sub-second value like 0.5 cannot land on the epoch.
        let Some(seconds) = raw.map(f64::trunc).filter(|s| *s > 0.0) else {
            return Verdict::Invalid;
        };
        // Beyond chrono's range is necessarily later than any real "now".
        let Some(time) = DateTime::from_timestamp(seconds as i64, 0) else {
            return Verdict::Future;
        };
        let time = time.naive_utc();
        if time > self.run_time {
            Verdict::Future
        } else {
            Verdict::Valid(time)
        }
    }
}

enum Verdict {
    Valid(NaiveDateTime),
    Invalid,
    Future,
}

/// The four derived columns for a set of behavior times.
fn derived_columns(times: &[NaiveDateTime]) -> PolarsResult<[Series; 4]> {
    let seconds: Vec<i64> = times.iter().map(|t| t.and_utc().timestamp()).collect();

    let millis: Vec<i64> = times
        .iter()
        .map(|t| t.and_utc().timestamp_millis())
        .collect();
    let behavior_time = Series::new(BEHAVIOR_TIME.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

    let days: Vec<i32> = seconds
        .iter()
        .map(|s| s.div_euclid(SECONDS_PER_DAY) as i32)
        .collect();
    let date = Series::new(DATE.into(), days).cast(&DataType::Date)?;

    let hours: Vec<i32> = times.iter().map(|t| t.hour() as i32).collect();
    let weekdays: Vec<i32> = times
        .iter()
        .map(|t| t.weekday().num_days_from_monday() as i32)
        .collect();

    Ok([
        behavior_time,
        date,
        Series::new(HOUR.into(), hours),
        Series::new(WEEKDAY.into(), weekdays),
    ])
}

impl CleaningStage for TemporalNormalizationStage {
    type Report = TemporalReport;

    fn stage(&self) -> PipelineStage {
        PipelineStage::TemporalNormalization
    }

    fn apply(&self, df: DataFrame) -> Result<(DataFrame, TemporalReport)> {
        require_columns(&df, &[TIMESTAMP])?;

        let raw = FieldCoercer::numeric_column(df.column(TIMESTAMP)?.as_materialized_series())?;
        let mut report = TemporalReport::new(self.run_time);
        let mut keep = Vec::with_capacity(raw.len());
        let mut times = Vec::with_capacity(raw.len());

        for value in raw {
            match self.classify(value) {
                Verdict::Valid(time) => {
                    keep.push(true);
                    times.push(time);
                }
                Verdict::Invalid => {
                    keep.push(false);
                    report.invalid_dropped += 1;
                }
                Verdict::Future => {
                    keep.push(false);
                    report.future_dropped += 1;
                }
            }
        }
        debug!(
            "Dropped {} rows with invalid timestamps and {} future-dated rows (cutoff {})",
            report.invalid_dropped, report.future_dropped, self.run_time
        );

        let (df, _) = filter_rows(&df, &keep)?;
        let mut df = df.drop(TIMESTAMP)?;
        for column in derived_columns(&times)? {
            df.with_column(column)?;
        }

        report.earliest = times.iter().min().copied();
        report.latest = times.iter().max().copied();

        info!(
            "Temporal normalization: dropped {} invalid and {} future-dated rows",
            report.invalid_dropped, report.future_dropped
        );

        Ok((df, report))
    }
}
