use crate::coercer::FieldCoercer;
use crate::error::Result;
use crate::types::CleaningReport;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

// ============================================================================
// Run Report Types
// ============================================================================

/// Missing-value count for one column of the raw table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingStat {
    /// Column name
    pub column: String,
    /// Number of missing cells
    pub missing: usize,
    /// Percentage of rows missing, rounded to 4 decimal places
    pub percentage: f64,
}

/// Everything written for one CLI run.
///
/// Use this for both JSON output (`--json`) and file writing (`--emit-report`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the input file
    pub input_file: String,
    /// Path to the output file (if written)
    pub output_file: Option<String>,
    /// Columns of the raw table that had missing values
    pub missing_profile: Vec<MissingStat>,
    /// What the pipeline did
    pub cleaning: CleaningReport,
}

pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./outputs"),
        }
    }
}

impl ReportGenerator {
    /// Create a new ReportGenerator writing into `output_dir`.
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Count missing cells per column, listing only columns with any.
    pub fn missing_profile(df: &DataFrame) -> Result<Vec<MissingStat>> {
        let rows = df.height();
        let mut stats = Vec::new();

        for column in df.get_columns() {
            let missing = FieldCoercer::missing_mask(column.as_materialized_series())?
                .into_iter()
                .filter(|m| *m)
                .count();
            if missing == 0 {
                continue;
            }
            let percentage = missing as f64 / rows as f64 * 100.0;
            stats.push(MissingStat {
                column: column.name().to_string(),
                missing,
                percentage: (percentage * 10_000.0).round() / 10_000.0,
            });
        }

        Ok(stats)
    }

    /// Build a run report from a pipeline outcome.
    pub fn build_run_report(
        input_file: &str,
        output_file: Option<&str>,
        missing_profile: Vec<MissingStat>,
        cleaning: &CleaningReport,
    ) -> RunReport {
        RunReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.to_string(),
            output_file: output_file.map(String::from),
            missing_profile,
            cleaning: cleaning.clone(),
        }
    }

    /// Write a run report to a JSON file.
    ///
    /// The report is written to the output directory with the specified base name.
    /// For example, if `report_base_name` is "behavior", the file will be
    /// "behavior_report.json".
    pub fn write_report_to_file(
        &self,
        report: &RunReport,
        report_base_name: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self
            .output_dir
            .join(format!("{}_report.json", report_base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }
}
