//! Run report generation.
//!
//! Use [`RunReport`] for a single report structure suitable for:
//! - JSON output to stdout (`--json` CLI flag)
//! - JSON file output (`--emit-report` CLI flag)
//! - Programmatic access in library mode
//!
//! # Example
//!
//! ```rust,ignore
//! use behavior_clean::reporting::ReportGenerator;
//!
//! let profile = ReportGenerator::missing_profile(&raw_df)?;
//! let outcome = pipeline.process(raw_df)?;
//! let report = ReportGenerator::build_run_report(
//!     "data/user_behavior.csv",
//!     Some("data/user_behavior_cleaned.csv"),
//!     profile,
//!     &outcome.report,
//! );
//!
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ReportGenerator::new(PathBuf::from("output")).write_report_to_file(&report, "user_behavior")?;
//! ```

mod generator;

pub use generator::{MissingStat, ReportGenerator, RunReport};
