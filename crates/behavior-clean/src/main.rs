//! CLI entry point for the user-behavior cleaning pipeline.

use anyhow::{Result, anyhow};
use behavior_clean::{Pipeline, PipelineConfig, ReportGenerator, RunReport, io};
use chrono::NaiveDateTime;
use clap::Parser;
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "E-commerce user-behavior cleaning pipeline",
    long_about = "Cleans raw user-behavior event tables: drops records missing core fields, \
                  fills optional ones, removes duplicate events, validates IDs, caps outlier \
                  prices and expands epoch timestamps into date/hour/weekday columns.\n\n\
                  EXAMPLES:\n  \
                  # Clean with defaults, writing cleaned_<input>.csv next to the input\n  \
                  behavior-clean -i data/UserBehavior.csv\n\n  \
                  # Reproducible run with a fixed cutoff and a JSON report\n  \
                  behavior-clean -i data/UserBehavior.csv --now 2024-06-01T00:00:00 -r\n\n  \
                  # Legacy Chinese-encoded export\n  \
                  behavior-clean -i data/UserBehavior.csv --encoding gb18030 --fill-sentinel 未知\n\n  \
                  # Machine-readable output only\n  \
                  behavior-clean -i data/UserBehavior.csv --json"
)]
struct Args {
    /// Path to the raw CSV file
    #[arg(short, long)]
    input: String,

    /// Path for the cleaned CSV file
    ///
    /// If not specified, writes cleaned_<input_name>.csv next to the input
    #[arg(short, long)]
    output: Option<String>,

    /// Fixed "now" (UTC) for the future-timestamp cutoff, e.g. 2024-06-01T00:00:00
    ///
    /// If not specified, the wall clock is sampled once at the start of the run
    #[arg(long, value_parser = parse_run_time)]
    now: Option<NaiveDateTime>,

    /// Quantile of the price column used as the outlier cap (0.0 - 1.0]
    #[arg(long, default_value = "0.99")]
    price_quantile: f64,

    /// Fill value for missing address, device and comment fields
    #[arg(long, default_value = "unknown")]
    fill_sentinel: String,

    /// Keep the device column's original case
    #[arg(long)]
    keep_device_case: bool,

    /// Text encoding of the input and output files (utf-8, gb18030, gbk, ...)
    #[arg(short, long, default_value = "utf-8")]
    encoding: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write a detailed JSON report next to the cleaned file
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,
}

/// Accept `2024-06-01T00:00:00` or `2024-06-01 00:00:00`.
fn parse_run_time(raw: &str) -> std::result::Result<NaiveDateTime, String> {
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| format!("invalid datetime '{}', expected YYYY-MM-DDTHH:MM:SS", raw))
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file (RUST_LOG, mostly)
    dotenv().ok();

    let input = Path::new(&args.input);
    if !input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }
    let output = args
        .output
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output_path(input));

    let mut config_builder = PipelineConfig::builder()
        .price_quantile(args.price_quantile)
        .fill_sentinel(&args.fill_sentinel)
        .normalize_device_case(!args.keep_device_case);
    if let Some(now) = args.now {
        config_builder = config_builder.run_time(now);
    }
    let config = config_builder.build()?;

    let mut builder = Pipeline::builder().config(config);
    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!("[{:.0}%] {}", update.progress * 100.0, update.message);
        });
    }
    let pipeline = builder.build()?;

    let encoding = io::encoding_for_label(&args.encoding)?;
    let data = io::load_table_with_encoding(input, encoding)?;
    let original_shape = data.shape();
    let missing_profile = ReportGenerator::missing_profile(&data)?;

    info!("{}", "=".repeat(80));
    info!("Starting user-behavior cleaning...");
    info!("{}", "=".repeat(80));

    let outcome = pipeline.process(data).map_err(|e| {
        error!("Pipeline failed: {}", e);
        anyhow!("Pipeline failed: {}", e)
    })?;

    let mut cleaned = outcome.data;
    let output = io::write_table_with_encoding(&mut cleaned, &output, encoding)?;

    let output_str = output.to_string_lossy().to_string();
    let report = ReportGenerator::build_run_report(
        &args.input,
        Some(&output_str),
        missing_profile,
        &outcome.report,
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if args.emit_report {
        let report_dir = output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let generator = ReportGenerator::new(report_dir);
        let report_path = generator.write_report_to_file(&report, &extract_file_stem(&args.input))?;
        info!("Report written to: {}", report_path.display());
    }

    print_human_readable_summary(&report, original_shape);

    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// `cleaned_<stem>.csv` in the input's directory.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = extract_file_stem(&input.to_string_lossy());
    input.with_file_name(format!("cleaned_{}.csv", stem))
}

/// Print a human-readable summary of the cleaning run.
///
/// This is the default output when `--json` is not specified.
fn print_human_readable_summary(report: &RunReport, original_shape: (usize, usize)) {
    let cleaning = &report.cleaning;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        report.input_file, original_shape.0, original_shape.1
    );
    if let Some(ref output_file) = report.output_file {
        println!(
            "Output: {} ({} rows x {} columns)",
            output_file,
            cleaning.rows_after,
            cleaning.columns.len()
        );
    }
    println!();

    if !report.missing_profile.is_empty() {
        println!("Missing Values (raw table):");
        for stat in &report.missing_profile {
            println!(
                "  {:<15} {:>8} ({:.2}%)",
                stat.column, stat.missing, stat.percentage
            );
        }
        println!();
    }

    println!("Stages:");
    for stage in &cleaning.stages {
        println!(
            "  {:<28} {:>8} -> {:<8} ({} dropped)",
            stage.stage.display_name(),
            stage.rows_before,
            stage.rows_after,
            stage.rows_dropped()
        );
    }
    println!();

    println!("Details:");
    println!(
        "  Core-field missing records dropped: {}",
        cleaning.missing.core_missing_dropped
    );
    for fill in &cleaning.missing.fills {
        println!(
            "  Filled {} missing '{}' values with {}",
            fill.filled, fill.column, fill.fill_value
        );
    }
    println!(
        "  Duplicates removed: {} exact, {} logical",
        cleaning.duplicates.exact_removed, cleaning.duplicates.logical_removed
    );
    for column in &cleaning.numeric.columns {
        if column.rows_dropped > 0 {
            println!(
                "  Dropped {} rows with invalid '{}'",
                column.rows_dropped, column.column
            );
        }
    }
    match cleaning.numeric.price_cap {
        Some(cap) => println!(
            "  Price cap (q{}): {:.2}",
            cleaning.numeric.price_quantile, cap
        ),
        None => println!("  Price cap: n/a (empty table)"),
    }
    println!(
        "  Timestamps dropped: {} invalid, {} later than {}",
        cleaning.temporal.invalid_dropped, cleaning.temporal.future_dropped, cleaning.run_time
    );
    if let (Some(earliest), Some(latest)) = (cleaning.temporal.earliest, cleaning.temporal.latest) {
        println!("  Behavior time range: {} .. {}", earliest, latest);
    }
    if let Some(device) = cleaning.device {
        println!("  Device values upper-cased: {}", device.values_changed);
    }
    println!();

    println!("Summary:");
    println!("  Duration: {}ms", cleaning.duration_ms);
    println!(
        "  Rows: {} -> {} ({} removed, {:.2}%)",
        cleaning.rows_before,
        cleaning.rows_after,
        cleaning.rows_removed(),
        cleaning.rows_removed_percentage()
    );
    println!("  Columns: {}", cleaning.columns.join(", "));
    println!();

    if !cleaning.warnings.is_empty() {
        println!("Warnings:");
        for warning in &cleaning.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}
