//! Integration tests for the user-behavior cleaning pipeline.
//!
//! These tests run the full pipeline over CSV fixtures loaded through the
//! crate's own reader, the same way the CLI does.

use behavior_clean::{
    CleaningError, Pipeline, PipelineConfig, PipelineStage, ProgressUpdate, ReportGenerator,
    RunReport, io,
};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture(filename: &str) -> DataFrame {
    io::load_table(fixtures_path().join(filename)).expect("Failed to load fixture")
}

fn run_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn fixed_pipeline() -> Pipeline {
    let config = PipelineConfig::builder()
        .run_time(run_time())
        .build()
        .unwrap();
    Pipeline::builder().config(config).build().unwrap()
}

fn ints(df: &DataFrame, name: &str) -> Vec<i64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Int64)
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

fn floats(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

fn strings(df: &DataFrame, name: &str) -> Vec<String> {
    df.column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_no_null_iter()
        .map(String::from)
        .collect()
}

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("behavior_clean_it_{}_{}", std::process::id(), name))
}

// ============================================================================
// Full Pipeline
// ============================================================================

#[test]
fn test_full_pipeline_on_sample() {
    let df = load_fixture("user_behavior_sample.csv");
    assert_eq!(df.height(), 16);

    let outcome = fixed_pipeline().process(df).unwrap();
    let cleaned = &outcome.data;
    let report = &outcome.report;

    assert_eq!(report.rows_before, 16);
    assert_eq!(report.rows_after, 7);
    assert_eq!(cleaned.height(), 7);
    assert_eq!(ints(cleaned, "user_id"), vec![1, 2, 3, 4, 7, 10, 12]);
    assert_eq!(ints(cleaned, "goods_id"), vec![101, 103, 104, 105, 108, 111, 113]);
    assert_eq!(ints(cleaned, "category_id"), vec![10, 0, 11, 12, 0, 14, 15]);
}

#[test]
fn test_full_pipeline_stage_row_counts() {
    let outcome = fixed_pipeline()
        .process(load_fixture("user_behavior_sample.csv"))
        .unwrap();

    let counts: Vec<(PipelineStage, usize, usize)> = outcome
        .report
        .stages
        .iter()
        .map(|s| (s.stage, s.rows_before, s.rows_after))
        .collect();

    assert_eq!(
        counts,
        vec![
            (PipelineStage::MissingValues, 16, 15),
            (PipelineStage::Deduplication, 15, 13),
            (PipelineStage::NumericNormalization, 13, 10),
            (PipelineStage::TemporalNormalization, 10, 7),
            (PipelineStage::DeviceNormalization, 7, 7),
        ]
    );
}

#[test]
fn test_full_pipeline_output_columns() {
    let outcome = fixed_pipeline()
        .process(load_fixture("user_behavior_sample.csv"))
        .unwrap();

    let expected = vec![
        "user_id",
        "goods_id",
        "category_id",
        "behavior",
        "price",
        "amount",
        "sex",
        "address",
        "device",
        "comment",
        "behavior_time",
        "date",
        "hour",
        "weekday",
    ];
    assert_eq!(outcome.report.columns, expected);

    let dtypes: Vec<(String, DataType)> = outcome
        .data
        .get_columns()
        .iter()
        .map(|c| (c.name().to_string(), c.dtype().clone()))
        .collect();
    assert!(dtypes.contains(&("user_id".to_string(), DataType::Int64)));
    assert!(dtypes.contains(&("price".to_string(), DataType::Float64)));
    assert!(dtypes.contains(&("amount".to_string(), DataType::Int64)));
    assert!(dtypes.contains(&("sex".to_string(), DataType::Float64)));
    assert!(dtypes.contains(&("date".to_string(), DataType::Date)));
    assert!(dtypes.contains(&(
        "behavior_time".to_string(),
        DataType::Datetime(TimeUnit::Milliseconds, None)
    )));
}

// ============================================================================
// Per-Stage Outcomes
// ============================================================================

#[test]
fn test_missing_values_outcome() {
    let outcome = fixed_pipeline()
        .process(load_fixture("user_behavior_sample.csv"))
        .unwrap();
    let missing = &outcome.report.missing;

    assert_eq!(missing.core_missing_dropped, 1);
    for column in ["category_id", "price", "amount", "sex", "address", "device", "comment"] {
        assert_eq!(
            missing.fill_for(column).map(|f| f.filled),
            Some(1),
            "fill count for '{}'",
            column
        );
    }
    assert_eq!(missing.fill_for("sex").unwrap().fill_value, "1");
    assert_eq!(missing.fill_for("address").unwrap().fill_value, "unknown");

    // No missing cell survives the run.
    for column in outcome.data.get_columns() {
        assert_eq!(column.null_count(), 0, "nulls left in '{}'", column.name());
    }

    let cleaned = &outcome.data;
    assert_eq!(floats(cleaned, "sex"), vec![1.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0]);
    assert_eq!(strings(cleaned, "address")[1], "unknown");
    assert_eq!(strings(cleaned, "comment")[1], "unknown");
}

#[test]
fn test_duplicates_outcome() {
    let outcome = fixed_pipeline()
        .process(load_fixture("user_behavior_sample.csv"))
        .unwrap();

    assert_eq!(outcome.report.duplicates.exact_removed, 1);
    assert_eq!(outcome.report.duplicates.logical_removed, 1);

    // The first occurrence of the duplicated event is the one kept.
    let cleaned = &outcome.data;
    assert_eq!(floats(cleaned, "price")[0], 19.9);
    assert_eq!(strings(cleaned, "comment")[0], "good");

    let keys: HashSet<(i64, i64, String, NaiveDateTime)> = ints(cleaned, "user_id")
        .into_iter()
        .zip(ints(cleaned, "goods_id"))
        .zip(strings(cleaned, "behavior"))
        .zip(behavior_times(cleaned))
        .map(|(((u, g), b), t)| (u, g, b, t))
        .collect();
    assert_eq!(keys.len(), cleaned.height());
}

#[test]
fn test_numeric_outcome() {
    let outcome = fixed_pipeline()
        .process(load_fixture("user_behavior_sample.csv"))
        .unwrap();
    let numeric = &outcome.report.numeric;

    for column in ["user_id", "goods_id", "category_id"] {
        assert_eq!(numeric.column(column).unwrap().rows_dropped, 1);
    }
    assert_eq!(numeric.rows_dropped(), 3);

    let price = numeric.column("price").unwrap();
    assert_eq!(price.filled_zero, 1);
    assert_eq!(price.negatives_clamped, 1);
    assert_eq!(price.capped, 1);

    // q0.99 over [0, 0, 0, 3, 3, 3, 5.5, 19.9, 30, 1e6] interpolates between 30 and 1e6.
    let cap = numeric.price_cap.unwrap();
    assert!((cap - (30.0 + 0.91 * (1_000_000.0 - 30.0))).abs() < 1e-3);

    let prices = floats(&outcome.data, "price");
    assert_eq!(prices[..4].to_vec(), vec![19.9, 5.5, 0.0, 0.0]);
    assert_eq!(prices[4], cap);
    assert!(prices.iter().all(|p| *p >= 0.0 && *p <= cap));

    let amount = numeric.column("amount").unwrap();
    assert_eq!(amount.negatives_clamped, 1);
    assert_eq!(amount.rounded, 2);
    assert_eq!(ints(&outcome.data, "amount"), vec![1, 0, 4, 2, 1, 0, 1]);
}

fn behavior_times(df: &DataFrame) -> Vec<NaiveDateTime> {
    ints(df, "behavior_time")
        .into_iter()
        .map(|ms| chrono::DateTime::from_timestamp_millis(ms).unwrap().naive_utc())
        .collect()
}

#[test]
fn test_temporal_outcome() {
    let outcome = fixed_pipeline()
        .process(load_fixture("user_behavior_sample.csv"))
        .unwrap();
    let temporal = &outcome.report.temporal;

    assert_eq!(temporal.run_time, run_time());
    assert_eq!(temporal.invalid_dropped, 2);
    assert_eq!(temporal.future_dropped, 1);

    let day = NaiveDate::from_ymd_opt(2023, 11, 14).unwrap();
    assert_eq!(temporal.earliest, Some(day.and_hms_opt(22, 13, 20).unwrap()));
    assert_eq!(temporal.latest, Some(day.and_hms_opt(22, 30, 0).unwrap()));

    let cleaned = &outcome.data;
    let times = behavior_times(cleaned);
    assert!(times.iter().all(|t| *t <= run_time()));

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let dates: Vec<NaiveDate> = ints(cleaned, "date")
        .into_iter()
        .map(|days| epoch + chrono::Duration::days(days))
        .collect();
    let hours = ints(cleaned, "hour");
    let weekdays = ints(cleaned, "weekday");

    for (i, time) in times.iter().enumerate() {
        use chrono::{Datelike, Timelike};
        assert_eq!(dates[i], time.date());
        assert_eq!(hours[i], time.hour() as i64);
        assert_eq!(weekdays[i], time.weekday().num_days_from_monday() as i64);
    }
    // 2023-11-14 was a Tuesday.
    assert!(weekdays.iter().all(|w| *w == 1));
}

#[test]
fn test_device_outcome() {
    let outcome = fixed_pipeline()
        .process(load_fixture("user_behavior_sample.csv"))
        .unwrap();

    assert_eq!(outcome.report.device.unwrap().values_changed, 6);
    assert_eq!(
        strings(&outcome.data, "device"),
        vec!["IOS", "ANDROID", "PC", "IOS", "MAC", "unknown", "ANDROID"]
    );
}

#[test]
fn test_keep_device_case() {
    let config = PipelineConfig::builder()
        .run_time(run_time())
        .normalize_device_case(false)
        .build()
        .unwrap();
    let outcome = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process(load_fixture("user_behavior_sample.csv"))
        .unwrap();

    assert!(outcome.report.device.is_none());
    assert!(outcome.report.stage(PipelineStage::DeviceNormalization).is_none());
    assert_eq!(strings(&outcome.data, "device")[2], "Pc");
}

#[test]
fn test_custom_quantile_and_sentinel() {
    let config = PipelineConfig::builder()
        .run_time(run_time())
        .price_quantile(0.5)
        .fill_sentinel("n/a")
        .build()
        .unwrap();
    let outcome = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process(load_fixture("user_behavior_sample.csv"))
        .unwrap();

    // Median of [0, 0, 0, 3, 3, 3, 5.5, 19.9, 30, 1e6].
    assert_eq!(outcome.report.numeric.price_cap, Some(3.0));
    assert_eq!(
        floats(&outcome.data, "price"),
        vec![3.0, 3.0, 0.0, 0.0, 3.0, 0.0, 3.0]
    );
    // The sentinel is left in its configured case.
    assert_eq!(strings(&outcome.data, "device")[5], "n/a");
    assert_eq!(strings(&outcome.data, "address")[1], "n/a");
}

#[test]
fn test_run_time_controls_future_cutoff() {
    // 1700000400 is 2023-11-14 22:20:00; the cutoff is inclusive.
    let cutoff = NaiveDate::from_ymd_opt(2023, 11, 14)
        .unwrap()
        .and_hms_opt(22, 20, 0)
        .unwrap();
    let config = PipelineConfig::builder().run_time(cutoff).build().unwrap();
    let outcome = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process(load_fixture("user_behavior_sample.csv"))
        .unwrap();

    assert_eq!(ints(&outcome.data, "user_id"), vec![1, 2, 3, 4]);
    assert_eq!(outcome.report.temporal.future_dropped, 4);
}

#[test]
fn test_second_pass_only_recaps_price() {
    let first = fixed_pipeline()
        .process(load_fixture("user_behavior_sample.csv"))
        .unwrap();

    // Feed the cleaned rows back with an epoch timestamp column.
    let mut again = first.data.clone();
    let seconds: Vec<i64> = ints(&again, "behavior_time")
        .into_iter()
        .map(|ms| ms / 1000)
        .collect();
    for name in ["behavior_time", "date", "hour", "weekday"] {
        again = again.drop(name).unwrap();
    }
    again
        .with_column(Series::new("timestamp".into(), seconds))
        .unwrap();

    let second = fixed_pipeline().process(again).unwrap();
    assert_eq!(second.report.rows_removed(), 0);
    assert_eq!(second.report.duplicates.total_removed(), 0);
    assert_eq!(second.report.missing.total_filled(), 0);
    assert_eq!(second.report.device.unwrap().values_changed, 0);

    // The cap is recomputed over the capped prices, so only price moves.
    let first_cap = first.report.numeric.price_cap.unwrap();
    assert!(second.report.numeric.price_cap.unwrap() <= first_cap);
    let unchanged = |df: &DataFrame| df.drop("price").unwrap();
    assert!(unchanged(&second.data).equals_missing(&unchanged(&first.data)));
}

// ============================================================================
// Warnings And Failures
// ============================================================================

#[test]
fn test_warnings_for_heavy_drop_and_future_records() {
    let outcome = fixed_pipeline()
        .process(load_fixture("user_behavior_sample.csv"))
        .unwrap();
    let warnings = &outcome.report.warnings;

    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].contains("% of records were dropped (9 of 16)"));
    assert!(warnings[1].contains("1 records had timestamps later than"));
}

#[test]
fn test_missing_column_is_schema_error() {
    let df = load_fixture("missing_comment_column.csv");
    let err = fixed_pipeline().process(df).unwrap_err();

    assert!(err.is_schema_error());
    assert_eq!(err.error_code(), "SCHEMA_ERROR");
    assert_eq!(err.missing_columns(), Some(&["comment".to_string()][..]));
}

#[test]
fn test_all_missing_sex_is_undefined_fill() {
    let df = load_fixture("all_missing_sex.csv");
    let err = fixed_pipeline().process(df).unwrap_err();

    assert_eq!(err.error_code(), "UNDEFINED_FILL_VALUE");
    assert!(err.to_string().contains("sex"));
}

#[test]
fn test_header_only_table() {
    let df = load_fixture("user_behavior_sample.csv").head(Some(0));
    let outcome = fixed_pipeline().process(df).unwrap();

    assert_eq!(outcome.report.rows_before, 0);
    assert_eq!(outcome.report.rows_after, 0);
    assert_eq!(outcome.report.numeric.price_cap, None);
    assert!(outcome.report.warnings.is_empty());
    assert_eq!(outcome.data.width(), 14);
}

// ============================================================================
// Progress Reporting
// ============================================================================

#[test]
fn test_progress_updates_cover_every_stage() {
    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);

    let config = PipelineConfig::builder()
        .run_time(run_time())
        .build()
        .unwrap();
    Pipeline::builder()
        .config(config)
        .on_progress(move |update| sink.lock().unwrap().push(update))
        .build()
        .unwrap()
        .process(load_fixture("user_behavior_sample.csv"))
        .unwrap();

    let updates = updates.lock().unwrap();
    assert_eq!(updates.len(), 11);
    assert_eq!(updates.last().unwrap().stage, PipelineStage::Complete);
    assert!(updates.windows(2).all(|w| w[0].progress <= w[1].progress + 1e-6));

    let finished: Vec<(usize, usize)> = updates
        .iter()
        .filter_map(|u| u.rows_before.zip(u.rows_after))
        .collect();
    assert_eq!(finished, vec![(16, 15), (15, 13), (13, 10), (10, 7), (7, 7)]);
}

#[test]
fn test_progress_reports_failure() {
    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);

    let result = Pipeline::builder()
        .on_progress(move |update| sink.lock().unwrap().push(update))
        .build()
        .unwrap()
        .process(load_fixture("missing_comment_column.csv"));

    assert!(matches!(result, Err(CleaningError::Schema { .. })));
    let updates = updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].stage, PipelineStage::Failed);
}

// ============================================================================
// Files And Reports
// ============================================================================

#[test]
fn test_write_and_reload_cleaned_table() {
    let dir = temp_dir("roundtrip");
    let outcome = fixed_pipeline()
        .process(load_fixture("user_behavior_sample.csv"))
        .unwrap();

    let mut cleaned = outcome.data;
    let path = io::write_table(&mut cleaned, dir.join("cleaned.csv")).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    let reloaded = io::load_table(&path).unwrap();
    std::fs::remove_dir_all(&dir).ok();

    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some(
            "user_id,goods_id,category_id,behavior,price,amount,sex,address,device,comment,\
             behavior_time,date,hour,weekday"
        )
    );
    assert!(
        lines
            .next()
            .unwrap()
            .ends_with(",2023-11-14 22:13:20,2023-11-14,22,1")
    );

    assert_eq!(reloaded.height(), 7);
    assert_eq!(ints(&reloaded, "user_id"), vec![1, 2, 3, 4, 7, 10, 12]);
    assert_eq!(ints(&reloaded, "amount"), vec![1, 0, 4, 2, 1, 0, 1]);
}

#[test]
fn test_gb18030_files_with_chinese_sentinel() {
    let dir = temp_dir("gb18030");
    let gb18030 = io::encoding_for_label("gb18030").unwrap();

    // Re-encode the sample so the run reads a legacy-encoded export.
    let mut raw = load_fixture("user_behavior_sample.csv");
    raw.replace(
        "address",
        Series::new(
            "address".into(),
            strings_or_null(&raw, "address")
                .into_iter()
                .map(|v| v.map(|a| if a == "Beijing" { "北京".to_string() } else { a }))
                .collect::<Vec<_>>(),
        ),
    )
    .unwrap();
    let input = io::write_table_with_encoding(&mut raw, dir.join("raw.csv"), gb18030).unwrap();

    let config = PipelineConfig::builder()
        .run_time(run_time())
        .fill_sentinel("未知")
        .build()
        .unwrap();
    let outcome = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process(io::load_table_with_encoding(&input, gb18030).unwrap())
        .unwrap();

    let mut cleaned = outcome.data;
    let output =
        io::write_table_with_encoding(&mut cleaned, dir.join("cleaned.csv"), gb18030).unwrap();
    let reloaded = io::load_table_with_encoding(&output, gb18030).unwrap();
    std::fs::remove_dir_all(&dir).ok();

    let address = strings(&reloaded, "address");
    assert_eq!(address[0], "北京");
    assert_eq!(address[1], "未知");
    assert_eq!(strings(&reloaded, "device")[5], "未知");
}

fn strings_or_null(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(String::from))
        .collect()
}

#[test]
fn test_run_report_json() {
    let df = load_fixture("user_behavior_sample.csv");
    let profile = ReportGenerator::missing_profile(&df).unwrap();
    let outcome = fixed_pipeline().process(df).unwrap();

    let profiled: Vec<(&str, usize)> = profile
        .iter()
        .map(|s| (s.column.as_str(), s.missing))
        .collect();
    assert_eq!(
        profiled,
        vec![
            ("user_id", 1),
            ("category_id", 1),
            ("price", 1),
            ("amount", 1),
            ("sex", 1),
            ("address", 1),
            ("device", 1),
            ("comment", 1),
        ]
    );

    let dir = temp_dir("report");
    let report = ReportGenerator::build_run_report(
        "user_behavior_sample.csv",
        None,
        profile,
        &outcome.report,
    );
    let path = ReportGenerator::new(dir.clone())
        .write_report_to_file(&report, "user_behavior_sample")
        .unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_dir_all(&dir).ok();

    let parsed: RunReport = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed.cleaning, outcome.report);
    assert!(content.contains("\"stage\": \"temporal_normalization\""));
}
