//! Shared utilities for the cleaning pipeline.
//!
//! This module contains common helper functions used across multiple stages
//! to reduce code duplication and ensure consistency.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    is_integer_dtype(dtype) || matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

// =============================================================================
// Missing Value Markers
// =============================================================================

/// Text values read as missing, matching the usual CSV missing-value markers.
pub const MISSING_MARKERS: [&str; 19] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null", "none",
];

/// Check if a (trimmed) string is a missing-value marker.
///
/// # Example
///
/// ```rust,ignore
/// use behavior_clean::utils::is_missing_marker;
///
/// assert!(is_missing_marker("N/A"));
/// assert!(!is_missing_marker("42"));
/// ```
pub fn is_missing_marker(s: &str) -> bool {
    MISSING_MARKERS.contains(&s)
}

// =============================================================================
// Statistics Utilities
// =============================================================================

/// Quantile with linear interpolation between the two nearest ranks.
///
/// For `n` sorted values the quantile sits at position `(n - 1) * q`; a
/// fractional position interpolates between its neighbours.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Round to the nearest integer, sending exact halves to the even neighbour.
#[inline]
pub fn round_half_even(value: f64) -> f64 {
    value.round_ties_even()
}

// =============================================================================
// Series Utilities
// =============================================================================

/// Build a keep-mask and filter the frame, returning the number of rows dropped.
pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> PolarsResult<(DataFrame, usize)> {
    let dropped = keep.iter().filter(|k| !**k).count();
    if dropped == 0 {
        return Ok((df.clone(), 0));
    }
    let mask = BooleanChunked::from_slice("mask".into(), keep);
    Ok((df.filter(&mask)?, dropped))
}

/// Column names of a frame as owned strings.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
