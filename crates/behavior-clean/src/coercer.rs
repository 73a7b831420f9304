//! Field coercion: raw column values to typed optional values.
//!
//! Every parse in the pipeline goes through [`FieldCoercer`]. A value that
//! cannot be read as the target type becomes `None` (the missing marker), so
//! stages apply one drop/fill rule instead of handling parse failures.

use crate::utils::{MISSING_MARKERS, is_integer_dtype, is_missing_marker, is_numeric_dtype};
use polars::prelude::*;

/// Parses raw fields into numbers, integers and text.
pub struct FieldCoercer;

impl FieldCoercer {
    /// Check if a text value counts as missing (blank or a missing marker).
    pub fn is_missing_text(raw: &str) -> bool {
        let trimmed = raw.trim();
        trimmed.is_empty() || is_missing_marker(trimmed)
    }

    /// Parse a raw value as a finite number.
    ///
    /// Empty text, missing markers, non-numeric text and values that overflow
    /// to infinity all yield `None`.
    pub fn parse_numeric(raw: &str) -> Option<f64> {
        if Self::is_missing_text(raw) {
            return None;
        }
        raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Parse a raw value as an integer.
    ///
    /// Integral decimals such as `"12.0"` are accepted; fractional values and
    /// anything outside the `i64` range yield `None`.
    pub fn parse_integer(raw: &str) -> Option<i64> {
        if Self::is_missing_text(raw) {
            return None;
        }
        let trimmed = raw.trim();
        trimmed
            .parse::<i64>()
            .ok()
            .or_else(|| trimmed.parse::<f64>().ok().and_then(Self::integral))
    }

    /// Narrow a float to `i64` when it holds an exact integer in range.
    pub fn integral(value: f64) -> Option<i64> {
        // 2^63 is exactly representable; anything at or above it overflows i64.
        const LIMIT: f64 = 9_223_372_036_854_775_808.0;
        if value.is_finite() && value.fract() == 0.0 && value >= -LIMIT && value < LIMIT {
            Some(value as i64)
        } else {
            None
        }
    }

    /// Coerce a column to optional finite floats.
    pub fn numeric_column(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
        match series.dtype() {
            DataType::String => Ok(series
                .str()?
                .into_iter()
                .map(|v| v.and_then(Self::parse_numeric))
                .collect()),
            DataType::Null => Ok(vec![None; series.len()]),
            dtype if is_numeric_dtype(dtype) || matches!(dtype, DataType::Boolean) => {
                let floats = series.cast(&DataType::Float64)?;
                Ok(floats
                    .f64()?
                    .into_iter()
                    .map(|v| v.filter(|x| x.is_finite()))
                    .collect())
            }
            _ => {
                let text = series.cast(&DataType::String)?;
                Self::numeric_column(&text)
            }
        }
    }

    /// Coerce a column to optional integers.
    pub fn integer_column(series: &Series) -> PolarsResult<Vec<Option<i64>>> {
        match series.dtype() {
            DataType::String => Ok(series
                .str()?
                .into_iter()
                .map(|v| v.and_then(Self::parse_integer))
                .collect()),
            dtype if is_integer_dtype(dtype) => {
                let ints = series.cast(&DataType::Int64)?;
                Ok(ints.i64()?.into_iter().collect())
            }
            _ => Ok(Self::numeric_column(series)?
                .into_iter()
                .map(|v| v.and_then(Self::integral))
                .collect()),
        }
    }

    /// Read a column as optional text; missing text values become `None`.
    pub fn text_column(series: &Series) -> PolarsResult<Vec<Option<String>>> {
        let text = match series.dtype() {
            DataType::String => series.clone(),
            _ => series.cast(&DataType::String)?,
        };
        Ok(text
            .str()?
            .into_iter()
            .map(|v| match v {
                Some(s) if !Self::is_missing_text(s) => Some(s.to_string()),
                _ => None,
            })
            .collect())
    }

    /// One flag per row: true where the raw value is missing.
    ///
    /// Only absence counts here. A present but unparsable value such as
    /// `"abc"` in a numeric column is not missing; numeric coercion handles it.
    pub fn missing_mask(series: &Series) -> PolarsResult<Vec<bool>> {
        match series.dtype() {
            DataType::String => Ok(series
                .str()?
                .into_iter()
                .map(|v| v.is_none_or(Self::is_missing_text))
                .collect()),
            DataType::Float32 | DataType::Float64 => {
                let floats = series.cast(&DataType::Float64)?;
                Ok(floats
                    .f64()?
                    .into_iter()
                    .map(|v| v.is_none_or(|x| x.is_nan()))
                    .collect())
            }
            _ => Ok(series.is_null().into_iter().map(|v| v.unwrap_or(true)).collect()),
        }
    }

    /// Markers treated as missing when reading text.
    pub fn missing_markers() -> &'static [&'static str] {
        &MISSING_MARKERS
    }
}
