//! Missing-value handling.

use super::CleaningStage;
use crate::coercer::FieldCoercer;
use crate::config::DEFAULT_FILL_SENTINEL;
use crate::error::{CleaningError, Result, ResultExt};
use crate::pipeline::PipelineStage;
use crate::schema::{
    AMOUNT, CATEGORY_ID, CORE_COLUMNS, INPUT_COLUMNS, PRICE, SEX, TEXT_COLUMNS, require_columns,
};
use crate::types::{FillRecord, MissingValueReport};
use crate::utils::{filter_rows, is_integer_dtype};
use polars::prelude::*;
use tracing::{debug, info};

/// Columns whose missing cells are filled with zero.
const ZERO_FILL_COLUMNS: [&str; 3] = [PRICE, AMOUNT, CATEGORY_ID];

/// Drops records missing a core field and fills every optional field.
///
/// - `user_id`, `goods_id`, `behavior`, `timestamp`: missing drops the record
/// - `price`, `amount`, `category_id`: missing becomes 0
/// - `sex`: missing becomes the median of the present values
/// - `address`, `device`, `comment`: missing becomes the fill sentinel
///
/// Fills only replace absent values. A present but malformed number such as
/// `"abc"` in `price` is left for numeric normalization to handle.
#[derive(Debug, Clone)]
pub struct MissingValueStage {
    fill_sentinel: String,
}

impl Default for MissingValueStage {
    fn default() -> Self {
        Self::new(DEFAULT_FILL_SENTINEL)
    }
}

impl MissingValueStage {
    pub fn new(fill_sentinel: impl Into<String>) -> Self {
        Self {
            fill_sentinel: fill_sentinel.into(),
        }
    }

    /// Drop every row with a missing value in any core column.
    fn drop_core_missing(df: &DataFrame) -> Result<(DataFrame, usize)> {
        let mut keep = vec![true; df.height()];
        for name in CORE_COLUMNS {
            let missing = FieldCoercer::missing_mask(df.column(name)?.as_materialized_series())?;
            for (k, m) in keep.iter_mut().zip(missing) {
                *k &= !m;
            }
        }
        Ok(filter_rows(df, &keep)?)
    }

    /// Fill missing cells with zero, keeping the column's kind.
    ///
    /// Text columns receive the text `"0"`, integer columns `0` and every
    /// other column becomes `Float64` with `0.0`.
    fn fill_zero(df: &mut DataFrame, name: &str) -> Result<usize> {
        let series = df.column(name)?.as_materialized_series().clone();
        let missing = FieldCoercer::missing_mask(&series)?;
        let filled = missing.iter().filter(|m| **m).count();
        if filled == 0 {
            return Ok(0);
        }

        let replacement = match series.dtype() {
            DataType::String => {
                let values: Vec<String> = series
                    .str()?
                    .into_iter()
                    .zip(&missing)
                    .map(|(v, m)| match v {
                        Some(s) if !*m => s.to_string(),
                        _ => "0".to_string(),
                    })
                    .collect();
                Series::new(name.into(), values)
            }
            dtype if is_integer_dtype(dtype) => {
                let ints = series.cast(&DataType::Int64)?;
                let values: Vec<i64> = ints.i64()?.into_iter().map(|v| v.unwrap_or(0)).collect();
                Series::new(name.into(), values)
            }
            _ => {
                let values: Vec<f64> = FieldCoercer::numeric_column(&series)?
                    .into_iter()
                    .map(|v| v.unwrap_or(0.0))
                    .collect();
                Series::new(name.into(), values)
            }
        };

        df.replace(name, replacement)?;
        Ok(filled)
    }

    /// Fill missing `sex` codes with the median of the present codes.
    ///
    /// Only absent cells are filled. The median is taken over the present
    /// cells that parse as numbers; a present but malformed code such as
    /// `"F"` is left as written, which keeps the column as text. Otherwise
    /// the column is stored as `Float64`.
    ///
    /// Returns the fill value and the number of cells filled, or `None` when
    /// nothing was missing.
    fn fill_median(df: &mut DataFrame, name: &str) -> Result<Option<(f64, usize)>> {
        let series = df.column(name)?.as_materialized_series().clone();
        let missing = FieldCoercer::missing_mask(&series)?;
        let values = FieldCoercer::numeric_column(&series)?;
        let filled = missing.iter().filter(|m| **m).count();

        let present: Vec<f64> = values
            .iter()
            .zip(&missing)
            .filter_map(|(v, m)| if *m { None } else { *v })
            .collect();
        let malformed = values.iter().zip(&missing).any(|(v, m)| !*m && v.is_none());

        let fill = if filled == 0 {
            None
        } else {
            let median = Float64Chunked::from_vec(name.into(), present).median();
            Some(median.ok_or_else(|| CleaningError::UndefinedFillValue {
                column: name.to_string(),
            })?)
        };

        let replacement = match fill {
            Some(fill) if malformed => {
                let text = series.cast(&DataType::String)?;
                let column: Vec<String> = text
                    .str()?
                    .into_iter()
                    .zip(&missing)
                    .map(|(v, m)| match v {
                        Some(s) if !*m => s.to_string(),
                        _ => fill.to_string(),
                    })
                    .collect();
                Series::new(name.into(), column)
            }
            None if malformed => return Ok(None),
            _ => {
                let column: Vec<f64> = values
                    .into_iter()
                    .map(|v| v.or(fill).unwrap_or(f64::NAN))
                    .collect();
                Series::new(name.into(), column)
            }
        };

        df.replace(name, replacement)?;
        Ok(fill.map(|f| (f, filled)))
    }

    /// Fill missing text with the sentinel.
    fn fill_text(&self, df: &mut DataFrame, name: &str) -> Result<usize> {
        let values = FieldCoercer::text_column(df.column(name)?.as_materialized_series())?;
        let filled = values.iter().filter(|v| v.is_none()).count();
        let column: Vec<String> = values
            .into_iter()
            .map(|v| v.unwrap_or_else(|| self.fill_sentinel.clone()))
            .collect();
        df.replace(name, Series::new(name.into(), column))?;
        Ok(filled)
    }
}

impl CleaningStage for MissingValueStage {
    type Report = MissingValueReport;

    fn stage(&self) -> PipelineStage {
        PipelineStage::MissingValues
    }

    fn apply(&self, df: DataFrame) -> Result<(DataFrame, MissingValueReport)> {
        require_columns(&df, &INPUT_COLUMNS)?;

        let (mut df, core_missing_dropped) =
            Self::drop_core_missing(&df).context("While dropping records missing core fields")?;
        let mut report = MissingValueReport {
            core_missing_dropped,
            fills: Vec::new(),
        };

        for name in ZERO_FILL_COLUMNS {
            let filled = Self::fill_zero(&mut df, name)?;
            if filled > 0 {
                debug!("Filled {} missing values in '{}' with 0", filled, name);
                report.fills.push(FillRecord {
                    column: name.to_string(),
                    fill_value: "0".to_string(),
                    filled,
                });
            }
        }

        if let Some((fill, filled)) = Self::fill_median(&mut df, SEX)? {
            debug!("Filled {} missing values in '{}' with median {}", filled, SEX, fill);
            report.fills.push(FillRecord {
                column: SEX.to_string(),
                fill_value: fill.to_string(),
                filled,
            });
        }

        for name in TEXT_COLUMNS {
            let filled = self.fill_text(&mut df, name)?;
            if filled > 0 {
                debug!(
                    "Filled {} missing values in '{}' with '{}'",
                    filled, name, self.fill_sentinel
                );
                report.fills.push(FillRecord {
                    column: name.to_string(),
                    fill_value: self.fill_sentinel.clone(),
                    filled,
                });
            }
        }

        info!(
            "Missing values: dropped {} records missing core fields, filled {} cells",
            report.core_missing_dropped,
            report.total_filled()
        );

        Ok((df, report))
    }
}
