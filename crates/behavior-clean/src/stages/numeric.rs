//! Numeric normalization: identifier validation, price capping and amount
//! rounding.
//!
//! Steps run in a fixed order because each one shrinks the table the next
//! one computes over:
//!
//! 1. `user_id`, `goods_id`: drop missing or `<= 0`
//! 2. `category_id`: drop missing or `< 0` (0 is the uncategorized sentinel)
//! 3. `price`: missing to 0, negatives to 0, then cap at the configured
//!    quantile of the clamped column
//! 4. `amount`: missing to 0, negatives to 0, round half to even, integer

use super::CleaningStage;
use crate::coercer::FieldCoercer;
use crate::config::DEFAULT_PRICE_QUANTILE;
use crate::error::Result;
use crate::pipeline::PipelineStage;
use crate::schema::{AMOUNT, CATEGORY_ID, GOODS_ID, PRICE, USER_ID, require_columns};
use crate::types::{ColumnAdjustment, NumericReport};
use crate::utils::{filter_rows, is_integer_dtype, quantile, round_half_even};
use polars::prelude::*;
use tracing::{debug, info};

/// Validates identifiers and normalizes `price` and `amount`.
#[derive(Debug, Clone, Copy)]
pub struct NumericNormalizationStage {
    price_quantile: f64,
}

impl Default for NumericNormalizationStage {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_QUANTILE)
    }
}

impl NumericNormalizationStage {
    pub fn new(price_quantile: f64) -> Self {
        Self { price_quantile }
    }

    /// Drop rows whose identifier is missing or fails `valid`.
    ///
    /// Survivors are stored as `Int64` when every one of them is integral
    /// and as `Float64` otherwise, so a fractional ID is kept as read.
    fn validate_identifier(
        df: DataFrame,
        name: &str,
        valid: impl Fn(f64) -> bool,
    ) -> Result<(DataFrame, ColumnAdjustment)> {
        let series = df.column(name)?.as_materialized_series();
        let (keep, column) = if is_integer_dtype(series.dtype()) {
            // Integer columns skip the float round trip so large IDs stay exact.
            let values = FieldCoercer::integer_column(series)?;
            let keep: Vec<bool> = values
                .iter()
                .map(|v| v.is_some_and(|x| valid(x as f64)))
                .collect();
            let kept: Vec<i64> = values
                .into_iter()
                .flatten()
                .filter(|x| valid(*x as f64))
                .collect();
            (keep, Series::new(name.into(), kept))
        } else {
            let values = FieldCoercer::numeric_column(series)?;
            let keep: Vec<bool> = values.iter().map(|v| v.is_some_and(&valid)).collect();
            let kept: Vec<f64> = values.into_iter().flatten().filter(|x| valid(*x)).collect();
            let integral: Option<Vec<i64>> =
                kept.iter().map(|x| FieldCoercer::integral(*x)).collect();
            match integral {
                Some(ints) => (keep, Series::new(name.into(), ints)),
                None => (keep, Series::new(name.into(), kept)),
            }
        };

        let (mut df, rows_dropped) = filter_rows(&df, &keep)?;
        df.replace(name, column)?;

        let mut adjustment = ColumnAdjustment::new(name);
        adjustment.rows_dropped = rows_dropped;
        Ok((df, adjustment))
    }

    /// Coerce to numbers, replacing missing with 0 and clamping negatives.
    fn non_negative(series: &Series, adjustment: &mut ColumnAdjustment) -> PolarsResult<Vec<f64>> {
        Ok(FieldCoercer::numeric_column(series)?
            .into_iter()
            .map(|v| match v {
                None => {
                    adjustment.filled_zero += 1;
                    0.0
                }
                Some(x) if x < 0.0 => {
                    adjustment.negatives_clamped += 1;
                    0.0
                }
                Some(x) => x,
            })
            .collect())
    }

    /// Clamp prices into `[0, cap]`, where `cap` is the configured quantile
    /// of the prices after negative clamping.
    fn cap_price(&self, df: &mut DataFrame) -> Result<(ColumnAdjustment, Option<f64>)> {
        let mut adjustment = ColumnAdjustment::new(PRICE);
        let mut prices =
            Self::non_negative(df.column(PRICE)?.as_materialized_series(), &mut adjustment)?;

        let cap = quantile(&prices, self.price_quantile);
        if let Some(cap) = cap {
            for price in prices.iter_mut().filter(|p| **p > cap) {
                *price = cap;
                adjustment.capped += 1;
            }
        }

        df.replace(PRICE, Series::new(PRICE.into(), prices))?;
        Ok((adjustment, cap))
    }

    /// Clamp amounts to `>= 0` and round them to integers.
    fn round_amount(df: &mut DataFrame) -> Result<ColumnAdjustment> {
        let mut adjustment = ColumnAdjustment::new(AMOUNT);
        let amounts = Self::non_negative(df.column(AMOUNT)?.as_materialized_series(), &mut adjustment)?;

        let rounded: Vec<i64> = amounts
            .into_iter()
            .map(|a| {
                if a.fract() != 0.0 {
                    adjustment.rounded += 1;
                }
                round_half_even(a) as i64
            })
            .collect();

        df.replace(AMOUNT, Series::new(AMOUNT.into(), rounded))?;
        Ok(adjustment)
    }
}

impl CleaningStage for NumericNormalizationStage {
    type Report = NumericReport;

    fn stage(&self) -> PipelineStage {
        PipelineStage::NumericNormalization
    }

    fn apply(&self, df: DataFrame) -> Result<(DataFrame, NumericReport)> {
        require_columns(&df, &[USER_ID, GOODS_ID, CATEGORY_ID, PRICE, AMOUNT])?;

        let mut report = NumericReport {
            columns: Vec::with_capacity(5),
            price_cap: None,
            price_quantile: self.price_quantile,
        };

        let (df, user) = Self::validate_identifier(df, USER_ID, |v| v > 0.0)?;
        let (df, goods) = Self::validate_identifier(df, GOODS_ID, |v| v > 0.0)?;
        let (mut df, category) = Self::validate_identifier(df, CATEGORY_ID, |v| v >= 0.0)?;
        for adjustment in [user, goods, category] {
            debug!(
                "Dropped {} rows with invalid '{}'",
                adjustment.rows_dropped, adjustment.column
            );
            report.columns.push(adjustment);
        }

        let (price, cap) = self.cap_price(&mut df)?;
        match cap {
            Some(cap) => debug!(
                "Price cap at quantile {}: {:.4} ({} values capped, {} negatives clamped)",
                self.price_quantile, cap, price.capped, price.negatives_clamped
            ),
            None => debug!("Price cap skipped: table is empty"),
        }
        report.price_cap = cap;
        report.columns.push(price);

        let amount = Self::round_amount(&mut df)?;
        debug!(
            "Amount: {} negatives clamped, {} values rounded",
            amount.negatives_clamped, amount.rounded
        );
        report.columns.push(amount);

        info!(
            "Numeric normalization: dropped {} rows with invalid identifiers, price cap {:?}",
            report.rows_dropped(),
            report.price_cap
        );

        Ok((df, report))
    }
}
