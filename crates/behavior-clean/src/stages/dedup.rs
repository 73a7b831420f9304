//! Duplicate event removal.

use super::CleaningStage;
use crate::error::Result;
use crate::pipeline::PipelineStage;
use crate::schema::{EVENT_KEY_COLUMNS, require_columns};
use crate::types::DedupReport;
use crate::utils::{column_names, filter_rows};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info};

/// Removes exact duplicates, then logical duplicates, keeping the first
/// occurrence each time.
///
/// The logical pass runs over the survivors of the exact pass, so "first"
/// means first in the table as it stands after exact removal. Fields of a
/// discarded logical duplicate are ignored even when they differ from the
/// kept record.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeduplicationStage;

impl DeduplicationStage {
    pub fn new() -> Self {
        Self
    }

    /// Keep-first mask over `df` keyed on `columns`.
    ///
    /// Values are compared by their text rendering, so a null only equals
    /// another null and `1.0` equals `1.0` regardless of the column's dtype.
    fn first_occurrence_mask(df: &DataFrame, columns: &[String]) -> Result<Vec<bool>> {
        let rendered: Vec<Vec<Option<String>>> = columns
            .iter()
            .map(|name| {
                let text = df
                    .column(name)?
                    .as_materialized_series()
                    .cast(&DataType::String)?;
                Ok(text
                    .str()?
                    .into_iter()
                    .map(|v| v.map(str::to_string))
                    .collect())
            })
            .collect::<PolarsResult<_>>()?;

        let mut seen: HashSet<Vec<Option<String>>> = HashSet::with_capacity(df.height());
        let mask = (0..df.height())
            .map(|row| {
                let key: Vec<Option<String>> =
                    rendered.iter().map(|col| col[row].clone()).collect();
                seen.insert(key)
            })
            .collect();
        Ok(mask)
    }

    /// Collapse records equal across every column.
    pub fn remove_exact(df: &DataFrame) -> Result<(DataFrame, usize)> {
        let mask = Self::first_occurrence_mask(df, &column_names(df))?;
        Ok(filter_rows(df, &mask)?)
    }

    /// Collapse records sharing `(user_id, goods_id, behavior, timestamp)`.
    pub fn remove_logical(df: &DataFrame) -> Result<(DataFrame, usize)> {
        require_columns(df, &EVENT_KEY_COLUMNS)?;
        let key: Vec<String> = EVENT_KEY_COLUMNS.iter().map(|s| s.to_string()).collect();
        let mask = Self::first_occurrence_mask(df, &key)?;
        Ok(filter_rows(df, &mask)?)
    }
}

impl CleaningStage for DeduplicationStage {
    type Report = DedupReport;

    fn stage(&self) -> PipelineStage {
        PipelineStage::Deduplication
    }

    fn apply(&self, df: DataFrame) -> Result<(DataFrame, DedupReport)> {
        require_columns(&df, &EVENT_KEY_COLUMNS)?;

        let (df, exact_removed) = Self::remove_exact(&df)?;
        debug!("Removed {} exact duplicate records", exact_removed);

        let (df, logical_removed) = Self::remove_logical(&df)?;
        debug!("Removed {} logical duplicate records", logical_removed);

        info!(
            "Deduplication: removed {} exact and {} logical duplicates",
            exact_removed, logical_removed
        );

        Ok((
            df,
            DedupReport {
                exact_removed,
                logical_removed,
            },
        ))
    }
}
