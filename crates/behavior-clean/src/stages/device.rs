//! Device name case normalization.

use super::CleaningStage;
use crate::config::DEFAULT_FILL_SENTINEL;
use crate::error::Result;
use crate::pipeline::PipelineStage;
use crate::schema::{DEVICE, require_columns};
use crate::types::DeviceCaseReport;
use polars::prelude::*;
use tracing::info;

/// Upper-cases the `device` column so `ios`, `iOS` and `IOS` group together.
///
/// The fill sentinel is left as written so filled cells stay recognisable.
#[derive(Debug, Clone)]
pub struct DeviceCaseStage {
    fill_sentinel: String,
}

impl Default for DeviceCaseStage {
    fn default() -> Self {
        Self::new(DEFAULT_FILL_SENTINEL)
    }
}

impl DeviceCaseStage {
    pub fn new(fill_sentinel: impl Into<String>) -> Self {
        Self {
            fill_sentinel: fill_sentinel.into(),
        }
    }
}

impl CleaningStage for DeviceCaseStage {
    type Report = DeviceCaseReport;

    fn stage(&self) -> PipelineStage {
        PipelineStage::DeviceNormalization
    }

    fn apply(&self, mut df: DataFrame) -> Result<(DataFrame, DeviceCaseReport)> {
        require_columns(&df, &[DEVICE])?;

        let mut report = DeviceCaseReport::default();
        let text = df
            .column(DEVICE)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let values: Vec<Option<String>> = text
            .str()?
            .into_iter()
            .map(|v| {
                v.map(|device| {
                    if device == self.fill_sentinel {
                        return device.to_string();
                    }
                    let upper = device.to_uppercase();
                    if upper != device {
                        report.values_changed += 1;
                    }
                    upper
                })
            })
            .collect();

        df.replace(DEVICE, Series::new(DEVICE.into(), values))?;
        info!("Device normalization: {} values upper-cased", report.values_changed);

        Ok((df, report))
    }
}
