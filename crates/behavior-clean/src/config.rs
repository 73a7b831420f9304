//! Configuration types for the cleaning pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Default quantile used to cap outlier prices.
pub const DEFAULT_PRICE_QUANTILE: f64 = 0.99;

/// Default fill value for missing text fields.
pub const DEFAULT_FILL_SENTINEL: &str = "unknown";

/// Configuration for the cleaning pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use behavior_clean::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .price_quantile(0.95)
///     .fill_sentinel("n/a")
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Quantile of the price column used as the outlier cap, in (0.0, 1.0].
    /// Default: 0.99
    pub price_quantile: f64,

    /// Value written into missing `address`, `device` and `comment` fields.
    /// Default: "unknown"
    pub fill_sentinel: String,

    /// Fixed "now" (UTC, timezone-naive) used as the future-timestamp cutoff.
    /// If None, the wall clock is sampled once at the start of each run.
    /// Default: None
    pub run_time: Option<NaiveDateTime>,

    /// Whether to upper-case the `device` column after temporal normalization.
    /// Default: true
    pub normalize_device_case: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            price_quantile: DEFAULT_PRICE_QUANTILE,
            fill_sentinel: DEFAULT_FILL_SENTINEL.to_string(),
            run_time: None,
            normalize_device_case: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.price_quantile > 0.0 && self.price_quantile <= 1.0) {
            return Err(ConfigValidationError::InvalidQuantile(self.price_quantile));
        }

        if self.fill_sentinel.trim().is_empty() {
            return Err(ConfigValidationError::EmptyFillSentinel);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid price quantile: {0} (must be greater than 0.0 and at most 1.0)")]
    InvalidQuantile(f64),

    #[error("Fill sentinel must not be empty")]
    EmptyFillSentinel,
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    price_quantile: Option<f64>,
    fill_sentinel: Option<String>,
    run_time: Option<NaiveDateTime>,
    normalize_device_case: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Set the quantile used to cap outlier prices.
    ///
    /// # Arguments
    /// * `quantile` - Value in (0.0, 1.0] (e.g., 0.99 = 99th percentile)
    pub fn price_quantile(mut self, quantile: f64) -> Self {
        self.price_quantile = Some(quantile);
        self
    }

    /// Set the value used for missing text fields.
    pub fn fill_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.fill_sentinel = Some(sentinel.into());
        self
    }

    /// Pin the run's "now" so reruns over the same input are reproducible.
    pub fn run_time(mut self, now: NaiveDateTime) -> Self {
        self.run_time = Some(now);
        self
    }

    /// Enable or disable upper-casing of the `device` column.
    pub fn normalize_device_case(mut self, normalize: bool) -> Self {
        self.normalize_device_case = Some(normalize);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let config = PipelineConfig {
            price_quantile: self.price_quantile.unwrap_or(DEFAULT_PRICE_QUANTILE),
            fill_sentinel: self
                .fill_sentinel
                .unwrap_or_else(|| DEFAULT_FILL_SENTINEL.to_string()),
            run_time: self.run_time,
            normalize_device_case: self.normalize_device_case.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}
