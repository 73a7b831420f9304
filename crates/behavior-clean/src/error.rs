//! Custom error types for the cleaning pipeline.
//!
//! Row-level data problems (malformed numbers, missing core fields, duplicate
//! events, outliers, future timestamps) are never errors: every stage resolves
//! them with a drop, fill, or clamp policy. The variants below cover the
//! failures that stop a run outright.
//!
//! Errors are serializable so a caller can hand them to a reporting layer as
//! `{ code, message }` pairs.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// One or more expected columns are absent from the input table.
    #[error("Missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A median fill was needed but the column has no present values.
    #[error("Cannot fill missing values in column '{column}': no non-missing values to compute a median from")]
    UndefinedFillValue { column: String },

    /// Invalid configuration provided, such as an unknown text encoding.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Build a schema error from any list of column names.
    pub fn schema<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CleaningError::Schema {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for callers that branch on the failure kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "SCHEMA_ERROR",
            Self::UndefinedFillValue { .. } => "UNDEFINED_FILL_VALUE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error was caused by the shape of the input table.
    pub fn is_schema_error(&self) -> bool {
        match self {
            Self::Schema { .. } => true,
            Self::WithContext { source, .. } => source.is_schema_error(),
            _ => false,
        }
    }

    /// Columns named by a schema error, if this is one.
    pub fn missing_columns(&self) -> Option<&[String]> {
        match self {
            Self::Schema { missing } => Some(missing),
            Self::WithContext { source, .. } => source.missing_columns(),
            _ => None,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(CleaningError::schema(["user_id"]).error_code(), "SCHEMA_ERROR");
        assert_eq!(
            CleaningError::UndefinedFillValue {
                column: "sex".to_string()
            }
            .error_code(),
            "UNDEFINED_FILL_VALUE"
        );
    }

    #[test]
    fn test_schema_error_names_every_column() {
        let error = CleaningError::schema(["price", "amount"]);
        let message = error.to_string();
        assert!(message.contains("price"));
        assert!(message.contains("amount"));
        assert_eq!(
            error.missing_columns(),
            Some(&["price".to_string(), "amount".to_string()][..])
        );
    }

    #[test]
    fn test_is_schema_error_through_context() {
        let error = CleaningError::schema(["device"]).with_context("While validating input");
        assert!(error.is_schema_error());
        assert!(!CleaningError::InvalidConfig("x".to_string()).is_schema_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = CleaningError::UndefinedFillValue {
            column: "sex".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("UNDEFINED_FILL_VALUE"));
        assert!(json.contains("sex"));
    }

    #[test]
    fn test_with_context() {
        let error = CleaningError::schema(["timestamp"]).with_context("During temporal normalization");
        assert!(error.to_string().contains("During temporal normalization"));
        assert_eq!(error.error_code(), "SCHEMA_ERROR");
    }
}
