//! Column names and schema checks for user-behavior tables.

use crate::error::{CleaningError, Result};
use polars::prelude::*;

pub const USER_ID: &str = "user_id";
pub const GOODS_ID: &str = "goods_id";
pub const CATEGORY_ID: &str = "category_id";
pub const BEHAVIOR: &str = "behavior";
pub const TIMESTAMP: &str = "timestamp";
pub const PRICE: &str = "price";
pub const AMOUNT: &str = "amount";
pub const SEX: &str = "sex";
pub const ADDRESS: &str = "address";
pub const DEVICE: &str = "device";
pub const COMMENT: &str = "comment";

pub const BEHAVIOR_TIME: &str = "behavior_time";
pub const DATE: &str = "date";
pub const HOUR: &str = "hour";
pub const WEEKDAY: &str = "weekday";

/// Columns every raw input table must carry, in source order.
pub const INPUT_COLUMNS: [&str; 11] = [
    USER_ID,
    GOODS_ID,
    CATEGORY_ID,
    BEHAVIOR,
    TIMESTAMP,
    PRICE,
    AMOUNT,
    SEX,
    ADDRESS,
    DEVICE,
    COMMENT,
];

/// Fields whose absence invalidates a whole record.
pub const CORE_COLUMNS: [&str; 4] = [USER_ID, GOODS_ID, BEHAVIOR, TIMESTAMP];

/// Fields that identify one event; records sharing them are logical duplicates.
pub const EVENT_KEY_COLUMNS: [&str; 4] = CORE_COLUMNS;

/// Free-text fields filled with the sentinel when missing.
pub const TEXT_COLUMNS: [&str; 3] = [ADDRESS, DEVICE, COMMENT];

/// Columns added by temporal normalization, in output order.
pub const DERIVED_TIME_COLUMNS: [&str; 4] = [BEHAVIOR_TIME, DATE, HOUR, WEEKDAY];

/// Fail with a schema error naming every column in `required` that `df` lacks.
pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| !present.iter().any(|p| p == col))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CleaningError::schema(missing))
    }
}

/// Check that a raw table carries the full input schema.
pub fn validate_input_schema(df: &DataFrame) -> Result<()> {
    require_columns(df, &INPUT_COLUMNS)
}

/// Column names expected on the cleaned table for a given input table.
///
/// Extra input columns pass through untouched, so they are kept in place.
pub fn output_columns(input: &DataFrame) -> Vec<String> {
    input
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .filter(|name| name != TIMESTAMP)
        .chain(DERIVED_TIME_COLUMNS.iter().map(|s| s.to_string()))
        .collect()
}
