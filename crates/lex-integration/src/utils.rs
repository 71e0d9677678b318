//! Shared utilities for the integration pipeline.
//!
//! Small helpers used by more than one stage: dtype checks, permissive
//! numeric parsing, null accounting and the canonical date check.

use crate::types::ColumnNullCount;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
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
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataFrame has a column with the given name.
#[inline]
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '%', '€', '£', ' '];

/// Common error/missing value markers in data.
pub const ERROR_MARKERS: [&str; 9] = [
    "error", "unknown", "n/a", "na", "nan", "null", "missing", "none", "#n/a",
];

/// Clean a string for numeric parsing by removing formatting characters.
///
/// ```rust,ignore
/// assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Check if a string is an error/missing value marker.
pub fn is_error_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    ERROR_MARKERS.iter().any(|&marker| lower == marker)
}

/// Try to parse a string as a finite numeric value.
///
/// Handles currency symbols, percentages and thousands separators. Error
/// markers, empty strings, NaN and infinities yield `None`.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    if is_error_marker(s) {
        return None;
    }
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Canonical Dates
// =============================================================================

static CANONICAL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

/// Check that a string has the `YYYY-MM-DD` shape.
///
/// This is a shape check only; calendar validity is checked by the date parser.
pub fn is_canonical_date(s: &str) -> bool {
    CANONICAL_DATE.is_match(s)
}

// =============================================================================
// Series Utilities
// =============================================================================

/// Fill null values in a string Series with a specific value.
///
/// The Series is cast to String first, so non-text columns are accepted.
/// Returns the filled Series and the number of values filled.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<(Series, usize)> {
    let as_text = series.cast(&DataType::String)?;
    let values = as_text.str()?;
    let mut filled = 0;

    let result: Vec<String> = values
        .into_iter()
        .map(|opt| match opt {
            Some(v) => v.to_string(),
            None => {
                filled += 1;
                fill_value.to_string()
            }
        })
        .collect();

    Ok((Series::new(series.name().clone(), result), filled))
}

/// Per-column null counts of a DataFrame, in column order.
pub fn null_counts(df: &DataFrame) -> Vec<ColumnNullCount> {
    df.get_columns()
        .iter()
        .map(|col| ColumnNullCount {
            name: col.name().to_string(),
            dtype: col.dtype().to_string(),
            null_count: col.null_count(),
        })
        .collect()
}

/// Build a boolean row mask from a slice of flags.
pub(crate) fn row_mask(flags: &[bool]) -> BooleanChunked {
    BooleanChunked::from_slice(PlSmallStr::from_static("mask"), flags)
}
