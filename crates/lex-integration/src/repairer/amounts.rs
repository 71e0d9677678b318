//! Amount sanitization: negative correction followed by mean imputation.

use crate::utils::{is_numeric_dtype, parse_numeric_string};
use anyhow::Result;
use polars::prelude::*;

/// Outcome of sanitizing one amount column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SanitizedAmounts {
    pub values: Vec<f64>,
    pub negatives_corrected: usize,
    pub missing_imputed: usize,
    /// Mean used for imputation, when at least one value was imputed.
    pub fill_value: Option<f64>,
    /// No non-missing amount existed, so zero was used instead of a mean.
    pub all_missing: bool,
}

/// Read an amount column as optional floats.
///
/// Numeric columns are widened to f64. Text columns go through the
/// permissive numeric parser, so "$1,200" reads as 1200 and "N/A" as missing.
/// NaN and infinities are treated as missing.
pub(crate) fn read_amounts(series: &Series) -> Result<Vec<Option<f64>>> {
    if is_numeric_dtype(series.dtype()) {
        let floats = series.cast(&DataType::Float64)?;
        return Ok(floats
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect());
    }

    let as_text = series.cast(&DataType::String)?;
    Ok(as_text
        .str()?
        .into_iter()
        .map(|v| v.and_then(parse_numeric_string))
        .collect())
}

/// Overwrite negatives with zero, then fill missing values with the mean of
/// the corrected column.
///
/// Zero-corrected entries take part in the mean. When every value is missing
/// the mean is undefined and missing entries become zero.
pub(crate) fn sanitize_amounts(values: Vec<Option<f64>>) -> SanitizedAmounts {
    let mut negatives_corrected = 0;

    let corrected: Vec<Option<f64>> = values
        .into_iter()
        .map(|v| match v {
            Some(x) if x < 0.0 => {
                negatives_corrected += 1;
                Some(0.0)
            }
            other => other,
        })
        .collect();

    let (sum, count) = corrected
        .iter()
        .flatten()
        .fold((0.0_f64, 0_usize), |(sum, count), x| (sum + x, count + 1));
    let missing = corrected.len() - count;

    let all_missing = count == 0 && missing > 0;
    let mean = if count > 0 { sum / count as f64 } else { 0.0 };

    SanitizedAmounts {
        values: corrected.into_iter().map(|v| v.unwrap_or(mean)).collect(),
        negatives_corrected,
        missing_imputed: missing,
        fill_value: (missing > 0).then_some(mean),
        all_missing,
    }
}
