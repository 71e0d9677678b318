//! Customer name fill.

use crate::utils::fill_string_nulls;
use anyhow::Result;
use polars::prelude::*;

/// Placeholder written where a customer name is missing.
pub const UNKNOWN_CUSTOMER_NAME: &str = "Desconocido";

/// Replace missing names with [`UNKNOWN_CUSTOMER_NAME`]; present names are
/// left untouched. Returns the new Series and how many names were filled.
pub(crate) fn fill_missing_names(series: &Series) -> Result<(Series, usize)> {
    Ok(fill_string_nulls(series, UNKNOWN_CUSTOMER_NAME)?)
}
