//! Post-run checks of the cleaned table.

use crate::config::IntegrationConfig;
use crate::dates::{DateRange, parse_date};
use crate::utils::{has_column, is_canonical_date};
use anyhow::Result;
use polars::prelude::*;

/// Check the guarantees of a cleaned table and describe every violation.
///
/// Columns that were absent from the input are not checked.
pub(crate) fn verify_output(
    df: &DataFrame,
    config: &IntegrationConfig,
    range: DateRange,
) -> Result<Vec<String>> {
    let mut violations = Vec::new();

    let amount = config.amount_column.as_str();
    if has_column(df, amount) {
        let values = df
            .column(amount)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        let values = values.f64()?;
        let missing = values.null_count();
        let negative = values.into_iter().flatten().filter(|v| *v < 0.0).count();
        if missing > 0 {
            violations.push(format!("{} rows have a missing '{}'", missing, amount));
        }
        if negative > 0 {
            violations.push(format!("{} rows have a negative '{}'", negative, amount));
        }
    }

    let name = config.name_column.as_str();
    if has_column(df, name) {
        let missing = df.column(name)?.null_count();
        if missing > 0 {
            violations.push(format!("{} rows have a missing '{}'", missing, name));
        }
    }

    let date = config.date_column.as_str();
    if has_column(df, date) {
        let values = df
            .column(date)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let bad = values
            .str()?
            .into_iter()
            .filter(|v| match v {
                Some(s) if is_canonical_date(s) => {
                    !parse_date(s).is_some_and(|d| range.contains(&d))
                }
                _ => true,
            })
            .count();
        if bad > 0 {
            violations.push(format!(
                "{} rows have a '{}' that is not a YYYY-MM-DD date in range",
                bad, date
            ));
        }
    }

    Ok(violations)
}
