//! Data-quality repair of the joined table.
//!
//! Two independent repairs run in a fixed order:
//! 1. Amount sanitization: negatives become 0, then missing amounts get the
//!    mean of the corrected column
//! 2. Name fill: missing customer names become [`UNKNOWN_CUSTOMER_NAME`]
//!
//! The repairer never removes rows and leaves every other column untouched.

mod amounts;
mod names;

pub use names::UNKNOWN_CUSTOMER_NAME;

use crate::utils::has_column;
use amounts::{read_amounts, sanitize_amounts};
use anyhow::Result;
use names::fill_missing_names;
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Counts observed while repairing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairReport {
    pub negatives_corrected: usize,
    pub amounts_imputed: usize,
    /// Value written into missing amounts, if any were missing.
    pub amount_fill_value: Option<f64>,
    /// Every amount was missing, so zero was used in place of a mean.
    pub all_amounts_missing: bool,
    pub names_filled: usize,
    /// Configured columns that were absent from the table.
    pub skipped_columns: Vec<String>,
}

/// Repairs amounts and customer names.
pub struct QualityRepairer {
    amount_column: String,
    name_column: String,
}

impl QualityRepairer {
    pub fn new(amount_column: impl Into<String>, name_column: impl Into<String>) -> Self {
        Self {
            amount_column: amount_column.into(),
            name_column: name_column.into(),
        }
    }

    /// Repair amounts, then names.
    ///
    /// A configured column that does not exist is skipped and listed in
    /// [`RepairReport::skipped_columns`].
    pub fn repair(&self, mut df: DataFrame) -> Result<(DataFrame, RepairReport)> {
        let mut report = RepairReport::default();

        if has_column(&df, &self.amount_column) {
            self.repair_amounts(&mut df, &mut report)?;
        } else {
            warn!(
                "Column '{}' not found, skipping amount sanitization",
                self.amount_column
            );
            report.skipped_columns.push(self.amount_column.clone());
        }

        if has_column(&df, &self.name_column) {
            self.fill_names(&mut df, &mut report)?;
        } else {
            warn!(
                "Column '{}' not found, skipping name fill",
                self.name_column
            );
            report.skipped_columns.push(self.name_column.clone());
        }

        Ok((df, report))
    }

    fn repair_amounts(&self, df: &mut DataFrame, report: &mut RepairReport) -> Result<()> {
        let col_name = self.amount_column.as_str();
        let series = df.column(col_name)?.as_materialized_series();

        debug!(
            "Missing values in '{}' before imputation: {}",
            col_name,
            series.null_count()
        );

        let sanitized = sanitize_amounts(read_amounts(series)?);
        df.replace(col_name, Series::new(col_name.into(), sanitized.values))?;

        if sanitized.negatives_corrected > 0 {
            info!(
                "Corrected {} negative values in '{}' to 0",
                sanitized.negatives_corrected, col_name
            );
        }

        if let Some(fill) = sanitized.fill_value {
            if sanitized.all_missing {
                warn!(
                    "Every value in '{}' is missing; filled {} values with 0",
                    col_name, sanitized.missing_imputed
                );
            } else {
                info!(
                    "Imputed {} missing values in '{}' with the mean: {:.2}",
                    sanitized.missing_imputed, col_name, fill
                );
            }
        }

        report.negatives_corrected = sanitized.negatives_corrected;
        report.amounts_imputed = sanitized.missing_imputed;
        report.amount_fill_value = sanitized.fill_value;
        report.all_amounts_missing = sanitized.all_missing;
        Ok(())
    }

    fn fill_names(&self, df: &mut DataFrame, report: &mut RepairReport) -> Result<()> {
        let col_name = self.name_column.as_str();
        let series = df.column(col_name)?.as_materialized_series();

        let (filled, count) = fill_missing_names(series)?;
        df.replace(col_name, filled)?;

        if count > 0 {
            info!(
                "Filled {} missing values in '{}' with '{}'",
                count, col_name, UNKNOWN_CUSTOMER_NAME
            );
        }

        report.names_filled = count;
        Ok(())
    }
}
