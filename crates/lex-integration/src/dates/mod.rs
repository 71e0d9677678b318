//! Sale date normalization.
//!
//! Parses every sale date, drops rows whose date cannot be parsed, drops rows
//! outside the valid range, and rewrites survivors as `YYYY-MM-DD`. Dropped
//! rows are gone for good; there is no quarantine table.

mod parser;

pub use parser::{format_date, parse_date};

use crate::utils::{has_column, row_mask};
use anyhow::Result;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Earliest accepted sale date: 2000-01-01.
pub fn min_sale_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Inclusive range of accepted sale dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl DateRange {
    pub fn new(min: NaiveDate, max: NaiveDate) -> Self {
        Self { min, max }
    }

    /// The range from [`min_sale_date`] to `max`.
    pub fn up_to(max: NaiveDate) -> Self {
        Self::new(min_sale_date(), max)
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        *date >= self.min && *date <= self.max
    }
}

/// Counts observed while normalizing dates.
#[derive(Debug, Clone, PartialEq)]
pub struct DateReport {
    pub unparsable_dropped: usize,
    pub out_of_range_dropped: usize,
    /// Rows whose date was rewritten in canonical form.
    pub normalized: usize,
    pub range: DateRange,
    /// The date column was absent and nothing was done.
    pub skipped: bool,
}

/// Normalizes the sale date column of a table.
pub struct DateNormalizer {
    column: String,
    range: DateRange,
}

impl DateNormalizer {
    pub fn new(column: impl Into<String>, range: DateRange) -> Self {
        Self {
            column: column.into(),
            range,
        }
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Parse, drop unparsable rows, drop out-of-range rows, then format.
    pub fn normalize(&self, df: DataFrame) -> Result<(DataFrame, DateReport)> {
        let col_name = self.column.as_str();
        let mut report = DateReport {
            unparsable_dropped: 0,
            out_of_range_dropped: 0,
            normalized: 0,
            range: self.range,
            skipped: false,
        };

        if !has_column(&df, col_name) {
            warn!("Column '{}' not found, skipping date normalization", col_name);
            report.skipped = true;
            return Ok((df, report));
        }

        // 1. Parse
        let parsed = read_dates(df.column(col_name)?.as_materialized_series())?;

        // 2. Drop unparsable
        let parsable: Vec<bool> = parsed.iter().map(Option::is_some).collect();
        report.unparsable_dropped = parsable.iter().filter(|ok| !**ok).count();
        let mut df = df;
        if report.unparsable_dropped > 0 {
            df = df.filter(&row_mask(&parsable))?;
            info!(
                "Dropped {} rows with unparsable '{}'",
                report.unparsable_dropped, col_name
            );
        }
        let dates: Vec<NaiveDate> = parsed.into_iter().flatten().collect();

        // 3. Range filter
        let in_range: Vec<bool> = dates.iter().map(|d| self.range.contains(d)).collect();
        report.out_of_range_dropped = in_range.iter().filter(|ok| !**ok).count();
        if report.out_of_range_dropped > 0 {
            df = df.filter(&row_mask(&in_range))?;
            info!(
                "Dropped {} rows with '{}' outside {} to {}",
                report.out_of_range_dropped,
                col_name,
                format_date(self.range.min),
                format_date(self.range.max)
            );
        }

        // 4. Format
        let formatted: Vec<String> = dates
            .into_iter()
            .filter(|d| self.range.contains(d))
            .map(format_date)
            .collect();
        report.normalized = formatted.len();
        df.replace(col_name, Series::new(col_name.into(), formatted))?;

        debug!(
            "Normalized {} values of '{}' to YYYY-MM-DD",
            report.normalized, col_name
        );

        Ok((df, report))
    }
}

/// Parse a column of any type into optional dates.
///
/// Non-text columns (integers like 20210501, `Date`, `Datetime`) are cast to
/// text first so they go through the same parser.
fn read_dates(series: &Series) -> Result<Vec<Option<NaiveDate>>> {
    let as_text = series.cast(&DataType::String)?;
    Ok(as_text
        .str()?
        .into_iter()
        .map(|v| v.and_then(parse_date))
        .collect())
}
