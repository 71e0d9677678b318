//! Inner join of the sales and customers tables.

use crate::error::{IntegrationError, Result, TableRole};
use crate::utils::{has_column, is_numeric_dtype};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info, warn};

const SALES_ROW: &str = "__sales_row";
const CUSTOMER_ROW: &str = "__customer_row";

/// Counts observed while joining.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinReport {
    pub sales_rows: usize,
    pub customer_rows: usize,
    pub joined_rows: usize,
    /// Sales rows whose identifier has no customer.
    pub unmatched_sales: usize,
    /// Customer rows whose identifier has no sale.
    pub orphan_customers: usize,
}

/// Joins sales to customers on the customer identifier.
pub struct Joiner {
    key: String,
}

impl Joiner {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Inner-join `sales` with `customers`.
    ///
    /// One row is produced per matching (sale, customer) pair, so an
    /// identifier repeated in `customers` fans the sale out. Rows with a null
    /// identifier or without a counterpart are dropped. Output follows sales
    /// order, then customer order within a sale.
    pub fn join(&self, sales: DataFrame, customers: DataFrame) -> Result<(DataFrame, JoinReport)> {
        let key = self.key.as_str();

        if !has_column(&sales, key) {
            return Err(IntegrationError::JoinKeyMissing {
                column: key.to_string(),
                table: TableRole::Sales,
            });
        }
        if !has_column(&customers, key) {
            return Err(IntegrationError::JoinKeyMissing {
                column: key.to_string(),
                table: TableRole::Customers,
            });
        }

        let (sales, customers) = align_key_types(sales, customers, key)?;

        let mut report = JoinReport {
            sales_rows: sales.height(),
            customer_rows: customers.height(),
            ..Default::default()
        };

        let sales_keys = key_set(&sales, key)?;
        let customer_keys = key_set(&customers, key)?;
        report.unmatched_sales = count_unmatched(&sales, key, &customer_keys)?;
        report.orphan_customers = count_unmatched(&customers, key, &sales_keys)?;

        let sales = sales.with_row_index(SALES_ROW.into(), None)?;
        let customers = customers.with_row_index(CUSTOMER_ROW.into(), None)?;

        let joined = sales
            .lazy()
            .join(
                customers.lazy(),
                [col(key)],
                [col(key)],
                JoinArgs::new(JoinType::Inner),
            )
            .collect()?;

        let joined = joined
            .sort([SALES_ROW, CUSTOMER_ROW], SortMultipleOptions::default())?
            .drop(SALES_ROW)?
            .drop(CUSTOMER_ROW)?;

        report.joined_rows = joined.height();

        if report.unmatched_sales > 0 {
            debug!(
                "{} sales rows have no matching customer and were dropped",
                report.unmatched_sales
            );
        }
        if report.orphan_customers > 0 {
            debug!(
                "{} customer rows have no sales and were dropped",
                report.orphan_customers
            );
        }
        if report.joined_rows > report.sales_rows {
            warn!(
                "Join produced {} rows from {} sales: duplicate '{}' values in customers fan out sales",
                report.joined_rows, report.sales_rows, key
            );
        }

        info!(
            "Joined on '{}': {:?} (rows, columns)",
            key,
            (joined.height(), joined.width())
        );

        Ok((joined, report))
    }
}

/// Give both key columns one type when their inferred types differ.
///
/// Two numeric keys (e.g. `i64` and `f64`) are compared as `Float64` so that
/// `1` matches `1.0`. Any other mismatch is compared as text.
fn align_key_types(
    mut sales: DataFrame,
    mut customers: DataFrame,
    key: &str,
) -> Result<(DataFrame, DataFrame)> {
    let sales_dtype = sales.column(key)?.dtype().clone();
    let customer_dtype = customers.column(key)?.dtype().clone();

    if sales_dtype == customer_dtype {
        return Ok((sales, customers));
    }

    let target = if is_numeric_dtype(&sales_dtype) && is_numeric_dtype(&customer_dtype) {
        DataType::Float64
    } else {
        DataType::String
    };
    debug!(
        "Join key '{}' has types {} and {}; comparing as {}",
        key, sales_dtype, customer_dtype, target
    );

    let casted = sales.column(key)?.as_materialized_series().cast(&target)?;
    sales.replace(key, casted)?;

    let casted = customers
        .column(key)?
        .as_materialized_series()
        .cast(&target)?;
    customers.replace(key, casted)?;

    Ok((sales, customers))
}

/// Distinct non-null key values, rendered as text for comparison.
fn key_set(df: &DataFrame, key: &str) -> Result<HashSet<String>> {
    let as_text = df
        .column(key)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(as_text
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect())
}

/// Rows whose key is null or absent from `other_keys`.
fn count_unmatched(df: &DataFrame, key: &str, other_keys: &HashSet<String>) -> Result<usize> {
    let as_text = df
        .column(key)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(as_text
        .str()?
        .into_iter()
        .filter(|v| v.is_none_or(|v| !other_keys.contains(v)))
        .count())
}
