//! Configuration types for the integration pipeline.
//!
//! Only column names, file locations and the reference date are
//! configurable. The repair rules themselves are fixed.

use crate::dates::min_sale_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_JOIN_KEY: &str = "cliente_id";
pub const DEFAULT_AMOUNT_COLUMN: &str = "importe";
pub const DEFAULT_NAME_COLUMN: &str = "nombre_cliente";
pub const DEFAULT_DATE_COLUMN: &str = "fecha_venta";

pub const DEFAULT_SALES_PATH: &str = "ventas.csv";
pub const DEFAULT_CUSTOMERS_PATH: &str = "clientes.csv";
pub const DEFAULT_OUTPUT_PATH: &str = "dataset_integrado.csv";

/// Configuration for the integration pipeline.
///
/// Use [`IntegrationConfig::builder()`] to create a validated configuration.
///
/// # Example
///
/// ```rust,ignore
/// use lex_integration::config::IntegrationConfig;
/// use chrono::NaiveDate;
///
/// let config = IntegrationConfig::builder()
///     .sales_path("data/ventas.csv")
///     .reference_date(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Sales source. Default: "ventas.csv"
    pub sales_path: PathBuf,

    /// Customers source. Default: "clientes.csv"
    pub customers_path: PathBuf,

    /// Destination of the cleaned table. Default: "dataset_integrado.csv"
    pub output_path: PathBuf,

    /// Customer identifier shared by both tables. Default: "cliente_id"
    pub join_key: String,

    /// Sale amount column. Default: "importe"
    pub amount_column: String,

    /// Customer name column. Default: "nombre_cliente"
    pub name_column: String,

    /// Sale date column. Default: "fecha_venta"
    pub date_column: String,

    /// Upper bound of the valid sale date range.
    /// If None, the local date at the moment the pipeline runs is used.
    /// Default: None
    pub reference_date: Option<NaiveDate>,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            sales_path: PathBuf::from(DEFAULT_SALES_PATH),
            customers_path: PathBuf::from(DEFAULT_CUSTOMERS_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            join_key: DEFAULT_JOIN_KEY.to_string(),
            amount_column: DEFAULT_AMOUNT_COLUMN.to_string(),
            name_column: DEFAULT_NAME_COLUMN.to_string(),
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            reference_date: None,
        }
    }
}

impl IntegrationConfig {
    /// Create a new configuration builder.
    pub fn builder() -> IntegrationConfigBuilder {
        IntegrationConfigBuilder::default()
    }

    /// Resolve the upper date bound, reading the wall clock when no
    /// reference date was configured.
    pub fn effective_reference_date(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let columns = [
            ("join_key", &self.join_key),
            ("amount_column", &self.amount_column),
            ("name_column", &self.name_column),
            ("date_column", &self.date_column),
        ];

        for (field, value) in &columns {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyColumnName(field.to_string()));
            }
        }

        for (i, (_, a)) in columns.iter().enumerate() {
            if columns[i + 1..].iter().any(|(_, b)| a == b) {
                return Err(ConfigValidationError::DuplicateColumnName(a.to_string()));
            }
        }

        if let Some(reference) = self.reference_date
            && reference < min_sale_date()
        {
            return Err(ConfigValidationError::ReferenceDateTooEarly(reference));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Column name for '{0}' must not be empty")]
    EmptyColumnName(String),

    #[error("Column '{0}' is configured for more than one role")]
    DuplicateColumnName(String),

    #[error("Reference date {0} is earlier than the minimum sale date")]
    ReferenceDateTooEarly(NaiveDate),
}

/// Builder for [`IntegrationConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct IntegrationConfigBuilder {
    sales_path: Option<PathBuf>,
    customers_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    join_key: Option<String>,
    amount_column: Option<String>,
    name_column: Option<String>,
    date_column: Option<String>,
    reference_date: Option<NaiveDate>,
}

impl IntegrationConfigBuilder {
    pub fn sales_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sales_path = Some(path.into());
        self
    }

    pub fn customers_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.customers_path = Some(path.into());
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Set the customer identifier column shared by both inputs.
    pub fn join_key(mut self, column: impl Into<String>) -> Self {
        self.join_key = Some(column.into());
        self
    }

    pub fn amount_column(mut self, column: impl Into<String>) -> Self {
        self.amount_column = Some(column.into());
        self
    }

    pub fn name_column(mut self, column: impl Into<String>) -> Self {
        self.name_column = Some(column.into());
        self
    }

    pub fn date_column(mut self, column: impl Into<String>) -> Self {
        self.date_column = Some(column.into());
        self
    }

    /// Pin the upper bound of the sale date range.
    ///
    /// Without it the range ends at the current local date, which makes
    /// results depend on the day the pipeline runs.
    pub fn reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `IntegrationConfig` or an error if validation fails.
    pub fn build(self) -> Result<IntegrationConfig, ConfigValidationError> {
        let config = IntegrationConfig {
            sales_path: self
                .sales_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SALES_PATH)),
            customers_path: self
                .customers_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CUSTOMERS_PATH)),
            output_path: self
                .output_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH)),
            join_key: self.join_key.unwrap_or_else(|| DEFAULT_JOIN_KEY.to_string()),
            amount_column: self
                .amount_column
                .unwrap_or_else(|| DEFAULT_AMOUNT_COLUMN.to_string()),
            name_column: self
                .name_column
                .unwrap_or_else(|| DEFAULT_NAME_COLUMN.to_string()),
            date_column: self
                .date_column
                .unwrap_or_else(|| DEFAULT_DATE_COLUMN.to_string()),
            reference_date: self.reference_date,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IntegrationConfig::default();
        assert_eq!(config.join_key, "cliente_id");
        assert_eq!(config.amount_column, "importe");
        assert_eq!(config.name_column, "nombre_cliente");
        assert_eq!(config.date_column, "fecha_venta");
        assert_eq!(config.output_path, PathBuf::from("dataset_integrado.csv"));
        assert!(config.reference_date.is_none());
    }

    #[test]
    fn test_builder_defaults_match_default() {
        let config = IntegrationConfig::builder().build().unwrap();
        assert_eq!(config, IntegrationConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let config = IntegrationConfig::builder()
            .sales_path("in/sales.csv")
            .customers_path("in/customers.csv")
            .output_path("out/merged.csv")
            .join_key("customer_id")
            .amount_column("amount")
            .name_column("name")
            .date_column("sold_on")
            .reference_date(date)
            .build()
            .unwrap();

        assert_eq!(config.sales_path, PathBuf::from("in/sales.csv"));
        assert_eq!(config.join_key, "customer_id");
        assert_eq!(config.date_column, "sold_on");
        assert_eq!(config.effective_reference_date(), date);
    }

    #[test]
    fn test_validation_empty_column() {
        let result = IntegrationConfig::builder().join_key("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyColumnName(field) if field == "join_key"
        ));
    }

    #[test]
    fn test_validation_duplicate_column() {
        let result = IntegrationConfig::builder()
            .name_column("importe")
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::DuplicateColumnName(col) if col == "importe"
        ));
    }

    #[test]
    fn test_validation_reference_date_too_early() {
        let result = IntegrationConfig::builder()
            .reference_date(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap())
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::ReferenceDateTooEarly(_)
        ));
    }

    #[test]
    fn test_effective_reference_date_defaults_to_today() {
        let config = IntegrationConfig::default();
        let today = chrono::Local::now().date_naive();
        // Allow for the clock rolling over midnight between the two reads.
        let resolved = config.effective_reference_date();
        assert!(resolved == today || resolved == today.succ_opt().unwrap());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "sales_path": "ventas.csv",
            "customers_path": "clientes.csv",
            "output_path": "out.csv",
            "join_key": "cliente_id",
            "amount_column": "importe",
            "name_column": "nombre_cliente",
            "date_column": "fecha_venta",
            "reference_date": "2024-06-30"
        }"#;

        let config: IntegrationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.reference_date,
            Some(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
        );
        assert_eq!(config.output_path, PathBuf::from("out.csv"));
        assert!(config.validate().is_ok());
    }
}
