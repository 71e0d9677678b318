//! Sales/Customer Integration Library
//!
//! Joins a sales table with a customers table, repairs data-quality defects
//! and writes one clean, integrated dataset. Built with Rust and Polars.
//!
//! # Overview
//!
//! The pipeline runs four stages in order:
//!
//! - **Join**: inner join on the customer identifier; unmatched rows are dropped
//! - **Repair**: negative amounts become 0, missing amounts get the column
//!   mean, missing customer names become `"Desconocido"`
//! - **Date normalization**: unparsable dates and dates outside
//!   2000-01-01 to today are dropped; survivors are rewritten as `YYYY-MM-DD`
//! - **Write**: the cleaned table is saved as CSV
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_integration::{IntegrationConfig, Pipeline};
//!
//! let config = IntegrationConfig::builder()
//!     .sales_path("ventas.csv")
//!     .customers_path("clientes.csv")
//!     .output_path("dataset_integrado.csv")
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//!
//! println!("{} rows written", result.summary.rows_after);
//! ```
//!
//! # Errors
//!
//! Only missing sources, a missing join key and a failed write abort a run.
//! Every other defect is repaired or its row dropped, and is recorded in the
//! [`IntegrationSummary`] as a [`RowDefect`].

pub mod config;
pub mod dates;
pub mod error;
pub mod io;
pub mod joiner;
pub mod pipeline;
pub mod repairer;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{ConfigValidationError, IntegrationConfig, IntegrationConfigBuilder};
pub use dates::{DateNormalizer, DateRange, DateReport, format_date, min_sale_date, parse_date};
pub use error::{IntegrationError, ResultExt, TableRole};
pub use io::{load_table, write_table};
pub use joiner::{JoinReport, Joiner};
pub use pipeline::{
    ClosureProgressReporter, IntegrationStage, Pipeline, PipelineBuilder, ProgressReporter,
    ProgressUpdate,
};
pub use repairer::{QualityRepairer, RepairReport, UNKNOWN_CUSTOMER_NAME};
pub use types::{
    ActionType, ColumnNullCount, IntegrationAction, IntegrationResult, IntegrationSummary,
    RowDefect,
};
pub use utils::{is_canonical_date, null_counts, parse_numeric_string};
