//! Error types for the integration pipeline.
//!
//! Only failures that abort the whole run are represented here. Row-level
//! defects (missing amounts, unparsable or out-of-range dates) are repaired or
//! dropped inside their stage and surface as [`crate::types::RowDefect`]
//! entries in the summary instead.
//!
//! Errors are serializable so a caller can forward them as `{code, message}`.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// Which input table an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRole {
    Sales,
    Customers,
}

impl std::fmt::Display for TableRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sales => write!(f, "sales"),
            Self::Customers => write!(f, "customers"),
        }
    }
}

/// The main error type for the integration pipeline.
#[derive(Error, Debug)]
pub enum IntegrationError {
    /// An input source could not be located or read.
    #[error("Source '{}' is unavailable: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    /// The join key column is absent from one of the input tables.
    #[error("Join key '{column}' not found in {table} table")]
    JoinKeyMissing { column: String, table: TableRole },

    /// The cleaned table could not be persisted.
    #[error("Failed to write '{}': {reason}", path.display())]
    DestinationWriteFailure { path: PathBuf, reason: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Amount or name repair failed unexpectedly.
    #[error("Failed to repair data: {0}")]
    RepairFailed(String),

    /// Date normalization failed unexpectedly.
    #[error("Failed to normalize dates: {0}")]
    NormalizationFailed(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<IntegrationError>,
    },
}

impl IntegrationError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        IntegrationError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, suitable for exit diagnostics and JSON output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            Self::JoinKeyMissing { .. } => "JOIN_KEY_MISSING",
            Self::DestinationWriteFailure { .. } => "DESTINATION_WRITE_FAILURE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::RepairFailed(_) => "REPAIR_FAILED",
            Self::NormalizationFailed(_) => "NORMALIZATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// True when the failure happened before any transformation ran.
    pub fn is_input_failure(&self) -> bool {
        match self {
            Self::SourceUnavailable { .. } | Self::JoinKeyMissing { .. } => true,
            Self::WithContext { source, .. } => source.is_input_failure(),
            _ => false,
        }
    }
}

impl Serialize for IntegrationError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("IntegrationError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for integration operations.
pub type Result<T> = std::result::Result<T, IntegrationError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| IntegrationError::Polars(e).with_context(context))
    }
}
