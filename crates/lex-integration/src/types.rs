use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

// ============================================================================
// Row-level defects
// ============================================================================

/// A data-quality defect found in a single row.
///
/// Defects never abort the pipeline: missing values are filled, negative
/// amounts are clamped, and rows with bad dates are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowDefect {
    /// Amount or name was missing. Resolved by imputation or fill.
    MissingValue,
    /// Amount was below zero. Resolved by overwriting with zero.
    NegativeValue,
    /// Sale date could not be interpreted. Resolved by dropping the row.
    UnparsableValue,
    /// Sale date fell outside the valid range. Resolved by dropping the row.
    OutOfRangeValue,
}

impl RowDefect {
    /// Whether rows carrying this defect are removed from the output.
    pub fn removes_row(&self) -> bool {
        matches!(self, Self::UnparsableValue | Self::OutOfRangeValue)
    }
}

// ============================================================================
// Summary Types
// ============================================================================

/// Null count of one column at a point in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNullCount {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
}

/// Human-readable summary of what the pipeline did.
///
/// # Example
///
/// ```rust,ignore
/// let summary = result.summary;
/// println!("{} of {} joined rows survived", summary.rows_after, summary.joined_rows);
/// println!("{} dates dropped as unparsable", summary.unparsable_dates_dropped);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrationSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    /// Rows in the sales input.
    pub sales_rows: usize,
    /// Rows in the customers input.
    pub customer_rows: usize,
    /// Rows produced by the inner join.
    pub joined_rows: usize,
    /// Rows in the final table.
    pub rows_after: usize,
    /// Columns in the final table.
    pub columns_after: usize,

    /// Negative amounts overwritten with zero.
    pub negative_amounts_corrected: usize,
    /// Missing amounts filled with the column mean.
    pub missing_amounts_imputed: usize,
    /// Value used to fill missing amounts, if any were filled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_fill_value: Option<f64>,
    /// Missing names replaced by the unknown-customer sentinel.
    pub missing_names_filled: usize,
    /// Rows dropped because their sale date could not be parsed.
    pub unparsable_dates_dropped: usize,
    /// Rows dropped because their sale date was outside the valid range.
    pub out_of_range_dates_dropped: usize,

    /// Lower bound of the accepted sale dates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_date: Option<NaiveDate>,
    /// Upper bound of the accepted sale dates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_date: Option<NaiveDate>,

    /// Null counts of the joined table, before any repair.
    pub nulls_before: Vec<ColumnNullCount>,
    /// Null counts of the final table.
    pub nulls_after: Vec<ColumnNullCount>,

    /// Ordered log of actions taken.
    pub actions: Vec<IntegrationAction>,

    /// Warnings and notes generated during the run.
    pub warnings: Vec<String>,
}

impl IntegrationSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_action(&mut self, action: IntegrationAction) {
        self.actions.push(action);
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Rows removed between the join and the final table.
    pub fn rows_removed(&self) -> usize {
        self.joined_rows.saturating_sub(self.rows_after)
    }

    /// Total nulls in the joined table before repair.
    pub fn total_nulls_before(&self) -> usize {
        self.nulls_before.iter().map(|c| c.null_count).sum()
    }

    /// Total nulls in the final table.
    pub fn total_nulls_after(&self) -> usize {
        self.nulls_after.iter().map(|c| c.null_count).sum()
    }
}

/// A single action taken during the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationAction {
    /// Type of action performed.
    pub action_type: ActionType,
    /// Column name, or "dataset" for table-wide actions.
    pub target: String,
    /// Human-readable description of the action.
    pub description: String,
    /// Number of rows the action touched.
    pub rows_affected: usize,
    /// Defect that triggered the action, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defect: Option<RowDefect>,
}

impl IntegrationAction {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
        rows_affected: usize,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            rows_affected,
            defect: None,
        }
    }

    /// Attach the defect that caused this action.
    pub fn with_defect(mut self, defect: RowDefect) -> Self {
        self.defect = Some(defect);
        self
    }
}

/// Types of actions the pipeline records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Sales and customers were joined.
    TablesJoined,
    /// Negative values were overwritten.
    ValueCorrected,
    /// Missing numeric values were imputed.
    ValueImputed,
    /// Missing text values were filled with a constant.
    ValueFilled,
    /// Rows were removed from the table.
    RowsRemoved,
    /// Dates were rewritten in canonical form.
    DateNormalized,
    /// A repair was skipped because its column was absent.
    StepSkipped,
}

impl ActionType {
    /// Get a human-readable display name for the action type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::TablesJoined => "Tables Joined",
            Self::ValueCorrected => "Value Corrected",
            Self::ValueImputed => "Value Imputed",
            Self::ValueFilled => "Value Filled",
            Self::RowsRemoved => "Rows Removed",
            Self::DateNormalized => "Date Normalized",
            Self::StepSkipped => "Step Skipped",
        }
    }
}

/// Output of a pipeline run: the cleaned table and what was done to it.
#[derive(Debug, Clone)]
pub struct IntegrationResult {
    pub data: DataFrame,
    pub summary: IntegrationSummary,
}
