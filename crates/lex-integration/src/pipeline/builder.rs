//! Main integration pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating join, repair and date normalization.

use crate::config::{ConfigValidationError, IntegrationConfig};
use crate::dates::{DateNormalizer, DateRange};
use crate::error::{IntegrationError, Result, ResultExt};
use crate::io::{load_table, write_table};
use crate::joiner::Joiner;
use crate::pipeline::progress::{
    ClosureProgressReporter, IntegrationStage, ProgressReporter, ProgressUpdate,
};
use crate::pipeline::verify::verify_output;
use crate::repairer::{QualityRepairer, UNKNOWN_CUSTOMER_NAME};
use crate::types::{
    ActionType, IntegrationAction, IntegrationResult, IntegrationSummary, RowDefect,
};
use crate::utils::null_counts;
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The sales/customer integration pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use lex_integration::{IntegrationConfig, Pipeline};
///
/// // End to end: read both sources, clean, write the output file
/// let result = Pipeline::builder()
///     .config(IntegrationConfig::builder().output_path("out.csv").build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run()?;
///
/// // In memory: tables already loaded, nothing written
/// let result = Pipeline::builder().build()?.process(sales, customers)?;
/// ```
pub struct Pipeline {
    config: IntegrationConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    joiner: Joiner,
    repairer: QualityRepairer,
}

static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    /// Load both sources, clean them and write the integrated table.
    ///
    /// Nothing is written unless every stage succeeds.
    pub fn run(&self) -> Result<IntegrationResult> {
        let outcome = self.run_internal();
        self.finish(outcome)
    }

    /// Clean already loaded tables without touching the filesystem.
    pub fn process(&self, sales: DataFrame, customers: DataFrame) -> Result<IntegrationResult> {
        let start_time = Instant::now();
        let outcome = self.transform(sales, customers).map(|mut result| {
            result.summary.duration_ms = start_time.elapsed().as_millis() as u64;
            result
        });
        self.finish(outcome)
    }

    fn finish(&self, outcome: Result<IntegrationResult>) -> Result<IntegrationResult> {
        match outcome {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Integration complete: {} rows",
                    result.summary.rows_after
                )));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self) -> Result<IntegrationResult> {
        let start_time = Instant::now();

        self.report_progress(ProgressUpdate::new(
            IntegrationStage::Loading,
            0.0,
            "Loading sales...",
        ));
        let sales = load_table(&self.config.sales_path)?;

        self.report_progress(ProgressUpdate::new(
            IntegrationStage::Loading,
            0.5,
            "Loading customers...",
        ));
        let customers = load_table(&self.config.customers_path)?;

        self.report_progress(ProgressUpdate::new(
            IntegrationStage::Loading,
            1.0,
            "Sources loaded",
        ));

        let mut result = self.transform(sales, customers)?;

        self.report_progress(ProgressUpdate::new(
            IntegrationStage::Writing,
            0.0,
            "Writing integrated dataset...",
        ));
        info!("Step 4: Writing integrated dataset...");
        write_table(&mut result.data, &self.config.output_path)
            .context("Writing integrated dataset")?;
        self.report_progress(ProgressUpdate::new(
            IntegrationStage::Writing,
            1.0,
            "Integrated dataset written",
        ));

        result.summary.duration_ms = start_time.elapsed().as_millis() as u64;
        Ok(result)
    }

    fn transform(&self, sales: DataFrame, customers: DataFrame) -> Result<IntegrationResult> {
        let mut summary = IntegrationSummary::new();
        let key = self.config.join_key.as_str();

        // Step 1: Join
        self.report_progress(ProgressUpdate::new(
            IntegrationStage::Joining,
            0.0,
            format!("Joining tables on '{}'...", key),
        ));
        info!("Step 1: Joining sales with customers on '{}'...", key);

        let (joined, join) = self.joiner.join(sales, customers)?;

        summary.sales_rows = join.sales_rows;
        summary.customer_rows = join.customer_rows;
        summary.joined_rows = join.joined_rows;
        summary.nulls_before = null_counts(&joined);
        summary.add_action(IntegrationAction::new(
            ActionType::TablesJoined,
            key,
            format!(
                "Inner join of {} sales rows with {} customer rows",
                join.sales_rows, join.customer_rows
            ),
            join.joined_rows,
        ));
        if join.unmatched_sales > 0 {
            summary.add_warning(format!(
                "{} sales rows had no matching customer and were dropped",
                join.unmatched_sales
            ));
        }
        if join.joined_rows > join.sales_rows {
            summary.add_warning(format!(
                "Duplicate '{}' values in customers produced {} extra rows",
                key,
                join.joined_rows - join.sales_rows
            ));
        }

        self.report_progress(ProgressUpdate::new(
            IntegrationStage::Joining,
            1.0,
            format!("Joined {} rows", join.joined_rows),
        ));

        // Step 2: Repair
        self.report_progress(ProgressUpdate::new(
            IntegrationStage::Repairing,
            0.0,
            "Repairing amounts and names...",
        ));
        info!("Step 2: Repairing amounts and customer names...");

        let (repaired, repair) = self
            .repairer
            .repair(joined)
            .map_err(|e| IntegrationError::RepairFailed(e.to_string()))?;

        let amount = self.config.amount_column.as_str();
        let name = self.config.name_column.as_str();

        summary.negative_amounts_corrected = repair.negatives_corrected;
        summary.missing_amounts_imputed = repair.amounts_imputed;
        summary.amount_fill_value = repair.amount_fill_value;
        summary.missing_names_filled = repair.names_filled;

        if repair.negatives_corrected > 0 {
            summary.add_action(
                IntegrationAction::new(
                    ActionType::ValueCorrected,
                    amount,
                    "Overwrote negative amounts with 0",
                    repair.negatives_corrected,
                )
                .with_defect(RowDefect::NegativeValue),
            );
        }
        if let Some(fill) = repair.amount_fill_value {
            summary.add_action(
                IntegrationAction::new(
                    ActionType::ValueImputed,
                    amount,
                    format!("Filled missing amounts with the column mean ({:.2})", fill),
                    repair.amounts_imputed,
                )
                .with_defect(RowDefect::MissingValue),
            );
        }
        if repair.all_amounts_missing {
            summary.add_warning(format!(
                "Every '{}' value was missing; filled with 0",
                amount
            ));
        }
        if repair.names_filled > 0 {
            summary.add_action(
                IntegrationAction::new(
                    ActionType::ValueFilled,
                    name,
                    format!("Filled missing names with '{}'", UNKNOWN_CUSTOMER_NAME),
                    repair.names_filled,
                )
                .with_defect(RowDefect::MissingValue),
            );
        }
        for column in &repair.skipped_columns {
            summary.add_action(IntegrationAction::new(
                ActionType::StepSkipped,
                column,
                format!("Column '{}' not found", column),
                0,
            ));
            summary.add_warning(format!("Column '{}' not found, repair skipped", column));
        }

        self.report_progress(ProgressUpdate::new(
            IntegrationStage::Repairing,
            1.0,
            "Repair complete",
        ));

        // Step 3: Dates
        let range = DateRange::up_to(self.config.effective_reference_date());
        let date = self.config.date_column.as_str();

        self.report_progress(ProgressUpdate::new(
            IntegrationStage::NormalizingDates,
            0.0,
            format!("Normalizing '{}'...", date),
        ));
        info!("Step 3: Normalizing sale dates...");

        let (cleaned, dates) = DateNormalizer::new(date, range)
            .normalize(repaired)
            .map_err(|e| IntegrationError::NormalizationFailed(e.to_string()))?;

        summary.min_date = Some(range.min);
        summary.max_date = Some(range.max);

        if dates.skipped {
            summary.add_action(IntegrationAction::new(
                ActionType::StepSkipped,
                date,
                format!("Column '{}' not found", date),
                0,
            ));
            summary.add_warning(format!(
                "Column '{}' not found, date normalization skipped",
                date
            ));
        } else {
            summary.unparsable_dates_dropped = dates.unparsable_dropped;
            summary.out_of_range_dates_dropped = dates.out_of_range_dropped;

            if dates.unparsable_dropped > 0 {
                summary.add_action(
                    IntegrationAction::new(
                        ActionType::RowsRemoved,
                        date,
                        "Dropped rows whose sale date could not be parsed",
                        dates.unparsable_dropped,
                    )
                    .with_defect(RowDefect::UnparsableValue),
                );
            }
            if dates.out_of_range_dropped > 0 {
                summary.add_action(
                    IntegrationAction::new(
                        ActionType::RowsRemoved,
                        date,
                        format!("Dropped rows dated outside {} to {}", range.min, range.max),
                        dates.out_of_range_dropped,
                    )
                    .with_defect(RowDefect::OutOfRangeValue),
                );
            }
            summary.add_action(IntegrationAction::new(
                ActionType::DateNormalized,
                date,
                "Rewrote sale dates as YYYY-MM-DD",
                dates.normalized,
            ));
        }

        self.report_progress(ProgressUpdate::new(
            IntegrationStage::NormalizingDates,
            1.0,
            format!("{} rows remain", cleaned.height()),
        ));

        summary.rows_after = cleaned.height();
        summary.columns_after = cleaned.width();
        summary.nulls_after = null_counts(&cleaned);

        if summary.rows_after == 0 {
            summary.add_warning("No rows survived integration");
        }

        match verify_output(&cleaned, &self.config, range) {
            Ok(violations) => {
                for violation in violations {
                    warn!("Output check failed: {}", violation);
                    summary.add_warning(format!("Output check failed: {}", violation));
                }
            }
            Err(e) => warn!("Could not verify the integrated table: {}", e),
        }

        debug!(
            "Rows: {} sales, {} joined, {} after cleaning",
            summary.sales_rows, summary.joined_rows, summary.rows_after
        );

        Ok(IntegrationResult {
            data: cleaned,
            summary,
        })
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<IntegrationConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: IntegrationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use lex_integration::{ProgressReporter, ProgressUpdate};
    /// use std::sync::Arc;
    ///
    /// struct StageLogger;
    ///
    /// impl ProgressReporter for StageLogger {
    ///     fn report(&self, update: ProgressUpdate) {
    ///         println!("{}: {}", update.stage.display_name(), update.message);
    ///     }
    /// }
    ///
    /// let pipeline = Pipeline::builder()
    ///     .progress_reporter(Arc::new(StageLogger))
    ///     .build()?;
    /// ```
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let joiner = Joiner::new(config.join_key.as_str());
        let repairer =
            QualityRepairer::new(config.amount_column.as_str(), config.name_column.as_str());

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            joiner,
            repairer,
        })
    }
}
