//! CLI entry point for the sales/customer integration pipeline.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use dotenv::dotenv;
use lex_integration::config::{
    DEFAULT_CUSTOMERS_PATH, DEFAULT_OUTPUT_PATH, DEFAULT_SALES_PATH, IntegrationConfig,
};
use lex_integration::{
    IntegrationError, IntegrationSummary, Pipeline, load_table, null_counts, write_table,
};
use polars::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Sales/Customer Integration Pipeline",
    long_about = "Joins a sales table with a customers table, repairs amounts, names \
                  and sale dates, and writes one integrated dataset.\n\n\
                  EXAMPLES:\n  \
                  # Default file names in the current directory\n  \
                  lex-integration\n\n  \
                  # Explicit sources and a pinned reference date\n  \
                  lex-integration --sales data/ventas.csv --customers data/clientes.csv \
                  --reference-date 2024-06-30\n\n  \
                  # Machine-readable summary\n  \
                  lex-integration --json | jq .summary.rows_after"
)]
struct Args {
    /// Path to the sales CSV
    #[arg(long, default_value = DEFAULT_SALES_PATH)]
    sales: PathBuf,

    /// Path to the customers CSV
    #[arg(long, default_value = DEFAULT_CUSTOMERS_PATH)]
    customers: PathBuf,

    /// Path of the integrated dataset to write
    #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Customer identifier column shared by both tables
    #[arg(long)]
    join_key: Option<String>,

    /// Sale amount column
    #[arg(long)]
    amount_column: Option<String>,

    /// Customer name column
    #[arg(long)]
    name_column: Option<String>,

    /// Sale date column
    #[arg(long)]
    date_column: Option<String>,

    /// Latest accepted sale date (YYYY-MM-DD)
    ///
    /// Defaults to today's local date
    #[arg(long, value_parser = parse_reference_date)]
    reference_date: Option<NaiveDate>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only the final JSON report is printed.
    #[arg(long)]
    json: bool,

    /// Write the JSON report to this file
    #[arg(short = 'r', long)]
    report: Option<PathBuf>,

    /// Number of rows of the integrated dataset to print
    #[arg(long, default_value = "5")]
    preview: usize,
}

fn parse_reference_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got '{}': {}", raw, e))
}

/// Machine-readable outcome of a run.
#[derive(Serialize)]
struct RunReport<'a> {
    sales: &'a Path,
    customers: &'a Path,
    output: &'a Path,
    summary: &'a IntegrationSummary,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // Load environment variables before the filter reads RUST_LOG
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    match build_config(&args).and_then(|config| run(&args, &config)) {
        Ok(()) => Ok(()),
        Err(e) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            }
            error!("Integration failed [{}]: {}", e.error_code(), e);
            Err(e.into())
        }
    }
}

fn build_config(args: &Args) -> std::result::Result<IntegrationConfig, IntegrationError> {
    let mut builder = IntegrationConfig::builder()
        .sales_path(&args.sales)
        .customers_path(&args.customers)
        .output_path(&args.output);

    if let Some(ref key) = args.join_key {
        builder = builder.join_key(key);
    }
    if let Some(ref column) = args.amount_column {
        builder = builder.amount_column(column);
    }
    if let Some(ref column) = args.name_column {
        builder = builder.name_column(column);
    }
    if let Some(ref column) = args.date_column {
        builder = builder.date_column(column);
    }
    if let Some(date) = args.reference_date {
        builder = builder.reference_date(date);
    }

    builder
        .build()
        .map_err(|e| IntegrationError::InvalidConfig(e.to_string()))
}

fn run(args: &Args, config: &IntegrationConfig) -> std::result::Result<(), IntegrationError> {
    info!("Loading sales from: {}", config.sales_path.display());
    let sales = load_table(&config.sales_path)?;
    info!("Loading customers from: {}", config.customers_path.display());
    let customers = load_table(&config.customers_path)?;

    if !args.json {
        print_table_overview("SALES", &config.sales_path, &sales);
        print_table_overview("CUSTOMERS", &config.customers_path, &customers);
    }

    let mut builder = Pipeline::builder().config(config.clone());
    if !args.quiet {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }
    let pipeline = builder
        .build()
        .map_err(|e| IntegrationError::InvalidConfig(e.to_string()))?;

    info!("{}", "=".repeat(80));
    info!("Starting integration pipeline...");
    info!("{}", "=".repeat(80));

    let mut result = pipeline.process(sales, customers)?;
    write_table(&mut result.data, &config.output_path)?;

    let report = RunReport {
        sales: &config.sales_path,
        customers: &config.customers_path,
        output: &config.output_path,
        summary: &result.summary,
    };

    // The dataset is already written, so a failed report is not fatal.
    if let Some(ref path) = args.report {
        match write_report(path, &report) {
            Ok(()) => info!("Report written to: {}", path.display()),
            Err(e) => warn!("Could not write report to {}: {}", path.display(), e),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&report);
    print_preview(&result.data, args.preview);
    Ok(())
}

fn write_report(path: &Path, report: &RunReport<'_>) -> std::result::Result<(), IntegrationError> {
    std::fs::write(path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}

/// Print shape, column types and null counts of a loaded table.
///
/// Uses `println!` because this is user-facing output, not logging.
fn print_table_overview(title: &str, path: &Path, df: &DataFrame) {
    println!();
    println!("{} ({})", title, path.display());
    println!("{}", "-".repeat(60));
    println!("  Rows: {}  Columns: {}", df.height(), df.width());
    println!("  {:<24} {:<12} {:>8}", "Column", "Type", "Nulls");
    for column in null_counts(df) {
        println!(
            "  {:<24} {:<12} {:>8}",
            truncate_str(&column.name, 23),
            column.dtype,
            column.null_count
        );
    }
}

/// Print a human-readable summary of the integration results.
fn print_human_readable_summary(report: &RunReport<'_>) {
    let summary = report.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("INTEGRATION COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows), {} ({} rows)",
        report.sales.display(),
        summary.sales_rows,
        report.customers.display(),
        summary.customer_rows
    );
    println!(
        "Output: {} ({} rows x {} columns)",
        report.output.display(),
        summary.rows_after,
        summary.columns_after
    );
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Rows: {} joined -> {} kept ({} removed)",
        summary.joined_rows,
        summary.rows_after,
        summary.rows_removed()
    );
    println!(
        "  Negative amounts corrected: {}",
        summary.negative_amounts_corrected
    );
    match summary.amount_fill_value {
        Some(fill) => println!(
            "  Missing amounts imputed: {} (mean {:.2})",
            summary.missing_amounts_imputed, fill
        ),
        None => println!("  Missing amounts imputed: 0"),
    }
    println!("  Missing names filled: {}", summary.missing_names_filled);
    println!(
        "  Unparsable dates dropped: {}",
        summary.unparsable_dates_dropped
    );
    if let (Some(min), Some(max)) = (summary.min_date, summary.max_date) {
        println!(
            "  Dates outside {} to {} dropped: {}",
            min, max, summary.out_of_range_dates_dropped
        );
    }
    println!(
        "  Nulls: {} before -> {} after",
        summary.total_nulls_before(),
        summary.total_nulls_after()
    );
    println!();

    if !summary.nulls_after.is_empty() {
        println!("Nulls per column (before -> after):");
        for after in &summary.nulls_after {
            let before = summary
                .nulls_before
                .iter()
                .find(|c| c.name == after.name)
                .map_or(0, |c| c.null_count);
            println!(
                "  {:<24} {:>6} -> {}",
                truncate_str(&after.name, 23),
                before,
                after.null_count
            );
        }
        println!();
    }

    if !summary.actions.is_empty() {
        println!("Actions Taken:");
        for action in &summary.actions {
            println!(
                "  - [{}] {}: {} ({} rows)",
                action.action_type.display_name(),
                action.target,
                action.description,
                action.rows_affected
            );
        }
        println!();
    }

    if !summary.warnings.is_empty() {
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}

fn print_preview(df: &DataFrame, rows: usize) {
    if rows == 0 {
        return;
    }
    println!();
    println!("First {} rows:", rows.min(df.height()));
    println!("{}", df.head(Some(rows)));
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
