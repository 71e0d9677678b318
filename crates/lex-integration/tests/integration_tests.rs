//! Integration tests for the sales/customer integration pipeline.
//!
//! These tests run the pipeline end to end over the CSV fixtures.

use chrono::NaiveDate;
use lex_integration::{
    ActionType, IntegrationConfig, IntegrationError, IntegrationStage, Pipeline, RowDefect,
    TableRole, load_table,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn config_for(output: &Path) -> IntegrationConfig {
    IntegrationConfig::builder()
        .sales_path(fixtures_path().join("ventas.csv"))
        .customers_path(fixtures_path().join("clientes.csv"))
        .output_path(output)
        .reference_date(reference_date())
        .build()
        .unwrap()
}

fn strings(df: &DataFrame, name: &str) -> Vec<String> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::String)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap().to_string())
        .collect()
}

fn floats(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}

// ============================================================================
// End-to-end runs over the fixtures
// ============================================================================

#[test]
fn test_run_fixtures_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("dataset_integrado.csv");

    let result = Pipeline::builder()
        .config(config_for(&output))
        .build()
        .unwrap()
        .run()
        .unwrap();

    let summary = &result.summary;
    assert_eq!(summary.sales_rows, 7);
    assert_eq!(summary.customer_rows, 5);
    assert_eq!(summary.joined_rows, 6);
    assert_eq!(summary.rows_after, 3);
    assert_eq!(summary.negative_amounts_corrected, 1);
    assert_eq!(summary.missing_amounts_imputed, 1);
    assert!((summary.amount_fill_value.unwrap() - 40.1).abs() < 1e-9);
    assert_eq!(summary.missing_names_filled, 2);
    assert_eq!(summary.unparsable_dates_dropped, 1);
    assert_eq!(summary.out_of_range_dates_dropped, 2);
    assert_eq!(summary.total_nulls_after(), 0);
    assert!(summary.total_nulls_before() >= 3);

    let df = &result.data;
    assert_eq!(strings(df, "venta_id"), vec!["2", "3", "6"]);
    assert_eq!(
        strings(df, "fecha_venta"),
        vec!["2021-05-01", "2023-02-15", "2020-08-15"]
    );
    assert_eq!(
        strings(df, "nombre_cliente"),
        vec!["Ana", "Ana", "Desconocido"]
    );
    let amounts = floats(df, "importe");
    assert!((amounts[0] - 40.1).abs() < 1e-9);
    assert_eq!(amounts[1..].to_vec(), vec![100.5, 30.0]);

    assert!(output.is_file());
    let written = load_table(&output).unwrap();
    assert_eq!(written.shape(), (3, 7));
    assert_eq!(
        written
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>(),
        vec![
            "venta_id",
            "cliente_id",
            "importe",
            "fecha_venta",
            "producto",
            "nombre_cliente",
            "ciudad",
        ]
    );
    assert_eq!(
        strings(&written, "fecha_venta"),
        vec!["2021-05-01", "2023-02-15", "2020-08-15"]
    );
}

#[test]
fn test_output_invariants_hold() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    let result = Pipeline::builder()
        .config(config_for(&output))
        .build()
        .unwrap()
        .run()
        .unwrap();

    let df = &result.data;
    assert!(floats(df, "importe").iter().all(|v| *v >= 0.0));
    assert_eq!(df.column("nombre_cliente").unwrap().null_count(), 0);
    for date in strings(df, "fecha_venta") {
        let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap();
        assert!(parsed >= NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        assert!(parsed <= reference_date());
    }
    assert!(df.height() <= result.summary.joined_rows);
    assert!(
        result
            .summary
            .warnings
            .iter()
            .all(|w| !w.starts_with("Output check failed"))
    );
}

#[test]
fn test_action_log_records_row_defects() {
    let dir = tempfile::tempdir().unwrap();

    let summary = Pipeline::builder()
        .config(config_for(&dir.path().join("out.csv")))
        .build()
        .unwrap()
        .run()
        .unwrap()
        .summary;

    let removed: usize = summary
        .actions
        .iter()
        .filter(|a| a.defect.is_some_and(|d| d.removes_row()))
        .map(|a| a.rows_affected)
        .sum();
    assert_eq!(removed, summary.rows_removed());

    let out_of_range = summary
        .actions
        .iter()
        .find(|a| a.defect == Some(RowDefect::OutOfRangeValue))
        .unwrap();
    assert_eq!(out_of_range.action_type, ActionType::RowsRemoved);
    assert_eq!(out_of_range.rows_affected, 2);

    assert!(
        summary
            .warnings
            .iter()
            .any(|w| w.contains("1 sales rows had no matching customer"))
    );
}

#[test]
fn test_progress_covers_every_stage() {
    let dir = tempfile::tempdir().unwrap();
    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = stages.clone();

    Pipeline::builder()
        .config(config_for(&dir.path().join("out.csv")))
        .on_progress(move |update| sink.lock().unwrap().push((update.stage, update.progress)))
        .build()
        .unwrap()
        .run()
        .unwrap();

    let seen = stages.lock().unwrap().clone();
    let mut order: Vec<IntegrationStage> = seen.iter().map(|(s, _)| *s).collect();
    order.dedup();
    assert_eq!(
        order,
        vec![
            IntegrationStage::Loading,
            IntegrationStage::Joining,
            IntegrationStage::Repairing,
            IntegrationStage::NormalizingDates,
            IntegrationStage::Writing,
            IntegrationStage::Complete,
        ]
    );
    assert!(seen.windows(2).all(|w| w[0].1 <= w[1].1 + 1e-6));
}

#[test]
fn test_rerun_on_output_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    Pipeline::builder()
        .config(config_for(&first))
        .build()
        .unwrap()
        .run()
        .unwrap();

    // Feed the integrated table back in as the sales side.
    let config = IntegrationConfig::builder()
        .sales_path(&first)
        .customers_path(fixtures_path().join("clientes.csv"))
        .output_path(&second)
        .reference_date(reference_date())
        .build()
        .unwrap();

    let sales = load_table(&first)
        .unwrap()
        .drop("nombre_cliente")
        .unwrap()
        .drop("ciudad")
        .unwrap();
    let customers = load_table(config.customers_path.clone()).unwrap();
    let result = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process(sales, customers)
        .unwrap();

    assert_eq!(result.summary.rows_after, 3);
    assert_eq!(result.summary.negative_amounts_corrected, 0);
    assert_eq!(result.summary.missing_amounts_imputed, 0);
    assert_eq!(result.summary.unparsable_dates_dropped, 0);
    assert_eq!(result.summary.out_of_range_dates_dropped, 0);
    assert_eq!(
        strings(&result.data, "fecha_venta"),
        vec!["2021-05-01", "2023-02-15", "2020-08-15"]
    );
}

// ============================================================================
// Fatal errors
// ============================================================================

#[test]
fn test_missing_source_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    let config = IntegrationConfig::builder()
        .sales_path(fixtures_path().join("ventas.csv"))
        .customers_path(dir.path().join("no_such_file.csv"))
        .output_path(&output)
        .build()
        .unwrap();

    let err = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run()
        .unwrap_err();

    assert!(matches!(err, IntegrationError::SourceUnavailable { .. }));
    assert!(!output.exists());
}

#[test]
fn test_join_key_missing_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    let config = IntegrationConfig::builder()
        .sales_path(fixtures_path().join("ventas.csv"))
        .customers_path(fixtures_path().join("clientes_sin_clave.csv"))
        .output_path(&output)
        .build()
        .unwrap();

    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = stages.clone();

    let err = Pipeline::builder()
        .config(config)
        .on_progress(move |update| sink.lock().unwrap().push(update.stage))
        .build()
        .unwrap()
        .run()
        .unwrap_err();

    match err {
        IntegrationError::JoinKeyMissing { column, table } => {
            assert_eq!(column, "cliente_id");
            assert_eq!(table, TableRole::Customers);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists());
    assert_eq!(
        stages.lock().unwrap().last(),
        Some(&IntegrationStage::Failed)
    );
}

#[test]
fn test_unwritable_destination_fails() {
    let dir = tempfile::tempdir().unwrap();

    // The destination path is an existing directory.
    let err = Pipeline::builder()
        .config(config_for(dir.path()))
        .build()
        .unwrap()
        .run()
        .unwrap_err();

    assert_eq!(err.error_code(), "DESTINATION_WRITE_FAILURE");
    assert!(!err.is_input_failure());
}

// ============================================================================
// In-memory scenarios
// ============================================================================

#[test]
fn test_scenario_bad_dates_and_missing_values() {
    let sales = df![
        "cliente_id" => [1i64, 2],
        "importe" => [Some(-5.0), None],
        "fecha_venta" => ["2022-13-40", "2021-05-01"],
    ]
    .unwrap();
    let customers = df![
        "cliente_id" => [1i64, 2],
        "nombre_cliente" => [None, Some("Ana")],
    ]
    .unwrap();

    let config = IntegrationConfig::builder()
        .reference_date(reference_date())
        .build()
        .unwrap();
    let result = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process(sales, customers)
        .unwrap();

    let df = &result.data;
    assert_eq!(df.height(), 1);
    assert_eq!(strings(df, "cliente_id"), vec!["2"]);
    assert_eq!(floats(df, "importe"), vec![0.0]);
    assert_eq!(strings(df, "nombre_cliente"), vec!["Ana"]);
    assert_eq!(strings(df, "fecha_venta"), vec!["2021-05-01"]);
}

#[test]
fn test_scenario_dates_outside_range() {
    let sales = df![
        "cliente_id" => [1i64, 1],
        "importe" => [10.0, 20.0],
        "fecha_venta" => ["1999-01-01", "2099-01-01"],
    ]
    .unwrap();
    let customers = df![
        "cliente_id" => [1i64],
        "nombre_cliente" => ["Ana"],
    ]
    .unwrap();

    let config = IntegrationConfig::builder()
        .reference_date(reference_date())
        .build()
        .unwrap();
    let result = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process(sales, customers)
        .unwrap();

    assert_eq!(result.data.height(), 0);
    assert_eq!(result.summary.out_of_range_dates_dropped, 2);
    assert_eq!(result.summary.unparsable_dates_dropped, 0);
    assert!(
        result
            .summary
            .warnings
            .iter()
            .any(|w| w == "No rows survived integration")
    );
}

#[test]
fn test_duplicate_customer_keys_fan_out() {
    let sales = df![
        "cliente_id" => [1i64],
        "importe" => [10.0],
        "fecha_venta" => ["2021-05-01"],
    ]
    .unwrap();
    let customers = df![
        "cliente_id" => [1i64, 1],
        "nombre_cliente" => ["Ana", "Ana María"],
    ]
    .unwrap();

    let config = IntegrationConfig::builder()
        .reference_date(reference_date())
        .build()
        .unwrap();
    let result = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process(sales, customers)
        .unwrap();

    assert_eq!(result.summary.joined_rows, 2);
    assert_eq!(
        strings(&result.data, "nombre_cliente"),
        vec!["Ana", "Ana María"]
    );
    assert!(
        result
            .summary
            .warnings
            .iter()
            .any(|w| w.contains("extra rows"))
    );
}
