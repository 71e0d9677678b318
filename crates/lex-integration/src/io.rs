//! Loading and persisting delimited tables.

use crate::error::{IntegrationError, Result};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Load a CSV table with a header row, inferring column types from every row.
///
/// Falls back to a pre-cleaned copy of the file content when the standard
/// reader rejects it (stray doubled quotes, blank lines).
pub fn load_table(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(unavailable(path, "file not found"));
    }

    match CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
    {
        Ok(df) => {
            info!("Loaded '{}': {:?}", path.display(), df.shape());
            return Ok(df);
        }
        Err(e) => {
            debug!("Standard loading of '{}' failed: {}", path.display(), e);
        }
    }

    let content =
        std::fs::read_to_string(path).map_err(|e| unavailable(path, &e.to_string()))?;
    let cursor = Cursor::new(clean_csv_content(&content));

    let df = CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .into_reader_with_file_handle(cursor)
        .finish()
        .map_err(|e| unavailable(path, &e.to_string()))?;

    info!(
        "Loaded '{}' after cleaning its content: {:?}",
        path.display(),
        df.shape()
    );
    Ok(df)
}

/// Write a table as comma-separated values with a header row.
///
/// The data goes to a temporary sibling file that is renamed over the
/// destination once complete, so a failure never leaves partial output.
pub fn write_table(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| write_failure(path, &e.to_string()))?;
    }

    let tmp_path = temporary_path(path);
    let written = File::create(&tmp_path)
        .map_err(|e| e.to_string())
        .and_then(|mut file| {
            CsvWriter::new(&mut file)
                .include_header(true)
                .with_separator(b',')
                .with_quote_char(b'"')
                .finish(df)
                .map_err(|e| e.to_string())
        })
        .and_then(|_| std::fs::rename(&tmp_path, path).map_err(|e| e.to_string()));

    if let Err(reason) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_failure(path, &reason));
    }

    info!("Dataset saved: {} ({} rows)", path.display(), df.height());
    Ok(())
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn unavailable(path: &Path, reason: &str) -> IntegrationError {
    IntegrationError::SourceUnavailable {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn write_failure(path: &Path, reason: &str) -> IntegrationError {
    IntegrationError::DestinationWriteFailure {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Collapse doubled quotes and drop blank lines.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
