//! Upload ingestion and startup recovery
//!
//! Uploads are staged to disk, converted to Parquet by DuckDB itself
//! (`read_csv_auto` sniffs delimiters, so `;`- and `,`-separated files both
//! work), and written as a NEW versioned `data-<uuid>.parquet`. In-flight
//! queries keep reading the previous file after the slot swap; the caller
//! deletes the displaced file once the swap returns. Datasets are durable:
//! on startup the newest stored file is reinstalled.

use dataq_types::Dataset;
use duckdb::Connection;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::engine::escape_literal;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported format '{extension}'. Use CSV or Parquet.")]
    UnsupportedFormat { extension: String },

    #[error("Failed to read file: {0}")]
    Read(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Parquet,
}

impl SourceFormat {
    pub fn from_name(file_name: &str) -> Option<Self> {
        match extension_of(file_name).as_str() {
            "csv" => Some(SourceFormat::Csv),
            "parquet" => Some(SourceFormat::Parquet),
            _ => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Parquet => "parquet",
        }
    }

    fn reader(self, path_literal: &str) -> String {
        match self {
            SourceFormat::Csv => format!("read_csv_auto('{path_literal}')"),
            SourceFormat::Parquet => format!("read_parquet('{path_literal}')"),
        }
    }
}

fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Convert an uploaded file into a fresh versioned Parquet dataset.
pub fn ingest_upload(
    data_dir: &Path,
    file_name: &str,
    bytes: &[u8],
) -> Result<Dataset, IngestError> {
    let format =
        SourceFormat::from_name(file_name).ok_or_else(|| IngestError::UnsupportedFormat {
            extension: extension_of(file_name),
        })?;

    std::fs::create_dir_all(data_dir)?;
    let upload_id = Uuid::new_v4();
    let staging = data_dir.join(format!("upload-{upload_id}.{}", format.extension()));
    std::fs::write(&staging, bytes)?;

    let target = data_dir.join(format!("data-{upload_id}.parquet"));
    let converted = convert_to_parquet(&staging, format, &target);
    std::fs::remove_file(&staging).ok();

    match converted {
        Ok((rows, cols)) => {
            tracing::info!(
                file = file_name,
                rows,
                cols,
                path = %target.display(),
                "dataset ingested"
            );
            Ok(Dataset::new(target, rows, cols))
        }
        Err(e) => {
            std::fs::remove_file(&target).ok();
            Err(e)
        }
    }
}

fn convert_to_parquet(
    source: &Path,
    format: SourceFormat,
    target: &Path,
) -> Result<(u64, u64), IngestError> {
    let conn = Connection::open_in_memory().map_err(read_err)?;
    let reader = format.reader(&escape_literal(&source.to_string_lossy()));
    conn.execute_batch(&format!(
        "CREATE OR REPLACE VIEW upload AS SELECT * FROM {reader}"
    ))
    .map_err(read_err)?;

    let (rows, cols) = shape_of(&conn, "upload")?;
    let target_literal = escape_literal(&target.to_string_lossy());
    conn.execute_batch(&format!(
        "COPY (SELECT * FROM upload) TO '{target_literal}' (FORMAT PARQUET)"
    ))
    .map_err(read_err)?;
    Ok((rows, cols))
}

fn shape_of(conn: &Connection, view: &str) -> Result<(u64, u64), IngestError> {
    let rows: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {view}"), [], |row| {
            row.get(0)
        })
        .map_err(read_err)?;
    let cols: i64 = conn
        .query_row(
            &format!(
                "SELECT COUNT(*) FROM information_schema.columns WHERE table_name = '{view}'"
            ),
            [],
            |row| row.get(0),
        )
        .map_err(read_err)?;
    Ok((rows.max(0) as u64, cols.max(0) as u64))
}

/// Reinstall the newest stored dataset after a restart, if one exists.
pub fn recover_latest(data_dir: &Path) -> Result<Option<Dataset>, IngestError> {
    let entries = match std::fs::read_dir(data_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !(name.starts_with("data-") && name.ends_with(".parquet")) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map_or(true, |(at, _)| modified > *at) {
            newest = Some((modified, entry.path()));
        }
    }

    let Some((_, path)) = newest else {
        return Ok(None);
    };

    let conn = Connection::open_in_memory().map_err(read_err)?;
    let reader = SourceFormat::Parquet.reader(&escape_literal(&path.to_string_lossy()));
    conn.execute_batch(&format!(
        "CREATE OR REPLACE VIEW recovered AS SELECT * FROM {reader}"
    ))
    .map_err(read_err)?;
    let (rows, cols) = shape_of(&conn, "recovered")?;

    tracing::info!(path = %path.display(), rows, cols, "recovered dataset from disk");
    Ok(Some(Dataset::new(path, rows, cols)))
}

fn read_err(e: duckdb::Error) -> IngestError {
    IngestError::Read(e.to_string())
}
