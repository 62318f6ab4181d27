//! End-to-end engine tests: ingest real files, inspect the schema, and run
//! validated queries against the embedded engine.

use dataq_duck::{ingest_upload, recover_latest, DuckEngine, EngineError, QueryLimits, TableEngine};
use dataq_sql::{validate, CandidateSql, ValidatedSql};
use dataq_types::{ColumnType, Dataset, TABLE_NAME};
use std::path::PathBuf;
use uuid::Uuid;

const CSV: &str = "id,amount,ts\n\
    1,10.5,2022-03-01 09:00:00\n\
    2,20.0,2022-07-15 12:30:00\n\
    3,5.25,2023-01-10 08:15:00\n\
    4,1.0,2023-06-02 17:45:00\n";

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dataq-duck-test-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn sql(text: &str) -> ValidatedSql {
    validate(&CandidateSql::new(text), TABLE_NAME).unwrap()
}

fn load_csv(dir: &PathBuf) -> Dataset {
    ingest_upload(dir, "sales.csv", CSV.as_bytes()).unwrap()
}

#[test]
fn ingest_reports_shape_and_describe_maps_types() {
    let dir = scratch_dir();
    let dataset = load_csv(&dir);
    assert_eq!(dataset.row_count, 4);
    assert_eq!(dataset.column_count, 3);

    let engine = DuckEngine::new(QueryLimits::default());
    let schema = engine.describe(&dataset).unwrap();
    let names: Vec<_> = schema.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "amount", "ts"]);
    assert_eq!(schema.column("id").unwrap().column_type, ColumnType::Integer);
    assert_eq!(schema.column("amount").unwrap().column_type, ColumnType::Float);
    assert_eq!(schema.column("ts").unwrap().column_type, ColumnType::Timestamp);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn ingest_accepts_semicolon_separated_csv() {
    let dir = scratch_dir();
    let csv = "id;amount\n1;10.5\n2;20.0\n";
    let dataset = ingest_upload(&dir, "sales.csv", csv.as_bytes()).unwrap();
    assert_eq!(dataset.row_count, 2);
    assert_eq!(dataset.column_count, 2);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn ingest_roundtrips_parquet() {
    let dir = scratch_dir();
    let first = load_csv(&dir);
    let bytes = std::fs::read(&first.path).unwrap();
    let second = ingest_upload(&dir, "sales.parquet", &bytes).unwrap();
    assert_eq!(second.row_count, 4);
    assert_eq!(second.column_count, 3);
    assert_ne!(first.path, second.path);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn malformed_parquet_is_a_read_error() {
    let dir = scratch_dir();
    let err = ingest_upload(&dir, "broken.parquet", b"not parquet at all").unwrap_err();
    assert!(matches!(err, dataq_duck::IngestError::Read(_)));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn execute_caps_rows_and_flags_truncation() {
    let dir = scratch_dir();
    let dataset = load_csv(&dir);
    let engine = DuckEngine::new(QueryLimits {
        max_result_rows: 2,
        memory_limit_mb: None,
    });

    let result = engine
        .execute(&dataset, &sql("SELECT id FROM data ORDER BY id"))
        .unwrap();
    assert_eq!(result.rows.len(), 2);
    assert!(result.truncated);

    // A result at or under the cap is not flagged.
    let result = engine
        .execute(&dataset, &sql("SELECT id FROM data ORDER BY id LIMIT 2"))
        .unwrap();
    assert_eq!(result.rows.len(), 2);
    assert!(!result.truncated);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn repeated_execution_is_idempotent() {
    let dir = scratch_dir();
    let dataset = load_csv(&dir);
    let engine = DuckEngine::new(QueryLimits::default());
    let query = sql("SELECT id, amount FROM data ORDER BY id");

    let first = engine.execute(&dataset, &query).unwrap();
    let second = engine.execute(&dataset, &query).unwrap();
    assert_eq!(first.rows, second.rows);
    assert_eq!(first.columns, second.columns);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn aggregates_group_by_year() {
    let dir = scratch_dir();
    let dataset = load_csv(&dir);
    let engine = DuckEngine::new(QueryLimits::default());

    let result = engine
        .execute(
            &dataset,
            &sql(
                "SELECT EXTRACT(YEAR FROM ts) AS year, SUM(amount) AS total \
                 FROM data GROUP BY year ORDER BY year",
            ),
        )
        .unwrap();
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.columns, ["year", "total"]);
    assert_eq!(result.rows[0]["year"], serde_json::json!(2022));
    assert_eq!(result.rows[0]["total"], serde_json::json!(30.5));
    assert_eq!(result.rows[1]["year"], serde_json::json!(2023));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn unknown_column_diagnostic_names_the_column() {
    let dir = scratch_dir();
    let dataset = load_csv(&dir);
    let engine = DuckEngine::new(QueryLimits::default());

    let err = engine
        .execute(&dataset, &sql("SELECT revenue FROM data"))
        .unwrap_err();
    match err {
        EngineError::Execute { message } => assert!(
            message.contains("revenue"),
            "diagnostic should name the column: {message}"
        ),
        other => panic!("expected Execute error, got {other:?}"),
    }

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn zero_row_results_are_empty_not_missing() {
    let dir = scratch_dir();
    let dataset = load_csv(&dir);
    let engine = DuckEngine::new(QueryLimits::default());

    let result = engine
        .execute(&dataset, &sql("SELECT id FROM data WHERE id > 100"))
        .unwrap();
    assert!(result.rows.is_empty());
    assert!(!result.truncated);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn recover_latest_prefers_the_newest_upload() {
    let dir = scratch_dir();
    let _first = load_csv(&dir);
    // Ensure a strictly later mtime for the second file.
    std::thread::sleep(std::time::Duration::from_millis(20));
    let second = ingest_upload(&dir, "again.csv", "id\n1\n2\n".as_bytes()).unwrap();

    let recovered = recover_latest(&dir).unwrap().unwrap();
    assert_eq!(recovered.path, second.path);
    assert_eq!(recovered.row_count, 2);
    assert_eq!(recovered.column_count, 1);

    std::fs::remove_dir_all(&dir).ok();
}
