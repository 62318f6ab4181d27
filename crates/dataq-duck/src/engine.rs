//! Schema inspection and bounded execution

use dataq_sql::ValidatedSql;
use dataq_types::{
    ColumnInfo, ColumnType, Dataset, QueryResult, Row, SchemaDescription, TABLE_NAME,
};
use duckdb::Connection;
use thiserror::Error;

use crate::value::value_ref_to_json;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Connection, pragma, or view creation failed. Not retryable.
    #[error("engine setup failed: {0}")]
    Setup(String),

    /// The query itself failed; carries the engine's diagnostic verbatim,
    /// which the retry prompt depends on.
    #[error("{message}")]
    Execute { message: String },
}

/// Resource limits applied to every execution.
#[derive(Debug, Clone)]
pub struct QueryLimits {
    pub max_result_rows: usize,
    pub memory_limit_mb: Option<u64>,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_result_rows: 500,
            memory_limit_mb: None,
        }
    }
}

/// Seam between the pipeline and the storage engine. The blanket `Send +
/// Sync` bound lets the pipeline run calls on the blocking pool.
pub trait TableEngine: Send + Sync {
    fn describe(&self, dataset: &Dataset) -> Result<SchemaDescription, EngineError>;
    fn execute(&self, dataset: &Dataset, sql: &ValidatedSql) -> Result<QueryResult, EngineError>;
}

pub struct DuckEngine {
    limits: QueryLimits,
}

impl DuckEngine {
    pub fn new(limits: QueryLimits) -> Self {
        Self { limits }
    }

    /// Short-lived in-memory connection with the `data` view installed over
    /// the dataset's Parquet file. DuckDB connections are not shared across
    /// requests.
    fn open(&self, dataset: &Dataset) -> Result<Connection, EngineError> {
        let conn = Connection::open_in_memory().map_err(setup_err)?;
        if let Some(mb) = self.limits.memory_limit_mb {
            conn.execute_batch(&format!("PRAGMA memory_limit='{mb}MB'"))
                .map_err(setup_err)?;
        }
        let path = escape_literal(&dataset.path.to_string_lossy());
        conn.execute_batch(&format!(
            "CREATE OR REPLACE VIEW {TABLE_NAME} AS SELECT * FROM read_parquet('{path}')"
        ))
        .map_err(setup_err)?;
        Ok(conn)
    }
}

impl TableEngine for DuckEngine {
    /// Metadata-only: the view reads Parquet footers, not data.
    fn describe(&self, dataset: &Dataset) -> Result<SchemaDescription, EngineError> {
        let conn = self.open(dataset)?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT column_name, data_type FROM information_schema.columns \
                 WHERE table_name = '{TABLE_NAME}' ORDER BY ordinal_position"
            ))
            .map_err(setup_err)?;
        let columns = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(setup_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(setup_err)?
            .into_iter()
            .map(|(name, data_type)| ColumnInfo {
                name,
                column_type: map_duck_type(&data_type),
            })
            .collect();
        Ok(SchemaDescription::new(columns))
    }

    fn execute(&self, dataset: &Dataset, sql: &ValidatedSql) -> Result<QueryResult, EngineError> {
        let conn = self.open(dataset)?;
        let mut stmt = conn.prepare(sql.as_str()).map_err(execute_err)?;
        let mut rows = stmt.query([]).map_err(execute_err)?;

        let mut columns: Vec<String> = Vec::new();
        let mut collected: Vec<Row> = Vec::new();
        let mut truncated = false;
        while let Some(row) = rows.next().map_err(execute_err)? {
            if columns.is_empty() {
                let count = row.as_ref().column_count();
                for i in 0..count {
                    columns.push(row.as_ref().column_name(i).map_err(execute_err)?.to_string());
                }
            }
            // Row cap: stop once a row beyond the cap exists and flag the
            // truncation. Deterministic for a given dataset and query.
            if collected.len() == self.limits.max_result_rows {
                truncated = true;
                break;
            }
            let mut record = Row::new();
            for (i, name) in columns.iter().enumerate() {
                let value = row.get_ref(i).map_err(execute_err)?;
                record.insert(name.clone(), value_ref_to_json(value));
            }
            collected.push(record);
        }

        tracing::debug!(
            rows = collected.len(),
            truncated,
            "query executed against {TABLE_NAME}"
        );
        Ok(QueryResult {
            query: sql.as_str().to_string(),
            columns,
            rows: collected,
            truncated,
        })
    }
}

fn setup_err(e: duckdb::Error) -> EngineError {
    EngineError::Setup(e.to_string())
}

fn execute_err(e: duckdb::Error) -> EngineError {
    EngineError::Execute {
        message: e.to_string(),
    }
}

/// DuckDB string literals escape single quotes by doubling them.
pub(crate) fn escape_literal(raw: &str) -> String {
    raw.replace('\'', "''")
}

/// Collapse DuckDB's type names onto the five semantic tags the prompts use.
fn map_duck_type(raw: &str) -> ColumnType {
    let upper = raw.to_ascii_uppercase();
    if upper.contains("BOOLEAN") {
        ColumnType::Boolean
    } else if upper.contains("TIMESTAMP") || upper.starts_with("DATE") {
        ColumnType::Timestamp
    } else if upper.contains("INTERVAL") {
        ColumnType::Text
    } else if upper.contains("INT") {
        ColumnType::Integer
    } else if upper.contains("DOUBLE")
        || upper.contains("FLOAT")
        || upper.contains("REAL")
        || upper.contains("DECIMAL")
        || upper.contains("NUMERIC")
    {
        ColumnType::Float
    } else {
        ColumnType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duck_types_map_to_semantic_tags() {
        assert_eq!(map_duck_type("BIGINT"), ColumnType::Integer);
        assert_eq!(map_duck_type("INTEGER"), ColumnType::Integer);
        assert_eq!(map_duck_type("HUGEINT"), ColumnType::Integer);
        assert_eq!(map_duck_type("DOUBLE"), ColumnType::Float);
        assert_eq!(map_duck_type("DECIMAL(18,3)"), ColumnType::Float);
        assert_eq!(map_duck_type("VARCHAR"), ColumnType::Text);
        assert_eq!(map_duck_type("TIMESTAMP"), ColumnType::Timestamp);
        assert_eq!(map_duck_type("TIMESTAMP WITH TIME ZONE"), ColumnType::Timestamp);
        assert_eq!(map_duck_type("DATE"), ColumnType::Timestamp);
        assert_eq!(map_duck_type("BOOLEAN"), ColumnType::Boolean);
        assert_eq!(map_duck_type("INTERVAL"), ColumnType::Text);
        assert_eq!(map_duck_type("BLOB"), ColumnType::Text);
    }

    #[test]
    fn literals_escape_single_quotes() {
        assert_eq!(escape_literal("it's"), "it''s");
        assert_eq!(escape_literal("/tmp/plain.parquet"), "/tmp/plain.parquet");
    }
}
