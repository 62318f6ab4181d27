//! DuckDB engine for dataq
//!
//! Schema inspection and bounded query execution against the active dataset,
//! plus upload ingestion (CSV/Parquet → versioned Parquet) and startup
//! recovery. Every request opens its own short-lived in-memory connection
//! with a `data` view over the dataset's Parquet file; the engine never
//! mutates the dataset.

mod engine;
mod ingest;
mod value;

pub use engine::{DuckEngine, EngineError, QueryLimits, TableEngine};
pub use ingest::{ingest_upload, recover_latest, IngestError, SourceFormat};
pub use value::value_ref_to_json;
