//! Core data model for dataq
//!
//! Shared types that flow through the question pipeline: the active dataset
//! and its single-slot store, the schema description injected into prompts,
//! and the result/envelope shapes returned to callers.

mod dataset;
mod result;
mod schema;

pub use dataset::{Dataset, DatasetSlot};
pub use result::{AskResponse, QueryResult, Row};
pub use schema::{ColumnInfo, ColumnType, SchemaDescription};

/// Name of the single queryable table. Every uploaded dataset is exposed to
/// the engine, the prompts, and the validator under this name.
pub const TABLE_NAME: &str = "data";
