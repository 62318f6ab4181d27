//! Execution result and response envelope

use serde::Serialize;
use serde_json::{Map, Value};

/// One result row: column name → scalar value, in SELECT order.
pub type Row = Map<String, Value>;

/// Bounded table of rows paired with the exact SQL that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub query: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Set when the row cap clipped the result.
    pub truncated: bool,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First `n` rows, used for the summarization prompt.
    pub fn sample(&self, n: usize) -> &[Row] {
        &self.rows[..n.min(self.rows.len())]
    }
}

/// Final response for a question. Field order is part of the contract;
/// `result` is `[]` (never null) when zero rows match. `truncated` appears
/// only when the row cap was hit.
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub question: String,
    pub query: String,
    pub result: Vec<Row>,
    pub friendly_answer: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl AskResponse {
    pub fn new(
        question: impl Into<String>,
        result: QueryResult,
        friendly_answer: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            query: result.query,
            result: result.rows,
            friendly_answer: friendly_answer.into(),
            truncated: result.truncated,
        }
    }
}
