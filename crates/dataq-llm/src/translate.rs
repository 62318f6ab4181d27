//! Question → SQL translation
//!
//! The schema is injected verbatim into every prompt: the model has no other
//! way to know real column names, and inventing names is its most common
//! failure. When a prior attempt failed in the engine, the failed SQL and the
//! engine's verbatim diagnostic are carried into the conversation so the
//! corrective prompt is self-contained.

use dataq_sql::CandidateSql;
use dataq_types::SchemaDescription;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{ChatTurn, CompletionBackend, LlmError};

const SYSTEM_PROMPT: &str = "You are a DuckDB SQL assistant. \
    Respond with exactly one valid SQL SELECT statement and nothing else: \
    no explanations, no markdown. \
    Only use the table/VIEW 'data' and only the columns listed in the schema. \
    When applying date functions to columns that may be string or timestamp, \
    cast explicitly to TIMESTAMP.";

/// Context from a failed execution, fed back into the retry prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFailure {
    pub query: String,
    pub message: String,
}

pub struct Translator<B> {
    backend: Arc<B>,
    timeout: Duration,
}

impl<B: CompletionBackend> Translator<B> {
    pub fn new(backend: Arc<B>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub async fn translate(
        &self,
        question: &str,
        schema: &SchemaDescription,
        prior: Option<&ExecutionFailure>,
    ) -> Result<CandidateSql, LlmError> {
        let mut turns = vec![
            ChatTurn::system(SYSTEM_PROMPT),
            ChatTurn::user(format!(
                "Schema of 'data':\n{}\n\nQuestion: {}",
                schema.render(),
                question
            )),
        ];
        if let Some(failure) = prior {
            turns.push(ChatTurn::assistant(failure.query.clone()));
            turns.push(ChatTurn::user(format!(
                "Executing that query failed with this error:\n{}\n\n\
                 Reply with a corrected single SELECT statement for the same question. \
                 SQL only.",
                failure.message
            )));
        }

        let raw = call_with_timeout(self.backend.as_ref(), &turns, self.timeout).await?;
        tracing::debug!(response = %raw, "translation response");
        CandidateSql::from_model_text(&raw).ok_or(LlmError::EmptyTranslation { raw })
    }
}

pub(crate) async fn call_with_timeout<B: CompletionBackend + ?Sized>(
    backend: &B,
    turns: &[ChatTurn],
    timeout: Duration,
) -> Result<String, LlmError> {
    match tokio::time::timeout(timeout, backend.complete(turns)).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}
