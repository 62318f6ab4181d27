//! Question pipeline orchestrator
//!
//! Straight-line sequence translate → validate → execute → summarize, with
//! one bounded retry loop around translate/validate/execute: when the engine
//! rejects a generated query, the failed SQL and the engine's verbatim
//! diagnostic go back into the translation prompt. Validation failures are
//! policy violations and never retried. Summarization failures never fail
//! the request; the structured result is the primary deliverable.

use dataq_duck::{EngineError, TableEngine};
use dataq_llm::{CompletionBackend, ExecutionFailure, Summarizer, Translator};
use dataq_sql::{validate, ValidatedSql};
use dataq_types::{
    AskResponse, Dataset, DatasetSlot, QueryResult, SchemaDescription, TABLE_NAME,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::AskError;
use crate::metrics::Metrics;

/// Engine call outcome including the orchestrator-enforced timeout.
#[derive(Debug)]
pub enum ExecuteError {
    Engine(EngineError),
    Timeout { query: String },
    Join(String),
}

/// Run one engine call on the blocking pool with a hard timeout. On timeout
/// the blocking task finishes in the background and its result is discarded.
pub async fn execute_with_timeout<E: TableEngine + 'static>(
    engine: Arc<E>,
    dataset: Arc<Dataset>,
    sql: ValidatedSql,
    timeout: Duration,
) -> Result<QueryResult, ExecuteError> {
    let query_text = sql.as_str().to_string();
    let handle = tokio::task::spawn_blocking(move || engine.execute(&dataset, &sql));
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result.map_err(ExecuteError::Engine),
        Ok(Err(join)) => Err(ExecuteError::Join(join.to_string())),
        Err(_) => Err(ExecuteError::Timeout { query: query_text }),
    }
}

pub struct AskPipeline<E, B> {
    slot: Arc<DatasetSlot>,
    engine: Arc<E>,
    translator: Translator<B>,
    summarizer: Summarizer<B>,
    max_retries: usize,
    query_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl<E, B> AskPipeline<E, B>
where
    E: TableEngine + 'static,
    B: CompletionBackend,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        slot: Arc<DatasetSlot>,
        engine: Arc<E>,
        translator: Translator<B>,
        summarizer: Summarizer<B>,
        max_retries: usize,
        query_timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            slot,
            engine,
            translator,
            summarizer,
            max_retries,
            query_timeout,
            metrics,
        }
    }

    pub async fn ask(&self, question: &str) -> Result<AskResponse, AskError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("ask", %request_id);
        async {
            self.metrics.asks_total.inc();
            let timer = self.metrics.ask_duration_seconds.start_timer();
            let outcome = self.run(question).await;
            timer.observe_duration();
            if let Err(e) = &outcome {
                self.metrics.failure(e.stage());
                tracing::warn!(error = %e, "ask failed");
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run(&self, question: &str) -> Result<AskResponse, AskError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AskError::EmptyQuestion);
        }
        // The slot check comes before any model call.
        let dataset = self.slot.active().ok_or(AskError::NoDatasetLoaded)?;
        let schema = self.describe(dataset.clone()).await?;

        let mut prior: Option<ExecutionFailure> = None;
        let mut retries = 0;
        let result = loop {
            let candidate = self
                .translator
                .translate(question, &schema, prior.as_ref())
                .await?;
            let validated = validate(&candidate, TABLE_NAME)?;
            tracing::info!(sql = %validated, attempt = retries, "generated SQL");

            match execute_with_timeout(
                self.engine.clone(),
                dataset.clone(),
                validated.clone(),
                self.query_timeout,
            )
            .await
            {
                Ok(result) => break result,
                Err(ExecuteError::Timeout { query }) => {
                    return Err(AskError::ExecutionTimeout { query });
                }
                Err(ExecuteError::Join(message)) => return Err(AskError::Internal(message)),
                Err(ExecuteError::Engine(EngineError::Setup(message))) => {
                    return Err(AskError::Engine(EngineError::Setup(message)));
                }
                Err(ExecuteError::Engine(EngineError::Execute { message })) => {
                    if retries < self.max_retries {
                        retries += 1;
                        self.metrics.translation_retries_total.inc();
                        tracing::warn!(error = %message, "generated SQL failed, retrying");
                        prior = Some(ExecutionFailure {
                            query: validated.into_string(),
                            message,
                        });
                    } else {
                        return Err(AskError::QueryGenerationFailed {
                            query: validated.into_string(),
                            last_error: message,
                        });
                    }
                }
            }
        };

        let friendly_answer = match self.summarizer.summarize(question, &result).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => {
                self.metrics.summarization_failures_total.inc();
                fallback_narrative(&result)
            }
            Err(e) => {
                self.metrics.summarization_failures_total.inc();
                tracing::warn!(error = %e, "summarization failed, using fallback narrative");
                fallback_narrative(&result)
            }
        };

        Ok(AskResponse::new(question, result, friendly_answer))
    }

    async fn describe(&self, dataset: Arc<Dataset>) -> Result<SchemaDescription, AskError> {
        let engine = self.engine.clone();
        let handle = tokio::task::spawn_blocking(move || engine.describe(&dataset));
        match tokio::time::timeout(self.query_timeout, handle).await {
            Ok(Ok(result)) => result.map_err(AskError::Engine),
            Ok(Err(join)) => Err(AskError::Internal(join.to_string())),
            Err(_) => Err(AskError::Internal(
                "schema inspection timed out".to_string(),
            )),
        }
    }
}

fn fallback_narrative(result: &QueryResult) -> String {
    format!("The query returned {} row(s).", result.row_count())
}
