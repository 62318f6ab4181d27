//! HTTP surface: upload, direct query, ask, metrics
//!
//! Thin adapters around the core. Direct SQL from `/query` goes through the
//! same validation gate as generated SQL; the validator is the single
//! security boundary in front of the executor.

use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use dataq_duck::{ingest_upload, DuckEngine};
use dataq_llm::OpenAiBackend;
use dataq_sql::{validate, CandidateSql};
use dataq_types::{AskResponse, DatasetSlot, TABLE_NAME};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ApiError, AskError};
use crate::metrics::Metrics;
use crate::pipeline::{execute_with_timeout, AskPipeline, ExecuteError};

#[derive(Clone)]
pub struct AppState {
    pub slot: Arc<DatasetSlot>,
    pub engine: Arc<DuckEngine>,
    pub pipeline: Arc<AskPipeline<DuckEngine, OpenAiBackend>>,
    pub metrics: Arc<Metrics>,
    pub data_dir: PathBuf,
    pub query_timeout: Duration,
    pub max_upload_bytes: usize,
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/upload", post(upload))
        .route("/query", get(query))
        .route("/ask", post(ask))
        .route("/metrics", get(metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let name = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| ApiError::bad_request("The 'file' field has no filename."))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
            file = Some((name, bytes.to_vec()));
        }
    }
    let (name, bytes) = file
        .ok_or_else(|| ApiError::bad_request("Multipart field 'file' is required."))?;
    tracing::info!(file = %name, size = bytes.len(), "uploading file");

    let data_dir = state.data_dir.clone();
    let ingest_name = name.clone();
    let dataset = tokio::task::spawn_blocking(move || ingest_upload(&data_dir, &ingest_name, &bytes))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;
    let (rows, cols) = (dataset.row_count, dataset.column_count);

    // Swap the slot, then drop the displaced file; in-flight queries that
    // captured the old dataset finish against the old file first.
    if let Some(displaced) = state.slot.install(dataset) {
        std::fs::remove_file(&displaced.path).ok();
    }
    state.metrics.uploads_total.inc();

    Ok(Json(json!({
        "message": format!("File {name} uploaded successfully."),
        "rows": rows,
        "cols": cols,
    })))
}

#[derive(Debug, Deserialize)]
struct QueryParams {
    /// SQL against the 'data' VIEW
    q: String,
}

async fn query(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Value>, ApiError> {
    let dataset = state
        .slot
        .active()
        .ok_or_else(|| ApiError::from(AskError::NoDatasetLoaded))?;

    // One trailing semicolon is tolerated on hand-written SQL.
    let text = params.q.trim();
    let text = text.strip_suffix(';').map(str::trim_end).unwrap_or(text);
    let validated = validate(&CandidateSql::new(text), TABLE_NAME)?;
    tracing::info!(sql = %validated, "executing direct query");

    let result = execute_with_timeout(
        state.engine.clone(),
        dataset,
        validated,
        state.query_timeout,
    )
    .await
    .map_err(|e| match e {
        ExecuteError::Engine(dataq_duck::EngineError::Execute { message }) => {
            ApiError::bad_request(format!("Error executing query: {message}"))
        }
        ExecuteError::Engine(setup) => ApiError::internal(setup.to_string()),
        ExecuteError::Timeout { query } => ApiError::new(
            StatusCode::GATEWAY_TIMEOUT,
            format!("Query timed out: {query}"),
        ),
        ExecuteError::Join(message) => ApiError::internal(message),
    })?;

    Ok(Json(json!({ "query": result.query, "result": result.rows })))
}

#[derive(Debug, Deserialize)]
struct AskBody {
    question: String,
}

async fn ask(
    State(state): State<AppState>,
    Json(body): Json<AskBody>,
) -> Result<Json<AskResponse>, AskError> {
    state.pipeline.ask(&body.question).await.map(Json)
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {e}"),
        ),
    }
}
