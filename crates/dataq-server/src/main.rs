//! dataq server
//!
//! Upload a CSV/Parquet dataset, then ask questions about it in natural
//! language: a language model translates each question into a single DuckDB
//! SELECT, a validator gates it, the engine executes it with a row cap, and
//! a second (non-critical) model call phrases the answer.

use anyhow::Context;
use dataq_duck::{DuckEngine, QueryLimits};
use dataq_llm::{OpenAiBackend, Summarizer, Translator};
use dataq_types::DatasetSlot;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod config;
mod error;
mod logging;
mod metrics;
mod pipeline;
mod routes;

use config::Config;
use metrics::Metrics;
use pipeline::AskPipeline;
use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables (secrets live in .env, not config.yaml)
    dotenvy::dotenv().ok();

    let config_path =
        std::env::var("DATAQ_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("failed to load configuration from {config_path}"))?;
    config.apply_logging_env();
    logging::init();

    let api_key = Config::openai_api_key()?;
    info!(model = %config.llm.model, "OpenAI backend configured");

    let metrics = Arc::new(Metrics::new()?);
    let engine = Arc::new(DuckEngine::new(QueryLimits {
        max_result_rows: config.query.max_result_rows,
        memory_limit_mb: config.query.memory_limit_mb,
    }));

    // The dataset is durable on disk; reinstall the newest one after a restart.
    let slot = Arc::new(DatasetSlot::new());
    let data_dir = PathBuf::from(&config.data.directory);
    match dataq_duck::recover_latest(&data_dir) {
        Ok(Some(dataset)) => {
            info!(path = %dataset.path.display(), rows = dataset.row_count, "recovered dataset");
            slot.install(dataset);
        }
        Ok(None) => info!("no stored dataset found; waiting for an upload"),
        Err(e) => tracing::warn!(error = %e, "dataset recovery failed; waiting for an upload"),
    }

    let backend = Arc::new(OpenAiBackend::new(&api_key, config.llm.model.clone()));
    let llm_timeout = Duration::from_millis(config.llm.timeout_ms);
    let query_timeout = Duration::from_millis(config.query.timeout_ms);
    let pipeline = Arc::new(AskPipeline::new(
        slot.clone(),
        engine.clone(),
        Translator::new(backend.clone(), llm_timeout),
        Summarizer::new(backend, llm_timeout),
        config.llm.max_retries,
        query_timeout,
        metrics.clone(),
    ));

    let state = AppState {
        slot,
        engine,
        pipeline,
        metrics,
        data_dir,
        query_timeout,
        max_upload_bytes: config.max_upload_bytes(),
    };
    let app = routes::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "dataq server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
