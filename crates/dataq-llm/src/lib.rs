//! Language-model integration: question → SQL translation and result
//! summarization
//!
//! Both paths go through the [`CompletionBackend`] trait so the pipeline can
//! be tested with scripted backends. The OpenAI implementation mirrors the
//! request/response contract: one prompt in, one text completion out, no
//! streaming. Every call carries an explicit timeout and is never made while
//! holding the dataset slot or an engine connection.

mod backend;
mod summarize;
mod translate;

pub use backend::{ChatTurn, CompletionBackend, LlmError, OpenAiBackend, Role};
pub use summarize::Summarizer;
pub use translate::{ExecutionFailure, Translator};
