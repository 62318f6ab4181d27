//! Result → narrative summarization
//!
//! Non-critical path: the structured result is the primary deliverable, so
//! the caller treats any failure here as a fallback to a templated
//! narrative, never as a request failure.

use dataq_types::QueryResult;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{ChatTurn, CompletionBackend, LlmError};
use crate::translate::call_with_timeout;

const SYSTEM_PROMPT: &str = "Explain the query result briefly and clearly in plain language.";

const SAMPLE_ROWS: usize = 5;

pub struct Summarizer<B> {
    backend: Arc<B>,
    timeout: Duration,
}

impl<B: CompletionBackend> Summarizer<B> {
    pub fn new(backend: Arc<B>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub async fn summarize(
        &self,
        question: &str,
        result: &QueryResult,
    ) -> Result<String, LlmError> {
        let sample = serde_json::to_string(result.sample(SAMPLE_ROWS))
            .unwrap_or_else(|_| "[]".to_string());
        let turns = [
            ChatTurn::system(SYSTEM_PROMPT),
            ChatTurn::user(format!(
                "User question: {question}\nReturned rows: {}\nSample rows: {sample}",
                result.row_count()
            )),
        ];
        let raw = call_with_timeout(self.backend.as_ref(), &turns, self.timeout).await?;
        Ok(raw.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedBackend {
        reply: String,
        seen: Mutex<Vec<Vec<ChatTurn>>>,
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(&self, turns: &[ChatTurn]) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(turns.to_vec());
            Ok(self.reply.clone())
        }
    }

    fn result_with_rows(n: usize) -> QueryResult {
        let rows = (0..n)
            .map(|i| {
                let mut row = dataq_types::Row::new();
                row.insert("id".to_string(), json!(i));
                row
            })
            .collect();
        QueryResult {
            query: "SELECT id FROM data".to_string(),
            columns: vec!["id".to_string()],
            rows,
            truncated: false,
        }
    }

    #[tokio::test]
    async fn prompt_carries_question_count_and_sample() {
        let backend = Arc::new(ScriptedBackend {
            reply: "  Eight rows matched.  ".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let summarizer = Summarizer::new(backend.clone(), Duration::from_secs(5));

        let narrative = summarizer
            .summarize("how many ids?", &result_with_rows(8))
            .await
            .unwrap();
        assert_eq!(narrative, "Eight rows matched.");

        let seen = backend.seen.lock().unwrap();
        let user = &seen[0][1].content;
        assert!(user.contains("User question: how many ids?"));
        assert!(user.contains("Returned rows: 8"));
        // Only the first five rows are included in the sample.
        assert!(user.contains("{\"id\":4}"));
        assert!(!user.contains("{\"id\":5}"));
    }
}
