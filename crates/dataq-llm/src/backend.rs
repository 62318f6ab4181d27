//! Chat completion backend trait and the OpenAI implementation

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport, auth, or builder failure from the model provider.
    #[error("model backend error: {message}")]
    Backend { message: String },

    #[error("model call timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The model returned blank or unusable text.
    #[error("model returned no usable SQL (raw response: {raw:?})")]
    EmptyTranslation { raw: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a chat exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request/response seam to the model provider. An empty completion is
/// returned as an empty string; callers decide whether that is an error.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, LlmError>;
}

pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiBackend {
    pub fn new(api_key: &str, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(turns.len());
        for turn in turns {
            let message = match turn.role {
                Role::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(turn.content.clone())
                        .build()
                        .map_err(backend_err)?,
                ),
                Role::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(turn.content.clone())
                        .build()
                        .map_err(backend_err)?,
                ),
                Role::Assistant => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(turn.content.clone())
                        .build()
                        .map_err(backend_err)?,
                ),
            };
            messages.push(message);
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .build()
            .map_err(backend_err)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(backend_err)?;
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();
        Ok(content)
    }
}

fn backend_err<E: std::fmt::Display>(e: E) -> LlmError {
    LlmError::Backend {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_constructors_set_roles() {
        assert_eq!(ChatTurn::system("a").role, Role::System);
        assert_eq!(ChatTurn::user("b").role, Role::User);
        assert_eq!(ChatTurn::assistant("c").role, Role::Assistant);
    }

    #[test]
    fn errors_carry_context() {
        let err = LlmError::Timeout { timeout_ms: 30_000 };
        assert!(err.to_string().contains("30000"));
        let err = LlmError::EmptyTranslation {
            raw: "  ".to_string(),
        };
        assert!(err.to_string().contains("no usable SQL"));
    }
}
