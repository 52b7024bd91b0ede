use async_trait::async_trait;
use serde::Serialize;

use crate::pipeline::labeling::classifier::ClassifyError;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body of an OpenAI-compatible chat-completion request.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

// Classification-side port: returns the assistant message content
#[async_trait]
pub trait ChatCompletionPort: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ClassifyError>;
}
