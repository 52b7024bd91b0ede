use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::prompt::build_prompt;
use crate::app::ports::{ChatCompletionPort, ChatMessage, ChatRequest};
use crate::config::ClassifierConfig;
use crate::types::{LabelVerdict, ModerationLabel};

/// Why a batch produced no labels. Never fatal to the run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("endpoint returned HTTP {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("response contained no message content")]
    EmptyResponse,

    #[error("response is not a JSON array of verdicts: {0}")]
    MalformedResponse(String),
}

/// Remove markdown code-fence markers (```json and bare ```) and trim.
pub fn strip_code_fences(content: &str) -> String {
    content.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse a model reply into verdicts.
///
/// The reply must be a JSON array. Elements without a string `review` and a
/// string `label` are skipped.
pub fn parse_verdicts(content: &str) -> Result<Vec<LabelVerdict>, ClassifyError> {
    let body = strip_code_fences(content);
    let parsed: Value = serde_json::from_str(&body)
        .map_err(|e| ClassifyError::MalformedResponse(e.to_string()))?;
    let Value::Array(items) = parsed else {
        return Err(ClassifyError::MalformedResponse(
            "top-level value is not an array".to_string(),
        ));
    };

    let total = items.len();
    let verdicts: Vec<LabelVerdict> = items
        .into_iter()
        .filter_map(|item| {
            let review = item.get("review")?.as_str()?.to_string();
            let label = item.get("label")?.as_str()?;
            Some(LabelVerdict {
                review,
                label: ModerationLabel::from(label),
            })
        })
        .collect();
    if verdicts.len() < total {
        debug!("Skipped {} malformed verdict entries", total - verdicts.len());
    }
    Ok(verdicts)
}

/// Sends one batch of review texts to the chat endpoint and parses the reply.
pub struct BatchClassifier<C> {
    client: C,
    settings: ClassifierConfig,
}

impl<C: ChatCompletionPort> BatchClassifier<C> {
    pub fn new(client: C, settings: ClassifierConfig) -> Self {
        Self { client, settings }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn request_for<S: AsRef<str>>(&self, batch: &[S]) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![ChatMessage::user(build_prompt(batch))],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    pub async fn classify<S: AsRef<str>>(
        &self,
        batch: &[S],
    ) -> Result<Vec<LabelVerdict>, ClassifyError> {
        let request = self.request_for(batch);
        let content = self.client.complete(&request).await?;
        parse_verdicts(content.trim())
    }

    /// [`classify`](Self::classify) with failures logged and turned into an
    /// empty result.
    pub async fn classify_or_empty<S: AsRef<str>>(&self, batch: &[S]) -> Vec<LabelVerdict> {
        match self.classify(batch).await {
            Ok(verdicts) => verdicts,
            Err(e) => {
                warn!("Classification error: {}", e);
                Vec::new()
            }
        }
    }
}
