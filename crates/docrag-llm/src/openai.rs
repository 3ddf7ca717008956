//! OpenAI-compatible chat completions client (Azure OpenAI or OpenAI).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use docrag_core::{ApiKind, ApiTarget, ChatMessage, ChatModel, ChatOptions, ProviderConfig, RagError, Result};

/// Chat model backed by a `/chat/completions` endpoint.
pub struct OpenAiChat {
    client: reqwest::Client,
    target: ApiTarget,
}

impl OpenAiChat {
    /// Build from provider configuration.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let target = config.target(ApiKind::Chat)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, target })
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<String> {
        let start = Instant::now();

        let request_body = CompletionRequest {
            model: self.target.model_in_body.then_some(self.target.model.as_str()),
            messages,
            temperature: options.temperature,
        };

        let response = self
            .client
            .post(&self.target.url)
            .header(self.target.auth_header, &self.target.auth_value)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Chat request failed");
                RagError::llm(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(%status, "Chat API error");
            return Err(RagError::llm(format!("API returned {status}: {detail}")));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse chat response");
            RagError::llm(format!("failed to parse response: {e}"))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RagError::llm("API returned no completion"))?;

        debug!(
            model = %self.target.model,
            messages = messages.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Chat completion finished"
        );

        Ok(content)
    }

    fn model(&self) -> &str {
        &self.target.model
    }
}
