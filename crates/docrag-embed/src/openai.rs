//! OpenAI-compatible embeddings client (Azure OpenAI or OpenAI).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use docrag_core::{ApiKind, ApiTarget, Embedder, ProviderConfig, RagError, Result};

/// Inputs sent per request. Azure caps the input array on older API versions.
const BATCH_SIZE: usize = 16;

/// Embedder backed by an `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    target: ApiTarget,
}

impl OpenAiEmbedder {
    /// Build from provider configuration.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let target = config.target(ApiKind::Embeddings)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::embedding(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, target })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        debug!(
            batch_size = texts.len(),
            model = %self.target.model,
            "Embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: self.target.model_in_body.then_some(self.target.model.as_str()),
            input: texts,
        };

        let response = self
            .client
            .post(&self.target.url)
            .header(self.target.auth_header, &self.target.auth_value)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Embedding request failed");
                RagError::embedding(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(%status, "Embedding API error");
            return Err(RagError::embedding(format!("API returned {status}: {detail}")));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse embedding response");
            RagError::embedding(format!("failed to parse response: {e}"))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(RagError::embedding(format!(
                "API returned {} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
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
impl Embedder for OpenAiEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            embeddings.extend(self.embed_batch(batch).await?);
        }
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding("API returned empty response"))
    }

    fn model(&self) -> &str {
        &self.target.model
    }
}
