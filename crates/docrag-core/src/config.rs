//! Configuration types for the RAG service.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};
use crate::traits::ChunkConfig;

/// Main configuration for the RAG service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Collection and preload configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Chunking configuration.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Retrieval configuration.
    #[serde(default)]
    pub search: SearchConfig,

    /// Embedding and chat provider configuration.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Answer validation loop configuration.
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Allowed CORS origins; `"*"` allows any.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Maximum accepted upload body in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Blanket per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Directory holding the static UI.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_origins: default_cors_origins(),
            max_upload_bytes: default_max_upload_bytes(),
            request_timeout_secs: default_request_timeout(),
            static_dir: default_static_dir(),
        }
    }
}

/// Collection and preload configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Name of the single collection.
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Folder preloaded at boot if it exists.
    #[serde(default = "default_documents_path")]
    pub documents_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection_name: default_collection_name(),
            documents_path: default_documents_path(),
        }
    }
}

/// Chunking configuration, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters of overlap between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl ChunkingConfig {
    pub fn to_chunk_config(&self) -> ChunkConfig {
        ChunkConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of chunks retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

/// Answer validation loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Generate/validate rounds before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Which provider backs embeddings and chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Azure OpenAI deployments.
    Azure,
    /// OpenAI or any OpenAI-compatible API.
    OpenAi,
    /// No network: hashing embedder and extractive answers.
    Offline,
}

impl std::str::FromStr for ProviderKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            "openai" => Ok(Self::OpenAi),
            "offline" => Ok(Self::Offline),
            other => Err(RagError::config(format!("unknown provider: {other}"))),
        }
    }
}

/// Embedding and chat provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider kind.
    #[serde(default = "default_provider_kind")]
    pub kind: ProviderKind,

    /// Azure resource endpoint, or OpenAI base URL.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Azure API version query parameter.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Chat deployment (Azure) or model (OpenAI).
    #[serde(default)]
    pub chat_deployment: Option<String>,

    /// Embedding deployment (Azure) or model (OpenAI).
    #[serde(default = "default_embedding_deployment")]
    pub embedding_deployment: String,

    /// Temperature for answers.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Temperature for the validator.
    #[serde(default = "default_validator_temperature")]
    pub validator_temperature: f32,

    /// HTTP timeout for provider calls in seconds.
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            endpoint: None,
            api_key: None,
            api_version: default_api_version(),
            chat_deployment: None,
            embedding_deployment: default_embedding_deployment(),
            temperature: default_temperature(),
            validator_temperature: default_validator_temperature(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

/// Which API of the provider a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKind {
    Chat,
    Embeddings,
}

/// A fully resolved provider endpoint.
#[derive(Debug, Clone)]
pub struct ApiTarget {
    /// Request URL.
    pub url: String,

    /// Authentication header name.
    pub auth_header: &'static str,

    /// Authentication header value.
    pub auth_value: String,

    /// Model or deployment name.
    pub model: String,

    /// Whether the model name goes into the request body (OpenAI) or the URL (Azure).
    pub model_in_body: bool,
}

impl ProviderConfig {
    /// Resolve the URL, credentials and model for one API.
    pub fn target(&self, api: ApiKind) -> Result<ApiTarget> {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| RagError::config("provider API key is not set"))?;

        let model = match api {
            ApiKind::Chat => self
                .chat_deployment
                .clone()
                .filter(|d| !d.is_empty())
                .ok_or_else(|| RagError::config("chat deployment is not set"))?,
            ApiKind::Embeddings => self.embedding_deployment.clone(),
        };

        let path = match api {
            ApiKind::Chat => "chat/completions",
            ApiKind::Embeddings => "embeddings",
        };

        match self.kind {
            ProviderKind::Azure => {
                let endpoint = self
                    .endpoint
                    .as_deref()
                    .filter(|e| !e.is_empty())
                    .ok_or_else(|| RagError::config("Azure endpoint is not set"))?;
                Ok(ApiTarget {
                    url: format!(
                        "{}/openai/deployments/{}/{}?api-version={}",
                        endpoint.trim_end_matches('/'),
                        model,
                        path,
                        self.api_version
                    ),
                    auth_header: "api-key",
                    auth_value: api_key,
                    model,
                    model_in_body: false,
                })
            }
            ProviderKind::OpenAi => {
                let base = self
                    .endpoint
                    .as_deref()
                    .filter(|e| !e.is_empty())
                    .unwrap_or(DEFAULT_OPENAI_BASE_URL);
                Ok(ApiTarget {
                    url: format!("{}/{}", base.trim_end_matches('/'), path),
                    auth_header: "Authorization",
                    auth_value: format!("Bearer {api_key}"),
                    model,
                    model_in_body: true,
                })
            }
            ProviderKind::Offline => Err(RagError::config(
                "offline provider has no remote endpoint",
            )),
        }
    }
}

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

// Default value functions

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_request_timeout() -> u64 {
    120
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_collection_name() -> String {
    "company_docs".to_string()
}

fn default_documents_path() -> PathBuf {
    PathBuf::from("./documents")
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_top_k() -> u32 {
    3
}

fn default_max_attempts() -> u32 {
    3
}

fn default_provider_kind() -> ProviderKind {
    ProviderKind::Azure
}

fn default_api_version() -> String {
    "2024-02-01".to_string()
}

fn default_embedding_deployment() -> String {
    "text-embedding-3-small".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_validator_temperature() -> f32 {
    0.3
}

fn default_provider_timeout() -> u64 {
    60
}

impl AppConfig {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RagError::config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("docrag").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("docrag.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }

    /// Apply overrides from the process environment, with `provider` taking
    /// precedence over `DOCRAG_PROVIDER`.
    ///
    /// Credential variables are read for the final provider kind.
    pub fn apply_env_with_provider(&mut self, provider: Option<ProviderKind>) -> Result<()> {
        self.apply_env_from_with_provider(|key| std::env::var(key).ok(), provider)
    }

    /// Apply overrides using `lookup` to read variables.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.apply_env_from_with_provider(lookup, None)
    }

    pub fn apply_env_from_with_provider<F>(
        &mut self,
        lookup: F,
        provider: Option<ProviderKind>,
    ) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(kind) = lookup("DOCRAG_PROVIDER") {
            self.provider.kind = kind.parse()?;
        }
        if let Some(kind) = provider {
            self.provider.kind = kind;
        }
        if let Some(bind) = lookup("DOCRAG_BIND") {
            self.server.bind_address = bind;
        }
        if let Some(path) = lookup("DOCRAG_DOCUMENTS") {
            self.store.documents_path = PathBuf::from(path);
        }

        let provider = &mut self.provider;
        match provider.kind {
            ProviderKind::Azure => {
                if let Some(v) = lookup("AZURE_OPENAI_ENDPOINT") {
                    provider.endpoint = Some(v);
                }
                if let Some(v) = lookup("AZURE_OPENAI_API_KEY") {
                    provider.api_key = Some(v);
                }
                if let Some(v) = lookup("AZURE_OPENAI_API_VERSION") {
                    provider.api_version = v;
                }
                if let Some(v) = lookup("AZURE_OPENAI_DEPLOYMENT") {
                    provider.chat_deployment = Some(v);
                }
                if let Some(v) = lookup("AZURE_OPENAI_EMBEDDING_DEPLOYMENT") {
                    provider.embedding_deployment = v;
                }
            }
            ProviderKind::OpenAi => {
                if let Some(v) = lookup("OPENAI_BASE_URL") {
                    provider.endpoint = Some(v);
                }
                if let Some(v) = lookup("OPENAI_API_KEY") {
                    provider.api_key = Some(v);
                }
                if let Some(v) = lookup("OPENAI_MODEL") {
                    provider.chat_deployment = Some(v);
                }
                if let Some(v) = lookup("OPENAI_EMBEDDING_MODEL") {
                    provider.embedding_deployment = v;
                }
            }
            ProviderKind::Offline => {}
        }

        Ok(())
    }

    /// Check values that would otherwise fail at first use.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(RagError::config("chunking.chunk_size must be positive"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(RagError::config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.search.top_k == 0 {
            return Err(RagError::config("search.top_k must be positive"));
        }
        if self.validation.max_attempts == 0 {
            return Err(RagError::config("validation.max_attempts must be positive"));
        }
        if self.store.collection_name.trim().is_empty() {
            return Err(RagError::config("store.collection_name must not be empty"));
        }
        if self.provider.kind != ProviderKind::Offline {
            self.provider.target(ApiKind::Chat)?;
            self.provider.target(ApiKind::Embeddings)?;
        }
        Ok(())
    }

    /// Render as TOML with the API key masked.
    pub fn to_toml_redacted(&self) -> Result<String> {
        let mut redacted = self.clone();
        if redacted.provider.api_key.is_some() {
            redacted.provider.api_key = Some("********".to_string());
        }
        toml::to_string_pretty(&redacted)
            .map_err(|e| RagError::config(format!("Failed to render config: {}", e)))
    }
}
