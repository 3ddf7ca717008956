use std::path::Path;
use std::time::Duration;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use docrag_core::{ChatMessage, DocumentOrigin, Role, Stats};
use docrag_query::{ValidationAttempt, ValidationStatus};

use crate::error::ApiError;
use crate::ingest::ingest_document;
use crate::state::AppState;

/// Body of the question routes.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,

    #[serde(default)]
    pub conversation_history: Option<Vec<ChatMessage>>,
}

impl PromptRequest {
    fn validated(&self) -> Result<&str, ApiError> {
        if self.prompt.trim().is_empty() {
            return Err(ApiError::BadRequest("Prompt must not be empty".to_string()));
        }
        Ok(&self.prompt)
    }

    fn history(&self) -> &[ChatMessage] {
        self.conversation_history.as_deref().unwrap_or_default()
    }

    /// Request history followed by this exchange.
    fn extend_history(&self, response: &str) -> Vec<ChatMessage> {
        let mut history = self.history().to_vec();
        history.push(ChatMessage::user(self.prompt.as_str()));
        history.push(ChatMessage::assistant(response));
        history
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub prompt: String,
    pub response: String,
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub prompt: String,
    pub response: String,
    pub conversation_history: Vec<ChatMessage>,
    pub method: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RagResponse {
    pub prompt: String,
    pub response: String,
    pub conversation_history: Vec<ChatMessage>,
    pub method: &'static str,
    pub context_used: Vec<String>,
    pub num_documents_retrieved: usize,
}

#[derive(Debug, Serialize)]
pub struct ValidatedResponse {
    pub prompt: String,
    pub response: String,
    pub conversation_history: Vec<ChatMessage>,
    pub method: &'static str,
    pub validation_status: ValidationStatus,
    pub attempts: Vec<ValidationAttempt>,
    pub total_attempts: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub chunks_created: usize,
    pub file_type: &'static str,
    pub status: &'static str,
}

/// Build the HTTP router over a ready state.
pub fn router(state: AppState) -> Router {
    let config = state.config.clone();
    let server = &config.server;
    let static_dir = server.static_dir.clone();
    let index = static_dir.join("index.html");

    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/ask", post(ask))
        .route("/ask-langchain", post(ask_conversation))
        .route("/ask-rag", post(ask_rag))
        .route("/ask-validated", post(ask_validated))
        .route("/upload-document", post(upload_document))
        .route_service("/", ServeFile::new(&index))
        .route_service("/ui", ServeFile::new(&index))
        .nest_service("/static", ServeDir::new(&static_dir))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(cors_layer(&server.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(allowed)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    Ok(Json(state.collection().stats().await?))
}

async fn ask(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let prompt = request.validated()?;
    let response = state.engine.chat(request.history(), prompt).await?;

    Ok(Json(ChatResponse {
        conversation_history: request.extend_history(&response),
        prompt: request.prompt.clone(),
        response,
    }))
}

/// History-aware chat. Only user and assistant turns reach the model.
async fn ask_conversation(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let prompt = request.validated()?;
    let turns: Vec<ChatMessage> = request
        .history()
        .iter()
        .filter(|m| m.role != Role::System)
        .cloned()
        .collect();
    let response = state.engine.chat(&turns, prompt).await?;

    Ok(Json(ConversationResponse {
        conversation_history: request.extend_history(&response),
        prompt: request.prompt.clone(),
        response,
        method: "langchain",
    }))
}

async fn ask_rag(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<RagResponse>, ApiError> {
    let prompt = request.validated()?;
    let answer = state.engine.answer(prompt).await?;

    Ok(Json(RagResponse {
        conversation_history: request.extend_history(&answer.answer),
        prompt: request.prompt.clone(),
        response: answer.answer,
        method: "rag",
        num_documents_retrieved: answer.context.len(),
        context_used: answer.context,
    }))
}

async fn ask_validated(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<ValidatedResponse>, ApiError> {
    let prompt = request.validated()?;
    let result = state.validator.run(request.history(), prompt).await?;

    Ok(Json(ValidatedResponse {
        conversation_history: request.extend_history(&result.response),
        prompt: request.prompt.clone(),
        response: result.response,
        method: "validated",
        validation_status: result.status,
        total_attempts: result.attempts.len(),
        attempts: result.attempts,
    }))
}

async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
        let bytes = field.bytes().await.map_err(multipart_error)?;

        let report = ingest_document(
            state.collection(),
            state.chunker.as_ref(),
            &state.chunk_config,
            &filename,
            &bytes,
            DocumentOrigin::Upload,
        )
        .await?;

        info!(filename = %filename, chunks = report.chunks, "Upload processed");

        return Ok(Json(UploadResponse {
            message: format!("Successfully uploaded and processed {filename}"),
            chunks_created: report.chunks,
            file_type: report.format.label(),
            status: "success",
            filename,
        }));
    }

    Err(ApiError::BadRequest("No file provided".to_string()))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}
