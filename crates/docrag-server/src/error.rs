use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use docrag_core::RagError;

#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Upstream provider error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    InternalError(String),
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::UnsupportedFormat { .. } => {
                Self::BadRequest("Only .txt, .doc, and .docx files are supported".to_string())
            }
            RagError::Encoding { .. } => Self::BadRequest(
                "File encoding error. Please ensure the file is UTF-8 encoded.".to_string(),
            ),
            RagError::EmptyDocument { .. } => {
                Self::BadRequest("No text content found in the document".to_string())
            }
            RagError::Decode { reason, .. } => {
                Self::BadRequest(format!("Failed to process file: {reason}"))
            }
            RagError::InvalidArgument { message } => Self::BadRequest(message),
            RagError::Embedding { .. } | RagError::Llm { .. } => {
                tracing::error!("Provider error: {}", err);
                Self::Upstream(err.to_string())
            }
            _ => {
                tracing::error!("Internal error: {:?}", err);
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::PayloadTooLarge(message) => (StatusCode::PAYLOAD_TOO_LARGE, message),
            Self::Upstream(message) => (StatusCode::BAD_GATEWAY, message),
            Self::InternalError(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        let body = ErrorResponse {
            error: message,
            status: "error".to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_status_code<T: IntoResponse>(response: T, expected_status: StatusCode) {
        let response = response.into_response();
        assert_eq!(response.status(), expected_status);
    }

    #[test]
    fn test_rag_error_conversion() {
        let api_error = ApiError::from(RagError::UnsupportedFormat {
            filename: "a.pdf".to_string(),
        });
        assert!(matches!(api_error, ApiError::BadRequest(msg) if msg == "Only .txt, .doc, and .docx files are supported"));

        let api_error = ApiError::from(RagError::Encoding {
            filename: "a.txt".to_string(),
        });
        assert!(matches!(api_error, ApiError::BadRequest(msg) if msg.starts_with("File encoding error")));

        let api_error = ApiError::from(RagError::decode("a.docx", "not a Word document"));
        assert!(matches!(api_error, ApiError::BadRequest(msg) if msg == "Failed to process file: not a Word document"));

        let api_error = ApiError::from(RagError::llm("timeout"));
        assert!(matches!(api_error, ApiError::Upstream(_)));

        let api_error = ApiError::from(RagError::database("locked"));
        assert!(matches!(api_error, ApiError::InternalError(msg) if msg == "Internal server error"));
    }

    #[test]
    fn test_status_codes() {
        assert_status_code(ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST);
        assert_status_code(ApiError::PayloadTooLarge("x".into()), StatusCode::PAYLOAD_TOO_LARGE);
        assert_status_code(ApiError::Upstream("x".into()), StatusCode::BAD_GATEWAY);
        assert_status_code(
            ApiError::InternalError("x".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
    }
}
