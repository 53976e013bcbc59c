//! HTTP surface: router, handlers and the error-to-response mapping.
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::RagError;

pub mod routes;
pub mod server;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl RagError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RagError::NoFileProvided | RagError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RagError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RagError::UnsupportedFileType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RagError::TextExtraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RagError::StorageUpload(_)
            | RagError::EmbeddingService(_)
            | RagError::Persistence(_) => StatusCode::BAD_GATEWAY,
            RagError::MalformedStoredVector { .. } | RagError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RagError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
