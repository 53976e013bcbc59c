use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::server::AppContext;
use crate::db::models::{EmbeddingRecord, RankedRecord};
use crate::error::{RagError, Result};
use crate::indexer::core::{Document, IngestReport};

/// Multipart field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub success: bool,
    pub data: Vec<EmbeddingRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub input: String,
}

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn list_embeddings(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<EmbeddingRecord>>> {
    Ok(Json(ctx.retriever.list_all().await?))
}

/// Unwrap a JSON body, turning extractor rejections into `InvalidInput` so
/// they share the `{success:false,error}` error body.
fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| RagError::InvalidInput(rejection.body_text()))
}

pub async fn create_embedding(
    State(ctx): State<AppContext>,
    payload: std::result::Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<PromptResponse>> {
    let request = json_body(payload)?;
    let data = ctx.ingestor.embed_prompt(&request.prompt).await?;
    Ok(Json(PromptResponse {
        success: true,
        data,
    }))
}

pub async fn search(
    State(ctx): State<AppContext>,
    payload: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<RankedRecord>>> {
    let request = json_body(payload)?;
    Ok(Json(ctx.retriever.search(&request.input).await?))
}

pub async fn upload(
    State(ctx): State<AppContext>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<IngestReport>> {
    let multipart = multipart.map_err(|rejection| RagError::InvalidInput(rejection.body_text()))?;
    let document = read_file_field(multipart).await?;
    if let Some(doc) = &document {
        info!(
            "Received upload {} ({} bytes, {})",
            doc.name,
            doc.bytes.len(),
            doc.media_type
        );
    }
    Ok(Json(ctx.ingestor.ingest(document).await?))
}

/// Pull the first `file` field out of a multipart body. Other fields are
/// skipped.
async fn read_file_field(mut multipart: Multipart) -> Result<Option<Document>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(name) = field.file_name().map(str::to_string) else {
            warn!("Multipart field {FILE_FIELD:?} has no filename");
            return Ok(None);
        };
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some(Document::new(&name, bytes.to_vec())));
    }
    Ok(None)
}

/// Body-limit breaches keep their 413; anything else is a malformed request.
fn multipart_error(e: MultipartError) -> RagError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RagError::PayloadTooLarge(e.body_text())
    } else {
        RagError::InvalidInput(format!("malformed multipart body: {}", e.body_text()))
    }
}
