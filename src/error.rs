//! Error taxonomy shared by the ingestion and query pipelines.
use thiserror::Error;

use crate::embedder::EmbedderError;

/// Errors surfaced by the pipelines and their collaborators.
///
/// Every variant is terminal for the request that produced it; none of them
/// touch process-wide state.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("no file provided")]
    NoFileProvided,

    #[error("unsupported file type: {media_type}")]
    UnsupportedFileType { media_type: String },

    #[error("storage upload failed: {0}")]
    StorageUpload(String),

    #[error("text extraction failed: {0}")]
    TextExtraction(String),

    #[error("embedding service error: {0}")]
    EmbeddingService(#[from] EmbedderError),

    #[error("persistence failed: {0}")]
    Persistence(String),

    /// Recovered inside the ranker; never returned to a caller.
    #[error("malformed stored vector (record {id:?}): {reason}")]
    MalformedStoredVector { id: Option<i64>, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RagError>;

impl From<rusqlite::Error> for RagError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}
