//! Embedding record storage and similarity ranking.
use async_trait::async_trait;

use crate::error::Result;

pub mod models;
pub mod search;
pub mod sqlite;
pub mod supabase;

use models::{EmbeddingRecord, NewEmbedding};

/// Capability interface over the table holding embedding records.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Fetch every stored record in retrieval order.
    async fn select_all(&self) -> Result<Vec<EmbeddingRecord>>;

    /// Insert rows and return them as stored.
    async fn insert(&self, rows: &[NewEmbedding]) -> Result<Vec<EmbeddingRecord>>;
}

/// Serialize a vector the way it is stored in the `embedding` column.
pub fn vector_to_json(vec: &[f32]) -> String {
    serde_json::to_string(vec).unwrap_or_default()
}
