//! Similarity search over stored embedding records.
use std::sync::Arc;

use tracing::info;

use crate::db::VectorStore;
use crate::db::models::{EmbeddingRecord, RankedRecord};
use crate::db::search;
use crate::embedder::Embedder;
use crate::error::{RagError, Result};

pub struct Retriever {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
    ) -> Self {
        Self {
            vector_store,
            embedder,
            top_k,
        }
    }

    /// Embed `input` and rank every stored record against it, best first.
    ///
    /// Records whose vectors cannot be scored trail the scored ones with no
    /// similarity. At most `top_k` records come back.
    pub async fn search(&self, input: &str) -> Result<Vec<RankedRecord>> {
        if input.trim().is_empty() {
            return Err(RagError::InvalidInput("search input must not be empty".into()));
        }
        let query = self.embedder.embed_checked(input).await?;
        let records = self.vector_store.select_all().await?;
        let total = records.len();
        let ranked = search::rank(&query, records, self.top_k);
        info!("Ranked {total} records, returning {}", ranked.len());
        Ok(ranked)
    }

    /// Every stored record, unranked.
    pub async fn list_all(&self) -> Result<Vec<EmbeddingRecord>> {
        self.vector_store.select_all().await
    }
}
