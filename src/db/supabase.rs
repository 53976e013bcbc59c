//! PostgREST (Supabase) backed vector store.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use tracing::debug;

use super::VectorStore;
use super::models::{EmbeddingRecord, NewEmbedding};
use crate::config::SupabaseConfig;
use crate::error::{RagError, Result};

/// Build an HTTP client carrying the project's API key on every request.
pub fn supabase_client(key: &str, timeout: Duration) -> anyhow::Result<Client> {
    use anyhow::Context;

    let key = key.trim();
    anyhow::ensure!(!key.is_empty(), "missing Supabase key");
    let mut headers = HeaderMap::new();
    headers.insert(
        "apikey",
        HeaderValue::from_str(key).context("invalid Supabase key")?,
    );
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {key}")).context("invalid Supabase key")?,
    );
    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .context("failed to build Supabase HTTP client")
}

/// Parse the project URL, rejecting anything that cannot carry path segments.
pub fn project_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| anyhow::anyhow!("invalid Supabase URL {raw:?}: {e}"))?;
    anyhow::ensure!(!url.cannot_be_a_base(), "invalid Supabase URL {raw:?}");
    Ok(url)
}

/// Embedding table exposed through the Supabase REST API.
pub struct SupabaseStore {
    client: Client,
    endpoint: Url,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig) -> anyhow::Result<Self> {
        let client = supabase_client(&config.key, Duration::from_secs(config.timeout_secs.max(1)))?;
        Ok(Self {
            client,
            endpoint: table_endpoint(&project_url(&config.url)?, &config.table),
        })
    }
}

fn table_endpoint(base: &Url, table: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(["rest", "v1", table]);
    }
    url
}

async fn failure(resp: reqwest::Response) -> String {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    format!("{status}: {body}")
}

#[async_trait]
impl VectorStore for SupabaseStore {
    async fn select_all(&self) -> Result<Vec<EmbeddingRecord>> {
        let resp = self
            .client
            .get(self.endpoint.clone())
            .query(&[("select", "*")])
            .send()
            .await
            .map_err(|e| RagError::Persistence(format!("error fetching embeddings: {e}")))?;
        if !resp.status().is_success() {
            return Err(RagError::Persistence(format!(
                "error fetching embeddings: {}",
                failure(resp).await
            )));
        }
        let records: Vec<EmbeddingRecord> = resp
            .json()
            .await
            .map_err(|e| RagError::Persistence(format!("unreadable embedding rows: {e}")))?;
        debug!("Fetched {} embedding records", records.len());
        Ok(records)
    }

    async fn insert(&self, rows: &[NewEmbedding]) -> Result<Vec<EmbeddingRecord>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header("Prefer", "return=representation")
            .json(rows)
            .send()
            .await
            .map_err(|e| RagError::Persistence(format!("insertion error: {e}")))?;
        if !resp.status().is_success() {
            return Err(RagError::Persistence(format!(
                "insertion error: {}",
                failure(resp).await
            )));
        }
        resp.json()
            .await
            .map_err(|e| RagError::Persistence(format!("unreadable inserted rows: {e}")))
    }
}
