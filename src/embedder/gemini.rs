//! Gemini `embedContent` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Embedder, EmbedderError};
use crate::config::EmbeddingConfig;

/// Embeddings client for Google's generative-language endpoint.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    /// Builds a client from the embedding section of the config.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbedderError> {
        if config.api_key.trim().is_empty() {
            return Err(EmbedderError::ClientSetup("missing Gemini API key".into()));
        }
        if config.model.trim().is_empty() {
            return Err(EmbedderError::ClientSetup("missing embedding model name".into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(config.api_key.trim())
                .map_err(|e| EmbedderError::ClientSetup(format!("invalid API key: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .default_headers(headers)
            .build()
            .map_err(|e| EmbedderError::ClientSetup(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: embed_endpoint(&config.base_url, &config.model),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

fn embed_endpoint(base_url: &str, model: &str) -> String {
    format!("{}/models/{}:embedContent", base_url.trim_end_matches('/'), model)
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let request = EmbedContentRequest::new(&self.model, text);
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbedderError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbedderError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedContentResponse = resp
            .json()
            .await
            .map_err(|e| EmbedderError::InvalidResponse(e.to_string()))?;
        let values = parsed.into_values(self.dimensions)?;
        debug!("Embedded {} chars into {} dims", text.len(), values.len());
        Ok(values)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> EmbedContentRequest<'a> {
    fn new(model: &str, text: &'a str) -> Self {
        Self {
            model: format!("models/{model}"),
            content: Content {
                parts: [Part { text }],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

impl EmbedContentResponse {
    fn into_values(self, expected: usize) -> Result<Vec<f32>, EmbedderError> {
        let values = self.embedding.values;
        if values.is_empty() {
            return Err(EmbedderError::InvalidResponse("empty embedding".into()));
        }
        if values.len() != expected {
            return Err(EmbedderError::InvalidResponse(format!(
                "expected {expected} dimensions, got {}",
                values.len()
            )));
        }
        Ok(values)
    }
}
