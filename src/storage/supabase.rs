//! Supabase Storage bucket client.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::info;

use super::{ObjectStore, StoredObject, UploadOptions};
use crate::config::SupabaseConfig;
use crate::db::supabase::{project_url, supabase_client};
use crate::error::{RagError, Result};

pub struct SupabaseObjectStore {
    client: Client,
    base: Url,
    bucket: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key", default)]
    key: Option<String>,
}

impl SupabaseObjectStore {
    pub fn new(config: &SupabaseConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(!config.bucket.trim().is_empty(), "missing storage bucket");
        Ok(Self {
            client: supabase_client(&config.key, Duration::from_secs(config.timeout_secs.max(1)))?,
            base: project_url(&config.url)?,
            bucket: config.bucket.clone(),
        })
    }

    fn object_url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "object", self.bucket.as_str()])
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url
    }
}

fn cache_control_header(value: &str) -> String {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        format!("max-age={value}")
    } else {
        value.to_string()
    }
}

#[async_trait]
impl ObjectStore for SupabaseObjectStore {
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        options: &UploadOptions,
    ) -> Result<StoredObject> {
        let resp = self
            .client
            .post(self.object_url(path))
            .header(CACHE_CONTROL, cache_control_header(&options.cache_control))
            .header(CONTENT_TYPE, options.content_type.as_str())
            .header("x-upsert", options.upsert.to_string())
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| RagError::StorageUpload(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagError::StorageUpload(format!("{status}: {body}")));
        }

        let parsed: UploadResponse = resp
            .json()
            .await
            .map_err(|e| RagError::StorageUpload(format!("unreadable upload response: {e}")))?;
        info!("Uploaded {} bytes to {}/{}", bytes.len(), self.bucket, path);
        Ok(StoredObject {
            path: path.to_string(),
            key: parsed.key,
        })
    }
}
