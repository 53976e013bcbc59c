//! Object storage for raw uploaded files.
use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

pub mod local;
pub mod supabase;

/// Options applied to a single upload.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub cache_control: String,
    /// Overwrite an existing object instead of failing.
    pub upsert: bool,
    pub content_type: String,
}

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Capability interface over the object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `path`. Without `upsert`, an existing object at the
    /// same path makes the upload fail.
    async fn upload(&self, path: &str, bytes: &[u8], options: &UploadOptions)
    -> Result<StoredObject>;
}
