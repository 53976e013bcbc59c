//! Filesystem object store rooted at a directory.
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::{ObjectStore, StoredObject, UploadOptions};
use crate::error::{RagError, Result};

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Absolute location of an object path under the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let clean = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if path.is_empty() || !clean {
            return Err(RagError::StorageUpload(format!("invalid object path: {path:?}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        options: &UploadOptions,
    ) -> Result<StoredObject> {
        let dest = self.resolve(path)?;
        let io_err = |e: std::io::Error| RagError::StorageUpload(format!("{}: {e}", dest.display()));

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let mut open = tokio::fs::OpenOptions::new();
        open.write(true);
        if options.upsert {
            open.create(true).truncate(true);
        } else {
            open.create_new(true);
        }
        let mut file = open.open(&dest).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                RagError::StorageUpload(format!("the resource already exists: {path}"))
            } else {
                io_err(e)
            }
        })?;
        file.write_all(bytes).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        info!("Stored {} bytes at {}", bytes.len(), dest.display());
        Ok(StoredObject {
            path: path.to_string(),
            key: Some(dest.to_string_lossy().into_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(upsert: bool) -> UploadOptions {
        UploadOptions {
            cache_control: "3600".into(),
            upsert,
            content_type: "text/plain".into(),
        }
    }

    #[tokio::test]
    async fn test_upload_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let stored = store
            .upload("public/notes.txt", b"hello", &options(false))
            .await
            .unwrap();
        assert_eq!(stored.path, "public/notes.txt");
        let on_disk = std::fs::read(dir.path().join("public/notes.txt")).unwrap();
        assert_eq!(on_disk, b"hello");
    }

    #[tokio::test]
    async fn test_duplicate_without_upsert_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.upload("public/a.txt", b"one", &options(false)).await.unwrap();

        let err = store
            .upload("public/a.txt", b"two", &options(false))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::StorageUpload(_)));
        assert_eq!(std::fs::read(dir.path().join("public/a.txt")).unwrap(), b"one");
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.upload("a.txt", b"first version", &options(false)).await.unwrap();
        store.upload("a.txt", b"second", &options(true)).await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"second");
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let store = LocalObjectStore::new("/srv/objects");
        assert!(store.resolve("../etc/passwd").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("public/./a.txt").is_ok());
        assert!(store.resolve("").is_err());
    }
}
