use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db::VectorStore;
use crate::db::models::{EmbeddingRecord, NewEmbedding};
use crate::embedder::Embedder;
use crate::error::{RagError, Result};
use crate::indexer::chunker::{self, Chunk};
use crate::indexer::extract;
use crate::storage::{ObjectStore, StoredObject, UploadOptions};

/// An uploaded file.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}

impl Document {
    /// Wrap an upload, keeping only the final path component of its name.
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        let name = Path::new(name.trim())
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let media_type = extract::detect_media_type(&name);
        Self {
            name,
            bytes,
            media_type,
        }
    }
}

/// Outcome of a successful ingestion.
#[derive(Debug, Serialize)]
pub struct IngestReport {
    #[serde(rename = "data")]
    pub stored: StoredObject,
    pub embeddings: Vec<EmbeddingRecord>,
}

/// Runs uploads through storage, extraction, chunking, embedding and
/// persistence.
///
/// Embedding records are written in a single insert once every chunk has
/// been embedded, so a failing chunk leaves no records behind. The raw
/// object stays in the object store whatever happens after the upload.
pub struct Ingestor {
    object_store: Arc<dyn ObjectStore>,
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    config: Arc<Config>,
}

impl Ingestor {
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            object_store,
            vector_store,
            embedder,
            config,
        }
    }

    fn object_path(&self, name: &str) -> String {
        let prefix = self.config.ingest.path_prefix.trim_matches('/');
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        }
    }

    /// Ingest an uploaded document.
    pub async fn ingest(&self, document: Option<Document>) -> Result<IngestReport> {
        let document = document.ok_or(RagError::NoFileProvided)?;
        if document.name.is_empty() {
            return Err(RagError::NoFileProvided);
        }

        let path = self.object_path(&document.name);
        let options = UploadOptions {
            cache_control: self.config.supabase.cache_control.clone(),
            upsert: self.config.supabase.upsert,
            content_type: document.media_type.to_string(),
        };
        let stored = self
            .object_store
            .upload(&path, &document.bytes, &options)
            .await
            .inspect_err(|e| error!("Upload of {path} failed: {e}"))?;

        if !extract::is_supported(document.media_type) {
            warn!(
                "Stored {path} but {} is not a supported file type",
                document.media_type
            );
            return Err(RagError::UnsupportedFileType {
                media_type: document.media_type.to_string(),
            });
        }

        let text = extract::extract_text(document.media_type, &document.bytes)?;
        let chunks = chunker::chunk_text(&text, self.config.chunk_size);
        info!("Split {} into {} chunks", document.name, chunks.len());

        let embeddings = self.embed_and_store(&chunks).await?;
        Ok(IngestReport { stored, embeddings })
    }

    /// Embed a single prompt and persist it as one record.
    pub async fn embed_prompt(&self, prompt: &str) -> Result<Vec<EmbeddingRecord>> {
        if prompt.trim().is_empty() {
            return Err(RagError::InvalidInput("prompt must not be empty".into()));
        }
        let chunk = Chunk {
            content: prompt.to_string(),
            position: 0,
        };
        self.embed_and_store(std::slice::from_ref(&chunk)).await
    }

    async fn embed_and_store(&self, chunks: &[Chunk]) -> Result<Vec<EmbeddingRecord>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.embed_chunks(chunks).await?;
        let document = self.config.ingest.document_id;
        let rows: Vec<NewEmbedding> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, embedding)| NewEmbedding {
                chunks: chunk.content.clone(),
                embedding,
                document,
            })
            .collect();

        let records = self
            .vector_store
            .insert(&rows)
            .await
            .inspect_err(|e| error!("Persisting {} records failed: {e}", rows.len()))?;
        info!("Persisted {} embedding records", records.len());
        Ok(records)
    }

    /// Embed chunks with at most `embedding.concurrency` calls in flight.
    /// Output order matches chunk order; the first failure aborts the rest.
    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let limit = self.config.embedding.concurrency.max(1);
        let pending: Vec<(usize, String)> = chunks
            .iter()
            .map(|chunk| (chunk.position, chunk.content.clone()))
            .collect();
        let embedder = Arc::clone(&self.embedder);

        stream::iter(pending)
            .map(move |(position, text)| {
                let embedder = Arc::clone(&embedder);
                async move {
                    debug!("Embedding chunk {position}");
                    embedder
                        .embed_checked(&text)
                        .await
                        .map_err(RagError::from)
                }
            })
            .buffered(limit)
            .try_collect::<Vec<_>>()
            .await
            .inspect_err(|e| error!("Embedding failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::search::parse_stored_vector;
    use crate::db::sqlite::SqliteStore;
    use crate::embedder::mock::MockEmbedder;
    use crate::storage::local::LocalObjectStore;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        store: Arc<SqliteStore>,
        embedder: Arc<MockEmbedder>,
        ingestor: Ingestor,
    }

    fn fixture_with(embedder: MockEmbedder, configure: impl FnOnce(&mut Config)) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let embedder = Arc::new(embedder);
        let mut config = Config::default();
        configure(&mut config);
        let ingestor = Ingestor::new(
            Arc::new(LocalObjectStore::new(dir.path())),
            store.clone(),
            embedder.clone(),
            Arc::new(config),
        );
        Fixture {
            dir,
            store,
            embedder,
            ingestor,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockEmbedder::default(), |_| {})
    }

    #[test]
    fn test_document_strips_directories() {
        let doc = Document::new("../../etc/notes.TXT", b"x".to_vec());
        assert_eq!(doc.name, "notes.TXT");
        assert_eq!(doc.media_type, "text/plain");
    }

    #[tokio::test]
    async fn test_ingest_text_file() {
        let fx = fixture();
        let report = fx
            .ingestor
            .ingest(Some(Document::new("hello.txt", b"hello world".to_vec())))
            .await
            .unwrap();

        assert_eq!(report.stored.path, "public/hello.txt");
        assert_eq!(report.embeddings.len(), 1);
        assert_eq!(report.embeddings[0].chunks, "hello world");
        assert_eq!(report.embeddings[0].document, Some(1));

        let stored = fx.store.select_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(parse_stored_vector(&stored[0].embedding).unwrap().len(), 768);
        assert!(fx.dir.path().join("public/hello.txt").exists());
    }

    #[tokio::test]
    async fn test_ingest_without_file() {
        let fx = fixture();
        let err = fx.ingestor.ingest(None).await.unwrap_err();
        assert!(matches!(err, RagError::NoFileProvided));

        let err = fx
            .ingestor
            .ingest(Some(Document::new("  ", b"data".to_vec())))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::NoFileProvided));
        assert_eq!(fx.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_ingest_unsupported_keeps_object() {
        let fx = fixture();
        let err = fx
            .ingestor
            .ingest(Some(Document::new("report.docx", b"PK\x03\x04".to_vec())))
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::UnsupportedFileType { .. }));
        assert!(fx.dir.path().join("public/report.docx").exists());
        assert!(fx.store.select_all().await.unwrap().is_empty());
        assert_eq!(fx.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_ingest_duplicate_upload_short_circuits() {
        let fx = fixture();
        fx.ingestor
            .ingest(Some(Document::new("a.txt", b"first".to_vec())))
            .await
            .unwrap();
        let calls = fx.embedder.calls();

        let err = fx
            .ingestor
            .ingest(Some(Document::new("a.txt", b"second".to_vec())))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::StorageUpload(_)));
        assert_eq!(fx.embedder.calls(), calls);
        assert_eq!(fx.store.select_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_upsert_allows_reupload() {
        let fx = fixture_with(MockEmbedder::default(), |c| c.supabase.upsert = true);
        for _ in 0..2 {
            fx.ingestor
                .ingest(Some(Document::new("a.txt", b"same".to_vec())))
                .await
                .unwrap();
        }
        assert_eq!(fx.store.select_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ingest_preserves_chunk_order() {
        let fx = fixture_with(MockEmbedder::default(), |c| {
            c.chunk_size = 12;
            c.embedding.concurrency = 3;
        });
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let report = fx
            .ingestor
            .ingest(Some(Document::new("greek.md", text.as_bytes().to_vec())))
            .await
            .unwrap();

        let expected = chunker::split_into_chunks(text, 12);
        let got: Vec<&str> = report.embeddings.iter().map(|r| r.chunks.as_str()).collect();
        assert_eq!(got, expected);
        assert_eq!(fx.embedder.calls(), expected.len());
    }

    #[tokio::test]
    async fn test_embedding_failure_persists_nothing() {
        let fx = fixture_with(MockEmbedder::default().failing_on("poison"), |c| {
            c.chunk_size = 10;
            c.embedding.concurrency = 1;
        });
        let err = fx
            .ingestor
            .ingest(Some(Document::new(
                "mixed.txt",
                b"fine words then poison and more".to_vec(),
            )))
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::EmbeddingService(_)));
        assert!(fx.store.select_all().await.unwrap().is_empty());
        assert!(fx.dir.path().join("public/mixed.txt").exists());
    }

    #[tokio::test]
    async fn test_ingest_empty_text_file() {
        let fx = fixture();
        let report = fx
            .ingestor
            .ingest(Some(Document::new("empty.txt", b"  \n ".to_vec())))
            .await
            .unwrap();
        assert!(report.embeddings.is_empty());
        assert_eq!(fx.embedder.calls(), 0);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_pipeline_futures_are_send() {
        let fx = fixture();

        let ingest = fx
            .ingestor
            .ingest(Some(Document::new("send.txt", b"spawnable work".to_vec())));
        assert_send(&ingest);
        assert_eq!(ingest.await.unwrap().embeddings.len(), 1);

        let prompt = fx.ingestor.embed_prompt("spawned prompt");
        assert_send(&prompt);
        assert_eq!(prompt.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_runs_on_spawned_task() {
        let fx = fixture();
        let ingestor = Arc::new(fx.ingestor);
        let handle = tokio::spawn({
            let ingestor = Arc::clone(&ingestor);
            async move {
                ingestor
                    .ingest(Some(Document::new("task.txt", b"from a task".to_vec())))
                    .await
            }
        });
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.embeddings[0].chunks, "from a task");
        assert_eq!(fx.store.select_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_embed_prompt() {
        let fx = fixture();
        let records = fx.ingestor.embed_prompt("a lone prompt").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].chunks, "a lone prompt");

        let err = fx.ingestor.embed_prompt("   ").await.unwrap_err();
        assert!(matches!(err, RagError::InvalidInput(_)));
    }

    #[test]
    fn test_report_serialization() {
        let report = IngestReport {
            stored: StoredObject {
                path: "public/a.txt".into(),
                key: None,
            },
            embeddings: Vec::new(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["data"]["path"], "public/a.txt");
        assert!(json["embeddings"].as_array().unwrap().is_empty());
    }
}
