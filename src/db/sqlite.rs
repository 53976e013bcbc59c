//! Local SQLite-backed vector store.
//!
//! Stores the same `word_embedding` shape as the remote table, with the
//! vector kept as JSON text. Used for offline runs and as the test double.
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use tokio::sync::Mutex as TokioMutex;
use tracing::info;

use super::models::{EmbeddingRecord, NewEmbedding};
use super::{VectorStore, vector_to_json};
use crate::error::Result;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS word_embedding (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at DATETIME NOT NULL,
    chunks TEXT NOT NULL,
    embedding TEXT NOT NULL,
    document INTEGER
);
"#;

/// A SQLite connection initialized with the `word_embedding` schema.
pub struct SqliteStore {
    pub(crate) conn: TokioMutex<Connection>,
}

impl SqliteStore {
    /// Open a database at the given path and initialize the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Initializing database: {}", path.display());
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: TokioMutex::new(conn),
        })
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EmbeddingRecord> {
    let created_at: DateTime<Utc> = row.get(1)?;
    let embedding: String = row.get(3)?;
    Ok(EmbeddingRecord {
        id: Some(row.get(0)?),
        created_at: Some(created_at.to_rfc3339()),
        chunks: row.get(2)?,
        embedding: serde_json::Value::String(embedding),
        document: row.get(4)?,
    })
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn select_all(&self) -> Result<Vec<EmbeddingRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, created_at, chunks, embedding, document FROM word_embedding ORDER BY id",
        )?;
        let rows = stmt.query_map([], map_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    async fn insert(&self, rows: &[NewEmbedding]) -> Result<Vec<EmbeddingRecord>> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let embedding = vector_to_json(&row.embedding);
            tx.execute(
                "INSERT INTO word_embedding (created_at, chunks, embedding, document) VALUES (?, ?, ?, ?)",
                params![now, row.chunks, embedding, row.document],
            )?;
            inserted.push(EmbeddingRecord {
                id: Some(tx.last_insert_rowid()),
                created_at: Some(now.to_rfc3339()),
                chunks: row.chunks.clone(),
                embedding: serde_json::Value::String(embedding),
                document: Some(row.document),
            });
        }

        tx.commit()?;
        Ok(inserted)
    }
}
