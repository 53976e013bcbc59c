use serde::{Deserialize, Serialize};

/// A persisted `word_embedding` row.
///
/// `embedding` is kept as raw JSON: remote stores hand vectors back as a
/// JSON-encoded string, and nothing guarantees the stored text is well
/// formed. The ranker parses it on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub chunks: String,
    #[serde(default)]
    pub embedding: serde_json::Value,
    #[serde(default)]
    pub document: Option<i64>,
}

/// A row about to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEmbedding {
    pub chunks: String,
    pub embedding: Vec<f32>,
    pub document: i64,
}

/// A record annotated with its similarity to a query.
///
/// `similarity` is `None` when the stored vector could not be scored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRecord {
    #[serde(flatten)]
    pub record: EmbeddingRecord,
    pub similarity: Option<f64>,
}
