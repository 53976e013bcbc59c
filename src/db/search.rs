//! Linear-scan cosine ranking over stored embedding records.
use serde_json::Value;
use tracing::warn;

use super::models::{EmbeddingRecord, RankedRecord};
use crate::error::RagError;

/// Number of results returned by a search.
pub const DEFAULT_TOP_K: usize = 10;

/// Cosine similarity `(a·b) / (‖a‖·‖b‖)`.
///
/// Returns 0 when either vector has zero magnitude. Extra trailing
/// components of the longer vector are ignored.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Decode a stored `embedding` value.
///
/// Accepts a JSON array of numbers or a string holding one.
pub fn parse_stored_vector(value: &Value) -> Result<Vec<f32>, String> {
    let parsed;
    let array = match value {
        Value::Array(items) => items,
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text).map_err(|e| format!("not JSON: {e}"))?;
            match &parsed {
                Value::Array(items) => items,
                other => return Err(format!("expected array, found {}", kind(other))),
            }
        }
        other => return Err(format!("expected array, found {}", kind(other))),
    };

    array
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64()
                .map(|f| f as f32)
                .filter(|f| f.is_finite())
                .ok_or_else(|| format!("component {i} is not a finite number"))
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Score a single record against the query.
fn score(query: &[f32], record: &EmbeddingRecord) -> Result<f64, RagError> {
    let malformed = |reason: String| RagError::MalformedStoredVector {
        id: record.id,
        reason,
    };
    let stored = parse_stored_vector(&record.embedding).map_err(malformed)?;
    if stored.len() != query.len() {
        return Err(malformed(format!(
            "dimension {} does not match query dimension {}",
            stored.len(),
            query.len()
        )));
    }
    let similarity = cosine_similarity(query, &stored);
    if !similarity.is_finite() {
        return Err(malformed("similarity is not finite".to_string()));
    }
    Ok(similarity)
}

/// Rank records by descending similarity to `query` and keep the top `top_k`.
///
/// Ties keep retrieval order. Records whose vector cannot be scored are
/// logged and placed after every scored record with `similarity: None`.
pub fn rank(query: &[f32], records: Vec<EmbeddingRecord>, top_k: usize) -> Vec<RankedRecord> {
    let mut scored = Vec::with_capacity(records.len());
    let mut unscored = Vec::new();

    for record in records {
        match score(query, &record) {
            Ok(similarity) => scored.push(RankedRecord {
                record,
                similarity: Some(similarity),
            }),
            Err(e) => {
                warn!("Excluding record from ranking: {e}");
                unscored.push(RankedRecord {
                    record,
                    similarity: None,
                });
            }
        }
    }

    // Stable: equal scores stay in retrieval order.
    scored.sort_by(|a, b| {
        let key = |r: &RankedRecord| r.similarity.unwrap_or(f64::NEG_INFINITY);
        key(b).total_cmp(&key(a))
    });

    scored.extend(unscored);
    scored.truncate(top_k);
    scored
}
