/// Embedder trait and shared types for text embedding.
///
/// The production implementation calls a remote embedding model; the mock
/// produces deterministic vectors for tests and offline runs.
pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("embedding service returned {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("client setup failed: {0}")]
    ClientSetup(String),
}

/// Trait for text embedding implementations.
///
/// One call is one attempt: implementations do not retry, and a failure is
/// never replaced by a placeholder vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;

    /// Embed `text` and reject a vector whose length differs from
    /// [`Embedder::dimensions`].
    async fn embed_checked(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let vector = self.embed(text).await?;
        let expected = self.dimensions();
        if vector.len() != expected {
            return Err(EmbedderError::InvalidResponse(format!(
                "expected {expected} dimensions, got {}",
                vector.len()
            )));
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock::MockEmbedder;

    /// Claims one size, returns another.
    struct Misreporting;

    #[async_trait]
    impl Embedder for Misreporting {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedderError> {
            Ok(vec![0.5; 3])
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    #[tokio::test]
    async fn test_embed_checked_rejects_wrong_length() {
        let err = Misreporting.embed_checked("text").await.unwrap_err();
        assert!(matches!(err, EmbedderError::InvalidResponse(ref m) if m.contains("expected 4")));
    }

    #[tokio::test]
    async fn test_embed_checked_passes_matching_length() {
        let embedder = MockEmbedder::new(16);
        assert_eq!(embedder.embed_checked("text").await.unwrap().len(), 16);
    }
}
