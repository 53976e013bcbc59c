//! Document ingestion: text extraction, chunking, and the upload pipeline.
pub mod chunker;
pub mod core;
pub mod extract;
