//! # chunkvec — Document Ingestion & Semantic Search Backend
//!
//! Accepts uploaded documents, stores the raw file in an object store,
//! extracts and chunks their text, embeds each chunk through a remote
//! embedding model, and ranks stored chunks against free-text queries by
//! cosine similarity.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading (JSON + environment) and validation
//! - **[`error`]** — `RagError` taxonomy shared by every pipeline
//! - **[`embedder`]** — `Embedder` trait, Gemini client, deterministic mock
//! - **[`db`]** — `VectorStore` trait, Supabase and SQLite stores, similarity ranking
//! - **[`storage`]** — `ObjectStore` trait, Supabase Storage and local filesystem
//! - **[`indexer`]** — Text extraction, word-packing chunker, ingestion pipeline
//! - **[`query`]** — Query pipeline (embed, fetch, rank)
//! - **[`http`]** — axum router, handlers and server start-up

pub mod config;
pub mod db;
pub mod embedder;
pub mod error;
pub mod http;
pub mod indexer;
pub mod query;
pub mod storage;
