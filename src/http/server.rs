/// HTTP server setup using axum.
///
/// Provides `AppContext` (shared state), `build_router`, and `HttpServer`
/// (bind and serve until Ctrl-C).
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::routes;
use crate::config::{Config, StorageBackend, VectorBackend};
use crate::db::VectorStore;
use crate::db::sqlite::SqliteStore;
use crate::db::supabase::SupabaseStore;
use crate::embedder::Embedder;
use crate::embedder::gemini::GeminiEmbedder;
use crate::indexer::core::Ingestor;
use crate::query::Retriever;
use crate::storage::ObjectStore;
use crate::storage::local::LocalObjectStore;
use crate::storage::supabase::SupabaseObjectStore;

/// Shared application context available to all handlers.
#[derive(Clone)]
pub struct AppContext {
    pub ingestor: Arc<Ingestor>,
    pub retriever: Arc<Retriever>,
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(
        config: Arc<Config>,
        object_store: Arc<dyn ObjectStore>,
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let ingestor = Ingestor::new(
            object_store,
            vector_store.clone(),
            embedder.clone(),
            config.clone(),
        );
        let retriever = Retriever::new(vector_store, embedder, config.search_top_k);
        Self {
            ingestor: Arc::new(ingestor),
            retriever: Arc::new(retriever),
            config,
        }
    }

    /// Wire the production backends selected in `config`.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::new(
            GeminiEmbedder::new(&config.embedding).context("Failed to set up embedding client")?,
        );

        let vector_store: Arc<dyn VectorStore> = match config.vector_store.backend {
            VectorBackend::Supabase => Arc::new(SupabaseStore::new(&config.supabase)?),
            VectorBackend::Sqlite => {
                let path = &config.vector_store.sqlite_path;
                if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty())
                {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                Arc::new(
                    SqliteStore::open(path)
                        .with_context(|| format!("Failed to open database {path}"))?,
                )
            }
        };

        let object_store: Arc<dyn ObjectStore> = match config.storage.backend {
            StorageBackend::Supabase => Arc::new(SupabaseObjectStore::new(&config.supabase)?),
            StorageBackend::Local => Arc::new(LocalObjectStore::new(&config.storage.local_dir)),
        };

        info!(
            "Backends: vector store {:?}, object store {:?}, embedding model {}",
            config.vector_store.backend, config.storage.backend, config.embedding.model
        );
        Ok(Self::new(config, object_store, vector_store, embedder))
    }
}

/// Build the application router.
pub fn build_router(ctx: AppContext) -> Router {
    let body_limit = ctx.config.server.max_upload_bytes;
    Router::new()
        .route("/healthz", get(routes::healthz))
        .route(
            "/embedding/",
            get(routes::list_embeddings).post(routes::create_embedding),
        )
        .route(
            "/embedding",
            get(routes::list_embeddings).post(routes::create_embedding),
        )
        .route("/search", post(routes::search))
        .route("/uploads", post(routes::upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

pub struct HttpServer {
    pub ctx: AppContext,
}

impl HttpServer {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let addr = self.ctx.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!("Listening on http://{addr}");

        axum::serve(listener, build_router(self.ctx))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server encountered an error")?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
