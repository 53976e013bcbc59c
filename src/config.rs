/// Configuration module for chunkvec.
///
/// Handles loading, validating, and providing default configuration values.
/// Settings come from an optional JSON file and are then overridden by
/// environment variables; the result is loaded once at start-up.
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ── Default value functions ──────────────────────────────────────────

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_chunk_size() -> usize {
    600
}

fn default_search_top_k() -> usize {
    10
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_embedding_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_dimensions() -> usize {
    768
}

fn default_concurrency() -> usize {
    4
}

fn default_bucket() -> String {
    "Knowledge Document Repo".to_string()
}

fn default_table() -> String {
    "word_embedding".to_string()
}

fn default_cache_control() -> String {
    "3600".to_string()
}

fn default_local_dir() -> String {
    "./uploads".to_string()
}

fn default_sqlite_path() -> String {
    "./embeddings.db".to_string()
}

fn default_path_prefix() -> String {
    "public".to_string()
}

fn default_document_id() -> i64 {
    1
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Maximum characters per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_search_top_k")]
    pub search_top_k: usize,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub supabase: SupabaseConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Chunks embedded in flight at once during ingestion (1 = sequential).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SupabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default, skip_serializing)]
    pub key: String,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default = "default_cache_control")]
    pub cache_control: String,

    #[serde(default)]
    pub upsert: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Supabase,
    Local,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    #[serde(default = "default_local_dir")]
    pub local_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Supabase,
    Sqlite,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub backend: VectorBackend,

    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IngestConfig {
    /// Object-store folder uploads are written under.
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,

    /// Document reference written on every embedding record.
    #[serde(default = "default_document_id")]
    pub document_id: i64,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            chunk_size: default_chunk_size(),
            search_top_k: default_search_top_k(),
            embedding: EmbeddingConfig::default(),
            supabase: SupabaseConfig::default(),
            storage: StorageConfig::default(),
            vector_store: VectorStoreConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_embedding_model(),
            base_url: default_embedding_base_url(),
            timeout_secs: default_timeout_secs(),
            dimensions: default_dimensions(),
            concurrency: default_concurrency(),
        }
    }
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: String::new(),
            bucket: default_bucket(),
            table: default_table(),
            cache_control: default_cache_control(),
            upsert: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            local_dir: default_local_dir(),
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::default(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            path_prefix: default_path_prefix(),
            document_id: default_document_id(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// A missing file is not an error: defaults are returned and the
    /// environment is expected to supply credentials.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "config.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;
        let cfg: Config =
            serde_json::from_str(&data).with_context(|| format!("invalid JSON in {path}"))?;

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Override settings from the process environment, falling back to a
    /// `.env` file in the working directory for keys the environment leaves
    /// unset.
    pub fn apply_env(&mut self) {
        self.apply_env_layered(Path::new(".env"), |key| std::env::var(key).ok());
    }

    /// Like [`Config::apply_env_from`], with `env_file` consulted for keys
    /// `lookup` has no non-empty value for.
    pub fn apply_env_layered<F>(&mut self, env_file: &Path, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_vars = read_env_file(env_file);
        self.apply_env_from(|key| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file_vars.get(key).cloned())
        });
    }

    /// Override settings from an arbitrary variable lookup.
    ///
    /// Recognised keys: `APP_HOST`, `APP_PORT`, `SUPABASE_URL`
    /// (or `NEXT_PUBLIC_SUPABASE_URL`), `SUPABASE_KEY` (or
    /// `NEXT_PUBLIC_SUPABASE_ANON_KEY`), `GEMINI_API_KEY`.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(k))
                .find(|v| !v.trim().is_empty())
        };

        if let Some(host) = first(&["APP_HOST", "app_host"]) {
            self.server.host = host;
        }
        if let Some(port) = first(&["APP_PORT", "app_port"]) {
            match port.trim().parse() {
                Ok(p) => self.server.port = p,
                Err(e) => warn!("Ignoring invalid APP_PORT {port:?}: {e}"),
            }
        }
        if let Some(url) = first(&["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"]) {
            self.supabase.url = url;
        }
        if let Some(key) = first(&["SUPABASE_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"]) {
            self.supabase.key = key;
        }
        if let Some(key) = first(&["GEMINI_API_KEY"]) {
            self.embedding.api_key = key;
        }
    }

    /// Socket address string the HTTP server binds to.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be positive");
        anyhow::ensure!(self.search_top_k > 0, "search_top_k must be positive");
        anyhow::ensure!(
            self.embedding.dimensions > 0,
            "embedding.dimensions must be positive"
        );
        anyhow::ensure!(
            self.embedding.concurrency > 0,
            "embedding.concurrency must be positive"
        );
        anyhow::ensure!(
            !self.embedding.api_key.trim().is_empty(),
            "embedding.api_key (GEMINI_API_KEY) is required"
        );

        let needs_supabase = self.storage.backend == StorageBackend::Supabase
            || self.vector_store.backend == VectorBackend::Supabase;
        if needs_supabase {
            anyhow::ensure!(
                !self.supabase.url.trim().is_empty(),
                "supabase.url (SUPABASE_URL) is required for the supabase backend"
            );
            anyhow::ensure!(
                !self.supabase.key.trim().is_empty(),
                "supabase.key (SUPABASE_KEY) is required for the supabase backend"
            );
        }
        Ok(())
    }
}

/// Read `KEY=value` pairs from a dotenv file without touching the process
/// environment. A missing file yields nothing.
fn read_env_file(path: &Path) -> HashMap<String, String> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return HashMap::new(),
        Err(e) => {
            warn!("Ignoring {}: {e}", path.display());
            return HashMap::new();
        }
    };
    let vars: HashMap<String, String> = iter
        .filter_map(|item| {
            item.inspect_err(|e| warn!("Skipping line in {}: {e}", path.display()))
                .ok()
        })
        .collect();
    info!("Loaded {} variables from {}", vars.len(), path.display());
    vars
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        let mut config = Config::default();
        config.embedding.api_key = "gemini-key".to_string();
        config.supabase.url = "https://project.supabase.co".to_string();
        config.supabase.key = "anon-key".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunk_size, 600);
        assert_eq!(config.search_top_k, 10);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.embedding.model, "text-embedding-004");
        assert_eq!(config.embedding.dimensions, 768);
        assert_eq!(config.supabase.bucket, "Knowledge Document Repo");
        assert_eq!(config.supabase.table, "word_embedding");
        assert!(!config.supabase.upsert);
        assert_eq!(config.storage.backend, StorageBackend::Supabase);
        assert_eq!(config.vector_store.backend, VectorBackend::Supabase);
        assert_eq!(config.ingest.path_prefix, "public");
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{
            "chunk_size": 200,
            "server": {"port": 8081},
            "storage": {"backend": "local", "local_dir": "/tmp/objects"},
            "vector_store": {"backend": "sqlite"}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.chunk_size, 200);
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.storage.local_dir, "/tmp/objects");
        assert_eq!(config.vector_store.backend, VectorBackend::Sqlite);
        assert_eq!(config.search_top_k, 10);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.chunk_size, 600);
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("APP_HOST", "0.0.0.0"),
            ("APP_PORT", "9000"),
            ("NEXT_PUBLIC_SUPABASE_URL", "https://legacy.supabase.co"),
            ("SUPABASE_KEY", "service-key"),
            ("GEMINI_API_KEY", "g-key"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.supabase.url, "https://legacy.supabase.co");
        assert_eq!(config.supabase.key, "service-key");
        assert_eq!(config.embedding.api_key, "g-key");
    }

    #[test]
    fn test_env_invalid_port_ignored() {
        let mut config = Config::default();
        config.apply_env_from(|k| (k == "APP_PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_validate_ok() {
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_chunk_size() {
        let mut config = configured();
        config.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_api_key() {
        let mut config = configured();
        config.embedding.api_key.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_local_backends_skip_supabase() {
        let mut config = Config::default();
        config.embedding.api_key = "gemini-key".to_string();
        config.storage.backend = StorageBackend::Local;
        config.vector_store.backend = VectorBackend::Sqlite;
        assert!(config.validate().is_ok());

        config.vector_store.backend = VectorBackend::Supabase;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialization_omits_secrets() {
        let json = serde_json::to_string_pretty(&configured()).unwrap();
        assert!(!json.contains("gemini-key"));
        assert!(!json.contains("anon-key"));
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.chunk_size, 600);
        assert_eq!(parsed.supabase.url, "https://project.supabase.co");
    }

    #[test]
    fn test_env_file_fills_unset_keys() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(
            &env_file,
            "# local secrets\nGEMINI_API_KEY=file-key\nAPP_PORT=4100\nNEXT_PUBLIC_SUPABASE_URL=https://file.supabase.co\n",
        )
        .unwrap();

        let vars: HashMap<&str, &str> = [("APP_PORT", "5000"), ("GEMINI_API_KEY", "")].into();
        let mut config = Config::default();
        config.apply_env_layered(&env_file, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.embedding.api_key, "file-key");
        assert_eq!(config.supabase.url, "https://file.supabase.co");
    }

    #[test]
    fn test_missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_env_file(&dir.path().join(".env")).is_empty());

        let mut config = Config::default();
        config.apply_env_layered(&dir.path().join(".env"), |_| None);
        assert_eq!(config.server.port, 3000);
        assert!(config.embedding.api_key.is_empty());
    }
}
