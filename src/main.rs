use std::sync::Arc;

use anyhow::{Context, Result};
use chunkvec::config::Config;
use chunkvec::http::server::{AppContext, HttpServer};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "chunkvec",
    version,
    about = "Document ingestion and semantic search backend"
)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "chunkvec=debug,tower_http=debug"
    } else {
        "chunkvec=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    info!("Starting chunkvec v{}", env!("CARGO_PKG_VERSION"));

    // 1. Load config: file, then environment, then CLI flags
    let mut config = Config::load(&cli.config)?;
    config.apply_env();
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate().context("Invalid configuration")?;

    // 2. Wire backends
    let ctx = AppContext::from_config(Arc::new(config))?;

    // 3. Serve
    HttpServer::new(ctx).start().await
}
