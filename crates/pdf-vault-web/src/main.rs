//! PDF Vault Web - HTTP API for storing, searching and downloading PDF documents.

mod helpers;
mod routes;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use pdf_vault_core::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "pdf-vault-web")]
#[command(author, version, about = "PDF Vault Web Server", long_about = None)]
struct Args {
    /// Host to bind to (overrides config)
    #[arg(long, env = "PDF_VAULT_HOST")]
    host: Option<String>,

    /// Port to bind to (overrides config)
    #[arg(short, long, env = "PDF_VAULT_PORT")]
    port: Option<u16>,

    /// Config file (defaults to layered lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for uploaded files (overrides config)
    #[arg(long, env = "PDF_VAULT_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // lopdf logs every recoverable parse problem; keep it quiet by default
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},lopdf=error")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.upload_dir {
        config.storage.upload_dir = dir;
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid listen address")?;

    // Opens the catalog - fails fast if another instance holds the lock
    let state = Arc::new(
        AppState::new(config).context("Failed to initialize application state")?,
    );

    let app = routes::router(state);

    info!("Starting server at http://{}{}", addr, routes::API_BASE);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
