//! Folio Server
//!
//! Receives intercepted reader exchanges over HTTP and assembles the wanted
//! documents. `merge` rebuilds a PDF from a page directory offline.

use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use folio_server::assembly::ImageFormat;
use folio_server::config::{Config, LoggingConfig};
use folio_server::document::DocumentPool;
use folio_server::finalize::{merge_directory, FinalizeQueue};
use folio_server::routes;
use folio_server::state::AppState;

#[derive(Parser)]
#[command(name = "folio-server", version)]
#[command(about = "Assemble documents from intercepted page-tile exchanges", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the exchange ingestion server (default)
    Serve,
    /// Merge a directory of page images into a PDF
    Merge {
        /// Directory containing `<page>.<ext>` images and optionally bookmark.json
        #[arg(long)]
        dir: PathBuf,

        /// Output PDF path
        #[arg(long)]
        output: PathBuf,

        /// Page image format
        #[arg(long, env = "TILE_FORMAT", default_value = "jpeg")]
        format: ImageFormat,

        /// JPEG quality for re-encoded pages
        #[arg(long, env = "TILE_QUALITY", default_value_t = 85)]
        quality: u8,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&LoggingConfig::from_env())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Merge {
            dir,
            output,
            format,
            quality,
        } => merge(&dir, &output, format, quality),
    }
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "folio_server=info,tower_http=info".into())
    };

    let file_layer = match &logging.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let name = format!("{}.log", chrono::Local::now().format("%Y-%m-%d-%M-%S"));
            let file = File::create(dir.join(name)).context("Failed to create log file")?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(filter()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter()))
        .with(file_layer)
        .init();
    Ok(())
}

async fn serve() -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!("Starting Folio Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Wanted documents: {:?}", config.tracking.wanted);
    tracing::info!("Page images: {}", config.storage.image_dir.display());
    tracing::info!("Output: {}", config.storage.output_dir.display());
    if config.tracking.wanted.is_empty() {
        tracing::warn!("WANTED_DOCUMENTS is empty, every exchange will be filtered");
    }

    let (finalizer, finalize_worker) = FinalizeQueue::start(config.finalize.workers);
    let pool = DocumentPool::new(
        config.tracking.wanted.iter().copied(),
        config.tracker_settings(),
        config.patterns.clone(),
        Arc::new(finalizer),
    )
    .context("Failed to open page stores")?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid SERVER_HOST/SERVER_PORT")?;
    let app = routes::app(AppState::new(config, pool));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Folio Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router (and with it the last queue handle) is gone; let queued
    // documents finish writing.
    tracing::info!("Waiting for pending document writes...");
    if let Err(e) = finalize_worker.await {
        tracing::error!("Finalize worker failed: {}", e);
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn merge(dir: &Path, output: &Path, format: ImageFormat, quality: u8) -> anyhow::Result<()> {
    let summary = merge_directory(dir, format.extension(), output, quality)
        .with_context(|| format!("Failed to merge {}", dir.display()))?;
    tracing::info!(
        pages = summary.pages,
        outline_entries = summary.outline_entries,
        "Wrote {}",
        output.display()
    );
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
