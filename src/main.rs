//! Model Tracker - Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use model_tracker::{
    CatalogStore, Enricher, ExtractionClient, Hub, HuggingFaceHub, ModelScopeHub,
    RefreshController, RefreshScheduler, Scraper, api, config::TrackerConfig, metrics,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(name = "model-tracker")]
#[command(about = "GGUF-aware model catalog for Hugging Face and ModelScope", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override API port
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (json or pretty)
    #[arg(long, default_value = "json")]
    log_format: String,

    /// Run a single scrape pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    match cli.log_format.as_str() {
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .json()
                .init();
        }
    }

    tracing::info!("Starting Model Tracker");

    // Load configuration
    let mut config = TrackerConfig::load(cli.config)?;

    // CLI overrides
    if let Some(port) = cli.port {
        config.api_port = port;
    }

    config.validate()?;

    tracing::info!(
        api_port = config.api_port,
        catalog_file = ?config.catalog_file,
        scrape_interval_hours = config.scrape_interval_hours,
        gguf_parser = ?config.parser.tool_path,
        "Configuration loaded"
    );

    // Setup metrics
    let prometheus_handle = metrics::setup_metrics()?;

    // Restore catalog
    let store = Arc::new(CatalogStore::new(config.catalog_file.clone()));
    store.load().await?;

    // Build the scrape pipeline
    let mut hubs: Vec<Arc<dyn Hub>> = Vec::new();
    if config.sources.huggingface {
        hubs.push(Arc::new(
            HuggingFaceHub::new(config.http_timeout()).context("Failed to build Hugging Face client")?,
        ));
    }
    if config.sources.modelscope {
        hubs.push(Arc::new(
            ModelScopeHub::new(config.http_timeout()).context("Failed to build ModelScope client")?,
        ));
    }

    let client = Arc::new(ExtractionClient::new(config.parser.clone()));
    let enricher = Arc::new(Enricher::new(client));
    let scraper = Arc::new(Scraper::new(
        config.clone(),
        hubs,
        enricher,
        store.clone(),
    ));
    let refresh = Arc::new(RefreshController::new(scraper));

    if cli.once {
        let report = refresh.run_now().await?;
        tracing::info!(
            total = report.total_models,
            inserted = report.inserted,
            updated = report.updated,
            "Single scrape pass finished"
        );
        return Ok(());
    }

    // Populate an empty catalog right away
    if store.count().await == 0 {
        tracing::info!("Catalog is empty, starting initial scrape");
        refresh.trigger().await?;
    }

    // Start refresh scheduler
    let scheduler_handle = RefreshScheduler::new(refresh.clone(), config.scrape_interval_hours)
        .map(|scheduler| tokio::spawn(scheduler.run()));
    if scheduler_handle.is_none() {
        tracing::info!("Scheduled refresh disabled");
    }

    // Setup API
    let app_state = api::AppState {
        store: store.clone(),
        refresh: refresh.clone(),
        prometheus_handle,
    };

    let app = api::create_router(app_state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.api_port));
    tracing::info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind API server")?;

    // Graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    tracing::info!("Shutting down...");

    if let Some(handle) = scheduler_handle {
        handle.abort();
    }

    if refresh.is_running() {
        tracing::warn!("Refresh still running at shutdown, its results will be discarded");
    }

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
