//! Beacon - self-hosted web analytics collector
//!
//! Event ingestion and aggregation engine:
//! - Forgiving tracker ingestion with payload normalization
//! - Append-only day-segment event log with write-time rollups
//! - Windowed aggregate queries for the dashboard
//! - Background workers for rollup flushing, reconciliation, and retention

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};

use api::{router, ApiConfig, AppState};
use eventstore::{EventStore, StoreConfig};
use telemetry::{health, init_tracing_from_env};
use worker::{WorkerConfig, WorkerScheduler};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Days of raw segments to keep; unset keeps everything
    #[serde(default)]
    retention_days: Option<u32>,

    #[serde(default)]
    store: StoreConfig,

    #[serde(default)]
    api: ApiConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            retention_days: None,
            store: StoreConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing_from_env();

    info!("Starting Beacon analytics collector v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config()?;

    // Open the event store (recovers segments and rollups)
    let store = match EventStore::open(config.store.clone()) {
        Ok(store) => {
            health().store.set_healthy();
            store
        }
        Err(e) => {
            health().store.set_unhealthy(e.to_string());
            return Err(e).context("Failed to open event store");
        }
    };

    // Start background workers
    let worker_scheduler = Arc::new(WorkerScheduler::new(
        WorkerConfig {
            retention_days: config.retention_days,
            ..WorkerConfig::default()
        },
        store.clone(),
    ));
    let _worker_handles = worker_scheduler.start();

    // Create application state
    let state = AppState::with_config(store.clone(), config.api.clone());

    // Create router
    let app = router(state);

    // Start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Cleanup
    info!("Shutting down...");

    // Persist pending rollup updates
    let flush_store = store.clone();
    let flush = tokio::task::spawn_blocking(move || flush_store.flush());
    match tokio::time::timeout(Duration::from_secs(5), flush).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!("Failed to flush rollup index: {}", e),
        Ok(Err(e)) => error!("Flush task panicked: {}", e),
        Err(_) => error!("Flush timed out"),
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("BEACON")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Manual overrides for nested store config from environment
    // The config crate's nested parsing doesn't work reliably with underscored field names
    if let Ok(data_dir) = std::env::var("BEACON_STORE_DATA_DIR") {
        config.store.data_dir = data_dir.into();
    }
    if let Ok(fsync) = std::env::var("BEACON_STORE_FSYNC") {
        config.store.fsync = fsync == "1" || fsync.to_lowercase() == "true";
    }

    if let Ok(days) = std::env::var("BEACON_RETENTION_DAYS") {
        config.retention_days = days.parse().ok();
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
