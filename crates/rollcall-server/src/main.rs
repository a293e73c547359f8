//! rollcall-server - HTTP ingestion server binary.

use std::net::SocketAddr;
use std::time::Duration;

use rollcall_core::config::RollcallConfig;
use rollcall_core::error::RollcallResult;
use rollcall_server::{create_server, create_state};
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How long in-flight sightings may run after the listener stops.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// File named by `ROLLCALL_CONFIG` (if any), then environment overrides.
fn load_config() -> RollcallResult<RollcallConfig> {
    let base = match std::env::var("ROLLCALL_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading configuration file");
            RollcallConfig::from_file(path)?
        }
        Err(_) => RollcallConfig::default(),
    };
    base.with_overrides(|key| std::env::var(key).ok())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("rollcall_server=debug".parse()?),
        )
        .init();

    let config = load_config()?;
    let state = create_state(&config)?;
    info!(
        store = state.info.store,
        notifier = state.info.notifier,
        rssi_threshold = config.pipeline.rssi_threshold,
        grace_minutes = config.pipeline.grace_period_minutes,
        "Pipeline ready"
    );

    let app = create_server(state.clone(), &config.server);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Starting rollcall-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, cancelling pending sightings...");
            shutdown.cancel();
        })
        .await?;

    state.tasks.close();
    if tokio::time::timeout(SHUTDOWN_GRACE, state.tasks.wait())
        .await
        .is_err()
    {
        warn!(
            pending = state.tasks.len(),
            "Sightings still running after shutdown grace period"
        );
    }

    info!("Server stopped cleanly");
    Ok(())
}
