//! Reference background-work service.
//!
//! # Usage
//!
//! ```bash
//! SCHEDULER_NAME=scheduler SERVICE_NAME=snapshots INTERNAL_API_SECRET=... \
//!     cargo run -p taskhook-server -- --port 8080
//!
//! # Configure logging level
//! RUST_LOG=debug cargo run -p taskhook-server
//! ```
//!
//! # Environment Variables
//!
//! - `SCHEDULER_NAME`, `SERVICE_NAME`, `INTERNAL_API_SECRET` — see [`taskhook::config`]
//! - `SHUTDOWN_GRACE_PERIOD_MS` — Drain grace period (default: `5000`)
//! - `HOST` — Override bind address (default: `0.0.0.0`)
//! - `PORT` — Override port (default: `8080`)
//! - `RUST_LOG` — Log level filter (default: `info`)
//!
//! Variables may also be provided in a `.env` file.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use taskhook::ServiceConfig;
use taskhook::config::BindArgs;
use taskhook::lifecycle::{FinalizeError, ServeHandle, ShutdownCoordinator};
use tracing_subscriber::EnvFilter;

use taskhook_server::service_router;

#[tokio::main]
async fn main() {
    // Load .env first so RUST_LOG from the file applies
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    if let Err(e) = run().await {
        tracing::error!("Service failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = BindArgs::parse();
    let config = ServiceConfig::from_env()?;
    tracing::info!(
        scheduler = %config.scheduler_origin,
        service = %config.service_name,
        grace_period = ?config.grace_period,
        "Loaded configuration"
    );

    let state = Arc::new(config);
    let app = service_router(Arc::clone(&state));

    let addr = args.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let handle = ServeHandle::new();
    let token = handle.cancellation_token();
    handle.spawn(async move {
        let served = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(token.cancelled_owned())
        .await;
        if let Err(e) = served {
            tracing::error!(error = %e, "Server stopped with an error");
        }
    });

    let coordinator = ShutdownCoordinator::new(state.grace_period);
    coordinator.setup(handle, finalize)?;
    tracing::info!("Service listening on http://{addr}");

    // The coordinator exits the process; this only returns if it never does.
    let outcome = coordinator.terminated().await;
    tracing::info!(?outcome, "Service shut down");
    Ok(())
}

/// Runs once before exit, after the listener drained or the grace period ran out.
async fn finalize() -> Result<(), FinalizeError> {
    tracing::info!("Finalizing service");
    Ok(())
}
