//! HTTP backend for campsites, favourites and weekend forecasts.
//!
//! Routes are thin: validate the request, delegate to Supabase, Geoapify or
//! the forecast aggregator, and map the result to JSON.

use std::sync::Arc;

use anyhow::Context;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};

use campweather_core::Config;

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;

pub async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Initializing state...");
    let port = config.server.port;
    let state = AppState::from_config(config)?;

    if state.config.server.allow_test_cleanup {
        warn!("Test cleanup routes are enabled");
    }
    info!(alert_policy = %state.forecasts.alert_policy(), "Forecast aggregator ready");

    let app = router(Arc::clone(&state));

    let address = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => warn!("Failed to listen for Ctrl+C: {err}"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
