pub mod handlers;
pub mod state;
pub mod target;

use crate::{config::Config, hls::PROXY_PATH};
use axum::{Router, routing::get};
use state::AppState;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

/// How long shutdown waits for in-flight relays after connections drain
const RELAY_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the router with every route and middleware, without binding a socket.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::health_check))
        .route(
            "/channel/{channel_id}/videos",
            get(handlers::channel::channel_videos),
        )
        .route(
            "/channel/{channel_id}/live",
            get(handlers::channel::channel_live),
        )
        .route(
            "/video/{video_id}/details",
            get(handlers::video::video_details),
        )
        .route(PROXY_PATH, get(handlers::proxy::proxy))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Axum HTTP server
pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);

    let state = AppState::new(config)?;
    let relays = state.relays.clone();
    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("Server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    relays.close();
    if tokio::time::timeout(RELAY_DRAIN_TIMEOUT, relays.wait())
        .await
        .is_err()
    {
        warn!(
            "{} relays still running after {:?}, exiting anyway",
            relays.len(),
            RELAY_DRAIN_TIMEOUT
        );
    }

    info!("Server stopped");
    Ok(())
}

/// Resolves on ctrl-c, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received, draining connections");
}
