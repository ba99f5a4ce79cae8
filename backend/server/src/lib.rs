//! Documentation of the SilverWall telemetry relay.
//!
//!
//!
//! # General Infrastructure
//! - Dashboard talks only to this relay, never to OpenF1 directly
//! - One background poller fetches live positions and fans them out over `/ws/telemetry`
//! - Track outlines come from a fallback chain: live OpenF1 → store → seeded
//! - Live outlines that pass the learning floor are upserted into the store
//!
//!
//!
//! # Degrading Gracefully
//!
//! **Goal**: the dashboard always has a circuit to draw, even when OpenF1 is down
//! or between sessions.
//!
//! - Upstream failures are logged and become "no data", never a 5xx
//! - The live feed reports `offline` instead of closing sockets
//! - Redis being unreachable at boot swaps in the in-memory store
//!
//!
//!
//! # Endpoints
//!
//! | route | what |
//! |---|---|
//! | `GET /` | banner |
//! | `GET /health` | liveness |
//! | `GET /api/status` | live session, or the circuit shown while waiting |
//! | `GET /api/track/current` | outline for the running session |
//! | `GET /api/track/{circuit}?use_openf1&session_key` | outline for one circuit |
//! | `GET /api/telemetry/live` | latest telemetry frame |
//! | `GET /ws/telemetry` | telemetry frames as they arrive |
//!
//!
//!
//! # Setup
//!
//! Run locally with debug logs.
//! ```sh
//! RUST_LOG=server=debug,track=debug cargo run -p server
//! ```
//!
//! Persist learned tracks.
//! ```sh
//! REDIS_URL=redis://127.0.0.1:6379 cargo run -p server
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    routing::get,
};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod cache;
pub mod config;
pub mod error;
pub mod live;
pub mod routes;
pub mod sources;
pub mod state;
pub mod utils;

use config::Config;
use live::{poll_telemetry, telemetry_ws_handler};
use routes::{
    current_track_handler, health_handler, live_frame_handler, root_handler, status_handler,
    track_handler,
};
use state::State;

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new(Config::load()).await?;

    tokio::spawn(poll_telemetry(state.clone()));

    info!("Starting server...");

    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

pub fn router(state: Arc<State>) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| warn!("Ignoring CORS origin {origin}: {e}"))
                .ok()
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/status", get(status_handler))
        .route("/api/track/current", get(current_track_handler))
        .route("/api/track/{circuit}", get(track_handler))
        .route("/api/telemetry/live", get(live_frame_handler))
        .route("/ws/telemetry", get(telemetry_ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
