//! HTTP server for skytrackd

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::Router;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use skytrack_common::{SnapshotStore, ThresholdRegistry, TrackerConfig};

use crate::routes;

/// Application state shared across handlers.
pub struct AppState {
    /// rusqlite connections are not Sync, so read handlers share one behind
    /// a mutex. The collector writes on its own connection.
    pub store: Mutex<SnapshotStore>,
    pub registry: ThresholdRegistry,
    pub config: TrackerConfig,
    pub start_time: Instant,
    /// Single-writer rule: only one collection run at a time.
    pub collect_in_flight: AtomicBool,
}

impl AppState {
    pub fn new(store: SnapshotStore, registry: ThresholdRegistry, config: TrackerConfig) -> Self {
        Self {
            store: Mutex::new(store),
            registry,
            config,
            start_time: Instant::now(),
            collect_in_flight: AtomicBool::new(false),
        }
    }
}

/// Run the HTTP server
pub async fn run(state: AppState) -> Result<()> {
    let addr = state.config.server.listen_addr.clone();
    let state = Arc::new(state);

    let app = Router::new()
        .merge(routes::collect_routes())
        .merge(routes::snapshot_routes())
        .merge(routes::history_routes())
        .merge(routes::diff_routes())
        .merge(routes::bestiary_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // The dashboard frontend is served from a different origin.
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
