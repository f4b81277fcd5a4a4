//! SkyTrack Daemon - SkyBlock progression tracker
//!
//! Snapshots a player's skills, collections, slayers, bestiary and currency
//! into an append-only SQLite store and serves history and progress-delta
//! queries for the dashboard.

mod collector;
mod routes;
mod server;

use anyhow::Result;
use tracing::{info, Level};

use skytrack_common::{SnapshotStore, ThresholdRegistry, TrackerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("SkyTrack daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let config = TrackerConfig::load()?;

    // Malformed threshold tables are the one fatal condition; fail here, not
    // at query time.
    let registry = ThresholdRegistry::builtin()?;

    let store = SnapshotStore::open_at(&config.database.path)?;
    info!("Database ready at {}", config.database.path.display());

    if config.hypixel.profile_id.is_empty() {
        info!("No profile_id configured; /api/trigger_collect will refuse to run");
    }

    let state = server::AppState::new(store, registry, config);
    server::run(state).await
}
