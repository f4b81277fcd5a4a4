//! API routes for skytrackd
//!
//! Read endpoints are best-effort dashboard queries: missing data comes back
//! as empty results, never as errors. Only the store itself failing maps to
//! a 500.

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use skytrack_common::{
    aggregate_all, compute_progress, profile_series_since, series_since, FamilyLevels,
    ProfileSeries, ProfileStats, ProgressEntry, SeriesPoint, SeriesTable, Window,
};

use crate::collector;
use crate::server::AppState;

type AppStateArc = Arc<AppState>;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    range: Option<String>,
}

impl RangeQuery {
    fn window_or(&self, default: &str) -> Window {
        Window::parse(self.range.as_deref().unwrap_or(default))
    }
}

fn internal_error(err: impl std::fmt::Display) -> (StatusCode, String) {
    error!("query failed: {}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

// ============================================================================
// Collection Trigger
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub message: String,
}

pub fn collect_routes() -> Router<AppStateArc> {
    Router::new().route("/api/trigger_collect", post(trigger_collect))
}

/// Fire-and-forget collection run. There is no feedback channel; the
/// dashboard polls /api/latest_snapshot_timestamp to detect completion.
async fn trigger_collect(
    State(state): State<AppStateArc>,
) -> Result<(StatusCode, Json<TriggerResponse>), (StatusCode, String)> {
    if state
        .collect_in_flight
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err((
            StatusCode::CONFLICT,
            "A collection run is already in progress".to_string(),
        ));
    }

    info!("Collection run triggered");
    let task_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = collector::run_collection(task_state.clone()).await {
            error!("Collection run failed: {:#}", e);
        }
        task_state.collect_in_flight.store(false, Ordering::SeqCst);
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            message: "Data collection started.".to_string(),
        }),
    ))
}

// ============================================================================
// Snapshot Routes
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LatestTimestampResponse {
    pub latest_timestamp: Option<i64>,
}

pub fn snapshot_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/latest_snapshot_timestamp", get(latest_snapshot_timestamp))
        .route("/api/profile_stats/:timestamp", get(profile_stats))
}

async fn latest_snapshot_timestamp(
    State(state): State<AppStateArc>,
) -> Result<Json<LatestTimestampResponse>, (StatusCode, String)> {
    let store = state.store.lock().await;
    let latest_timestamp = store.latest_profile_timestamp().map_err(internal_error)?;
    Ok(Json(LatestTimestampResponse { latest_timestamp }))
}

async fn profile_stats(
    State(state): State<AppStateArc>,
    Path(timestamp): Path<i64>,
) -> Result<Json<ProfileStats>, (StatusCode, String)> {
    let store = state.store.lock().await;
    let stats = store.profile_stats_at(timestamp).map_err(internal_error)?;
    stats
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Stats not found".to_string()))
}

// ============================================================================
// History Routes
// ============================================================================

pub fn history_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/history/skills", get(history_skills))
        .route("/api/history/collections", get(history_collections))
        .route("/api/history/bestiary", get(history_bestiary))
        .route("/api/history/profile_stats", get(history_profile_stats))
}

async fn history_for(
    state: &AppState,
    table: SeriesTable,
    query: &RangeQuery,
) -> Result<BTreeMap<String, Vec<SeriesPoint>>, (StatusCode, String)> {
    let window = query.window_or("7d");
    let store = state.store.lock().await;
    series_since(&store, table, window, Local::now()).map_err(internal_error)
}

async fn history_skills(
    State(state): State<AppStateArc>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<BTreeMap<String, Vec<SeriesPoint>>>, (StatusCode, String)> {
    history_for(&state, SeriesTable::Skills, &query).await.map(Json)
}

async fn history_collections(
    State(state): State<AppStateArc>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<BTreeMap<String, Vec<SeriesPoint>>>, (StatusCode, String)> {
    history_for(&state, SeriesTable::Collections, &query)
        .await
        .map(Json)
}

async fn history_bestiary(
    State(state): State<AppStateArc>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<BTreeMap<String, Vec<SeriesPoint>>>, (StatusCode, String)> {
    history_for(&state, SeriesTable::Bestiary, &query)
        .await
        .map(Json)
}

async fn history_profile_stats(
    State(state): State<AppStateArc>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ProfileSeries>, (StatusCode, String)> {
    let window = query.window_or("7d");
    let store = state.store.lock().await;
    profile_series_since(&store, window, Local::now())
        .map(Json)
        .map_err(internal_error)
}

// ============================================================================
// Progress Diff Routes
// ============================================================================

pub fn diff_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/diff/collections", get(diff_collections))
        .route("/api/diff/bestiary", get(diff_bestiary))
}

async fn diff_for(
    state: &AppState,
    table: SeriesTable,
    query: &RangeQuery,
) -> Result<Vec<ProgressEntry>, (StatusCode, String)> {
    let window = query.window_or("today");
    let store = state.store.lock().await;
    compute_progress(&store, table, window, Local::now()).map_err(internal_error)
}

async fn diff_collections(
    State(state): State<AppStateArc>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<ProgressEntry>>, (StatusCode, String)> {
    diff_for(&state, SeriesTable::Collections, &query)
        .await
        .map(Json)
}

async fn diff_bestiary(
    State(state): State<AppStateArc>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<ProgressEntry>>, (StatusCode, String)> {
    diff_for(&state, SeriesTable::Bestiary, &query).await.map(Json)
}

// ============================================================================
// Bestiary Routes
// ============================================================================

pub fn bestiary_routes() -> Router<AppStateArc> {
    Router::new().route("/api/bestiary/levels", get(bestiary_levels))
}

/// Family and subgroup levels from the latest snapshot.
async fn bestiary_levels(
    State(state): State<AppStateArc>,
) -> Result<Json<Vec<FamilyLevels>>, (StatusCode, String)> {
    let store = state.store.lock().await;
    let Some(latest) = store
        .latest_timestamp(SeriesTable::Bestiary)
        .map_err(internal_error)?
    else {
        return Ok(Json(Vec::new()));
    };
    let kills = store.kills_at(latest).map_err(internal_error)?;
    Ok(Json(aggregate_all(&state.registry, &kills)))
}

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub latest_snapshot: Option<i64>,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/api/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    let latest_snapshot = {
        let store = state.store.lock().await;
        store.latest_profile_timestamp().unwrap_or(None)
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        latest_snapshot,
    })
}
