//! Hypixel API collector.
//!
//! One collection run: fetch the profile document, stamp a single timestamp,
//! parse into a snapshot batch, append atomically. The daemon enforces the
//! single-writer rule with the in-flight flag on [`AppState`]; the write path
//! uses its own connection so dashboard reads stay live under WAL.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use tracing::info;

use skytrack_common::{parse_profile, SnapshotStore};

use crate::server::AppState;

const HYPIXEL_API_BASE: &str = "https://api.hypixel.net/v2";

/// Thin client for the SkyBlock profile endpoint.
pub struct HypixelClient {
    api_key: String,
    base_url: String,
}

impl HypixelClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: HYPIXEL_API_BASE.to_string(),
        }
    }

    /// Fetch the profile document, unwrapped from the API envelope.
    pub async fn fetch_profile(&self, profile_id: &str) -> Result<Value> {
        let url = format!("{}/skyblock/profile?profile={}", self.base_url, profile_id);

        let client = reqwest::Client::new();
        let response = client
            .get(&url)
            .header("API-Key", &self.api_key)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .context("Failed to fetch profile from Hypixel")?;

        if !response.status().is_success() {
            anyhow::bail!("Hypixel API returned error: {}", response.status());
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse Hypixel API response")?;

        if !body.get("success").and_then(Value::as_bool).unwrap_or(false) {
            anyhow::bail!("Hypixel API reported failure");
        }

        body.get("profile")
            .cloned()
            .context("Profile missing from Hypixel API response")
    }
}

/// Run one collection pass against the configured profile.
pub async fn run_collection(state: Arc<AppState>) -> Result<()> {
    let api_key = state
        .config
        .api_key()
        .context("No Hypixel API key configured (HYPIXEL_API_KEY or config file)")?;
    let profile_id = state.config.hypixel.profile_id.clone();
    if profile_id.is_empty() {
        anyhow::bail!("No profile_id configured");
    }

    info!("Fetching profile {}", profile_id);
    let client = HypixelClient::new(api_key);
    let doc = client.fetch_profile(&profile_id).await?;

    let timestamp = Utc::now().timestamp();
    let batch = parse_profile(
        &doc,
        &state.config.hypixel.player_uuid,
        timestamp,
        &state.registry,
    )?;

    let store = SnapshotStore::open_at(&state.config.database.path)?;
    store.insert_batch(&batch)?;

    info!(
        "Snapshot {} appended: {} skills, {} collections, {} bestiary entries, {} slayers, {} bank transactions",
        timestamp,
        batch.skills.len(),
        batch.collections.len(),
        batch.bestiary.len(),
        batch.slayers.len(),
        batch.transactions.len(),
    );
    Ok(())
}
