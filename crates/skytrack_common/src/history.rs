//! Chronological series for charting, read straight off the snapshot store.
//!
//! History windows are inclusive of the boundary (everything at or after it),
//! unlike progress baselines which sit strictly before it.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use rusqlite::types::Value as SqlValue;
use serde::Serialize;

use crate::error::Result;
use crate::progress::Window;
use crate::store::{SeriesTable, SnapshotStore};

/// One observation in a charted series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: i64,
    pub value: f64,
}

/// Profile-counter series derived from the profile snapshots.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileSeries {
    pub total_money: Vec<SeriesPoint>,
    pub kills: Vec<SeriesPoint>,
    pub deaths: Vec<SeriesPoint>,
}

fn numeric(value: &SqlValue) -> Option<f64> {
    match value {
        SqlValue::Integer(i) => Some(*i as f64),
        SqlValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// Per-id chronological series for every observation inside the window.
/// Non-numeric stored values are skipped.
pub fn series_since(
    store: &SnapshotStore,
    table: SeriesTable,
    window: Window,
    now: DateTime<Local>,
) -> Result<BTreeMap<String, Vec<SeriesPoint>>> {
    let boundary = window.start_boundary(now);
    let mut series: BTreeMap<String, Vec<SeriesPoint>> = BTreeMap::new();
    for row in store.rows_since(table, boundary)? {
        let Some(value) = numeric(&row.value) else {
            continue;
        };
        series.entry(row.id).or_default().push(SeriesPoint {
            timestamp: row.timestamp,
            value,
        });
    }
    Ok(series)
}

/// The three derived profile series the dashboard charts: total money
/// (purse + bank), kills and deaths.
pub fn profile_series_since(
    store: &SnapshotStore,
    window: Window,
    now: DateTime<Local>,
) -> Result<ProfileSeries> {
    let boundary = window.start_boundary(now);
    let mut series = ProfileSeries::default();
    for row in store.profile_rows_since(boundary)? {
        series.total_money.push(SeriesPoint {
            timestamp: row.timestamp,
            value: row.stats.purse + row.stats.bank_balance,
        });
        series.kills.push(SeriesPoint {
            timestamp: row.timestamp,
            value: row.stats.kills as f64,
        });
        series.deaths.push(SeriesPoint {
            timestamp: row.timestamp,
            value: row.stats.death_count as f64,
        });
    }
    Ok(series)
}
