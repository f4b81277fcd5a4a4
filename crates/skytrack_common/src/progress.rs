//! Windowed progress: how much each metric moved between the last snapshot
//! before a window opened and the most recent snapshot overall.
//!
//! The baseline is the last snapshot taken strictly *before* the window
//! boundary, not the first one inside the window. Sparse or missing data
//! never errors; every "no data" condition yields an empty result.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveTime, TimeZone};
use rusqlite::types::Value as SqlValue;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::Result;
use crate::store::{SeriesTable, SnapshotStore};

/// Relative time range token from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Today,
    Days7,
    Days30,
    All,
}

impl Window {
    /// Unrecognized tokens fall back to the full history.
    pub fn parse(token: &str) -> Self {
        match token {
            "today" => Window::Today,
            "7d" => Window::Days7,
            "30d" => Window::Days30,
            _ => Window::All,
        }
    }

    /// Absolute boundary timestamp (unix seconds) for this window.
    pub fn start_boundary(&self, now: DateTime<Local>) -> i64 {
        match self {
            Window::Today => {
                let midnight = now.date_naive().and_time(NaiveTime::MIN);
                match Local.from_local_datetime(&midnight) {
                    LocalResult::Single(dt) => dt.timestamp(),
                    LocalResult::Ambiguous(dt, _) => dt.timestamp(),
                    // Midnight swallowed by a DST gap; an empty window beats
                    // a wrong baseline.
                    LocalResult::None => now.timestamp(),
                }
            }
            Window::Days7 => (now - Duration::days(7)).timestamp(),
            Window::Days30 => (now - Duration::days(30)).timestamp(),
            Window::All => 0,
        }
    }
}

/// One metric that moved inside the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEntry {
    pub name: String,
    pub progress: i64,
    pub end_value: i64,
}

/// Integer coercion for stored values: NULL counts as zero, text must parse,
/// anything else is unusable and skips the row.
fn coerce_int(value: &SqlValue) -> Option<i64> {
    match value {
        SqlValue::Integer(i) => Some(*i),
        SqlValue::Real(f) => Some(*f as i64),
        SqlValue::Text(s) => s.trim().parse::<i64>().ok(),
        SqlValue::Null => Some(0),
        SqlValue::Blob(_) => None,
    }
}

/// Compute per-item progress over a window against the snapshot store.
///
/// Requires two distinct bracketing snapshots: the baseline (last snapshot
/// strictly before the window boundary) and the latest snapshot overall.
/// Items absent from the baseline count from zero; only strictly positive
/// deltas are reported, descending, ties broken by name.
pub fn compute_progress(
    store: &SnapshotStore,
    table: SeriesTable,
    window: Window,
    now: DateTime<Local>,
) -> Result<Vec<ProgressEntry>> {
    let Some(end_ts) = store.latest_timestamp(table)? else {
        return Ok(Vec::new());
    };
    let boundary = window.start_boundary(now);
    let Some(start_ts) = store.max_timestamp_before(table, boundary)? else {
        return Ok(Vec::new());
    };
    if start_ts == end_ts {
        return Ok(Vec::new());
    }

    let baseline: HashMap<String, SqlValue> =
        store.rows_at(table, start_ts)?.into_iter().collect();
    let current = store.rows_at(table, end_ts)?;

    let mut entries = Vec::new();
    for (id, value) in current {
        let Some(end_value) = coerce_int(&value) else {
            continue;
        };
        let start_value = match baseline.get(&id) {
            Some(v) => match coerce_int(v) {
                Some(start) => start,
                None => continue,
            },
            None => 0,
        };
        let progress = end_value - start_value;
        if progress > 0 {
            entries.push(ProgressEntry {
                name: id,
                progress,
                end_value,
            });
        }
    }

    entries.sort_by(|a, b| {
        b.progress
            .cmp(&a.progress)
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(entries)
}
