//! Level resolution: cumulative counter -> discrete level/tier.
//!
//! A level is the count of breakpoints at or below the value, capped at the
//! table length. Level 0 means "below the first breakpoint". The resolver is
//! pure and total; callers reject non-finite values before they get here.

use crate::error::{Result, TrackerError};
use crate::thresholds::ThresholdRegistry;

/// Resolve a cumulative value against an ordered breakpoint table.
///
/// Empty table -> 0. Reaching a breakpoint exactly counts as reaching the
/// level. Values past the last breakpoint cap at the table length; negative
/// values resolve to 0.
pub fn resolve_level(value: f64, thresholds: &[u64]) -> u32 {
    let Some(&last) = thresholds.last() else {
        return 0;
    };
    if value >= last as f64 {
        return thresholds.len() as u32;
    }
    let mut level = 0;
    for (i, &threshold) in thresholds.iter().enumerate() {
        if value >= threshold as f64 {
            level = (i + 1) as u32;
        } else {
            break;
        }
    }
    level
}

/// Reject non-finite cumulative values before they reach the resolver.
pub fn ensure_finite(metric: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TrackerError::InvalidMetricValue {
            metric: metric.to_string(),
        })
    }
}

/// Skill level from total XP. Skills without a dedicated curve use the
/// standard table.
pub fn skill_level(registry: &ThresholdRegistry, skill: &str, xp: f64) -> Result<u32> {
    let xp = ensure_finite(skill, xp)?;
    Ok(resolve_level(xp, registry.skill_table(skill)))
}

/// Collection tier from amount collected. Unknown collections resolve to
/// tier 0, silently.
pub fn collection_tier(registry: &ThresholdRegistry, collection: &str, amount: i64) -> u32 {
    match registry.collection_table(collection) {
        Some(table) => resolve_level(amount as f64, table),
        None => 0,
    }
}
