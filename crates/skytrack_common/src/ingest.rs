//! Parsing of a fetched Hypixel SkyBlock profile document into a snapshot
//! batch ready for the store.
//!
//! One batch = one ingestion run = one shared timestamp across every row.
//! Levels and tiers are annotated here, at write time, so read paths never
//! recompute them.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::levels::{collection_tier, ensure_finite, skill_level};
use crate::thresholds::{MetricCategory, ThresholdRegistry};

/// Member-level counters shown on the dashboard header.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSummary {
    pub cute_name: Option<String>,
    pub purse: f64,
    pub death_count: i64,
    pub kills: i64,
    pub bank_balance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillRow {
    pub name: String,
    pub total_xp: f64,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRow {
    pub name: String,
    pub amount: i64,
    pub tier: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlayerRow {
    pub name: String,
    pub total_xp: i64,
    /// boss kills for tiers 1-5
    pub tier_kills: [i64; 5],
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestiaryRow {
    pub mob_id: String,
    pub kills: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BankTransaction {
    pub timestamp: i64,
    pub action: String,
    pub amount: f64,
    pub initiator_name: String,
}

/// Everything one ingestion run appends, stamped with a single timestamp.
#[derive(Debug, Clone)]
pub struct SnapshotBatch {
    pub profile_id: String,
    pub member_uuid: String,
    pub timestamp: i64,
    /// Absent when the configured member is not in the profile document.
    pub summary: Option<ProfileSummary>,
    pub skills: Vec<SkillRow>,
    pub collections: Vec<CollectionRow>,
    pub slayers: Vec<SlayerRow>,
    pub bestiary: Vec<BestiaryRow>,
    pub transactions: Vec<BankTransaction>,
}

/// Parse a profile document for one member into a snapshot batch.
///
/// Member-scoped sections are skipped entirely when the member is absent;
/// bank transactions are profile-level and always parsed.
pub fn parse_profile(
    doc: &Value,
    member_uuid: &str,
    timestamp: i64,
    registry: &ThresholdRegistry,
) -> Result<SnapshotBatch> {
    let profile_id = doc
        .get("profile_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut batch = SnapshotBatch {
        profile_id,
        member_uuid: member_uuid.to_string(),
        timestamp,
        summary: None,
        skills: Vec::new(),
        collections: Vec::new(),
        slayers: Vec::new(),
        bestiary: Vec::new(),
        transactions: Vec::new(),
    };

    let bank_balance = doc
        .pointer("/banking/balance")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    if let Some(transactions) = doc.pointer("/banking/transactions").and_then(Value::as_array) {
        for tx in transactions {
            batch.transactions.push(BankTransaction {
                timestamp: tx.get("timestamp").and_then(Value::as_i64).unwrap_or(0),
                action: tx
                    .get("action")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                amount: tx.get("amount").and_then(Value::as_f64).unwrap_or(0.0),
                initiator_name: tx
                    .get("initiator_name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
    }

    let Some(member) = doc.pointer(&format!("/members/{}", member_uuid)) else {
        debug!("member {} not present in profile document", member_uuid);
        return Ok(batch);
    };

    let player_data = member.get("player_data").cloned().unwrap_or(Value::Null);

    // The kills counter is a flat number on old profiles and a per-cause map
    // on current ones; the map is summed.
    let raw_kills = member.pointer("/player_stats/kills").cloned().unwrap_or(Value::Null);
    let kills = match &raw_kills {
        Value::Object(map) => map.values().filter_map(Value::as_f64).sum::<f64>() as i64,
        other => other.as_f64().unwrap_or(0.0) as i64,
    };

    batch.summary = Some(ProfileSummary {
        cute_name: doc
            .get("cute_name")
            .and_then(Value::as_str)
            .map(str::to_string),
        purse: member
            .pointer("/currencies/coin_purse")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
        death_count: player_data
            .get("death_count")
            .and_then(Value::as_i64)
            .unwrap_or(0),
        kills,
        bank_balance,
    });

    if let Some(experience) = player_data.get("experience").and_then(Value::as_object) {
        for (raw_name, xp) in experience {
            let name = MetricCategory::Skill.canonical_name(raw_name);
            let total_xp = ensure_finite(&name, xp.as_f64().unwrap_or(0.0))?;
            let level = skill_level(registry, &name, total_xp)?;
            batch.skills.push(SkillRow {
                name,
                total_xp,
                level,
            });
        }
    }

    if let Some(slayers) = member.pointer("/slayer/slayer_bosses").and_then(Value::as_object) {
        for (name, data) in slayers {
            if data.get("xp").is_none() {
                continue;
            }
            let mut tier_kills = [0i64; 5];
            for (tier, slot) in tier_kills.iter_mut().enumerate() {
                *slot = data
                    .get(format!("boss_kills_tier_{}", tier))
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
            }
            batch.slayers.push(SlayerRow {
                name: name.clone(),
                total_xp: data.get("xp").and_then(Value::as_i64).unwrap_or(0),
                tier_kills,
            });
        }
    }

    if let Some(collections) = member.get("collection").and_then(Value::as_object) {
        for (raw_name, amount) in collections {
            let name = MetricCategory::Collection.canonical_name(raw_name);
            let amount = ensure_finite(&name, amount.as_f64().unwrap_or(0.0))? as i64;
            let tier = collection_tier(registry, &name, amount);
            batch.collections.push(CollectionRow { name, amount, tier });
        }
    }

    if let Some(mob_kills) = member.pointer("/bestiary/kills").and_then(Value::as_object) {
        for (mob_id, count) in mob_kills {
            batch.bestiary.push(BestiaryRow {
                mob_id: mob_id.clone(),
                kills: count.as_i64().unwrap_or(0),
            });
        }
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> Value {
        json!({
            "profile_id": "46cd9591-5632-4f66-8005-c96d432ddb56",
            "cute_name": "Papaya",
            "banking": {
                "balance": 1_250_000.5,
                "transactions": [
                    {"timestamp": 1700000000, "action": "DEPOSIT", "amount": 50000.0, "initiator_name": "Player1"},
                    {"timestamp": 1700000100, "action": "WITHDRAW", "amount": 10000.0, "initiator_name": "Player1"}
                ]
            },
            "members": {
                "46cd959156324f668005c96d432ddb56": {
                    "player_data": {
                        "death_count": 42,
                        "experience": {
                            "SKILL_FARMING": 175.0,
                            "SKILL_RUNECRAFTING": 50.0
                        }
                    },
                    "player_stats": {
                        "kills": {"zombie": 10.0, "skeleton": 5.0}
                    },
                    "currencies": {"coin_purse": 9_999.25},
                    "slayer": {
                        "slayer_bosses": {
                            "zombie": {
                                "xp": 1500,
                                "boss_kills_tier_0": 20,
                                "boss_kills_tier_1": 7
                            },
                            "unstarted": {}
                        }
                    },
                    "collection": {
                        "wheat": 250,
                        "LOG:2": 75
                    },
                    "bestiary": {
                        "kills": {
                            "zealot_bruiser": 120,
                            "enderman_50": 30
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn parses_a_full_profile_document() {
        let registry = ThresholdRegistry::builtin().unwrap();
        let batch = parse_profile(
            &fixture(),
            "46cd959156324f668005c96d432ddb56",
            1700003600,
            &registry,
        )
        .unwrap();

        assert_eq!(batch.profile_id, "46cd9591-5632-4f66-8005-c96d432ddb56");
        assert_eq!(batch.timestamp, 1700003600);

        let summary = batch.summary.unwrap();
        assert_eq!(summary.cute_name.as_deref(), Some("Papaya"));
        assert_eq!(summary.kills, 15); // per-cause map summed
        assert_eq!(summary.death_count, 42);
        assert!((summary.bank_balance - 1_250_000.5).abs() < 1e-9);

        // Skill names normalized, levels annotated at parse time.
        let farming = batch.skills.iter().find(|s| s.name == "farming").unwrap();
        assert_eq!(farming.level, 2);
        let rune = batch
            .skills
            .iter()
            .find(|s| s.name == "runecrafting")
            .unwrap();
        assert_eq!(rune.level, 1); // runecrafting curve, not standard

        // Collection names canonicalized to UPPERCASE, tiers annotated.
        let wheat = batch.collections.iter().find(|c| c.name == "WHEAT").unwrap();
        assert_eq!(wheat.amount, 250);
        assert_eq!(wheat.tier, 3);
        assert!(batch.collections.iter().any(|c| c.name == "LOG:2"));

        // Slayer entries without xp are skipped.
        assert_eq!(batch.slayers.len(), 1);
        assert_eq!(batch.slayers[0].tier_kills[0], 20);
        assert_eq!(batch.slayers[0].tier_kills[1], 7);

        assert_eq!(batch.bestiary.len(), 2);
        assert_eq!(batch.transactions.len(), 2);
    }

    #[test]
    fn missing_member_still_keeps_bank_transactions() {
        let registry = ThresholdRegistry::builtin().unwrap();
        let batch = parse_profile(&fixture(), "someone-else", 1700003600, &registry).unwrap();
        assert!(batch.summary.is_none());
        assert!(batch.skills.is_empty());
        assert!(batch.collections.is_empty());
        assert_eq!(batch.transactions.len(), 2);
    }

    #[test]
    fn scalar_kill_counters_pass_through() {
        let registry = ThresholdRegistry::builtin().unwrap();
        let mut doc = fixture();
        doc["members"]["46cd959156324f668005c96d432ddb56"]["player_stats"]["kills"] =
            json!(321.0);
        let batch = parse_profile(
            &doc,
            "46cd959156324f668005c96d432ddb56",
            1700003600,
            &registry,
        )
        .unwrap();
        assert_eq!(batch.summary.unwrap().kills, 321);
    }
}
