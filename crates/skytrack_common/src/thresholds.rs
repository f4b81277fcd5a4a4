//! Breakpoint tables for skill levels, collection tiers and bestiary brackets.
//!
//! Everything lives in one immutable [`ThresholdRegistry`] built once at
//! startup and passed explicitly into the resolver and aggregator. Tables are
//! validated at construction (strictly increasing, never empty) so query paths
//! never have to.
//!
//! Skill curves and bestiary brackets are in-code constants; collection tier
//! tables and bestiary family definitions ship as embedded JSON data files.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// Cumulative XP required per skill level, shared by most skills.
pub const STANDARD_SKILL_XP: &[u64] = &[
    50, 175, 375, 675, 1175, 1925, 2925, 4425, 6425, 9925, 14925, 22425, 32425, 47425, 67425,
    97425, 147425, 222425, 322425, 522425, 822425, 1222425, 1722425, 2322425, 3022425, 3822425,
    4722425, 5722425, 6822425, 8022425, 9322425, 10722425, 12222425, 13822425, 15522425, 17322425,
    19222425, 21222425, 23322425, 25522425, 27822425, 30222425, 32722425, 35322425, 38072425,
    40972425, 44072425, 47472425, 51172425, 55172425, 59472425, 64072425, 68972425, 74172425,
    79672425, 85472425, 91572425, 97972425, 104672425, 111672425,
];

/// Runecrafting runs on its own shorter curve.
pub const RUNECRAFTING_XP: &[u64] = &[
    50, 200, 450, 850, 1450, 2300, 3450, 4950, 6850, 9250, 12250, 15900, 20900, 27400, 35900,
    46900, 61900, 81900, 106900, 136900, 176900, 226900, 286900, 356900, 446900,
];

/// Kill-count breakpoints for land bestiary families.
pub const BESTIARY_REGULAR: &[u64] = &[
    10, 25, 50, 100, 250, 500, 1000, 2500, 5000, 10000, 20000, 50000, 100000, 250000, 500000,
    1000000,
];

/// Fishing families cap out much earlier.
pub const BESTIARY_FISHING: &[u64] = &[10, 25, 50, 100, 250, 500, 1000, 2500, 5000, 10000];

const COLLECTIONS_JSON: &str = include_str!("../data/collections.json");
const FAMILIES_JSON: &str = include_str!("../data/bestiary_families.json");

/// Metric categories with distinct threshold and naming semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricCategory {
    Skill,
    Collection,
    BestiaryMob,
    BestiaryFamily,
}

impl MetricCategory {
    /// Canonical form of a metric name for storage and lookup.
    ///
    /// Skills arrive from the API as `SKILL_FARMING`; collections differ only
    /// in case between endpoints, so they are pinned to UPPERCASE on both the
    /// write and the read path. Mob ids are already canonical.
    pub fn canonical_name(&self, raw: &str) -> String {
        match self {
            MetricCategory::Skill => raw
                .strip_prefix("SKILL_")
                .unwrap_or(raw)
                .to_ascii_lowercase(),
            MetricCategory::Collection => raw.to_ascii_uppercase(),
            MetricCategory::BestiaryMob | MetricCategory::BestiaryFamily => raw.to_string(),
        }
    }
}

/// Which breakpoint table a bestiary family levels against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BestiaryBracket {
    Regular,
    Fishing,
}

/// A bestiary family: named subgroups, each a set of mob-id prefixes.
#[derive(Debug, Clone, Deserialize)]
pub struct FamilyDef {
    pub name: String,
    pub bracket: BestiaryBracket,
    /// display name -> mob-id prefixes counted for that subgroup
    pub subgroups: BTreeMap<String, Vec<String>>,
}

/// Immutable lookup structure for every breakpoint table the tracker uses.
pub struct ThresholdRegistry {
    skill_tables: HashMap<String, Vec<u64>>,
    collection_tables: HashMap<String, Vec<u64>>,
    regular_bracket: Vec<u64>,
    fishing_bracket: Vec<u64>,
    families: Vec<FamilyDef>,
}

impl ThresholdRegistry {
    /// Build the registry from the built-in tables and embedded data files.
    pub fn builtin() -> Result<Self> {
        let mut skill_tables = HashMap::new();
        skill_tables.insert("standard".to_string(), STANDARD_SKILL_XP.to_vec());
        skill_tables.insert("runecrafting".to_string(), RUNECRAFTING_XP.to_vec());

        let collection_tables: HashMap<String, Vec<u64>> = serde_json::from_str(COLLECTIONS_JSON)
            .map_err(|e| TrackerError::InvalidThresholdTable {
                name: "collections.json".to_string(),
                reason: e.to_string(),
            })?;

        let families: Vec<FamilyDef> =
            serde_json::from_str(FAMILIES_JSON).map_err(|e| TrackerError::InvalidThresholdTable {
                name: "bestiary_families.json".to_string(),
                reason: e.to_string(),
            })?;

        Self::from_parts(
            skill_tables,
            collection_tables,
            BESTIARY_REGULAR.to_vec(),
            BESTIARY_FISHING.to_vec(),
            families,
        )
    }

    /// Assemble a registry from explicit parts, validating every table.
    pub fn from_parts(
        skill_tables: HashMap<String, Vec<u64>>,
        collection_tables: HashMap<String, Vec<u64>>,
        regular_bracket: Vec<u64>,
        fishing_bracket: Vec<u64>,
        families: Vec<FamilyDef>,
    ) -> Result<Self> {
        for (name, table) in &skill_tables {
            validate_table(name, table)?;
        }
        if !skill_tables.contains_key("standard") {
            return Err(TrackerError::InvalidThresholdTable {
                name: "standard".to_string(),
                reason: "missing fallback skill table".to_string(),
            });
        }
        for (name, table) in &collection_tables {
            validate_table(name, table)?;
        }
        validate_table("bestiary/regular", &regular_bracket)?;
        validate_table("bestiary/fishing", &fishing_bracket)?;

        Ok(Self {
            skill_tables,
            collection_tables,
            regular_bracket,
            fishing_bracket,
            families,
        })
    }

    /// XP table for a skill; skills without a dedicated curve use `standard`.
    pub fn skill_table(&self, skill: &str) -> &[u64] {
        self.skill_tables
            .get(skill)
            .or_else(|| self.skill_tables.get("standard"))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tier table for a collection, looked up by canonical UPPERCASE name.
    /// Unknown collections are unleveled, not an error.
    pub fn collection_table(&self, collection: &str) -> Option<&[u64]> {
        let key = MetricCategory::Collection.canonical_name(collection);
        self.collection_tables.get(&key).map(Vec::as_slice)
    }

    /// Kill breakpoints for a bestiary bracket.
    pub fn bracket(&self, bracket: BestiaryBracket) -> &[u64] {
        match bracket {
            BestiaryBracket::Regular => &self.regular_bracket,
            BestiaryBracket::Fishing => &self.fishing_bracket,
        }
    }

    /// All bestiary family definitions.
    pub fn families(&self) -> &[FamilyDef] {
        &self.families
    }
}

/// Invariant: a usable table is non-empty and strictly increasing.
fn validate_table(name: &str, table: &[u64]) -> Result<()> {
    if table.is_empty() {
        return Err(TrackerError::InvalidThresholdTable {
            name: name.to_string(),
            reason: "table is empty".to_string(),
        });
    }
    for (i, pair) in table.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(TrackerError::InvalidThresholdTable {
                name: name.to_string(),
                reason: format!(
                    "breakpoints not strictly increasing at index {} ({} -> {})",
                    i + 1,
                    pair[0],
                    pair[1]
                ),
            });
        }
    }
    Ok(())
}
