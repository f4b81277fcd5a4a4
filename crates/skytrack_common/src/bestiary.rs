//! Bestiary aggregation: raw per-mob kill counters -> family/subgroup levels.
//!
//! Kill counters arrive keyed by mob id (`zealot_bruiser_100`, `enderman_50`).
//! A family groups them by id prefix. Subgroup prefixes may overlap on
//! purpose: "Enderman" matches `enderman` while the End's variant matches
//! `enderman_`, and an id matching both is counted in both subgroups. Family
//! totals use union semantics (each id counted once) and only gate whether the
//! family is reported at all.

use std::collections::HashMap;

use serde::Serialize;

use crate::levels::resolve_level;
use crate::thresholds::{FamilyDef, ThresholdRegistry};

/// One subgroup of a family, levelled against the family's bracket.
#[derive(Debug, Clone, Serialize)]
pub struct SubgroupLevel {
    pub name: String,
    pub kills: u64,
    pub level: u32,
}

/// Aggregated view of one bestiary family.
#[derive(Debug, Clone, Serialize)]
pub struct FamilyLevels {
    pub name: String,
    pub total_kills: u64,
    pub subgroups: Vec<SubgroupLevel>,
}

/// Aggregate one family from raw kill counters.
///
/// Returns `None` when no mob id under any of the family's prefixes has
/// kills, so empty families never show up in reports.
pub fn aggregate_family(
    registry: &ThresholdRegistry,
    family: &FamilyDef,
    kills: &HashMap<String, u64>,
) -> Option<FamilyLevels> {
    // Union gate: each mob id counted once toward the family total no matter
    // how many subgroup prefixes it matches.
    let total_kills: u64 = kills
        .iter()
        .filter(|(mob_id, _)| {
            family
                .subgroups
                .values()
                .flatten()
                .any(|prefix| mob_id.starts_with(prefix.as_str()))
        })
        .map(|(_, count)| count)
        .sum();

    if total_kills == 0 {
        return None;
    }

    let bracket = registry.bracket(family.bracket);
    let mut subgroups = Vec::new();
    for (display_name, prefixes) in &family.subgroups {
        let subgroup_kills: u64 = kills
            .iter()
            .filter(|(mob_id, _)| prefixes.iter().any(|p| mob_id.starts_with(p.as_str())))
            .map(|(_, count)| count)
            .sum();
        if subgroup_kills == 0 {
            continue;
        }
        subgroups.push(SubgroupLevel {
            name: display_name.clone(),
            kills: subgroup_kills,
            level: resolve_level(subgroup_kills as f64, bracket),
        });
    }

    Some(FamilyLevels {
        name: family.name.clone(),
        total_kills,
        subgroups,
    })
}

/// Aggregate every registered family with kills.
pub fn aggregate_all(
    registry: &ThresholdRegistry,
    kills: &HashMap<String, u64>,
) -> Vec<FamilyLevels> {
    registry
        .families()
        .iter()
        .filter_map(|family| aggregate_family(registry, family, kills))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::collections::HashMap;

    use crate::thresholds::{BestiaryBracket, ThresholdRegistry};

    fn test_family(bracket: BestiaryBracket) -> FamilyDef {
        let mut subgroups = BTreeMap::new();
        subgroups.insert("Enderman".to_string(), vec!["enderman".to_string()]);
        subgroups.insert("End Enderman".to_string(), vec!["enderman_".to_string()]);
        subgroups.insert("Zealot".to_string(), vec!["zealot".to_string()]);
        FamilyDef {
            name: "The End".to_string(),
            bracket,
            subgroups,
        }
    }

    fn kills(entries: &[(&str, u64)]) -> HashMap<String, u64> {
        entries
            .iter()
            .map(|(id, n)| (id.to_string(), *n))
            .collect()
    }

    #[test]
    fn overlapping_prefixes_count_in_both_subgroups() {
        let registry = ThresholdRegistry::builtin().unwrap();
        let family = test_family(BestiaryBracket::Regular);
        // "enderman_50" starts with both "enderman" and "enderman_".
        let kills = kills(&[("enderman_50", 30)]);

        let levels = aggregate_family(&registry, &family, &kills).unwrap();
        let enderman = levels
            .subgroups
            .iter()
            .find(|s| s.name == "Enderman")
            .unwrap();
        let end_enderman = levels
            .subgroups
            .iter()
            .find(|s| s.name == "End Enderman")
            .unwrap();
        assert_eq!(enderman.kills, 30);
        assert_eq!(end_enderman.kills, 30);
        // The family gate counts the id once.
        assert_eq!(levels.total_kills, 30);
    }

    #[test]
    fn family_without_kills_is_not_reported() {
        let registry = ThresholdRegistry::builtin().unwrap();
        let family = test_family(BestiaryBracket::Regular);
        let kills = kills(&[("unrelated_mob", 500)]);
        assert!(aggregate_family(&registry, &family, &kills).is_none());
    }

    #[test]
    fn subgroup_levels_use_the_family_bracket() {
        let registry = ThresholdRegistry::builtin().unwrap();
        let counts = kills(&[("zealot_bruiser", 100)]);

        let regular =
            aggregate_family(&registry, &test_family(BestiaryBracket::Regular), &counts).unwrap();
        let fishing =
            aggregate_family(&registry, &test_family(BestiaryBracket::Fishing), &counts).unwrap();

        // 100 kills sits at the fourth breakpoint of both brackets.
        assert_eq!(regular.subgroups[0].level, 4);
        assert_eq!(fishing.subgroups[0].level, 4);

        // Past the end of the fishing table the level caps at its length.
        let capped = kills(&[("zealot_bruiser", 50_000)]);
        let capped_fishing =
            aggregate_family(&registry, &test_family(BestiaryBracket::Fishing), &capped).unwrap();
        assert_eq!(capped_fishing.subgroups[0].level, 10);
    }

    #[test]
    fn zero_kill_subgroups_are_dropped() {
        let registry = ThresholdRegistry::builtin().unwrap();
        let family = test_family(BestiaryBracket::Regular);
        let kills = kills(&[("zealot", 5)]);
        let levels = aggregate_family(&registry, &family, &kills).unwrap();
        assert_eq!(levels.subgroups.len(), 1);
        assert_eq!(levels.subgroups[0].name, "Zealot");
        assert_eq!(levels.subgroups[0].level, 0); // below first breakpoint
    }
}
