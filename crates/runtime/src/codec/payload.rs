//! On-disk payload shapes, one per blob version, and the migration chain.
//!
//! Older payloads are only ever read. Each step converts version `n` into
//! version `n + 1`; fields a version did not have take their defaults.

use std::collections::{BTreeMap, BTreeSet};

use beacon_core::{EffectKind, EffectSet, MergePolicy, OwnerId};
use serde::{Deserialize, Serialize};

/// Version 1: a vanilla-style primary and optional secondary effect.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct PayloadV1 {
    pub primary: (String, u8),
    pub secondary: Option<(String, u8)>,
}

/// Version 2: a free effect list plus soulbound and exp-reduction levels.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct PayloadV2 {
    pub effects: Vec<(String, u16)>,
    pub soulbound_level: u16,
    pub soulbound_owner: Option<[u8; 16]>,
    pub exp_reduction_level: u16,
}

/// Version 3 (current).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct PayloadV3 {
    pub effects: Vec<(String, u32)>,
    pub disabled: Vec<String>,
    pub binding_level: u32,
    pub upkeep_reduction_level: u32,
    pub owner: Option<OwnerId>,
    pub custom_version: Option<String>,
}

impl From<PayloadV1> for PayloadV2 {
    /// A secondary of the same kind as the primary levels it up the way two
    /// equal bundles combine.
    fn from(v1: PayloadV1) -> Self {
        let (primary, primary_level) = v1.primary;
        let mut effects = vec![(primary, u16::from(primary_level))];
        if let Some((secondary, level)) = v1.secondary {
            let level = u16::from(level);
            match effects.iter_mut().find(|(name, _)| same_name(name, &secondary)) {
                Some((_, current)) => {
                    let merged = MergePolicy::Tiered.merge(u32::from(*current), u32::from(level));
                    *current = u16::try_from(merged).unwrap_or(u16::MAX);
                }
                None => effects.push((secondary, level)),
            }
        }
        Self {
            effects,
            soulbound_level: 0,
            soulbound_owner: None,
            exp_reduction_level: 0,
        }
    }
}

impl From<PayloadV2> for PayloadV3 {
    fn from(v2: PayloadV2) -> Self {
        Self {
            effects: v2
                .effects
                .into_iter()
                .map(|(name, level)| (name, u32::from(level)))
                .collect(),
            disabled: Vec::new(),
            binding_level: u32::from(v2.soulbound_level),
            upkeep_reduction_level: u32::from(v2.exp_reduction_level),
            owner: v2.soulbound_owner.map(OwnerId::from_bytes),
            custom_version: None,
        }
    }
}

impl PayloadV3 {
    pub fn from_effect_set(set: &EffectSet) -> Self {
        Self {
            effects: set
                .effects
                .iter()
                .map(|(kind, level)| (kind.key().to_string(), *level))
                .collect(),
            disabled: set
                .disabled_effects
                .iter()
                .map(|kind| kind.key().to_string())
                .collect(),
            binding_level: set.binding_level,
            upkeep_reduction_level: set.upkeep_reduction_level,
            owner: set.owner,
            custom_version: set.custom_version.clone(),
        }
    }

    /// Resolves effect names. Names no longer known to the host are dropped.
    pub fn into_effect_set(self, schema_version: u8) -> EffectSet {
        let mut effects = BTreeMap::new();
        for (name, level) in self.effects {
            match EffectKind::parse(&name) {
                Ok(kind) if level > 0 => {
                    let entry = effects.entry(kind).or_insert(level);
                    *entry = (*entry).max(level);
                }
                Ok(_) => {}
                Err(_) => tracing::warn!("Dropping unknown effect '{}' from stored bundle", name),
            }
        }

        let disabled: BTreeSet<EffectKind> = self
            .disabled
            .iter()
            .filter_map(|name| EffectKind::parse(name).ok())
            .collect();

        EffectSet {
            effects,
            binding_level: self.binding_level,
            upkeep_reduction_level: self.upkeep_reduction_level,
            owner: self.owner,
            disabled_effects: disabled,
            custom_version: self.custom_version,
            schema_version,
        }
    }
}

fn same_name(a: &str, b: &str) -> bool {
    match (EffectKind::parse(a), EffectKind::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.eq_ignore_ascii_case(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_same_kind_levels_up() {
        let v2 = PayloadV2::from(PayloadV1 {
            primary: ("speed".into(), 1),
            secondary: Some(("SPEED".into(), 1)),
        });
        assert_eq!(v2.effects, vec![("speed".to_string(), 2)]);

        let v2 = PayloadV2::from(PayloadV1 {
            primary: ("speed".into(), 1),
            secondary: Some(("speed".into(), 2)),
        });
        assert_eq!(v2.effects, vec![("speed".to_string(), 2)]);
    }

    #[test]
    fn v1_distinct_kinds_are_kept() {
        let v2 = PayloadV2::from(PayloadV1 {
            primary: ("increase_damage".into(), 2),
            secondary: Some(("regeneration".into(), 1)),
        });
        let set = PayloadV3::from(v2).into_effect_set(1);
        assert_eq!(set.get(EffectKind::Strength), Some(2));
        assert_eq!(set.get(EffectKind::Regeneration), Some(1));
    }

    #[test]
    fn unknown_names_are_dropped() {
        let payload = PayloadV3 {
            effects: vec![("speed".into(), 1), ("teleportitis".into(), 3)],
            disabled: vec!["speed".into(), "teleportitis".into()],
            binding_level: 0,
            upkeep_reduction_level: 0,
            owner: None,
            custom_version: None,
        };
        let set = payload.into_effect_set(3);
        assert_eq!(set.len(), 1);
        assert!(set.disabled_effects.contains(&EffectKind::Speed));
        assert_eq!(set.disabled_effects.len(), 1);
    }

    #[test]
    fn v2_aliases_collapse_to_the_higher_level() {
        let v3 = PayloadV3::from(PayloadV2 {
            effects: vec![("fast_digging".into(), 1), ("haste".into(), 3)],
            soulbound_level: 1,
            soulbound_owner: Some([7; 16]),
            exp_reduction_level: 2,
        });
        let set = v3.into_effect_set(2);
        assert_eq!(set.get(EffectKind::Haste), Some(3));
        assert_eq!(set.binding_level, 1);
        assert_eq!(set.upkeep_reduction_level, 2);
        assert_eq!(set.owner, Some(OwnerId::from_bytes([7; 16])));
    }
}
