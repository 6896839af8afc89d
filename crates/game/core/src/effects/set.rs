//! The persisted bundle of effect levels.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use super::filter::EffectFilter;
use super::kind::EffectKind;
use crate::config::{EffectTable, EngineConfig};

/// Stable identity of the actor a bundle is bound to.
pub type OwnerId = Uuid;

/// Schema version written by the current codec.
pub const CURRENT_SCHEMA_VERSION: u8 = 3;

/// How a level delta is folded into an existing level.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LevelOp {
    /// Integer sum.
    Add,
    /// Overwrite; a level of 0 removes the kind.
    Set,
    /// Decrement; reaching 0 removes the kind.
    #[strum(to_string = "subtract", serialize = "remove")]
    Subtract,
}

impl LevelOp {
    /// Folds `delta` into `current` (0 = absent). Never clamps.
    pub fn fold(self, current: u32, delta: u32) -> u32 {
        match self {
            LevelOp::Add => current.saturating_add(delta),
            LevelOp::Set => delta,
            LevelOp::Subtract => current.saturating_sub(delta),
        }
    }
}

/// A bundle of effect levels attached to a portable item.
///
/// The model is a plain container: ceilings are enforced by the engines at
/// mutation time, not here. Clone before any speculative mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectSet {
    /// Effect kind to level (always >= 1).
    pub effects: BTreeMap<EffectKind, u32>,
    /// Owner-binding strength.
    pub binding_level: u32,
    /// Upkeep reduction strength.
    pub upkeep_reduction_level: u32,
    pub owner: Option<OwnerId>,
    /// Kinds switched off by the holder. Stale entries are ignored.
    pub disabled_effects: BTreeSet<EffectKind>,
    /// Item-custom-version stamp of the configuration that last wrote this bundle.
    pub custom_version: Option<String>,
    /// Encoding version this bundle was read from.
    pub schema_version: u8,
}

impl Default for EffectSet {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectSet {
    /// Creates an empty bundle tagged with the current schema version.
    pub fn new() -> Self {
        Self {
            effects: BTreeMap::new(),
            binding_level: 0,
            upkeep_reduction_level: 0,
            owner: None,
            disabled_effects: BTreeSet::new(),
            custom_version: None,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// Creates a bundle from `(kind, level)` pairs, skipping zero levels.
    pub fn from_effects(effects: impl IntoIterator<Item = (EffectKind, u32)>) -> Self {
        let mut set = Self::new();
        for (kind, level) in effects {
            set.set_level(kind, level);
        }
        set
    }

    /// Binds the bundle to `owner` at the given binding level (builder pattern).
    #[must_use]
    pub fn with_binding(mut self, level: u32, owner: Option<OwnerId>) -> Self {
        self.binding_level = level;
        self.owner = owner;
        self
    }

    /// Sets the upkeep reduction level (builder pattern).
    #[must_use]
    pub fn with_upkeep_reduction(mut self, level: u32) -> Self {
        self.upkeep_reduction_level = level;
        self
    }

    pub fn get(&self, kind: EffectKind) -> Option<u32> {
        self.effects.get(&kind).copied()
    }

    pub fn contains(&self, kind: EffectKind) -> bool {
        self.effects.contains_key(&kind)
    }

    /// Number of effect kinds held.
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Sum of all effect levels.
    pub fn total_levels(&self) -> u32 {
        self.effects
            .values()
            .fold(0u32, |total, level| total.saturating_add(*level))
    }

    /// Highest level of any kind, 0 when empty.
    pub fn max_level(&self) -> u32 {
        self.effects.values().copied().max().unwrap_or(0)
    }

    /// Sets a level, returning the previous one. A level of 0 removes the kind.
    pub fn set_level(&mut self, kind: EffectKind, level: u32) -> Option<u32> {
        if level == 0 {
            self.disabled_effects.remove(&kind);
            self.effects.remove(&kind)
        } else {
            self.effects.insert(kind, level)
        }
    }

    /// Folds `delta` into the level of `kind` and returns the resulting level
    /// (`None` when the kind ended up removed).
    pub fn merge_in_place(&mut self, kind: EffectKind, delta: u32, op: LevelOp) -> Option<u32> {
        let current = self.get(kind).unwrap_or(0);
        let level = op.fold(current, delta);
        self.set_level(kind, level);
        self.get(kind)
    }

    /// Effects the holder has not disabled.
    pub fn enabled_effects(&self) -> impl Iterator<Item = (EffectKind, u32)> + '_ {
        self.effects
            .iter()
            .filter(|(kind, _)| !self.disabled_effects.contains(kind))
            .map(|(kind, level)| (*kind, *level))
    }

    /// Unclaimed bundles are usable by anyone.
    pub fn is_owner(&self, identity: OwnerId) -> bool {
        self.owner.is_none_or(|owner| owner == identity)
    }

    /// Like [`is_owner`](Self::is_owner) for an actor that may be anonymous.
    /// An anonymous actor only owns unclaimed bundles.
    pub fn is_usable_by(&self, actor: Option<OwnerId>) -> bool {
        match actor {
            Some(identity) => self.is_owner(identity),
            None => self.owner.is_none(),
        }
    }

    /// Multiplier applied to upkeep, floored at zero.
    pub fn effective_upkeep_multiplier(&self, reduction_per_level: f64) -> f64 {
        (1.0 - self.upkeep_reduction_level as f64 * reduction_per_level).max(0.0)
    }

    /// Returns a copy holding only the permitted kinds. Never mutates `self`.
    pub fn filter_by_allowed(&self, allowed: &BTreeSet<EffectKind>) -> EffectSet {
        let mut filtered = self.clone();
        filtered.effects.retain(|kind, _| allowed.contains(kind));
        filtered.disabled_effects.retain(|kind| allowed.contains(kind));
        filtered
    }

    /// Keeps (`whitelist`) or drops (`!whitelist`) the effects matched by any filter.
    pub fn filter(&mut self, filters: &[EffectFilter], whitelist: bool) {
        self.effects.retain(|kind, level| {
            let matched = filters.iter().any(|filter| filter.matches(*kind, *level));
            matched == whitelist
        });
        let effects = &self.effects;
        self.disabled_effects.retain(|kind| effects.contains_key(kind));
    }

    /// Lowers every level above its ceiling. Returns true if anything changed.
    pub fn clamp_to_ceilings(&mut self, table: &EffectTable) -> bool {
        let mut changed = false;
        for (kind, level) in self.effects.iter_mut() {
            let ceiling = table.max_level(*kind);
            if *level > ceiling {
                *level = ceiling;
                changed = true;
            }
        }
        let before = self.effects.len();
        self.effects.retain(|_, level| *level > 0);
        changed || before != self.effects.len()
    }

    /// True when the bundle was read from an older schema or was written under
    /// a different item-custom-version.
    pub fn needs_update(&self, config: &EngineConfig) -> bool {
        self.schema_version < CURRENT_SCHEMA_VERSION || self.custom_version != config.custom_version
    }

    /// Equality that ignores the schema tag.
    pub fn content_eq(&self, other: &EffectSet) -> bool {
        self.effects == other.effects
            && self.binding_level == other.binding_level
            && self.upkeep_reduction_level == other.upkeep_reduction_level
            && self.owner == other.owner
            && self.disabled_effects == other.disabled_effects
            && self.custom_version == other.custom_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(n: u128) -> OwnerId {
        Uuid::from_u128(n)
    }

    #[test]
    fn zero_level_removes_kind() {
        let mut set = EffectSet::from_effects([(EffectKind::Speed, 2), (EffectKind::Haste, 0)]);
        assert_eq!(set.len(), 1);
        set.disabled_effects.insert(EffectKind::Speed);

        assert_eq!(set.set_level(EffectKind::Speed, 0), Some(2));
        assert!(set.is_empty());
        assert!(set.disabled_effects.is_empty());
    }

    #[test]
    fn merge_in_place_follows_operation() {
        let mut set = EffectSet::from_effects([(EffectKind::Speed, 2)]);
        assert_eq!(set.merge_in_place(EffectKind::Speed, 1, LevelOp::Add), Some(3));
        assert_eq!(set.merge_in_place(EffectKind::Speed, 5, LevelOp::Set), Some(5));
        assert_eq!(
            set.merge_in_place(EffectKind::Speed, 9, LevelOp::Subtract),
            None
        );
        assert!(!set.contains(EffectKind::Speed));
    }

    #[test]
    fn unclaimed_bundles_are_usable_by_anyone() {
        let unclaimed = EffectSet::new();
        assert!(unclaimed.is_owner(owner(1)));
        assert!(unclaimed.is_usable_by(None));

        let bound = EffectSet::new().with_binding(1, Some(owner(1)));
        assert!(bound.is_owner(owner(1)));
        assert!(!bound.is_owner(owner(2)));
        assert!(!bound.is_usable_by(None));
    }

    #[test]
    fn upkeep_multiplier_is_floored_at_zero() {
        let set = EffectSet::new().with_upkeep_reduction(2);
        assert!((set.effective_upkeep_multiplier(0.2) - 0.6).abs() < 1e-9);
        assert_eq!(set.effective_upkeep_multiplier(0.75), 0.0);
    }

    #[test]
    fn filter_by_allowed_leaves_source_untouched() {
        let mut set = EffectSet::from_effects([(EffectKind::Speed, 1), (EffectKind::Haste, 2)]);
        set.disabled_effects.insert(EffectKind::Haste);
        let allowed = BTreeSet::from([EffectKind::Speed]);

        let filtered = set.filter_by_allowed(&allowed);

        assert_eq!(filtered.get(EffectKind::Speed), Some(1));
        assert!(!filtered.contains(EffectKind::Haste));
        assert!(filtered.disabled_effects.is_empty());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn enabled_effects_skip_disabled_and_tolerate_stale_entries() {
        let mut set = EffectSet::from_effects([(EffectKind::Speed, 1), (EffectKind::Haste, 2)]);
        set.disabled_effects.insert(EffectKind::Haste);
        set.disabled_effects.insert(EffectKind::Poison);

        let enabled: Vec<_> = set.enabled_effects().collect();
        assert_eq!(enabled, vec![(EffectKind::Speed, 1)]);
    }

    #[test]
    fn content_eq_ignores_schema_tag() {
        let current = EffectSet::from_effects([(EffectKind::Speed, 1)]);
        let mut legacy = current.clone();
        legacy.schema_version = 1;
        assert_ne!(current, legacy);
        assert!(current.content_eq(&legacy));
    }
}
