//! Merging a bundle with a second bundle or with an enchanted catalyst.
//!
//! Bundle + bundle produces a fresh [`EffectSet`]; bundle + catalyst raises
//! auxiliary levels on the target in place. Neither path computes cost.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{CatalystEnchantment, CombinationRules, EngineConfig};
use crate::effects::{EffectKind, EffectSet, OwnerId};
use crate::error::Rejection;

/// Normalizes an item or enchantment key: lowercase, no `minecraft:` namespace.
pub fn normalize_key(key: &str) -> String {
    let lower = key.trim().to_ascii_lowercase();
    match lower.strip_prefix("minecraft:") {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}

/// Stored enchantment levels read off a catalyst item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnchantmentExtraction(BTreeMap<String, u32>);

impl EnchantmentExtraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an enchantment, normalizing its key (builder pattern).
    #[must_use]
    pub fn with(mut self, key: &str, level: u32) -> Self {
        self.insert(key, level);
        self
    }

    pub fn insert(&mut self, key: &str, level: u32) {
        self.0.insert(normalize_key(key), level);
    }

    pub fn level(&self, key: &str) -> Option<u32> {
        self.0.get(&normalize_key(key)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(key, level)| (key.as_str(), *level))
    }
}

impl<'a> FromIterator<(&'a str, u32)> for EnchantmentExtraction {
    fn from_iter<I: IntoIterator<Item = (&'a str, u32)>>(iter: I) -> Self {
        let mut extraction = Self::new();
        for (key, level) in iter {
            extraction.insert(key, level);
        }
        extraction
    }
}

/// The second input of a combination.
#[derive(Clone, Copy, Debug)]
pub enum CombineInput<'a> {
    Bundle(&'a EffectSet),
    Catalyst(&'a EnchantmentExtraction),
}

/// Stateless combination rules evaluated against an [`EngineConfig`].
#[derive(Clone, Copy, Debug)]
pub struct CombinationEngine<'a> {
    config: &'a EngineConfig,
}

impl<'a> CombinationEngine<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Combines `primary` with `input` under `rules` and returns the result.
    ///
    /// Inputs are never mutated. When the binding config restricts usage to
    /// owners, every bundle involved must be usable by `actor`.
    pub fn combine(
        &self,
        primary: &EffectSet,
        input: CombineInput<'_>,
        rules: &CombinationRules,
        actor: Option<OwnerId>,
    ) -> Result<EffectSet, Rejection> {
        if self.config.binding.owner_usage_only {
            let secondary_usable = match input {
                CombineInput::Bundle(secondary) => secondary.is_usable_by(actor),
                CombineInput::Catalyst(_) => true,
            };
            if !primary.is_usable_by(actor) || !secondary_usable {
                return Err(Rejection::NotOwner);
            }
        }

        match input {
            CombineInput::Bundle(secondary) => self.merge_bundles(primary, secondary, rules),
            CombineInput::Catalyst(catalyst) => {
                let mut result = primary.clone();
                self.apply_catalyst(&mut result, catalyst, actor)?;
                Ok(result)
            }
        }
    }

    /// Merges every kind present in either bundle.
    ///
    /// The first kind (in kind order) over its ceiling aborts the merge. The
    /// kind-count limit is checked after all kinds merged.
    pub fn merge_bundles(
        &self,
        primary: &EffectSet,
        secondary: &EffectSet,
        rules: &CombinationRules,
    ) -> Result<EffectSet, Rejection> {
        let kinds: BTreeSet<EffectKind> = primary
            .effects
            .keys()
            .chain(secondary.effects.keys())
            .copied()
            .collect();

        let mut merged = BTreeMap::new();
        for kind in kinds {
            let level = match (primary.get(kind), secondary.get(kind)) {
                (Some(a), Some(b)) => rules.policy.merge(a, b),
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => continue,
            };
            if level > self.config.effects.max_level(kind) {
                return Err(Rejection::Overpowered {
                    name: self.config.effects.display_name(kind),
                });
            }
            merged.insert(kind, level);
        }

        if merged.len() > rules.max_effects {
            return Err(Rejection::TooManyEffects {
                max: rules.max_effects,
            });
        }

        let mut result = primary.clone();
        result.effects = merged;
        Ok(result)
    }

    /// Raises binding and upkeep reduction on `target` by one for each
    /// catalyst enchantment recognized on `catalyst`.
    ///
    /// Mutates `target` directly and may leave it partially updated on
    /// rejection; clone first to keep the original.
    pub fn apply_catalyst(
        &self,
        target: &mut EffectSet,
        catalyst: &EnchantmentExtraction,
        actor: Option<OwnerId>,
    ) -> Result<(), Rejection> {
        let binding = &self.config.binding.catalyst;
        let reduction = &self.config.upkeep_reduction.catalyst;
        let mut recognized = false;

        if binding.recognized_on(catalyst) {
            recognized = true;
            target.binding_level = Self::increment(target.binding_level, binding)?;
            if let Some(identity) = actor
                && target.is_owner(identity)
            {
                target.owner = Some(identity);
            }
        }

        if reduction.recognized_on(catalyst) {
            recognized = true;
            target.upkeep_reduction_level =
                Self::increment(target.upkeep_reduction_level, reduction)?;
        }

        if recognized {
            Ok(())
        } else {
            Err(Rejection::Incompatible)
        }
    }

    /// Number of catalyst enchantments on `catalyst` that would apply.
    pub fn applicable_catalysts(&self, catalyst: &EnchantmentExtraction) -> u32 {
        [
            &self.config.binding.catalyst,
            &self.config.upkeep_reduction.catalyst,
        ]
        .into_iter()
        .filter(|enchantment| enchantment.recognized_on(catalyst))
        .count() as u32
    }

    fn increment(level: u32, enchantment: &CatalystEnchantment) -> Result<u32, Rejection> {
        let next = level.saturating_add(1);
        if next > enchantment.max_level {
            return Err(Rejection::Overpowered {
                name: enchantment.name.clone(),
            });
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MergePolicy;
    use uuid::Uuid;

    fn config(max_level: u32) -> EngineConfig {
        EngineConfig::with_max_level(max_level)
    }

    fn tiered(max_effects: usize) -> CombinationRules {
        CombinationRules {
            policy: MergePolicy::Tiered,
            max_effects,
        }
    }

    fn combine(
        config: &EngineConfig,
        a: &EffectSet,
        b: &EffectSet,
        rules: CombinationRules,
    ) -> Result<EffectSet, Rejection> {
        CombinationEngine::new(config).combine(a, CombineInput::Bundle(b), &rules, None)
    }

    #[test]
    fn tiered_merge_levels_up_equal_levels() {
        let config = config(5);
        let a = EffectSet::from_effects([(EffectKind::Speed, 2), (EffectKind::Haste, 1)]);
        let b = EffectSet::from_effects([(EffectKind::Speed, 2), (EffectKind::Haste, 3)]);

        let merged = combine(&config, &a, &b, tiered(6)).unwrap();

        assert_eq!(merged.get(EffectKind::Speed), Some(3));
        assert_eq!(merged.get(EffectKind::Haste), Some(3));
    }

    #[test]
    fn additive_merge_sums_levels() {
        let config = config(10);
        let a = EffectSet::from_effects([(EffectKind::Speed, 2), (EffectKind::Luck, 1)]);
        let b = EffectSet::from_effects([(EffectKind::Speed, 2)]);
        let rules = CombinationRules {
            policy: MergePolicy::Additive,
            max_effects: 6,
        };

        let merged = combine(&config, &a, &b, rules).unwrap();

        assert_eq!(merged.get(EffectKind::Speed), Some(4));
        assert_eq!(merged.get(EffectKind::Luck), Some(1));
    }

    #[test]
    fn ceiling_rejects_with_effect_name() {
        let config = config(4);
        let four = EffectSet::from_effects([(EffectKind::Speed, 4)]);
        let three = EffectSet::from_effects([(EffectKind::Speed, 3)]);

        let err = combine(&config, &four, &four, tiered(6)).unwrap_err();
        assert_eq!(err.to_string(), "Overpowered Speed");

        let merged = combine(&config, &three, &four, tiered(6)).unwrap();
        assert_eq!(merged.effects, four.effects);
    }

    #[test]
    fn kind_count_limit_rejects() {
        let config = config(4);
        let a = EffectSet::from_effects([
            (EffectKind::Speed, 1),
            (EffectKind::Haste, 1),
            (EffectKind::Luck, 1),
        ]);
        let b = EffectSet::from_effects([(EffectKind::Glowing, 1)]);

        let err = combine(&config, &a, &b, tiered(3)).unwrap_err();

        assert_eq!(err, Rejection::TooManyEffects { max: 3 });
    }

    #[test]
    fn rejection_leaves_inputs_untouched() {
        let config = config(1);
        let a = EffectSet::from_effects([(EffectKind::Speed, 1)]).with_binding(1, None);
        let b = EffectSet::from_effects([(EffectKind::Speed, 1)]);
        let (a_before, b_before) = (a.clone(), b.clone());

        assert!(combine(&config, &a, &b, tiered(6)).is_err());

        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
    }

    #[test]
    fn merged_bundle_keeps_primary_auxiliary_fields() {
        let config = config(5);
        let owner = Uuid::from_u128(7);
        let a = EffectSet::from_effects([(EffectKind::Speed, 1)])
            .with_binding(2, Some(owner))
            .with_upkeep_reduction(1);
        let b = EffectSet::from_effects([(EffectKind::Haste, 1)]).with_upkeep_reduction(4);

        let merged = CombinationEngine::new(&config)
            .combine(&a, CombineInput::Bundle(&b), &tiered(6), Some(owner))
            .unwrap();

        assert_eq!(merged.binding_level, 2);
        assert_eq!(merged.upkeep_reduction_level, 1);
        assert_eq!(merged.owner, Some(owner));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn catalyst_increments_by_one_and_stamps_owner() {
        let config = config(5);
        let actor = Uuid::from_u128(3);
        let catalyst = EnchantmentExtraction::new()
            .with("minecraft:binding_curse", 1)
            .with("MENDING", 4);
        let engine = CombinationEngine::new(&config);

        let mut target = EffectSet::from_effects([(EffectKind::Speed, 1)]);
        engine
            .apply_catalyst(&mut target, &catalyst, Some(actor))
            .unwrap();

        assert_eq!(target.binding_level, 1);
        assert_eq!(target.upkeep_reduction_level, 1);
        assert_eq!(target.owner, Some(actor));
        assert_eq!(engine.applicable_catalysts(&catalyst), 2);
    }

    #[test]
    fn catalyst_respects_minimum_level_and_ceiling() {
        let mut config = config(5);
        config.binding.catalyst.min_catalyst_level = 2;
        config.upkeep_reduction.catalyst.max_level = 1;
        let engine = CombinationEngine::new(&config);

        let weak = EnchantmentExtraction::new().with("binding_curse", 1);
        let mut target = EffectSet::new();
        assert_eq!(
            engine.apply_catalyst(&mut target, &weak, None),
            Err(Rejection::Incompatible)
        );

        let mending = EnchantmentExtraction::new().with("mending", 1);
        let maxed = EffectSet::new().with_upkeep_reduction(1);
        let err = engine
            .combine(&maxed, CombineInput::Catalyst(&mending), &tiered(6), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "Overpowered Experience Efficiency");
        assert_eq!(maxed.upkeep_reduction_level, 1);
    }

    #[test]
    fn catalyst_does_not_steal_claimed_bundles() {
        let config = config(5);
        let owner = Uuid::from_u128(1);
        let other = Uuid::from_u128(2);
        let catalyst = EnchantmentExtraction::new().with("binding_curse", 1);

        let mut target = EffectSet::new().with_binding(1, Some(owner));
        CombinationEngine::new(&config)
            .apply_catalyst(&mut target, &catalyst, Some(other))
            .unwrap();

        assert_eq!(target.binding_level, 2);
        assert_eq!(target.owner, Some(owner));
    }

    #[test]
    fn owner_usage_only_blocks_foreign_bundles() {
        let mut config = config(5);
        config.binding.owner_usage_only = true;
        let owner = Uuid::from_u128(1);
        let a = EffectSet::from_effects([(EffectKind::Speed, 1)]).with_binding(1, Some(owner));
        let b = EffectSet::from_effects([(EffectKind::Haste, 1)]);
        let engine = CombinationEngine::new(&config);

        let err = engine
            .combine(&a, CombineInput::Bundle(&b), &tiered(6), Some(Uuid::from_u128(9)))
            .unwrap_err();
        assert_eq!(err, Rejection::NotOwner);
        assert!(
            engine
                .combine(&a, CombineInput::Bundle(&b), &tiered(6), Some(owner))
                .is_ok()
        );
    }
}
