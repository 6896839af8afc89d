//! Ongoing experience cost of an active bundle.

use crate::config::EngineConfig;
use crate::effects::EffectSet;

/// Experience levels per minute drained by `set`: the configured upkeep of
/// every enabled kind, scaled by the bundle's upkeep reduction.
pub fn calc_upkeep_per_minute(set: &EffectSet, config: &EngineConfig) -> f64 {
    let base: f64 = set
        .enabled_effects()
        .map(|(kind, _)| config.effects.upkeep_per_minute(kind))
        .sum();
    base * set.effective_upkeep_multiplier(config.upkeep_reduction.reduction_per_level)
}
