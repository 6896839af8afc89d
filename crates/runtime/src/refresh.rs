//! Bringing stored bundles up to date with the current configuration.

use beacon_core::{CURRENT_SCHEMA_VERSION, EffectSet, EngineConfig};

/// Returns the updated bundle when `set` is obsolete, `None` otherwise.
///
/// A bundle is obsolete when it was read from an older blob version or was
/// written under a different item-custom-version. With `force_downgrade`
/// set, levels above their ceilings are lowered.
pub fn refresh_bundle(set: &EffectSet, config: &EngineConfig) -> Option<EffectSet> {
    if !set.needs_update(config) {
        return None;
    }

    let mut refreshed = set.clone();
    if config.force_downgrade && refreshed.clamp_to_ceilings(&config.effects) {
        tracing::debug!("Downgraded bundle to configured ceilings");
    }
    refreshed.custom_version = config.custom_version.clone();
    refreshed.schema_version = CURRENT_SCHEMA_VERSION;
    Some(refreshed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::EffectKind;

    #[test]
    fn current_bundles_are_left_alone() {
        let config = EngineConfig::with_max_level(3);
        let set = EffectSet::from_effects([(EffectKind::Speed, 5)]);
        assert_eq!(refresh_bundle(&set, &config), None);
    }

    #[test]
    fn version_mismatch_restamps() {
        let mut config = EngineConfig::with_max_level(3);
        config.custom_version = Some("v2".to_string());
        let mut set = EffectSet::from_effects([(EffectKind::Speed, 5)]);
        set.schema_version = 1;

        let refreshed = refresh_bundle(&set, &config).unwrap();

        assert_eq!(refreshed.custom_version.as_deref(), Some("v2"));
        assert_eq!(refreshed.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(refreshed.get(EffectKind::Speed), Some(5));
        assert_eq!(refresh_bundle(&refreshed, &config), None);
    }

    #[test]
    fn force_downgrade_clamps() {
        let mut config = EngineConfig::with_max_level(3);
        config.force_downgrade = true;
        config.custom_version = Some("v2".to_string());
        let set = EffectSet::from_effects([(EffectKind::Speed, 5), (EffectKind::Luck, 1)]);

        let refreshed = refresh_bundle(&set, &config).unwrap();

        assert_eq!(refreshed.get(EffectKind::Speed), Some(3));
        assert_eq!(refreshed.get(EffectKind::Luck), Some(1));
    }
}
