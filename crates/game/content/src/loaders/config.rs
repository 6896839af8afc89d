//! Engine configuration loader.
//!
//! The file is parsed into a TOML table first so that legacy keys can be
//! migrated in memory and so that a bad `[effects.<kind>]` entry only skips
//! that entry.

use std::path::Path;

use beacon_core::{
    CatalystEnchantment, ConfigError, EffectDefaults, EffectInfo, EffectKind, EngineConfig,
    MergePolicy, Toggle, normalize_key,
};
use serde::Deserialize;
use toml::{Table, Value};

use crate::loaders::{LoadResult, read_file};

/// Current layout of the configuration file.
pub const CONFIG_VERSION: i64 = 2;

/// Allowed range for every level-like integer.
const LEVEL_RANGE: (i64, i64) = (0, 255);
const DURATION_RANGE: (i64, i64) = (0, u32::MAX as i64);

/// Legacy key paths and where their values now live.
const MIGRATIONS: &[(&[&str], &[&str])] = &[
    (
        &["combination", "max-effect-amplifier"],
        &["effects", "default", "max-level"],
    ),
    (
        &["nerfs", "exp-levels-per-minute"],
        &["effects", "default", "upkeep-per-minute"],
    ),
];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawEffectInfo {
    name_override: Option<String>,
    max_level: Option<i64>,
    duration: Option<i64>,
    hide_particles: Option<bool>,
    upkeep_per_minute: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawCombination {
    max_effects: Option<i64>,
    combine_effects_additively: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawCatalyst {
    enabled: Option<bool>,
    enchantment: Option<String>,
    min_catalyst_level: Option<i64>,
    max_level: Option<i64>,
    name: Option<String>,
    owner_usage_only: Option<bool>,
    reduction_per_level: Option<f64>,
}

/// Loader for the engine configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the engine configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, or if `[effects.default]`
    /// lacks a required key ([`ConfigError::MissingDefault`]). Every other
    /// problem is logged and the offending entry skipped or clamped.
    pub fn load(path: &Path) -> LoadResult<EngineConfig> {
        let content = read_file(path)?;
        let config = Self::parse(&content)
            .map_err(|e| e.context(format!("Failed to load config {}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Parse the engine configuration from TOML text.
    pub fn parse(content: &str) -> LoadResult<EngineConfig> {
        let mut table: Table = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        let migrated = migrate_legacy_keys(&mut table);
        if !migrated.is_empty() {
            tracing::warn!("The following legacy config values have been migrated (in memory):");
            for message in &migrated {
                tracing::warn!(" - {}", message);
            }
        }

        let mut config = EngineConfig::new(read_defaults(&table)?);
        read_effect_overrides(&table, &mut config);
        read_combination(&table, &mut config);
        read_catalysts(&table, &mut config);
        read_toggles(&table, &mut config);

        config.force_downgrade = table
            .get("force-downgrade")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        config.custom_version = table
            .get("custom-version")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(config)
    }
}

// ============================================================================
// Migrations
// ============================================================================

/// Moves legacy keys to their current location. Returns one message per
/// migrated key. A key already present at the new location wins.
pub fn migrate_legacy_keys(table: &mut Table) -> Vec<String> {
    let mut migrated = Vec::new();

    for (from, to) in MIGRATIONS {
        let Some(value) = take_path(table, from) else {
            continue;
        };
        if insert_path_if_absent(table, to, value) {
            migrated.push(format!("{} -> {}", from.join("."), to.join(".")));
        } else {
            migrated.push(format!(
                "{} dropped, {} is already set",
                from.join("."),
                to.join(".")
            ));
        }
    }

    if let Some(version) = table.get("config-version").and_then(Value::as_integer)
        && version > CONFIG_VERSION
    {
        tracing::warn!(version, "config was written by a newer version");
    }

    migrated
}

fn take_path(table: &mut Table, path: &[&str]) -> Option<Value> {
    let (last, parents) = path.split_last()?;
    let mut current = table;
    for key in parents {
        current = current.get_mut(*key)?.as_table_mut()?;
    }
    current.remove(*last)
}

fn insert_path_if_absent(table: &mut Table, path: &[&str], value: Value) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };
    let mut current = table;
    for key in parents {
        let entry = current
            .entry(key.to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        let Some(next) = entry.as_table_mut() else {
            return false;
        };
        current = next;
    }
    if current.contains_key(*last) {
        return false;
    }
    current.insert(last.to_string(), value);
    true
}

// ============================================================================
// Sections
// ============================================================================

fn read_defaults(table: &Table) -> LoadResult<EffectDefaults> {
    let raw: RawEffectInfo = table
        .get("effects")
        .and_then(|effects| effects.get("default"))
        .cloned()
        .ok_or(ConfigError::MissingDefault("effects.default"))?
        .try_into()
        .map_err(|e| anyhow::anyhow!("Failed to parse effects.default: {}", e))?;

    if raw.name_override.is_some() {
        anyhow::bail!(ConfigError::invalid_value(
            "effects.default.name-override",
            "the default section cannot have a name override"
        ));
    }

    let max_level = raw
        .max_level
        .ok_or(ConfigError::MissingDefault("max-level"))?;
    let duration = raw.duration.ok_or(ConfigError::MissingDefault("duration"))?;
    let hide_particles = raw
        .hide_particles
        .ok_or(ConfigError::MissingDefault("hide-particles"))?;

    Ok(EffectDefaults {
        max_level: clamp("effects.default.max-level", max_level, LEVEL_RANGE),
        duration_ticks: clamp("effects.default.duration", duration, DURATION_RANGE),
        hide_particles,
        upkeep_per_minute: clamp_non_negative(
            "effects.default.upkeep-per-minute",
            raw.upkeep_per_minute.unwrap_or(0.0),
        ),
    })
}

fn read_effect_overrides(table: &Table, config: &mut EngineConfig) {
    let Some(effects) = table.get("effects").and_then(Value::as_table) else {
        return;
    };

    for (key, value) in effects {
        if key == "default" {
            continue;
        }
        match parse_effect_entry(key, value) {
            Ok((kind, info)) => config.effects.insert(kind, info),
            Err(e) => {
                tracing::warn!("Skipping erroneous config 'effects.{}': {}", key, e);
            }
        }
    }
}

fn parse_effect_entry(key: &str, value: &Value) -> LoadResult<(EffectKind, EffectInfo)> {
    let kind = EffectKind::parse(key)?;
    let raw: RawEffectInfo = value.clone().try_into()?;
    let path = |field: &str| format!("effects.{key}.{field}");

    Ok((
        kind,
        EffectInfo {
            name_override: raw.name_override,
            max_level: raw
                .max_level
                .map(|level| clamp(&path("max-level"), level, LEVEL_RANGE)),
            duration_ticks: raw
                .duration
                .map(|ticks| clamp(&path("duration"), ticks, DURATION_RANGE)),
            hide_particles: raw.hide_particles,
            upkeep_per_minute: raw
                .upkeep_per_minute
                .map(|upkeep| clamp_non_negative(&path("upkeep-per-minute"), upkeep)),
        },
    ))
}

fn read_combination(table: &Table, config: &mut EngineConfig) {
    let Some(value) = table.get("combination") else {
        return;
    };
    let raw: RawCombination = match value.clone().try_into() {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Skipping erroneous config 'combination': {}", e);
            return;
        }
    };

    if let Some(max_effects) = raw.max_effects {
        config.combination.max_effects =
            clamp("combination.max-effects", max_effects, LEVEL_RANGE) as usize;
    }
    if let Some(additive) = raw.combine_effects_additively {
        config.combination.policy = MergePolicy::from_additive(additive);
    }
}

fn read_catalysts(table: &Table, config: &mut EngineConfig) {
    let Some(section) = table.get("custom-enchantments").and_then(Value::as_table) else {
        return;
    };

    if let Some(raw) = read_catalyst(section, "binding") {
        apply_catalyst(&mut config.binding.catalyst, &raw, "binding");
        if let Some(owner_usage_only) = raw.owner_usage_only {
            config.binding.owner_usage_only = owner_usage_only;
        }
    }

    if let Some(raw) = read_catalyst(section, "upkeep-reduction") {
        apply_catalyst(&mut config.upkeep_reduction.catalyst, &raw, "upkeep-reduction");
        if let Some(reduction) = raw.reduction_per_level {
            config.upkeep_reduction.reduction_per_level = clamp_non_negative(
                "custom-enchantments.upkeep-reduction.reduction-per-level",
                reduction,
            );
        }
    }
}

fn read_catalyst(section: &Table, key: &str) -> Option<RawCatalyst> {
    let value = section.get(key)?;
    match value.clone().try_into() {
        Ok(raw) => Some(raw),
        Err(e) => {
            tracing::warn!("Skipping erroneous config 'custom-enchantments.{}': {}", key, e);
            None
        }
    }
}

fn apply_catalyst(target: &mut CatalystEnchantment, raw: &RawCatalyst, key: &str) {
    let path = |field: &str| format!("custom-enchantments.{key}.{field}");

    if let Some(enabled) = raw.enabled {
        target.enabled = enabled;
    }
    if let Some(enchantment) = &raw.enchantment {
        target.enchantment = normalize_key(enchantment);
    }
    if let Some(level) = raw.min_catalyst_level {
        target.min_catalyst_level = clamp(&path("min-catalyst-level"), level, LEVEL_RANGE);
    }
    if let Some(level) = raw.max_level {
        target.max_level = clamp(&path("max-level"), level, LEVEL_RANGE);
    }
    if let Some(name) = &raw.name {
        target.name = name.clone();
    }
}

fn read_toggles(table: &Table, config: &mut EngineConfig) {
    let Some(toggles) = table.get("toggles").and_then(Value::as_table) else {
        return;
    };

    for (key, value) in toggles {
        let Ok(toggle) = key.parse::<Toggle>() else {
            tracing::warn!("Skipping unknown toggle 'toggles.{}'", key);
            continue;
        };
        match value.as_bool() {
            Some(enabled) => config.toggles.set_enabled(toggle, enabled),
            None => tracing::warn!("Config \"toggles.{}\" is not a boolean", key),
        }
    }
}

// ============================================================================
// Range Checks
// ============================================================================

fn clamp(path: &str, value: i64, (min, max): (i64, i64)) -> u32 {
    if value > max {
        tracing::error!(
            "Config \"{}\" cannot be larger than {}, got {}.",
            path,
            max,
            value
        );
        max as u32
    } else if value < min {
        tracing::error!(
            "Config \"{}\" cannot be smaller than {}, got {}.",
            path,
            min,
            value
        );
        min as u32
    } else {
        value as u32
    }
}

fn clamp_non_negative(path: &str, value: f64) -> f64 {
    if value < 0.0 || value.is_nan() {
        tracing::error!("Config \"{}\" cannot be smaller than 0, got {}.", path, value);
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::{EngineError, Toggles};

    const MINIMAL: &str = r#"
[effects.default]
max-level = 3
duration = 280
hide-particles = false
"#;

    #[test]
    fn minimal_config_uses_shipped_defaults() {
        let config = ConfigLoader::parse(MINIMAL).unwrap();

        assert_eq!(config.effects.max_level(EffectKind::Speed), 3);
        assert_eq!(config.effects.duration_ticks(EffectKind::Speed), 280);
        assert_eq!(config.effects.upkeep_per_minute(EffectKind::Speed), 0.0);
        assert_eq!(config.combination.max_effects, 6);
        assert_eq!(config.combination.policy, MergePolicy::Tiered);
        assert_eq!(config.toggles, Toggles::all());
        assert!(!config.force_downgrade);
        assert_eq!(config.custom_version, None);
    }

    #[test]
    fn missing_default_key_is_fatal() {
        let err = ConfigLoader::parse("[effects.default]\nmax-level = 3\nduration = 20\n")
            .unwrap_err();
        let config_err = err.downcast_ref::<ConfigError>().unwrap();
        assert_eq!(*config_err, ConfigError::MissingDefault("hide-particles"));
        assert!(config_err.severity().is_fatal());

        let err = ConfigLoader::parse("[combination]\nmax-effects = 2\n").unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn bad_effect_entries_are_skipped() {
        let content = format!(
            "{MINIMAL}
[effects.flying]
max-level = 9

[effects.speed]
max-level = \"lots\"

[effects.fast_digging]
max-level = 5
name-override = \"Haste\"
"
        );
        let config = ConfigLoader::parse(&content).unwrap();

        assert_eq!(config.effects.max_level(EffectKind::Speed), 3);
        assert_eq!(config.effects.max_level(EffectKind::Haste), 5);
        assert_eq!(config.effects.display_name(EffectKind::Haste), "Haste");
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let content = "
[effects.default]
max-level = 900
duration = -5
hide-particles = true
upkeep-per-minute = -1.0

[custom-enchantments.upkeep-reduction]
max-level = -2
reduction-per-level = 0.25
";
        let config = ConfigLoader::parse(content).unwrap();

        assert_eq!(config.effects.defaults().max_level, 255);
        assert_eq!(config.effects.defaults().duration_ticks, 0);
        assert_eq!(config.effects.defaults().upkeep_per_minute, 0.0);
        assert_eq!(config.upkeep_reduction.catalyst.max_level, 0);
        assert_eq!(config.upkeep_reduction.reduction_per_level, 0.25);
    }

    #[test]
    fn legacy_keys_are_migrated() {
        let content = "
[effects.default]
duration = 280
hide-particles = false

[combination]
max-effect-amplifier = 4
combine-effects-additively = true

[nerfs]
exp-levels-per-minute = 0.5
";
        let config = ConfigLoader::parse(content).unwrap();

        assert_eq!(config.effects.max_level(EffectKind::Luck), 4);
        assert_eq!(config.effects.upkeep_per_minute(EffectKind::Luck), 0.5);
        assert_eq!(config.combination.policy, MergePolicy::Additive);
    }

    #[test]
    fn migration_does_not_override_current_keys() {
        let mut table: Table = toml::from_str(
            "[effects.default]\nmax-level = 2\n[combination]\nmax-effect-amplifier = 9\n",
        )
        .unwrap();

        let migrated = migrate_legacy_keys(&mut table);

        assert_eq!(migrated.len(), 1);
        assert_eq!(table["effects"]["default"]["max-level"].as_integer(), Some(2));
        assert!(table["combination"].get("max-effect-amplifier").is_none());
    }

    #[test]
    fn catalysts_toggles_and_stamps() {
        let content = format!(
            "force-downgrade = true
custom-version = \"2024-07\"
{MINIMAL}
[custom-enchantments.binding]
enchantment = \"minecraft:Vanishing_Curse\"
min-catalyst-level = 2
owner-usage-only = true
name = \"Bound\"

[toggles]
ritual = false
world-pickup = false
teleport = true
"
        );
        let config = ConfigLoader::parse(&content).unwrap();

        assert_eq!(config.binding.catalyst.enchantment, "vanishing_curse");
        assert_eq!(config.binding.catalyst.min_catalyst_level, 2);
        assert_eq!(config.binding.catalyst.name, "Bound");
        assert!(config.binding.owner_usage_only);
        assert!(!config.toggles.is_enabled(Toggle::Ritual));
        assert!(!config.toggles.is_enabled(Toggle::WorldPickup));
        assert!(config.toggles.is_enabled(Toggle::ToggleGui));
        assert!(config.force_downgrade);
        assert_eq!(config.custom_version.as_deref(), Some("2024-07"));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = ConfigLoader::load(&path).unwrap();
        assert_eq!(config.effects.defaults().max_level, 3);

        assert!(ConfigLoader::load(&dir.path().join("missing.toml")).is_err());
    }
}
