//! Engine configuration: ceilings, combination policy, catalyst enchantments
//! and global toggles.
//!
//! The configuration is read-only from the engine's point of view. It is
//! built by `beacon-content`'s `ConfigLoader` and replaced wholesale on reload.

use std::collections::BTreeMap;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::effects::EffectKind;

// ============================================================================
// Effects
// ============================================================================

/// Values every effect kind falls back to. All fields are required.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectDefaults {
    pub max_level: u32,
    pub duration_ticks: u32,
    pub hide_particles: bool,
    /// Experience levels per minute for one active kind.
    pub upkeep_per_minute: f64,
}

/// Per-kind overrides; `None` falls back to [`EffectDefaults`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectInfo {
    pub name_override: Option<String>,
    pub max_level: Option<u32>,
    pub duration_ticks: Option<u32>,
    pub hide_particles: Option<bool>,
    pub upkeep_per_minute: Option<f64>,
}

/// Resolved per-kind settings.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectTable {
    defaults: EffectDefaults,
    overrides: BTreeMap<EffectKind, EffectInfo>,
}

impl EffectTable {
    pub fn new(defaults: EffectDefaults) -> Self {
        Self {
            defaults,
            overrides: BTreeMap::new(),
        }
    }

    /// Adds or replaces the override for `kind` (builder pattern).
    #[must_use]
    pub fn with_override(mut self, kind: EffectKind, info: EffectInfo) -> Self {
        self.overrides.insert(kind, info);
        self
    }

    pub fn insert(&mut self, kind: EffectKind, info: EffectInfo) {
        self.overrides.insert(kind, info);
    }

    pub fn defaults(&self) -> &EffectDefaults {
        &self.defaults
    }

    pub fn info(&self, kind: EffectKind) -> Option<&EffectInfo> {
        self.overrides.get(&kind)
    }

    /// The level ceiling for `kind`.
    pub fn max_level(&self, kind: EffectKind) -> u32 {
        self.info(kind)
            .and_then(|info| info.max_level)
            .unwrap_or(self.defaults.max_level)
    }

    pub fn duration_ticks(&self, kind: EffectKind) -> u32 {
        self.info(kind)
            .and_then(|info| info.duration_ticks)
            .unwrap_or(self.defaults.duration_ticks)
    }

    pub fn hide_particles(&self, kind: EffectKind) -> bool {
        self.info(kind)
            .and_then(|info| info.hide_particles)
            .unwrap_or(self.defaults.hide_particles)
    }

    pub fn upkeep_per_minute(&self, kind: EffectKind) -> f64 {
        self.info(kind)
            .and_then(|info| info.upkeep_per_minute)
            .unwrap_or(self.defaults.upkeep_per_minute)
    }

    /// Name shown to players, honoring `name-override`.
    pub fn display_name(&self, kind: EffectKind) -> String {
        self.info(kind)
            .and_then(|info| info.name_override.clone())
            .unwrap_or_else(|| kind.display_name())
    }
}

// ============================================================================
// Combination
// ============================================================================

/// How two levels of the same kind merge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MergePolicy {
    /// Equal levels level up by one, otherwise the larger wins.
    #[default]
    Tiered,
    /// Levels are summed.
    Additive,
}

impl MergePolicy {
    pub fn from_additive(additive: bool) -> Self {
        if additive {
            Self::Additive
        } else {
            Self::Tiered
        }
    }

    pub fn merge(self, a: u32, b: u32) -> u32 {
        match self {
            MergePolicy::Additive => a.saturating_add(b),
            MergePolicy::Tiered if a == b => a.saturating_add(1),
            MergePolicy::Tiered => a.max(b),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CombinationRules {
    pub policy: MergePolicy,
    /// Maximum number of kinds a merged bundle may hold.
    pub max_effects: usize,
}

impl CombinationRules {
    pub const DEFAULT_MAX_EFFECTS: usize = 6;
}

impl Default for CombinationRules {
    fn default() -> Self {
        Self {
            policy: MergePolicy::Tiered,
            max_effects: Self::DEFAULT_MAX_EFFECTS,
        }
    }
}

/// Per-recipe changes to the configured combination rules. Unset fields
/// fall back to the configuration at apply time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CombinationOverride {
    pub policy: Option<MergePolicy>,
    pub max_effects: Option<usize>,
}

impl CombinationOverride {
    pub fn is_empty(&self) -> bool {
        self.policy.is_none() && self.max_effects.is_none()
    }

    pub fn resolve(&self, configured: CombinationRules) -> CombinationRules {
        CombinationRules {
            policy: self.policy.unwrap_or(configured.policy),
            max_effects: self.max_effects.unwrap_or(configured.max_effects),
        }
    }
}

// ============================================================================
// Catalyst Enchantments
// ============================================================================

/// A catalyst enchantment that raises one auxiliary level by one per use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalystEnchantment {
    pub enabled: bool,
    /// Normalized key of the stored enchantment on the catalyst.
    pub enchantment: String,
    /// Minimum stored level for the catalyst to count.
    pub min_catalyst_level: u32,
    /// Ceiling of the auxiliary level on the bundle.
    pub max_level: u32,
    /// Name used in "Overpowered <name>".
    pub name: String,
}

impl CatalystEnchantment {
    /// Whether `catalyst` carries this enchantment at a sufficient level.
    pub fn recognized_on(&self, catalyst: &crate::combine::EnchantmentExtraction) -> bool {
        self.enabled
            && catalyst
                .level(&self.enchantment)
                .is_some_and(|level| level >= self.min_catalyst_level)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingConfig {
    pub catalyst: CatalystEnchantment,
    /// Only the owner may use, combine or modify a bound bundle.
    pub owner_usage_only: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            catalyst: CatalystEnchantment {
                enabled: true,
                enchantment: "binding_curse".to_string(),
                min_catalyst_level: 1,
                max_level: 5,
                name: "Soulbound".to_string(),
            },
            owner_usage_only: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpkeepReductionConfig {
    pub catalyst: CatalystEnchantment,
    /// Fraction of upkeep removed per level.
    pub reduction_per_level: f64,
}

impl Default for UpkeepReductionConfig {
    fn default() -> Self {
        Self {
            catalyst: CatalystEnchantment {
                enabled: true,
                enchantment: "mending".to_string(),
                min_catalyst_level: 1,
                max_level: 5,
                name: "Experience Efficiency".to_string(),
            },
            reduction_per_level: 0.2,
        }
    }
}

// ============================================================================
// Toggles
// ============================================================================

bitflags::bitflags! {
    /// Global feature switches that administrators may flip at runtime.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Toggles: u8 {
        const RITUAL = 1;
        const TOGGLE_GUI = 1 << 1;
        const CREATION_REMINDER = 1 << 2;
        const WORLD_PLACEMENT = 1 << 3;
        const WORLD_PICKUP = 1 << 4;
    }
}

/// Named handle for one [`Toggles`] flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Toggle {
    Ritual,
    ToggleGui,
    CreationReminder,
    WorldPlacement,
    WorldPickup,
}

impl Toggle {
    pub const fn flag(self) -> Toggles {
        match self {
            Toggle::Ritual => Toggles::RITUAL,
            Toggle::ToggleGui => Toggles::TOGGLE_GUI,
            Toggle::CreationReminder => Toggles::CREATION_REMINDER,
            Toggle::WorldPlacement => Toggles::WORLD_PLACEMENT,
            Toggle::WorldPickup => Toggles::WORLD_PICKUP,
        }
    }

    pub fn all() -> impl Iterator<Item = Toggle> {
        Self::iter()
    }
}

impl Toggles {
    pub fn is_enabled(&self, toggle: Toggle) -> bool {
        self.contains(toggle.flag())
    }

    pub fn set_enabled(&mut self, toggle: Toggle, enabled: bool) {
        self.set(toggle.flag(), enabled);
    }
}

impl Default for Toggles {
    fn default() -> Self {
        Toggles::all()
    }
}

// ============================================================================
// Engine Configuration
// ============================================================================

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub effects: EffectTable,
    pub combination: CombinationRules,
    pub binding: BindingConfig,
    pub upkeep_reduction: UpkeepReductionConfig,
    /// Clamp over-ceiling levels when refreshing obsolete bundles.
    pub force_downgrade: bool,
    /// Stamp written into refreshed bundles.
    pub custom_version: Option<String>,
    pub toggles: Toggles,
}

impl EngineConfig {
    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MAX_LEVEL: u32 = 3;
    pub const DEFAULT_DURATION_TICKS: u32 = 280;

    /// Configuration with the shipped defaults for everything but the effect
    /// defaults, which must always be supplied.
    pub fn new(defaults: EffectDefaults) -> Self {
        Self {
            effects: EffectTable::new(defaults),
            combination: CombinationRules::default(),
            binding: BindingConfig::default(),
            upkeep_reduction: UpkeepReductionConfig::default(),
            force_downgrade: false,
            custom_version: None,
            toggles: Toggles::default(),
        }
    }

    /// Convenience constructor with a uniform level ceiling.
    pub fn with_max_level(max_level: u32) -> Self {
        Self::new(EffectDefaults {
            max_level,
            duration_ticks: Self::DEFAULT_DURATION_TICKS,
            hide_particles: false,
            upkeep_per_minute: 0.0,
        })
    }
}
