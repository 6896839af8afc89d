//! The closed enumeration of effect kinds a bundle can carry.

use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::ConfigError;

/// Potion effect kinds known to the host.
///
/// Keys are the host's snake_case names. Pre-flattening names used by older
/// configs and stored bundles (`fast_digging`, `increase_damage`, ...) are
/// accepted by [`EffectKind::parse`] and map to the same variant.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EffectKind {
    Speed,
    #[strum(to_string = "slowness", serialize = "slow")]
    Slowness,
    #[strum(to_string = "haste", serialize = "fast_digging")]
    Haste,
    #[strum(to_string = "mining_fatigue", serialize = "slow_digging")]
    MiningFatigue,
    #[strum(to_string = "strength", serialize = "increase_damage")]
    Strength,
    #[strum(to_string = "instant_health", serialize = "heal")]
    InstantHealth,
    #[strum(to_string = "instant_damage", serialize = "harm")]
    InstantDamage,
    #[strum(to_string = "jump_boost", serialize = "jump")]
    JumpBoost,
    #[strum(to_string = "nausea", serialize = "confusion")]
    Nausea,
    Regeneration,
    #[strum(to_string = "resistance", serialize = "damage_resistance")]
    Resistance,
    FireResistance,
    WaterBreathing,
    Invisibility,
    Blindness,
    NightVision,
    Hunger,
    Weakness,
    Poison,
    Wither,
    HealthBoost,
    Absorption,
    Saturation,
    Glowing,
    Levitation,
    Luck,
    #[strum(to_string = "unluck", serialize = "bad_luck")]
    Unluck,
    SlowFalling,
    ConduitPower,
    DolphinsGrace,
    BadOmen,
    HeroOfTheVillage,
    Darkness,
}

impl EffectKind {
    /// Parses an effect name, accepting `minecraft:` namespaces, any letter
    /// case and the legacy aliases.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let trimmed = input.trim();
        let key = trimmed.strip_prefix("minecraft:").unwrap_or(trimmed);
        key.parse()
            .map_err(|_| ConfigError::UnknownEffect(input.to_string()))
    }

    /// The canonical storage key (`jump_boost`).
    pub fn key(self) -> &'static str {
        self.into()
    }

    /// Human readable name (`Jump Boost`).
    pub fn display_name(self) -> String {
        self.key()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Iterates every kind in declaration order.
    pub fn all() -> impl Iterator<Item = EffectKind> {
        Self::iter()
    }
}
