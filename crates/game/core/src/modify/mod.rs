//! ADD / SET / SUBTRACT transformations of a bundle.
//!
//! Used by administrative item edits and by declarative recipes alike. The
//! ADD path clamps silently at the ceiling instead of rejecting.

mod special;

pub use special::SpecialOperation;

use std::collections::BTreeMap;
use std::str::FromStr;

use uuid::Uuid;

use crate::config::EngineConfig;
use crate::effects::{EffectKind, EffectSet, LevelOp, OwnerId};
use crate::error::ConfigError;

/// Keys addressing the auxiliary levels inside a virtual bundle.
pub const BINDING_KEYS: [&str; 2] = ["binding", "soulbound"];
pub const UPKEEP_REDUCTION_KEYS: [&str; 2] = ["upkeep-reduction", "exp-reduction"];
pub const OWNER_KEYS: [&str; 2] = ["owner", "soulbound-owner"];

/// The operand of a [`Modification`]. Absent auxiliary entries are left
/// alone, which differs from an explicit zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VirtualEffectSet {
    pub effects: BTreeMap<EffectKind, u32>,
    pub binding_level: Option<u32>,
    pub upkeep_reduction_level: Option<u32>,
    pub owner: Option<OwnerId>,
}

impl VirtualEffectSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_effects(effects: impl IntoIterator<Item = (EffectKind, u32)>) -> Self {
        Self {
            effects: effects.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Sets an entry by its textual key: an effect kind or one of the
    /// auxiliary keys.
    pub fn set_entry(&mut self, key: &str, level: u32) -> Result<(), ConfigError> {
        let key = key.trim();
        let lower = key.to_ascii_lowercase();
        if BINDING_KEYS.contains(&lower.as_str()) {
            self.binding_level = Some(level);
        } else if UPKEEP_REDUCTION_KEYS.contains(&lower.as_str()) {
            self.upkeep_reduction_level = Some(level);
        } else {
            let kind =
                EffectKind::parse(key).map_err(|_| ConfigError::UnknownEffectKey(key.to_string()))?;
            self.effects.insert(kind, level);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
            && self.binding_level.is_none()
            && self.upkeep_reduction_level.is_none()
            && self.owner.is_none()
    }

    /// Returns a [`EffectSet`] with the same levels. Absent auxiliary levels
    /// become zero.
    pub fn to_effect_set(&self) -> EffectSet {
        EffectSet::from_effects(self.effects.iter().map(|(kind, level)| (*kind, *level)))
            .with_binding(self.binding_level.unwrap_or(0), self.owner)
            .with_upkeep_reduction(self.upkeep_reduction_level.unwrap_or(0))
    }
}

/// Parses whitespace-separated `key=level` entries (`speed=2 binding=1`).
/// A bare key means level 1; `owner=<uuid>` sets the owner.
impl FromStr for VirtualEffectSet {
    type Err = ConfigError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut set = Self::new();
        for token in input.split_whitespace() {
            let (key, value) = token.split_once('=').unwrap_or((token, "1"));
            if OWNER_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
                let owner = Uuid::parse_str(value).map_err(|err| {
                    ConfigError::invalid_value(key, format!("invalid owner id: {err}"))
                })?;
                set.owner = Some(owner);
                continue;
            }
            let level: u32 = value.parse().map_err(|_| {
                ConfigError::invalid_value(key, format!("'{value}' is not a valid level"))
            })?;
            set.set_entry(key, level)?;
        }
        Ok(set)
    }
}

/// One operation with its operand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Modification {
    pub op: LevelOp,
    pub virtual_effects: VirtualEffectSet,
    /// Skip the ADD ceiling clamp. Administrative edits only.
    pub allow_overpowered: bool,
}

impl Modification {
    pub fn new(op: LevelOp, virtual_effects: VirtualEffectSet) -> Self {
        Self {
            op,
            virtual_effects,
            allow_overpowered: false,
        }
    }

    #[must_use]
    pub fn allow_overpowered(mut self) -> Self {
        self.allow_overpowered = true;
        self
    }
}

/// Who triggered a modification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModificationContext {
    pub actor: Option<OwnerId>,
}

impl ModificationContext {
    pub fn new(actor: Option<OwnerId>) -> Self {
        Self { actor }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ModificationEngine<'a> {
    config: &'a EngineConfig,
}

impl<'a> ModificationEngine<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Applies one modification to `target` in place.
    ///
    /// Returns false when there was nothing to apply: an empty operand, or a
    /// SUBTRACT that touches nothing the target holds.
    pub fn apply(&self, target: &mut EffectSet, modification: &Modification) -> bool {
        let operand = &modification.virtual_effects;
        if operand.is_empty() {
            return false;
        }
        if modification.op == LevelOp::Subtract && !Self::overlaps(target, operand) {
            return false;
        }

        let op = modification.op;
        let clamp = op == LevelOp::Add && !modification.allow_overpowered;

        for (&kind, &delta) in &operand.effects {
            let current = target.get(kind).unwrap_or(0);
            let mut level = op.fold(current, delta);
            if clamp {
                level = level.min(self.config.effects.max_level(kind).max(current));
            }
            target.set_level(kind, level);
        }

        if let Some(delta) = operand.binding_level {
            let ceiling = self.config.binding.catalyst.max_level;
            target.binding_level = Self::fold_auxiliary(target.binding_level, delta, op, clamp, ceiling);
        }
        if let Some(delta) = operand.upkeep_reduction_level {
            let ceiling = self.config.upkeep_reduction.catalyst.max_level;
            target.upkeep_reduction_level =
                Self::fold_auxiliary(target.upkeep_reduction_level, delta, op, clamp, ceiling);
        }

        if let Some(owner) = operand.owner {
            match op {
                LevelOp::Set => target.owner = Some(owner),
                LevelOp::Add => {
                    target.owner.get_or_insert(owner);
                }
                LevelOp::Subtract => {
                    if target.owner == Some(owner) {
                        target.owner = None;
                    }
                }
            }
        }

        true
    }

    /// Applies `modifications` in order, then every special operation.
    /// Returns true if any step reported a change.
    pub fn apply_all(
        &self,
        target: &mut EffectSet,
        modifications: &[Modification],
        special_operations: &[SpecialOperation],
        ctx: &ModificationContext,
    ) -> bool {
        let mut changed = false;
        for modification in modifications {
            changed |= self.apply(target, modification);
        }
        for operation in special_operations {
            changed |= operation.apply(target, ctx);
        }
        changed
    }

    fn fold_auxiliary(current: u32, delta: u32, op: LevelOp, clamp: bool, ceiling: u32) -> u32 {
        let level = op.fold(current, delta);
        if clamp {
            level.min(ceiling.max(current))
        } else {
            level
        }
    }

    fn overlaps(target: &EffectSet, operand: &VirtualEffectSet) -> bool {
        operand.effects.keys().any(|kind| target.contains(*kind))
            || operand.binding_level.is_some() && target.binding_level > 0
            || operand.upkeep_reduction_level.is_some() && target.upkeep_reduction_level > 0
            || operand.owner.is_some() && target.owner == operand.owner
    }
}
