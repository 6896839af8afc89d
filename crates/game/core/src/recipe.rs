//! Declarative recipes and the matcher that decides whether one applies.

use std::collections::BTreeMap;

use strum::{Display, EnumIter, EnumString};

use crate::combine::{CombinationEngine, CombineInput, EnchantmentExtraction, normalize_key};
use crate::config::{CombinationOverride, EngineConfig};
use crate::cost::{CostContext, ExpCostCalculator};
use crate::effects::{EffectSet, OwnerId};
use crate::error::{ConfigError, Rejection};
use crate::modify::{Modification, ModificationContext, ModificationEngine, SpecialOperation};

/// Where a recipe is performed.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum StationType {
    /// The combination station.
    Anvil,
    /// The alternate crafting station.
    SmithingTable,
}

impl StationType {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        input
            .trim()
            .parse()
            .map_err(|_| ConfigError::UnknownStation(input.to_string()))
    }
}

/// An item placed in a station slot, as seen by the matcher.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StationItem {
    /// Normalized item key (`beacon`, `enchanted_book`).
    pub kind: String,
    pub amount: u32,
    /// The bundle the item carries, if it is a portable beacon.
    pub bundle: Option<EffectSet>,
    pub stored_enchantments: EnchantmentExtraction,
}

impl StationItem {
    pub fn new(kind: &str, amount: u32) -> Self {
        Self {
            kind: normalize_key(kind),
            amount,
            ..Self::default()
        }
    }

    /// A single portable beacon carrying `bundle`.
    pub fn bundle(bundle: EffectSet) -> Self {
        Self {
            bundle: Some(bundle),
            ..Self::new("beacon", 1)
        }
    }

    #[must_use]
    pub fn with_enchantments(mut self, enchantments: EnchantmentExtraction) -> Self {
        self.stored_enchantments = enchantments;
        self
    }
}

/// Predicate on the non-bundle input of a recipe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputShape {
    pub item: String,
    pub amount: u32,
    /// Stored enchantments the item must carry, at least at the given level.
    pub enchantments: BTreeMap<String, u32>,
}

impl InputShape {
    pub fn new(item: &str, amount: u32) -> Self {
        Self {
            item: normalize_key(item),
            amount,
            enchantments: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_enchantment(mut self, key: &str, level: u32) -> Self {
        self.enchantments.insert(normalize_key(key), level);
        self
    }

    pub fn matches(&self, item: &StationItem) -> bool {
        item.kind == self.item
            && item.amount == self.amount
            && self.enchantments.iter().all(|(key, min)| {
                item.stored_enchantments
                    .level(key)
                    .is_some_and(|level| level >= *min)
            })
    }
}

/// What a recipe does to the bundle.
#[derive(Clone, Debug, PartialEq)]
pub enum RecipeAction {
    /// Bundle + bundle or bundle + catalyst combination under the configured
    /// rules, with any per-recipe overrides applied.
    Combine(CombinationOverride),
    Modify {
        modifications: Vec<Modification>,
        special_operations: Vec<SpecialOperation>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub station: StationType,
    /// Required for [`RecipeAction::Modify`]; combination recipes accept any
    /// bundle or catalyst.
    pub input: Option<InputShape>,
    pub action: RecipeAction,
    pub exp_cost: ExpCostCalculator,
    pub enabled: bool,
}

/// The result of a successful recipe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipeOutput {
    pub effects: EffectSet,
    pub exp_cost: u32,
}

impl Recipe {
    /// Whether this recipe can run on the two station slots.
    ///
    /// `bundle_item` must be a single item carrying a bundle. For combination
    /// recipes the second item must be a single bundle or catalyst; for
    /// modification recipes it must match the input shape.
    pub fn is_applicable_to(&self, bundle_item: &StationItem, input_item: &StationItem) -> bool {
        if bundle_item.bundle.is_none() || bundle_item.amount != 1 {
            return false;
        }
        if let Some(shape) = &self.input
            && !shape.matches(input_item)
        {
            return false;
        }
        match &self.action {
            RecipeAction::Combine(_) => {
                input_item.amount == 1
                    && (input_item.bundle.is_some() || !input_item.stored_enchantments.is_empty())
            }
            RecipeAction::Modify { .. } => self.input.is_some() && input_item.bundle.is_none(),
        }
    }

    /// Runs the recipe. Inputs are never mutated.
    pub fn apply(
        &self,
        bundle_item: &StationItem,
        input_item: &StationItem,
        config: &EngineConfig,
        actor: Option<OwnerId>,
    ) -> Result<RecipeOutput, Rejection> {
        let primary = bundle_item
            .bundle
            .as_ref()
            .ok_or(Rejection::InvalidCombination)?;

        if config.binding.owner_usage_only && !primary.is_usable_by(actor) {
            return Err(Rejection::NotOwner);
        }

        match &self.action {
            RecipeAction::Combine(rules) => {
                let rules = rules.resolve(config.combination);
                let engine = CombinationEngine::new(config);
                if let Some(secondary) = &input_item.bundle {
                    let effects =
                        engine.combine(primary, CombineInput::Bundle(secondary), &rules, actor)?;
                    let ctx = CostContext::new(primary)
                        .with_secondary(secondary)
                        .with_result(&effects);
                    let exp_cost = self.exp_cost.cost(&ctx);
                    Ok(RecipeOutput { effects, exp_cost })
                } else {
                    let catalyst = &input_item.stored_enchantments;
                    let effects =
                        engine.combine(primary, CombineInput::Catalyst(catalyst), &rules, actor)?;
                    let ctx = CostContext::new(primary)
                        .with_result(&effects)
                        .with_catalysts(engine.applicable_catalysts(catalyst));
                    let exp_cost = self.exp_cost.cost(&ctx);
                    Ok(RecipeOutput { effects, exp_cost })
                }
            }
            RecipeAction::Modify {
                modifications,
                special_operations,
            } => {
                let mut effects = primary.clone();
                ModificationEngine::new(config).apply_all(
                    &mut effects,
                    modifications,
                    special_operations,
                    &ModificationContext::new(actor),
                );
                let exp_cost = self.exp_cost.cost(&CostContext::new(primary).with_result(&effects));
                Ok(RecipeOutput { effects, exp_cost })
            }
        }
    }
}
