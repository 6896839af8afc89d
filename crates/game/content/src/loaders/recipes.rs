//! Recipe definition loader.
//!
//! TOML format, one table per recipe under `[recipes.<id>]`:
//!
//! ```toml
//! [recipes.speed-upgrade]
//! type = "smithing-table"
//! exp-cost = 5                      # or "vanilla", "dynamic:<formula>",
//!                                   # or { formula = "...", min = 1, max = 30 }
//! special-operations = ["set-owner"]
//!
//! [recipes.speed-upgrade.input]
//! item = "sugar"
//! amount = 32
//!
//! [[recipes.speed-upgrade.modifications]]
//! action = "add"
//! effects = { speed = 1, binding = 1 }
//! ```
//!
//! Combination recipes use `kind = "combination"` with optional
//! `max-effects` and `combine-effects-additively` overrides.

use std::collections::BTreeMap;
use std::path::Path;

use beacon_core::{
    CombinationOverride, ConfigError, DynamicFormula, ExpCostCalculator, InputShape, LevelOp,
    MergePolicy, Modification, Recipe, RecipeAction, SpecialOperation, StationType,
    VirtualEffectSet,
};
use serde::{Deserialize, Serialize};
use toml::{Table, Value};
use uuid::Uuid;

use crate::loaders::{LoadResult, read_file};

pub const KIND_COMBINATION: &str = "combination";
pub const KIND_MODIFICATION: &str = "modification";

// ============================================================================
// Raw Records
// ============================================================================

/// On-disk shape of one recipe. Scalars precede tables so the record
/// serializes back into valid TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawRecipe {
    #[serde(rename = "type")]
    pub station: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_effects: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combine_effects_additively: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub special_operations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp_cost: Option<RawExpCost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<RawInput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifications: Vec<RawModification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawExpCost {
    Fixed(u32),
    Text(String),
    Formula {
        formula: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawInput {
    pub item: String,
    #[serde(default = "default_amount")]
    pub amount: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub enchantments: BTreeMap<String, u32>,
}

fn default_amount() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawModification {
    pub action: String,
    #[serde(default)]
    pub effects: BTreeMap<String, RawEntry>,
}

/// A level, or an owner id for the owner keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawEntry {
    Level(u32),
    Text(String),
}

// ============================================================================
// Conversion
// ============================================================================

impl RawRecipe {
    /// Validates the record and builds a [`Recipe`].
    pub fn into_recipe(self, id: &str) -> Result<Recipe, ConfigError> {
        let station = StationType::parse(&self.station)?;
        let input = self.input.map(|raw| {
            let mut shape = InputShape::new(&raw.item, raw.amount);
            for (key, level) in &raw.enchantments {
                shape = shape.with_enchantment(key, *level);
            }
            shape
        });

        let kind = match self.kind.as_deref() {
            Some(kind) => kind.to_ascii_lowercase(),
            None if input.is_some() => KIND_MODIFICATION.to_string(),
            None => KIND_COMBINATION.to_string(),
        };

        let action = match kind.as_str() {
            KIND_COMBINATION => {
                RecipeAction::Combine(CombinationOverride {
                    policy: self.combine_effects_additively.map(MergePolicy::from_additive),
                    max_effects: self.max_effects.map(|max| max as usize),
                })
            }
            KIND_MODIFICATION => {
                if input.is_none() {
                    return Err(ConfigError::invalid_value(
                        format!("recipes.{id}.input"),
                        "modification recipes require an input",
                    ));
                }
                let modifications = self
                    .modifications
                    .iter()
                    .map(|raw| raw.to_modification(id))
                    .collect::<Result<Vec<_>, _>>()?;
                let special_operations = self
                    .special_operations
                    .iter()
                    .map(|name| SpecialOperation::parse(name))
                    .collect::<Result<Vec<_>, _>>()?;
                RecipeAction::Modify {
                    modifications,
                    special_operations,
                }
            }
            other => {
                return Err(ConfigError::invalid_value(
                    format!("recipes.{id}.kind"),
                    format!("'{other}' is not {KIND_COMBINATION} or {KIND_MODIFICATION}"),
                ));
            }
        };

        let exp_cost = match self.exp_cost {
            None => ExpCostCalculator::default(),
            Some(RawExpCost::Fixed(levels)) => ExpCostCalculator::Fixed(levels),
            Some(RawExpCost::Text(text)) => ExpCostCalculator::parse(&text)?,
            Some(RawExpCost::Formula { formula, min, max }) => {
                ExpCostCalculator::Dynamic(DynamicFormula::parse(&formula)?.with_bounds(min, max)?)
            }
        };

        Ok(Recipe {
            id: id.to_string(),
            station,
            input,
            action,
            exp_cost,
            enabled: self.enabled.unwrap_or(true),
        })
    }

    /// The on-disk record for `recipe`.
    pub fn from_recipe(recipe: &Recipe) -> Self {
        let mut raw = RawRecipe {
            station: recipe.station.to_string(),
            enabled: Some(recipe.enabled),
            exp_cost: Some(match &recipe.exp_cost {
                ExpCostCalculator::Fixed(levels) => RawExpCost::Fixed(*levels),
                ExpCostCalculator::Dynamic(formula) if formula.min.is_some() || formula.max.is_some() => {
                    RawExpCost::Formula {
                        formula: formula.source().to_string(),
                        min: formula.min,
                        max: formula.max,
                    }
                }
                other => RawExpCost::Text(other.to_string()),
            }),
            input: recipe.input.as_ref().map(|shape| RawInput {
                item: shape.item.clone(),
                amount: shape.amount,
                enchantments: shape.enchantments.clone(),
            }),
            ..RawRecipe::default()
        };

        match &recipe.action {
            RecipeAction::Combine(rules) => {
                raw.kind = Some(KIND_COMBINATION.to_string());
                raw.max_effects = rules.max_effects.map(|max| max as u32);
                raw.combine_effects_additively =
                    rules.policy.map(|policy| policy == MergePolicy::Additive);
            }
            RecipeAction::Modify {
                modifications,
                special_operations,
            } => {
                raw.kind = Some(KIND_MODIFICATION.to_string());
                raw.modifications = modifications.iter().map(RawModification::from_modification).collect();
                raw.special_operations = special_operations.iter().map(ToString::to_string).collect();
            }
        }
        raw
    }
}

impl RawModification {
    fn to_modification(&self, id: &str) -> Result<Modification, ConfigError> {
        let op: LevelOp = self
            .action
            .parse()
            .map_err(|_| ConfigError::UnknownAction(self.action.clone()))?;

        let mut virtual_effects = VirtualEffectSet::new();
        for (key, entry) in &self.effects {
            match entry {
                RawEntry::Level(level) => virtual_effects.set_entry(key, *level)?,
                RawEntry::Text(text) if beacon_core::modify::OWNER_KEYS.contains(&key.as_str()) => {
                    let owner = Uuid::parse_str(text).map_err(|e| {
                        ConfigError::invalid_value(format!("recipes.{id}.modifications.{key}"), e.to_string())
                    })?;
                    virtual_effects.owner = Some(owner);
                }
                RawEntry::Text(text) => {
                    return Err(ConfigError::invalid_value(
                        format!("recipes.{id}.modifications.{key}"),
                        format!("'{text}' is not a level"),
                    ));
                }
            }
        }

        Ok(Modification::new(op, virtual_effects))
    }

    fn from_modification(modification: &Modification) -> Self {
        let operand = &modification.virtual_effects;
        let mut effects: BTreeMap<String, RawEntry> = operand
            .effects
            .iter()
            .map(|(kind, level)| (kind.key().to_string(), RawEntry::Level(*level)))
            .collect();
        if let Some(level) = operand.binding_level {
            effects.insert("binding".to_string(), RawEntry::Level(level));
        }
        if let Some(level) = operand.upkeep_reduction_level {
            effects.insert("upkeep-reduction".to_string(), RawEntry::Level(level));
        }
        if let Some(owner) = operand.owner {
            effects.insert("owner".to_string(), RawEntry::Text(owner.to_string()));
        }
        Self {
            action: modification.op.to_string(),
            effects,
        }
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Loader for recipe definitions from TOML files.
pub struct RecipeLoader;

impl RecipeLoader {
    /// Load every valid recipe from `path`, in file order.
    ///
    /// A missing file yields no recipes. Malformed entries are logged and
    /// skipped.
    pub fn load(path: &Path) -> LoadResult<Vec<Recipe>> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "recipe file not found, no recipes loaded");
            return Ok(Vec::new());
        }
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| e.context(format!("Failed to load recipes {}", path.display())))
    }

    /// Parse recipe definitions from TOML text.
    pub fn parse(content: &str) -> LoadResult<Vec<Recipe>> {
        let table: Table = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse recipes TOML: {}", e))?;

        let Some(entries) = table.get("recipes") else {
            tracing::info!("Loaded 0 recipes");
            return Ok(Vec::new());
        };
        let entries = entries
            .as_table()
            .ok_or_else(|| anyhow::anyhow!("'recipes' must be a table"))?;

        let mut recipes = Vec::with_capacity(entries.len());
        for (id, value) in entries {
            match parse_entry(id, value) {
                Ok(recipe) => recipes.push(recipe),
                Err(e) => tracing::warn!("Skipping erroneous recipe '{}': {}", id, e),
            }
        }

        tracing::info!("Loaded {} recipes", recipes.len());
        Ok(recipes)
    }
}

fn parse_entry(id: &str, value: &Value) -> LoadResult<Recipe> {
    let raw: RawRecipe = value.clone().try_into()?;
    Ok(raw.into_recipe(id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::{EffectKind, StationItem};

    const RECIPES: &str = r#"
[recipes.anvil-combination]
type = "anvil"
kind = "combination"
max-effects = 4
exp-cost = "vanilla"

[recipes.speed-upgrade]
type = "smithing-table"
special-operations = ["set-soulbound-owner"]
exp-cost = { formula = "level * 2", min = 1, max = 30 }

[recipes.speed-upgrade.input]
item = "minecraft:sugar"
amount = 32

[[recipes.speed-upgrade.modifications]]
action = "add"
effects = { speed = 1, binding = 1 }

[recipes.broken]
type = "loom"

[recipes.no-input]
type = "anvil"
kind = "modification"

[recipes.bad-formula]
type = "anvil"
exp-cost = "dynamic:level +"

[recipes.unbind]
type = "anvil"
enabled = false
exp-cost = 2

[recipes.unbind.input]
item = "enchanted_book"
enchantments = { "minecraft:mending" = 1 }

[[recipes.unbind.modifications]]
action = "remove"
effects = { binding = 5, owner = "00000000-0000-0000-0000-000000000007" }
"#;

    #[test]
    fn loads_valid_recipes_in_file_order() {
        let recipes = RecipeLoader::parse(RECIPES).unwrap();
        let ids: Vec<_> = recipes.iter().map(|recipe| recipe.id.as_str()).collect();
        assert_eq!(ids, vec!["anvil-combination", "speed-upgrade", "unbind"]);
    }

    #[test]
    fn combination_recipe_overrides_rules() {
        let recipes = RecipeLoader::parse(RECIPES).unwrap();
        let combination = &recipes[0];

        assert_eq!(combination.station, StationType::Anvil);
        assert_eq!(combination.exp_cost, ExpCostCalculator::Vanilla);
        let RecipeAction::Combine(rules) = &combination.action else {
            panic!("expected combination rules");
        };
        assert_eq!(rules.max_effects, Some(4));
        assert_eq!(rules.policy, None);
        assert!(combination.enabled);
    }

    #[test]
    fn modification_recipe_fields() {
        let recipes = RecipeLoader::parse(RECIPES).unwrap();
        let upgrade = &recipes[1];

        let shape = upgrade.input.as_ref().unwrap();
        assert!(shape.matches(&StationItem::new("sugar", 32)));
        let RecipeAction::Modify {
            modifications,
            special_operations,
        } = &upgrade.action
        else {
            panic!("expected modification recipe");
        };
        assert_eq!(modifications[0].op, LevelOp::Add);
        assert_eq!(
            modifications[0].virtual_effects.effects.get(&EffectKind::Speed),
            Some(&1)
        );
        assert_eq!(modifications[0].virtual_effects.binding_level, Some(1));
        assert_eq!(special_operations, &vec![SpecialOperation::SetOwner]);
        let ExpCostCalculator::Dynamic(formula) = &upgrade.exp_cost else {
            panic!("expected dynamic cost");
        };
        assert_eq!((formula.min, formula.max), (Some(1.0), Some(30.0)));

        let unbind = &recipes[2];
        assert!(!unbind.enabled);
        assert_eq!(unbind.exp_cost, ExpCostCalculator::Fixed(2));
        let RecipeAction::Modify { modifications, .. } = &unbind.action else {
            panic!("expected modification recipe");
        };
        assert_eq!(modifications[0].op, LevelOp::Subtract);
        assert_eq!(
            modifications[0].virtual_effects.owner,
            Some(Uuid::from_u128(7))
        );
    }

    #[test]
    fn raw_record_survives_save_and_reload() {
        let recipes = RecipeLoader::parse(RECIPES).unwrap();
        for recipe in &recipes {
            let raw = RawRecipe::from_recipe(recipe);
            let reloaded = raw.into_recipe(&recipe.id).unwrap();
            assert_eq!(&reloaded, recipe);
        }
    }

    #[test]
    fn missing_file_and_section_yield_no_recipes() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RecipeLoader::load(&dir.path().join("recipes.toml")).unwrap().is_empty());
        assert!(RecipeLoader::parse("").unwrap().is_empty());
        assert!(RecipeLoader::parse("recipes = 3").is_err());
    }
}
