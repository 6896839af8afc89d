//! Combination-station flow: pick the recipe for two slots and run it.

use beacon_core::{EffectSet, EngineConfig, OwnerId, Rejection, StationItem, StationType};

use crate::recipes::RecipeTable;

/// Result of a successful station preview.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StationOutcome {
    pub recipe_id: String,
    pub effects: EffectSet,
    pub exp_cost: u32,
}

/// A station view over one recipe table snapshot and configuration.
pub struct Station<'a> {
    config: &'a EngineConfig,
    recipes: &'a RecipeTable,
}

impl<'a> Station<'a> {
    pub fn new(config: &'a EngineConfig, recipes: &'a RecipeTable) -> Self {
        Self { config, recipes }
    }

    /// Runs the first enabled recipe for `station` that applies to the two
    /// slots. `Ok(None)` means no recipe applies; a matching recipe that
    /// refuses the inputs yields its [`Rejection`]. Neither item is mutated.
    pub fn prepare(
        &self,
        station: StationType,
        left: &StationItem,
        right: &StationItem,
        actor: Option<OwnerId>,
    ) -> Result<Option<StationOutcome>, Rejection> {
        let Some(recipe) = self
            .recipes
            .for_station(station)
            .find(|recipe| recipe.is_applicable_to(left, right))
        else {
            return Ok(None);
        };

        let output = recipe.apply(left, right, self.config, actor)?;
        Ok(Some(StationOutcome {
            recipe_id: recipe.id.clone(),
            effects: output.effects,
            exp_cost: output.exp_cost,
        }))
    }
}
