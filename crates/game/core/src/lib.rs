//! Deterministic rules for portable effect bundles.
//!
//! `beacon-core` defines the bundle model and the pure engines that transform
//! it (combination, modification, recipes, cost and upkeep). It performs no
//! I/O; loading lives in `beacon-content` and persistence in `beacon-runtime`.
pub mod combine;
pub mod config;
pub mod cost;
pub mod effects;
pub mod error;
pub mod modify;
pub mod recipe;
pub mod upkeep;

pub use combine::{CombinationEngine, CombineInput, EnchantmentExtraction, normalize_key};
pub use config::{
    BindingConfig, CatalystEnchantment, CombinationOverride, CombinationRules, EffectDefaults, EffectInfo, EffectTable,
    EngineConfig, MergePolicy, Toggle, Toggles, UpkeepReductionConfig,
};
pub use cost::{CostContext, DynamicFormula, ExpCostCalculator, Variable, vanilla_unit_cost};
pub use effects::{
    CURRENT_SCHEMA_VERSION, Comparison, EffectFilter, EffectKind, EffectSet, LevelOp, OwnerId,
};
pub use error::{ConfigError, EngineError, ErrorSeverity, Rejection};
pub use modify::{
    Modification, ModificationContext, ModificationEngine, SpecialOperation, VirtualEffectSet,
};
pub use recipe::{InputShape, Recipe, RecipeAction, RecipeOutput, StationItem, StationType};
pub use upkeep::calc_upkeep_per_minute;
