//! Experience cost of a combination or recipe.

mod formula;

pub use formula::{BinaryOp, DynamicFormula, Expr, Function, Variable, parse_expr};

use std::fmt;

use crate::effects::EffectSet;
use crate::error::ConfigError;

/// Vanilla unit cost of a bundle: `Σ 1 << level`, saturating.
pub fn vanilla_unit_cost(set: &EffectSet) -> u32 {
    set.effects.values().fold(0u32, |total, level| {
        let unit = 1u32.checked_shl(*level).unwrap_or(u32::MAX);
        total.saturating_add(unit)
    })
}

/// Inputs available to a cost calculation.
#[derive(Clone, Copy, Debug)]
pub struct CostContext<'a> {
    pub primary: &'a EffectSet,
    /// The second bundle of a bundle + bundle combination.
    pub secondary: Option<&'a EffectSet>,
    /// The bundle that would be produced.
    pub result: Option<&'a EffectSet>,
    /// Catalyst enchantments that apply, for bundle + catalyst combinations.
    pub applicable_catalysts: u32,
    pub tier: u32,
}

impl<'a> CostContext<'a> {
    pub fn new(primary: &'a EffectSet) -> Self {
        Self {
            primary,
            secondary: None,
            result: None,
            applicable_catalysts: 0,
            tier: 0,
        }
    }

    #[must_use]
    pub fn with_secondary(mut self, secondary: &'a EffectSet) -> Self {
        self.secondary = Some(secondary);
        self
    }

    #[must_use]
    pub fn with_result(mut self, result: &'a EffectSet) -> Self {
        self.result = Some(result);
        self
    }

    #[must_use]
    pub fn with_catalysts(mut self, applicable: u32) -> Self {
        self.applicable_catalysts = applicable;
        self
    }

    #[must_use]
    pub fn with_tier(mut self, tier: u32) -> Self {
        self.tier = tier;
        self
    }

    /// The vanilla-curve cost of this context.
    pub fn vanilla_cost(&self) -> u32 {
        if let Some(secondary) = self.secondary {
            vanilla_unit_cost(self.primary).saturating_add(vanilla_unit_cost(secondary))
        } else if self.applicable_catalysts > 0 {
            vanilla_unit_cost(self.primary).saturating_mul(self.applicable_catalysts)
        } else {
            vanilla_unit_cost(self.result.unwrap_or(self.primary))
        }
    }

    /// Value of a formula variable in this context.
    pub fn variable(&self, variable: Variable) -> f64 {
        let result = self.result.unwrap_or(self.primary);
        let value = match variable {
            Variable::Level => self.primary.total_levels(),
            Variable::Effects => self.primary.len() as u32,
            Variable::MaxLevel => self.primary.max_level(),
            Variable::InputLevel => self.secondary.map_or(0, EffectSet::total_levels),
            Variable::InputEffects => self.secondary.map_or(0, |set| set.len() as u32),
            Variable::ResultLevel => result.total_levels(),
            Variable::ResultEffects => result.len() as u32,
            Variable::Binding => self.primary.binding_level,
            Variable::UpkeepReduction => self.primary.upkeep_reduction_level,
            Variable::Catalysts => self.applicable_catalysts,
            Variable::Tier => self.tier,
            Variable::Vanilla => self.vanilla_cost(),
        };
        f64::from(value)
    }
}

/// How much experience an operation costs.
#[derive(Clone, Debug, PartialEq)]
pub enum ExpCostCalculator {
    Fixed(u32),
    /// Derived from the bundles involved with the `1 << level` unit cost.
    Vanilla,
    Dynamic(DynamicFormula),
}

impl ExpCostCalculator {
    pub const DYNAMIC_PREFIX: &'static str = "dynamic:";

    /// Parses `vanilla`, a whole number, or `dynamic:<formula>`.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("vanilla") {
            return Ok(Self::Vanilla);
        }
        if let Some(source) = trimmed.strip_prefix(Self::DYNAMIC_PREFIX) {
            return DynamicFormula::parse(source).map(Self::Dynamic);
        }
        trimmed.parse().map(Self::Fixed).map_err(|_| {
            ConfigError::invalid_value(
                "exp-cost",
                format!("'{input}' is not vanilla, a number or dynamic:<formula>"),
            )
        })
    }

    pub fn cost(&self, ctx: &CostContext<'_>) -> u32 {
        match self {
            ExpCostCalculator::Fixed(levels) => *levels,
            ExpCostCalculator::Vanilla => ctx.vanilla_cost(),
            ExpCostCalculator::Dynamic(formula) => {
                formula.evaluate(&|variable| ctx.variable(variable))
            }
        }
    }
}

impl Default for ExpCostCalculator {
    fn default() -> Self {
        Self::Fixed(0)
    }
}

impl fmt::Display for ExpCostCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpCostCalculator::Fixed(levels) => write!(f, "{levels}"),
            ExpCostCalculator::Vanilla => f.write_str("vanilla"),
            ExpCostCalculator::Dynamic(formula) => write!(f, "{}{formula}", Self::DYNAMIC_PREFIX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectKind;

    #[test]
    fn fixed_cost_ignores_context() {
        let fixed = ExpCostCalculator::Fixed(3);
        let empty = EffectSet::new();
        let full = EffectSet::from_effects([(EffectKind::Speed, 9), (EffectKind::Luck, 4)]);

        assert_eq!(fixed.cost(&CostContext::new(&empty)), 3);
        assert_eq!(
            fixed.cost(&CostContext::new(&full).with_secondary(&full).with_tier(2)),
            3
        );
    }

    #[test]
    fn vanilla_curve_follows_inputs() {
        let a = EffectSet::from_effects([(EffectKind::Speed, 2), (EffectKind::Luck, 1)]);
        let b = EffectSet::from_effects([(EffectKind::Speed, 3)]);

        assert_eq!(vanilla_unit_cost(&a), 6);
        let vanilla = ExpCostCalculator::Vanilla;
        assert_eq!(vanilla.cost(&CostContext::new(&a).with_secondary(&b)), 14);
        assert_eq!(vanilla.cost(&CostContext::new(&a).with_catalysts(2)), 12);
        assert_eq!(vanilla.cost(&CostContext::new(&a).with_result(&b)), 8);
    }

    #[test]
    fn vanilla_unit_cost_saturates() {
        let huge = EffectSet::from_effects([(EffectKind::Speed, 40), (EffectKind::Luck, 31)]);
        assert_eq!(vanilla_unit_cost(&huge), u32::MAX);
    }

    #[test]
    fn dynamic_formula_reads_context() {
        let a = EffectSet::from_effects([(EffectKind::Speed, 2), (EffectKind::Luck, 1)]);
        let b = EffectSet::from_effects([(EffectKind::Speed, 3)]);
        let ctx = CostContext::new(&a).with_secondary(&b).with_tier(1);

        let cost = ExpCostCalculator::parse("dynamic:level + input_level * 2 + tier").unwrap();
        assert_eq!(cost.cost(&ctx), 10);

        let vanilla_based = ExpCostCalculator::parse("dynamic: vanilla / 2").unwrap();
        assert_eq!(vanilla_based.cost(&ctx), 7);
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(
            ExpCostCalculator::parse("VANILLA").unwrap(),
            ExpCostCalculator::Vanilla
        );
        assert_eq!(
            ExpCostCalculator::parse(" 5 ").unwrap(),
            ExpCostCalculator::Fixed(5)
        );
        let dynamic = ExpCostCalculator::parse("dynamic:effects * 3").unwrap();
        assert_eq!(dynamic.to_string(), "dynamic:effects * 3");
        assert!(ExpCostCalculator::parse("-1").is_err());
        assert!(ExpCostCalculator::parse("dynamic:effects *").is_err());
    }
}
