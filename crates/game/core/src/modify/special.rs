use strum::{Display, EnumIter, EnumString};

use super::ModificationContext;
use crate::effects::EffectSet;
use crate::error::ConfigError;

/// Post-processing steps that run after the level operations of a recipe or
/// modification list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum SpecialOperation {
    /// Stamps the invoking actor as owner.
    #[strum(to_string = "set-owner", serialize = "set-soulbound-owner")]
    SetOwner,
}

impl SpecialOperation {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        input
            .trim()
            .parse()
            .map_err(|_| ConfigError::UnknownSpecialOperation(input.to_string()))
    }

    /// Runs the operation. Returns true if `target` changed.
    pub fn apply(&self, target: &mut EffectSet, ctx: &ModificationContext) -> bool {
        match self {
            SpecialOperation::SetOwner => match ctx.actor {
                Some(actor) if target.owner != Some(actor) => {
                    target.owner = Some(actor);
                    true
                }
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn parses_current_and_legacy_names() {
        assert_eq!(
            SpecialOperation::parse("set-owner").unwrap(),
            SpecialOperation::SetOwner
        );
        assert_eq!(
            SpecialOperation::parse("SET-SOULBOUND-OWNER").unwrap(),
            SpecialOperation::SetOwner
        );
        assert_eq!(SpecialOperation::SetOwner.to_string(), "set-owner");
        assert!(SpecialOperation::parse("explode").is_err());
    }

    #[test]
    fn set_owner_without_actor_is_a_no_op() {
        let mut target = EffectSet::new();
        assert!(!SpecialOperation::SetOwner.apply(&mut target, &ModificationContext::default()));
        assert_eq!(target.owner, None);

        let actor = Uuid::from_u128(4);
        let ctx = ModificationContext::new(Some(actor));
        assert!(SpecialOperation::SetOwner.apply(&mut target, &ctx));
        assert!(!SpecialOperation::SetOwner.apply(&mut target, &ctx));
    }
}
