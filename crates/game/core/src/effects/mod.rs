//! Effect-set data model.
//!
//! An [`EffectSet`] is the unit persisted on an item: effect levels, the two
//! auxiliary enchantment levels, the owner and the holder's disabled kinds.

pub mod filter;
pub mod kind;
pub mod set;

pub use filter::{Comparison, EffectFilter};
pub use kind::EffectKind;
pub use set::{CURRENT_SCHEMA_VERSION, EffectSet, LevelOp, OwnerId};
