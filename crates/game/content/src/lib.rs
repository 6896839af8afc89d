//! Data-driven configuration and recipe loaders.
//!
//! This crate reads the structured-text inputs of the engine:
//! - Engine configuration (TOML, with in-memory migration of legacy keys)
//! - Recipe definitions (TOML, one `[recipes.<id>]` table per recipe)
//!
//! It also owns the comment-preserving editor used by administrative
//! create/enable/disable operations on the recipe file.
//!
//! All loaders produce `beacon-core` types; malformed entries are logged and
//! skipped rather than failing the whole load.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    CONFIG_VERSION, ConfigLoader, LoadResult, RawRecipe, RecipeFile, RecipeLoader,
    migrate_legacy_keys,
};
