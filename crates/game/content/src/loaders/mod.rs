//! Content loaders for reading engine data from files.
//!
//! This module provides loaders that convert TOML files into `beacon-core`
//! types, plus the administrative editor for the recipe file.

pub mod config;
pub mod recipe_file;
pub mod recipes;

pub use config::{CONFIG_VERSION, ConfigLoader, migrate_legacy_keys};
pub use recipe_file::RecipeFile;
pub use recipes::{RawRecipe, RecipeLoader};

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
