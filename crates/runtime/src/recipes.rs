//! In-memory recipe table with wholesale reload.
//!
//! Lookups work on an immutable [`RecipeTable`] snapshot. A reload builds a
//! complete new table from the recipe file and swaps it in; entries are never
//! edited in place. Administrative create/enable/disable calls only rewrite
//! the file and take effect on the next reload.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use beacon_content::{RecipeFile, RecipeLoader};
use beacon_core::{Recipe, StationType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecipeStoreError {
    #[error("recipe table lock was poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Content(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RecipeStoreError>;

/// An immutable, ordered view of the loaded recipes.
#[derive(Clone, Debug, Default)]
pub struct RecipeTable {
    enabled: Vec<Recipe>,
    disabled: BTreeSet<String>,
}

impl RecipeTable {
    /// Splits `recipes` into the enabled list (file order kept) and the set
    /// of disabled ids.
    pub fn from_recipes(recipes: impl IntoIterator<Item = Recipe>) -> Self {
        let mut table = Self::default();
        for recipe in recipes {
            if recipe.enabled {
                table.disabled.remove(&recipe.id);
                table.enabled.retain(|existing| existing.id != recipe.id);
                table.enabled.push(recipe);
            } else {
                table.enabled.retain(|existing| existing.id != recipe.id);
                table.disabled.insert(recipe.id);
            }
        }
        table
    }

    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.enabled.iter().find(|recipe| recipe.id == id)
    }

    pub fn is_disabled(&self, id: &str) -> bool {
        self.disabled.contains(id)
    }

    pub fn disabled_ids(&self) -> impl Iterator<Item = &str> {
        self.disabled.iter().map(String::as_str)
    }

    /// Enabled recipes in file order.
    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.enabled.iter()
    }

    /// Enabled recipes for `station`, in file order.
    pub fn for_station(&self, station: StationType) -> impl Iterator<Item = &Recipe> {
        self.enabled
            .iter()
            .filter(move |recipe| recipe.station == station)
    }

    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

/// Recipe table backed by the recipe definition file.
pub struct RecipeStore {
    file: RecipeFile,
    table: RwLock<Arc<RecipeTable>>,
}

impl RecipeStore {
    /// Opens the store and loads `path`. A missing file yields no recipes.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(path);
        store.reload()?;
        Ok(store)
    }

    /// Creates a store with an empty table; call [`reload`](Self::reload) to
    /// read the file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: RecipeFile::new(path),
            table: RwLock::new(Arc::new(RecipeTable::default())),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Rebuilds the table from the file and swaps it in.
    ///
    /// On failure the previous table stays active. Returns the number of
    /// enabled recipes.
    pub fn reload(&self) -> Result<usize> {
        let recipes = RecipeLoader::load(self.file.path())?;
        let table = RecipeTable::from_recipes(recipes);
        let count = table.len();
        self.replace(table)?;
        tracing::debug!(
            "Recipe table swapped from {} ({} enabled)",
            self.file.path().display(),
            count
        );
        Ok(count)
    }

    /// Swaps in a prebuilt table.
    pub fn replace(&self, table: RecipeTable) -> Result<()> {
        let mut current = self
            .table
            .write()
            .map_err(|_| RecipeStoreError::LockPoisoned)?;
        *current = Arc::new(table);
        Ok(())
    }

    /// The current table. Later reloads do not affect a taken snapshot.
    pub fn snapshot(&self) -> Result<Arc<RecipeTable>> {
        let current = self
            .table
            .read()
            .map_err(|_| RecipeStoreError::LockPoisoned)?;
        Ok(Arc::clone(&current))
    }

    /// Appends a recipe to the file. Visible after the next reload.
    pub fn create(&self, recipe: &Recipe) -> Result<()> {
        self.file.create(recipe)?;
        Ok(())
    }

    /// Enables or disables a recipe in the file. Visible after the next reload.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        self.file.set_enabled(id, enabled)?;
        Ok(())
    }
}
