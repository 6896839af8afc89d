//! The host-facing facade over configuration, recipes and item blobs.

use std::sync::{Arc, RwLock};

use beacon_core::{
    EffectFilter, EffectSet, EngineConfig, Modification, ModificationContext, ModificationEngine,
    OwnerId, SpecialOperation, StationItem, StationType, calc_upkeep_per_minute,
};

use crate::api::{Result, RuntimeError};
use crate::codec::PersistenceCodec;
use crate::recipes::RecipeStore;
use crate::refresh::refresh_bundle;
use crate::repository::BlobStore;
use crate::station::{Station, StationOutcome};

/// Entry point for hosts.
///
/// Holds the active configuration and recipe store. Item operations read the
/// bundle through [`PersistenceCodec`], work on a private copy and write the
/// result back only when something changed.
pub struct BeaconEngine {
    config: RwLock<Arc<EngineConfig>>,
    recipes: RecipeStore,
}

impl BeaconEngine {
    pub fn new(config: EngineConfig, recipes: RecipeStore) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            recipes,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> Result<Arc<EngineConfig>> {
        let config = self
            .config
            .read()
            .map_err(|_| RuntimeError::ConfigLockPoisoned)?;
        Ok(Arc::clone(&config))
    }

    /// Swaps in a freshly loaded configuration.
    pub fn replace_config(&self, config: EngineConfig) -> Result<()> {
        let mut current = self
            .config
            .write()
            .map_err(|_| RuntimeError::ConfigLockPoisoned)?;
        *current = Arc::new(config);
        Ok(())
    }

    pub fn recipes(&self) -> &RecipeStore {
        &self.recipes
    }

    /// Previews the station result for two slots.
    ///
    /// Rule violations come back as [`RuntimeError::Rejected`].
    pub fn prepare(
        &self,
        station: StationType,
        left: &StationItem,
        right: &StationItem,
        actor: Option<OwnerId>,
    ) -> Result<Option<StationOutcome>> {
        let config = self.config()?;
        let table = self.recipes.snapshot()?;
        let outcome = Station::new(&config, &table).prepare(station, left, right, actor)?;
        if let Some(outcome) = &outcome {
            tracing::debug!(
                "Recipe '{}' prepared on {} for {} levels",
                outcome.recipe_id,
                station,
                outcome.exp_cost
            );
        }
        Ok(outcome)
    }

    /// Reads the bundle attached to `store`, if any.
    pub fn read_item(&self, store: &dyn BlobStore) -> Result<Option<EffectSet>> {
        PersistenceCodec::read(store)
    }

    /// Stamps `set` with the configured custom version and attaches it.
    pub fn write_item(&self, store: &dyn BlobStore, mut set: EffectSet) -> Result<()> {
        set.custom_version = self.config()?.custom_version.clone();
        PersistenceCodec::write(store, &set)
    }

    /// Applies administrative modifications to the attached bundle.
    /// Returns whether the bundle changed.
    pub fn edit_item(
        &self,
        store: &dyn BlobStore,
        modifications: &[Modification],
        special_operations: &[SpecialOperation],
        actor: Option<OwnerId>,
    ) -> Result<bool> {
        let config = self.config()?;
        let mut set = Self::load_bundle(store)?;

        let changed = ModificationEngine::new(&config).apply_all(
            &mut set,
            modifications,
            special_operations,
            &ModificationContext::new(actor),
        );
        if changed {
            self.write_item(store, set)?;
        }
        Ok(changed)
    }

    /// Sets or clears the owner of the attached bundle.
    pub fn set_owner(&self, store: &dyn BlobStore, owner: Option<OwnerId>) -> Result<bool> {
        let mut set = Self::load_bundle(store)?;
        if set.owner == owner {
            return Ok(false);
        }
        set.owner = owner;
        self.write_item(store, set)?;
        Ok(true)
    }

    /// Keeps (whitelist) or drops (blacklist) the effects matching any of
    /// `filters`.
    pub fn filter_item(
        &self,
        store: &dyn BlobStore,
        filters: &[EffectFilter],
        whitelist: bool,
    ) -> Result<bool> {
        let original = Self::load_bundle(store)?;
        let mut set = original.clone();
        set.filter(filters, whitelist);
        if set == original {
            return Ok(false);
        }
        self.write_item(store, set)?;
        Ok(true)
    }

    /// Rewrites an obsolete bundle. Items without a bundle are left alone.
    pub fn refresh_item(&self, store: &dyn BlobStore) -> Result<bool> {
        let Some(set) = PersistenceCodec::read(store)? else {
            return Ok(false);
        };
        let config = self.config()?;
        let Some(refreshed) = refresh_bundle(&set, &config) else {
            return Ok(false);
        };
        PersistenceCodec::write(store, &refreshed)?;
        tracing::debug!(
            "Refreshed bundle from v{} to v{}",
            set.schema_version,
            refreshed.schema_version
        );
        Ok(true)
    }

    /// Experience levels per minute the bundle costs to keep active.
    pub fn upkeep_per_minute(&self, set: &EffectSet) -> Result<f64> {
        let config = self.config()?;
        Ok(calc_upkeep_per_minute(set, &config))
    }

    fn load_bundle(store: &dyn BlobStore) -> Result<EffectSet> {
        PersistenceCodec::read(store)?.ok_or(RuntimeError::NotABundle)
    }
}
