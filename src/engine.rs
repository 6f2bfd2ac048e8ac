use crate::collection::Collection;
use crate::config::EngineConfig;
use crate::errors::{DbError, Result};
use crate::types::{CollectionName, IdGenerator};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory registry of named collections sharing one id generator.
pub struct Engine {
    pub(crate) config: EngineConfig,
    ids: Arc<dyn IdGenerator>,
    pub(crate) collections: RwLock<HashMap<CollectionName, Arc<Collection>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("collections", &self.collections.read().len())
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine with default settings; process-wide telemetry is left as is.
    #[must_use]
    pub fn new() -> Self {
        let config = EngineConfig::default();
        let ids = config.build_id_generator();
        Self { config, ids, collections: RwLock::new(HashMap::new()) }
    }

    /// Builds an engine from `config`; the limits and audit switch are pushed
    /// into the process-wide telemetry.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        config.apply_telemetry();
        let ids = config.build_id_generator();
        Self { config, ids, collections: RwLock::new(HashMap::new()) }
    }

    /// Uses `ids` instead of the generator named in the config. Telemetry is left as is.
    #[must_use]
    pub fn with_id_generator(config: EngineConfig, ids: Arc<dyn IdGenerator>) -> Self {
        Self { config, ids, collections: RwLock::new(HashMap::new()) }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the named collection, creating it when missing.
    pub fn create_collection(&self, name: impl Into<String>) -> Arc<Collection> {
        let name = name.into();
        let mut cols = self.collections.write();
        if let Some(c) = cols.get(&name) {
            return Arc::clone(c);
        }
        log::info!("create collection {name}");
        let col = Arc::new(Collection::new(name.clone(), Arc::clone(&self.ids)));
        cols.insert(name, Arc::clone(&col));
        col
    }

    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    pub fn delete_collection(&self, name: &str) -> bool {
        let removed = self.collections.write().remove(name).is_some();
        if removed {
            log::info!("drop collection {name}");
        }
        removed
    }

    /// Collection names in sorted order.
    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn rename_collection(&self, old: &str, new: &str) -> Result<()> {
        let mut cols = self.collections.write();
        if cols.contains_key(new) {
            return Err(DbError::CollectionAlreadyExists(new.to_string()));
        }
        let col = cols.remove(old).ok_or_else(|| DbError::NoSuchCollection(old.to_string()))?;
        col.set_name(new.to_string());
        cols.insert(new.to_string(), col);
        log::info!("rename collection {old} -> {new}");
        Ok(())
    }
}
