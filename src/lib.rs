pub mod collection;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod logger;
pub mod query;
pub mod types;
pub mod utils;

pub use crate::query::telemetry;

use crate::collection::Collection;
use crate::config::EngineConfig;
use crate::document::Document;
use crate::engine::Engine;
use crate::errors::{DbError, Result};
use crate::query::{Cursor, DeleteReport, FindAndModify, FindOptions, UpdateOptions, UpdateReport};
use bson::Bson;
use std::path::Path;
use std::sync::Arc;

/// The main database struct: named collections plus the query API.
#[derive(Debug, Default)]
pub struct Database {
    engine: Arc<Engine>,
}

impl Database {
    /// Creates an empty in-memory database with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self { engine: Arc::new(Engine::new()) }
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self { engine: Arc::new(Engine::with_config(config)) }
    }

    /// Loads the config (optional TOML file, then `DOCMOCK_*` environment),
    /// installs file logging when configured, and builds the database.
    ///
    /// # Errors
    /// Returns `DbError::Config` or `DbError::Io` when the config or logging setup fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = EngineConfig::load(config_path)?;
        config.init_logging()?;
        Ok(Self::with_config(config))
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Returns the named collection, creating it when missing.
    pub fn create_collection(&self, name: &str) -> Arc<Collection> {
        self.engine.create_collection(name)
    }

    /// Retrieves a collection by its name.
    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.engine.get_collection(name)
    }

    /// Deletes a collection by its name.
    pub fn delete_collection(&self, name: &str) -> bool {
        self.engine.delete_collection(name)
    }

    /// Lists the names of all collections.
    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        self.engine.list_collection_names()
    }

    /// Rename a collection.
    pub fn rename_collection(&self, old: &str, new: &str) -> Result<()> {
        self.engine.rename_collection(old, new)
    }

    fn collection(&self, name: &str) -> Result<Arc<Collection>> {
        self.engine.get_collection(name).ok_or_else(|| DbError::NoSuchCollection(name.to_string()))
    }

    /// Inserts a document into the specified collection.
    pub fn insert_document(&self, collection_name: &str, document: Document) -> Result<Bson> {
        self.collection(collection_name)?.insert_document(document)
    }

    pub fn insert_many(&self, collection_name: &str, documents: Vec<Document>) -> Result<Vec<Bson>> {
        self.collection(collection_name)?.insert_many(documents)
    }

    // --- Query API (façade over query module) ---
    pub fn find(&self, collection_name: &str, query: &Document, opts: &FindOptions) -> Result<Cursor> {
        crate::query::find_docs(&self.collection(collection_name)?, query, opts)
    }

    pub fn count(&self, collection_name: &str, query: &Document) -> Result<usize> {
        crate::query::count_docs(&self.collection(collection_name)?, query)
    }

    pub fn update(
        &self,
        collection_name: &str,
        query: &Document,
        update: &Document,
        opts: &UpdateOptions,
    ) -> Result<UpdateReport> {
        crate::query::update(&self.collection(collection_name)?, query, update, opts)
    }

    pub fn update_one(&self, collection_name: &str, query: &Document, update: &Document) -> Result<UpdateReport> {
        crate::query::update_one(&self.collection(collection_name)?, query, update, false)
    }

    pub fn update_many(&self, collection_name: &str, query: &Document, update: &Document) -> Result<UpdateReport> {
        crate::query::update_many(&self.collection(collection_name)?, query, update, false)
    }

    pub fn delete_many(&self, collection_name: &str, query: &Document) -> Result<DeleteReport> {
        crate::query::delete_many(&self.collection(collection_name)?, query)
    }

    pub fn delete_one(&self, collection_name: &str, query: &Document) -> Result<DeleteReport> {
        crate::query::delete_one(&self.collection(collection_name)?, query)
    }

    pub fn find_and_modify(&self, collection_name: &str, req: &FindAndModify) -> Result<Option<Document>> {
        crate::query::find_and_modify(&self.collection(collection_name)?, req)
    }
}
