use crate::document::{Document, ID_FIELD};
use crate::errors::{DbError, Result};
use crate::types::{DocumentId, IdGenerator};
use bson::Bson;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Documents of one collection in insertion order, indexed by `_id`.
#[derive(Debug, Default)]
pub struct Store {
    seq: u64,
    by_id: BTreeMap<DocumentId, u64>,
    docs: BTreeMap<u64, Document>,
}

impl Store {
    /// Stores `doc`, generating `_id` when missing and moving it to the front.
    pub fn insert(&mut self, doc: Document, ids: &dyn IdGenerator) -> Result<Bson> {
        let id = doc.get(ID_FIELD).cloned().unwrap_or_else(|| ids.next_id());
        let key = DocumentId(id.clone());
        if self.by_id.contains_key(&key) {
            return Err(DbError::DuplicateIdentifier(format!("duplicate key error: _id {id}")));
        }
        let mut stored = Document::new();
        stored.insert(ID_FIELD, id.clone());
        for (k, v) in doc {
            if k != ID_FIELD {
                stored.insert(k, v);
            }
        }
        self.seq += 1;
        self.docs.insert(self.seq, stored);
        self.by_id.insert(key, self.seq);
        Ok(id)
    }

    #[must_use]
    pub fn get(&self, id: &Bson) -> Option<&Document> {
        let seq = self.by_id.get(&DocumentId(id.clone()))?;
        self.docs.get(seq)
    }

    #[must_use]
    pub fn contains(&self, id: &Bson) -> bool {
        self.by_id.contains_key(&DocumentId(id.clone()))
    }

    /// Swaps in a new body for `id`, keeping its position in natural order.
    pub fn replace(&mut self, id: &Bson, doc: Document) -> bool {
        match self.by_id.get(&DocumentId(id.clone())) {
            Some(seq) => {
                self.docs.insert(*seq, doc);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &Bson) -> Option<Document> {
        let seq = self.by_id.remove(&DocumentId(id.clone()))?;
        self.docs.remove(&seq)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.docs.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

pub struct Collection {
    pub name: Arc<RwLock<String>>,
    pub(crate) store: Mutex<Store>,
    pub(crate) ids: Arc<dyn IdGenerator>,
}

impl Collection {
    pub fn new(name: String, ids: Arc<dyn IdGenerator>) -> Self {
        Self { name: Arc::new(RwLock::new(name)), store: Mutex::new(Store::default()), ids }
    }

    pub fn set_name(&self, new_name: String) {
        *self.name.write() = new_name;
    }

    /// Returns the collection's name as a String (cloned), hiding the `RwLock`.
    pub fn name_str(&self) -> String {
        self.name.read().clone()
    }

    /// Takes the collection-wide lock held for the whole of each operation.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock()
    }
}
