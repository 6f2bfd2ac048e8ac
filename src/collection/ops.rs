use super::core::Collection;
use crate::document::{Document, ID_FIELD};
use crate::errors::{DbError, Result};
use crate::query::telemetry;
use crate::types::DocumentId;
use bson::Bson;
use std::collections::BTreeSet;

impl Collection {
    /// Inserts one document and returns its `_id`, generated when absent.
    pub fn insert_document(&self, document: Document) -> Result<Bson> {
        let mut store = self.lock();
        let res = store.insert(document, self.ids.as_ref());
        match &res {
            Ok(id) => telemetry::log_audit("insert", &self.name_str(), &id.to_string()),
            Err(e) => telemetry::log_error("insert", &self.name_str(), e),
        }
        res
    }

    /// Inserts a batch atomically: nothing is written if any `_id` clashes,
    /// generated ones included.
    pub fn insert_many(&self, documents: Vec<Document>) -> Result<Vec<Bson>> {
        let mut store = self.lock();
        let documents: Vec<Document> = documents
            .into_iter()
            .map(|mut d| {
                if !d.contains_key(ID_FIELD) {
                    d.insert(ID_FIELD, self.ids.next_id());
                }
                d
            })
            .collect();
        let mut seen = BTreeSet::new();
        for d in &documents {
            if let Some(id) = d.get(ID_FIELD)
                && (store.contains(id) || !seen.insert(DocumentId(id.clone())))
            {
                let err = DbError::DuplicateIdentifier(format!("duplicate key error: _id {id}"));
                telemetry::log_error("insert_many", &self.name_str(), &err);
                return Err(err);
            }
        }
        let mut out = Vec::with_capacity(documents.len());
        for d in documents {
            let id = store.insert(d, self.ids.as_ref())?;
            telemetry::log_audit("insert", &self.name_str(), &id.to_string());
            out.push(id);
        }
        Ok(out)
    }

    #[must_use]
    pub fn find_document(&self, id: &Bson) -> Option<Document> {
        self.lock().get(id).cloned()
    }

    /// Replaces the stored body for `id`; the `_id` is kept.
    pub fn update_document(&self, id: &Bson, new_document: Document) -> bool {
        let mut store = self.lock();
        let mut body = Document::new();
        body.insert(ID_FIELD, id.clone());
        for (k, v) in new_document {
            if k != ID_FIELD {
                body.insert(k, v);
            }
        }
        let done = store.replace(id, body);
        if done {
            telemetry::log_audit("update", &self.name_str(), &id.to_string());
        }
        done
    }

    pub fn delete_document(&self, id: &Bson) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            telemetry::log_audit("delete", &self.name_str(), &id.to_string());
        }
        removed
    }

    /// Snapshot of every document in natural (insertion) order.
    #[must_use]
    pub fn get_all_documents(&self) -> Vec<Document> {
        self.lock().iter().cloned().collect()
    }

    /// Return only the IDs of all documents, in natural order.
    #[must_use]
    pub fn list_ids(&self) -> Vec<Bson> {
        self.lock().iter().filter_map(|d| d.get(ID_FIELD).cloned()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
