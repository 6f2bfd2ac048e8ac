use crate::document::compare;
use bson::Bson;
use bson::oid::ObjectId;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use uuid::Uuid;

pub type CollectionName = String;

/// Identifier of a stored document, ordered by the cross-type value order.
#[derive(Debug, Clone)]
pub struct DocumentId(pub Bson);

impl DocumentId {
    #[must_use]
    pub fn as_bson(&self) -> &Bson {
        &self.0
    }
}

impl PartialEq for DocumentId {
    fn eq(&self, other: &Self) -> bool {
        compare(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for DocumentId {}

impl PartialOrd for DocumentId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DocumentId {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(&self.0, &other.0)
    }
}

impl From<Bson> for DocumentId {
    fn from(v: Bson) -> Self {
        Self(v)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of fresh `_id` values for documents inserted without one.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Bson;
}

#[derive(Debug, Default)]
pub struct ObjectIdGenerator;

impl IdGenerator for ObjectIdGenerator {
    fn next_id(&self) -> Bson {
        Bson::ObjectId(ObjectId::new())
    }
}

/// String ids from random v4 UUIDs.
#[derive(Debug, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> Bson {
        Bson::String(Uuid::new_v4().to_string())
    }
}

/// Monotonic `Int64` ids.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicI64,
}

impl SequentialIdGenerator {
    #[must_use]
    pub fn new(start: i64) -> Self {
        Self { next: AtomicI64::new(start) }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> Bson {
        Bson::Int64(self.next.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// Reproducible ObjectIds drawn from a seeded RNG.
pub struct SeededIdGenerator {
    rng: Mutex<StdRng>,
}

impl SeededIdGenerator {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl IdGenerator for SeededIdGenerator {
    fn next_id(&self) -> Bson {
        let mut bytes = [0u8; 12];
        self.rng.lock().fill_bytes(&mut bytes);
        Bson::ObjectId(ObjectId::from_bytes(bytes))
    }
}
