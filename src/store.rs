//! Authoritative map from object id to the last applied snapshot.
//!
//! The store has no locking of its own; the cache serializes all access.

use geocache_types::object::{ObjectId, TrackedObject};
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: FxHashMap<ObjectId, TrackedObject>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the store for a bulk load of `capacity` objects.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            objects: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&TrackedObject> {
        self.objects.get(&id)
    }

    /// Store a snapshot, returning the one it replaced.
    pub fn put(&mut self, object: TrackedObject) -> Option<TrackedObject> {
        self.objects.insert(object.id, object)
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<TrackedObject> {
        self.objects.remove(&id)
    }

    pub fn values(&self) -> impl Iterator<Item = &TrackedObject> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}
