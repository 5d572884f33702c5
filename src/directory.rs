//! Events delivered by the external object directory.
//!
//! The directory (session layer) is responsible for ordering: events for an
//! object arrive in the order they happened, one at a time.

use geocache_types::object::{ObjectId, TrackedObject};
use serde::{Deserialize, Serialize};

/// Complete set of objects known to the directory.
///
/// Delivered once at cold start and again on every forced resync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullSyncSnapshot {
    pub objects: Vec<TrackedObject>,
}

impl FullSyncSnapshot {
    pub fn new(objects: Vec<TrackedObject>) -> Self {
        Self { objects }
    }
}

impl FromIterator<TrackedObject> for FullSyncSnapshot {
    fn from_iter<I: IntoIterator<Item = TrackedObject>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DirectoryEvent {
    /// Full synchronization finished; replaces the cache contents.
    FullSync(FullSyncSnapshot),
    /// An object was created or modified. An unset location means the
    /// object currently has no place on the map.
    ObjectChanged { object: TrackedObject },
    /// An object was permanently removed from the directory.
    ObjectDeleted { id: ObjectId },
}
