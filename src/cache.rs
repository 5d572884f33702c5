//! The location cache: object store and spatial index kept in sync with the
//! object directory.
//!
//! One reader/writer lock guards the store and the index as a unit, so a
//! query always sees both in the state left by some complete write. Writers
//! are additionally serialized by a gate mutex, which lets a full resync
//! rebuild fresh structures without holding the reader lock and then swap
//! them in at once.

use geocache_types::area::Area;
use geocache_types::location::GeoLocation;
use geocache_types::object::{ObjectId, TrackedObject};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{CacheConfig, DispatchMode};
use crate::directory::{DirectoryEvent, FullSyncSnapshot};
use crate::error::{GeoCacheError, Result};
use crate::index::SpatialIndex;
use crate::notify::{ChangeNotifier, LocationChange, LocationListener, SubscriptionId};
use crate::projection::{self, Anchor};
use crate::store::ObjectStore;

/// Lifecycle of a cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No full snapshot received yet; queries return nothing.
    Uninitialized,
    /// A full snapshot is being loaded. Queries still see the previous contents.
    BulkLoading,
    Ready,
}

/// Point-in-time counters, read under a single lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub phase: Phase,
    /// Objects in the store.
    pub objects: usize,
    /// Points in the spatial index.
    pub indexed: usize,
    pub listeners: usize,
}

#[derive(Debug)]
struct CacheState {
    phase: Phase,
    store: ObjectStore,
    index: SpatialIndex,
}

impl CacheState {
    /// Apply one object snapshot. Returns the change if the indexed state moved.
    fn apply(&mut self, object: TrackedObject, config: &CacheConfig) -> Option<LocationChange> {
        let id = object.id;

        if !config.tracks(object.class) {
            // Never admitted; only evicts a stale entry if the class changed.
            return self.evict(id, Some(object));
        }

        if !object.location.is_set() {
            return self.evict(id, Some(object));
        }

        let location = object.location;
        match self.store.get(id).map(|old| old.location) {
            None => {
                self.index
                    .insert(location.latitude(), location.longitude(), id);
                self.store.put(object.clone());
                log::trace!("Object {} added at {:?}", id, location);
                Some(LocationChange {
                    object,
                    previous: None,
                })
            }
            Some(previous) if previous.same_position(&location) => {
                self.store.put(object);
                None
            }
            Some(previous) => {
                self.index.remove(id);
                self.index
                    .insert(location.latitude(), location.longitude(), id);
                self.store.put(object.clone());
                log::trace!("Object {} moved from {:?} to {:?}", id, previous, location);
                Some(LocationChange {
                    object,
                    previous: Some(previous),
                })
            }
        }
    }

    /// Drop `id` from store and index. `current` is the snapshot reported to
    /// listeners; without one the stored snapshot is reported with its location unset.
    fn evict(&mut self, id: ObjectId, current: Option<TrackedObject>) -> Option<LocationChange> {
        let old = self.store.remove(id)?;
        if !self.index.remove(id) {
            log::warn!("Object {} was stored but not indexed", id);
        }
        log::trace!("Object {} removed from {:?}", id, old.location);

        let previous = old.location;
        let object = current.unwrap_or(old).with_location(GeoLocation::unset());
        Some(LocationChange {
            object,
            previous: Some(previous),
        })
    }
}

/// Live index of object locations for map rendering.
///
/// Construct one per application and share it with `Arc`; the cache is
/// `Send + Sync`. Feed it [`DirectoryEvent`]s from a single writer and query
/// it from any number of threads.
///
/// ```rust
/// use geocache::{Area, DirectoryEvent, GeoLocation, GeoLocationCache, ObjectClass, TrackedObject};
///
/// let cache = GeoLocationCache::new();
/// cache.handle(DirectoryEvent::FullSync(
///     vec![TrackedObject::new(1, ObjectClass::Node, "core", GeoLocation::gps(10.0, 20.0))]
///         .into_iter()
///         .collect(),
/// ));
///
/// let visible = cache.objects_in(&Area::new(0.0, 0.0, 15.0, 25.0));
/// assert_eq!(visible.len(), 1);
/// ```
#[derive(Debug)]
pub struct GeoLocationCache {
    state: RwLock<CacheState>,
    write_gate: Mutex<()>,
    notifier: ChangeNotifier,
    config: CacheConfig,
}

impl GeoLocationCache {
    /// Create a cache with the default configuration.
    pub fn new() -> Self {
        Self::build(CacheConfig::default())
    }

    /// Create a cache with a custom configuration.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate().map_err(GeoCacheError::InvalidConfig)?;
        Ok(Self::build(config))
    }

    pub fn builder() -> crate::builder::CacheBuilder {
        crate::builder::CacheBuilder::new()
    }

    fn build(config: CacheConfig) -> Self {
        Self {
            state: RwLock::new(CacheState {
                phase: Phase::Uninitialized,
                store: ObjectStore::new(),
                index: SpatialIndex::new(config.node_capacity, config.max_depth),
            }),
            write_gate: Mutex::new(()),
            notifier: ChangeNotifier::new(),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Apply an event from the object directory.
    ///
    /// Returns whether the indexed state changed (always `true` for a full sync).
    pub fn handle(&self, event: DirectoryEvent) -> bool {
        match event {
            DirectoryEvent::FullSync(snapshot) => {
                self.bulk_load(snapshot);
                true
            }
            DirectoryEvent::ObjectChanged { object } => self.apply_change(object),
            DirectoryEvent::ObjectDeleted { id } => self.apply_delete(id),
        }
    }

    /// Replace the cache contents with a full snapshot. Returns the number of
    /// objects indexed.
    ///
    /// Fresh structures are built while queries keep reading the old ones,
    /// then swapped in under the write lock.
    pub fn bulk_load(&self, snapshot: FullSyncSnapshot) -> usize {
        let gate = self.write_gate.lock();

        let previous_phase = {
            let mut state = self.state.write();
            std::mem::replace(&mut state.phase, Phase::BulkLoading)
        };
        if previous_phase == Phase::Ready {
            log::info!(
                "Resynchronizing location cache from {} directory objects",
                snapshot.objects.len()
            );
        } else {
            log::debug!(
                "Loading location cache from {} directory objects",
                snapshot.objects.len()
            );
        }

        let started = Instant::now();
        let mut store = ObjectStore::with_capacity(snapshot.objects.len());
        let mut index = SpatialIndex::new(self.config.node_capacity, self.config.max_depth);

        for object in snapshot.objects {
            if !self.config.tracks(object.class) || !object.location.is_set() {
                continue;
            }
            let id = object.id;
            let location = object.location;
            if store.put(object).is_some() {
                log::warn!("Object {} appears more than once in snapshot", id);
                index.remove(id);
            }
            index.insert(location.latitude(), location.longitude(), id);
        }

        let indexed = index.len();
        let mut state = self.state.write();
        state.store = store;
        state.index = index;
        state.phase = Phase::Ready;

        log::debug!(
            "Location cache ready: {} objects indexed in {:?}",
            indexed,
            started.elapsed()
        );

        match self.config.dispatch_mode {
            DispatchMode::UnderLock => self.notifier.notify_reloaded(),
            DispatchMode::Deferred => {
                drop(state);
                drop(gate);
                self.notifier.notify_reloaded();
            }
        }

        indexed
    }

    /// Apply a create/update of one object. Returns whether the indexed state changed.
    ///
    /// Changes arriving before the first full sync are dropped: the snapshot
    /// that completes initialization supersedes them.
    pub fn apply_change(&self, object: TrackedObject) -> bool {
        let gate = self.write_gate.lock();
        let mut state = self.state.write();

        if state.phase == Phase::Uninitialized {
            log::debug!("Ignoring change of object {} before initial sync", object.id);
            return false;
        }

        let change = state.apply(object, &self.config);
        let changed = change.is_some();

        if let Some(change) = change {
            match self.config.dispatch_mode {
                DispatchMode::UnderLock => {
                    self.notifier
                        .notify(&change.object, change.previous.as_ref());
                }
                DispatchMode::Deferred => {
                    drop(state);
                    drop(gate);
                    self.notifier.notify_all(std::slice::from_ref(&change));
                }
            }
        }

        changed
    }

    /// Remove an object deleted from the directory. Returns whether it was indexed.
    pub fn apply_delete(&self, id: ObjectId) -> bool {
        let gate = self.write_gate.lock();
        let mut state = self.state.write();

        let Some(change) = state.evict(id, None) else {
            return false;
        };

        match self.config.dispatch_mode {
            DispatchMode::UnderLock => {
                self.notifier
                    .notify(&change.object, change.previous.as_ref());
            }
            DispatchMode::Deferred => {
                drop(state);
                drop(gate);
                self.notifier.notify_all(std::slice::from_ref(&change));
            }
        }

        true
    }

    /// All cached objects located within `area`, boundaries included.
    ///
    /// Returns an empty list before the first full sync. Order is unspecified.
    pub fn objects_in(&self, area: &Area) -> Vec<TrackedObject> {
        self.objects_in_filtered(area, None, None)
    }

    /// Like [`objects_in`](Self::objects_in), keeping only objects below the
    /// container `root` whose name contains `name_filter` (case-insensitive).
    ///
    /// A `root` of `None` or `Some(0)` does not restrict the result.
    pub fn objects_in_filtered(
        &self,
        area: &Area,
        root: Option<ObjectId>,
        name_filter: Option<&str>,
    ) -> Vec<TrackedObject> {
        let root = root.filter(|&id| id != 0);
        let state = self.state.read();
        let ids = state.index.query(area);

        let mut missing = 0usize;
        let objects = ids
            .into_iter()
            .filter_map(|id| {
                let object = state.store.get(id);
                if object.is_none() {
                    missing += 1;
                }
                object
            })
            .filter(|object| root.is_none_or(|root| object.is_under(root)))
            .filter(|object| name_filter.is_none_or(|filter| object.name_matches(filter)))
            .cloned()
            .collect();

        if missing > 0 {
            log::warn!("{} indexed ids had no stored snapshot", missing);
        }
        objects
    }

    /// Last known snapshot of an indexed object.
    pub fn object(&self, id: ObjectId) -> Option<TrackedObject> {
        self.state.read().store.get(id).cloned()
    }

    /// Indexed location of an object.
    pub fn location_of(&self, id: ObjectId) -> Option<GeoLocation> {
        self.state.read().store.get(id).map(|object| object.location)
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.state.read().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn phase(&self) -> Phase {
        self.state.read().phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Ready
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.read();
        CacheStats {
            phase: state.phase,
            objects: state.store.len(),
            indexed: state.index.len(),
            listeners: self.notifier.listener_count(),
        }
    }

    /// Register a listener for location changes.
    ///
    /// With [`DispatchMode::UnderLock`] the listener runs while the cache
    /// write lock is held and must not call back into the cache.
    pub fn subscribe(&self, listener: Arc<dyn LocationListener>) -> SubscriptionId {
        self.notifier.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    fn check_zoom(&self, zoom: u32) -> Result<()> {
        if zoom > self.config.max_zoom {
            return Err(GeoCacheError::InvalidInput(format!(
                "zoom {} exceeds configured maximum {}",
                zoom, self.config.max_zoom
            )));
        }
        Ok(())
    }

    /// See [`projection::coverage`].
    pub fn coverage(
        &self,
        viewport_size: (u32, u32),
        base_point: &GeoLocation,
        anchor: Anchor,
        zoom: u32,
    ) -> Result<Area> {
        self.check_zoom(zoom)?;
        projection::coverage(viewport_size, base_point, anchor, zoom)
    }

    /// See [`projection::to_world_pixel`].
    pub fn to_world_pixel(&self, location: &GeoLocation, zoom: u32) -> Result<(f64, f64)> {
        self.check_zoom(zoom)?;
        projection::to_world_pixel(location, zoom)
    }

    /// See [`projection::from_world_pixel`].
    pub fn from_world_pixel(&self, x: f64, y: f64, zoom: u32) -> Result<GeoLocation> {
        self.check_zoom(zoom)?;
        projection::from_world_pixel(x, y, zoom)
    }

    /// See [`projection::display_to_location`].
    pub fn display_to_location(
        &self,
        x: f64,
        y: f64,
        zoom: u32,
        normalize: bool,
    ) -> Result<GeoLocation> {
        self.check_zoom(zoom)?;
        projection::display_to_location(x, y, zoom, normalize)
    }

    /// See [`projection::virtual_map_size`].
    pub fn virtual_map_size(&self, zoom: u32) -> Result<(u64, u64)> {
        self.check_zoom(zoom)?;
        projection::virtual_map_size(zoom)
    }
}

impl Default for GeoLocationCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geocache_types::object::ObjectClass;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn node(id: ObjectId, lat: f64, lon: f64) -> TrackedObject {
        TrackedObject::new(id, ObjectClass::Node, format!("node-{}", id), GeoLocation::gps(lat, lon))
    }

    fn ready_cache(objects: Vec<TrackedObject>) -> GeoLocationCache {
        let cache = GeoLocationCache::new();
        cache.bulk_load(FullSyncSnapshot::new(objects));
        cache
    }

    fn counting_listener(cache: &GeoLocationCache) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        cache.subscribe(Arc::new(move |_: &TrackedObject, _: Option<&GeoLocation>| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));
        count
    }

    #[test]
    fn test_uninitialized_cache_is_empty() {
        let cache = GeoLocationCache::new();
        assert_eq!(cache.phase(), Phase::Uninitialized);
        assert!(cache.objects_in(&Area::world()).is_empty());

        // Changes before the first sync are dropped.
        assert!(!cache.apply_change(node(1, 1.0, 1.0)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_bulk_load_skips_ineligible_objects() {
        let cache = ready_cache(vec![
            node(1, 10.0, 20.0),
            TrackedObject::new(2, ObjectClass::Node, "nowhere", GeoLocation::unset()),
            TrackedObject::new(3, ObjectClass::Subnet, "net", GeoLocation::gps(1.0, 1.0)),
        ]);

        assert!(cache.is_ready());
        assert_eq!(cache.len(), 1);
        assert!(cache.location_of(2).is_none());
        assert!(cache.location_of(3).is_none());
    }

    #[test]
    fn test_bulk_load_duplicate_ids_keep_last() {
        let cache = ready_cache(vec![node(1, 10.0, 10.0), node(1, -10.0, -10.0)]);
        let stats = cache.stats();
        assert_eq!(stats.objects, 1);
        assert_eq!(stats.indexed, 1);
        assert_eq!(cache.location_of(1).unwrap().latitude(), -10.0);
    }

    #[test]
    fn test_apply_insert_move_remove() {
        let cache = ready_cache(Vec::new());
        let count = counting_listener(&cache);

        assert!(cache.apply_change(node(5, 1.0, 1.0)));
        assert!(cache.apply_change(node(5, 2.0, 2.0)));
        assert!(cache.apply_delete(5));
        assert!(!cache.apply_delete(5));

        assert_eq!(count.load(Ordering::Relaxed), 3);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().indexed, 0);
    }

    #[test]
    fn test_unchanged_location_updates_snapshot_silently() {
        let cache = ready_cache(vec![node(1, 1.0, 1.0)]);
        let count = counting_listener(&cache);

        let renamed = TrackedObject::new(1, ObjectClass::Node, "renamed", GeoLocation::manual(1.0, 1.0));
        assert!(!cache.apply_change(renamed));

        assert_eq!(count.load(Ordering::Relaxed), 0);
        assert_eq!(cache.object(1).unwrap().name, "renamed");
    }

    #[test]
    fn test_unset_for_unknown_object_is_noop() {
        let cache = ready_cache(Vec::new());
        let count = counting_listener(&cache);

        let obj = TrackedObject::new(8, ObjectClass::Node, "x", GeoLocation::unset());
        assert!(!cache.apply_change(obj));
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_untracked_class_is_ignored() {
        let config = CacheConfig::default().with_tracked_classes([ObjectClass::MobileDevice]);
        let cache = GeoLocationCache::with_config(config).unwrap();
        cache.bulk_load(FullSyncSnapshot::default());

        assert!(!cache.apply_change(node(1, 1.0, 1.0)));
        assert!(cache.is_empty());

        let phone = TrackedObject::new(2, ObjectClass::MobileDevice, "phone", GeoLocation::gps(1.0, 1.0));
        assert!(cache.apply_change(phone));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_deleted_object_reported_with_unset_location() {
        let cache = ready_cache(vec![node(4, 3.0, 4.0)]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        cache.subscribe(Arc::new(move |obj: &TrackedObject, prev: Option<&GeoLocation>| {
            sink.lock().push((obj.clone(), prev.copied()));
        }));

        cache.handle(DirectoryEvent::ObjectDeleted { id: 4 });

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.id, 4);
        assert_eq!(seen[0].0.name, "node-4");
        assert!(!seen[0].0.location.is_set());
        assert_eq!(seen[0].1, Some(GeoLocation::gps(3.0, 4.0)));
    }

    #[test]
    fn test_name_filter() {
        let cache = ready_cache(vec![
            TrackedObject::new(1, ObjectClass::Node, "Core-Router", GeoLocation::gps(1.0, 1.0)),
            TrackedObject::new(2, ObjectClass::Node, "Edge-Switch", GeoLocation::gps(1.0, 1.0)),
        ]);

        let found = cache.objects_in_filtered(&Area::world(), None, Some("router"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
        assert_eq!(cache.objects_in_filtered(&Area::world(), None, None).len(), 2);
    }

    #[test]
    fn test_root_filter() {
        let cache = ready_cache(vec![
            node(1, 1.0, 1.0).with_parents([100]),
            node(2, 2.0, 2.0).with_parents([100, 200]),
            node(3, 3.0, 3.0).with_parents([200]),
            node(4, 4.0, 4.0),
        ]);
        let ids = |root| {
            let mut ids: Vec<_> = cache
                .objects_in_filtered(&Area::world(), root, None)
                .into_iter()
                .map(|o| o.id)
                .collect();
            ids.sort_unstable();
            ids
        };

        assert_eq!(ids(Some(100)), vec![1, 2]);
        assert_eq!(ids(Some(200)), vec![2, 3]);
        assert!(ids(Some(300)).is_empty());
        assert_eq!(ids(Some(0)), vec![1, 2, 3, 4]);
        assert_eq!(ids(None), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_class_change_to_untracked_evicts() {
        let cache = ready_cache(vec![node(6, 12.0, 34.0)]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        cache.subscribe(Arc::new(move |obj: &TrackedObject, prev: Option<&GeoLocation>| {
            sink.lock().push((obj.clone(), prev.copied()));
        }));

        let subnet = TrackedObject::new(6, ObjectClass::Subnet, "node-6", GeoLocation::gps(12.0, 34.0));
        assert!(cache.apply_change(subnet));

        assert!(cache.object(6).is_none());
        assert!(cache.objects_in(&Area::world()).is_empty());
        assert_eq!(cache.stats().indexed, 0);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.class, ObjectClass::Subnet);
        assert!(!seen[0].0.location.is_set());
        assert_eq!(seen[0].1, Some(GeoLocation::gps(12.0, 34.0)));
    }

    #[test]
    fn test_zoom_limited_by_config() {
        let cache = GeoLocationCache::with_config(CacheConfig::default().with_max_zoom(5)).unwrap();
        let base = GeoLocation::manual(0.0, 0.0);
        assert!(cache.coverage((100, 100), &base, Anchor::Center, 5).is_ok());
        assert!(matches!(
            cache.coverage((100, 100), &base, Anchor::Center, 6),
            Err(GeoCacheError::InvalidInput(_))
        ));
        assert_eq!(cache.virtual_map_size(5).unwrap(), (8192, 8192));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = GeoLocationCache::with_config(CacheConfig {
            tracked_classes: Vec::new(),
            ..CacheConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, GeoCacheError::InvalidConfig(_)));
    }

    #[test]
    fn test_listener_may_query_cache_in_deferred_mode() {
        let cache = Arc::new(ready_cache(Vec::new()));
        let seen = Arc::new(AtomicUsize::new(0));

        let reader = Arc::downgrade(&cache);
        let sink = seen.clone();
        cache.subscribe(Arc::new(move |_: &TrackedObject, _: Option<&GeoLocation>| {
            if let Some(cache) = reader.upgrade() {
                sink.store(cache.objects_in(&Area::world()).len(), Ordering::SeqCst);
            }
        }));

        cache.apply_change(node(1, 1.0, 1.0));
        cache.apply_change(node(2, 2.0, 2.0));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
