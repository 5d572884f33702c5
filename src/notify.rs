//! Fan-out of location changes to registered listeners.
//!
//! Listeners are called synchronously, in registration order, on the thread
//! that applied the change. They must return quickly; a listener that blocks
//! stalls the writer.

use geocache_types::location::GeoLocation;
use geocache_types::object::TrackedObject;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives location changes from a [`GeoLocationCache`](crate::GeoLocationCache).
///
/// Any `Fn(&TrackedObject, Option<&GeoLocation>) + Send + Sync` closure is a
/// listener.
pub trait LocationListener: Send + Sync {
    /// An object was added to, moved within, or removed from the index.
    ///
    /// `object.location` is the new location (unset for a removal) and
    /// `previous` is the indexed location before the change, `None` when the
    /// object was not indexed before.
    fn location_changed(&self, object: &TrackedObject, previous: Option<&GeoLocation>);

    /// The cache was rebuilt from a full directory snapshot.
    fn cache_reloaded(&self) {}
}

impl<F> LocationListener for F
where
    F: Fn(&TrackedObject, Option<&GeoLocation>) + Send + Sync,
{
    fn location_changed(&self, object: &TrackedObject, previous: Option<&GeoLocation>) {
        self(object, previous)
    }
}

/// Handle returned by [`ChangeNotifier::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// One change that altered the indexed state.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationChange {
    pub object: TrackedObject,
    pub previous: Option<GeoLocation>,
}

#[derive(Default)]
pub struct ChangeNotifier {
    listeners: RwLock<Vec<(SubscriptionId, Arc<dyn LocationListener>)>>,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn LocationListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn notify(&self, object: &TrackedObject, previous: Option<&GeoLocation>) {
        for listener in self.snapshot() {
            listener.location_changed(object, previous);
        }
    }

    /// Deliver a batch of changes, in order, to every listener.
    pub fn notify_all(&self, changes: &[LocationChange]) {
        if changes.is_empty() {
            return;
        }
        let listeners = self.snapshot();
        for change in changes {
            for listener in &listeners {
                listener.location_changed(&change.object, change.previous.as_ref());
            }
        }
    }

    pub fn notify_reloaded(&self) {
        for listener in self.snapshot() {
            listener.cache_reloaded();
        }
    }

    /// Copy the listener list so callbacks run without holding the registry
    /// lock and may unsubscribe themselves.
    fn snapshot(&self) -> Vec<Arc<dyn LocationListener>> {
        self.listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
