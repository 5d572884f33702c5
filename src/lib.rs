//! Live geographic location index of monitored objects for map rendering.
//!
//! ## Features
//! - **Spatial index**: arena quadtree over latitude/longitude with O(1) removal by id
//! - **Incremental sync**: full snapshots and per-object change events from an object directory
//! - **Consistent reads**: one reader/writer lock guards the object store and index together
//! - **Change notifications**: listeners hear about every insert, move, and removal
//! - **Projection**: Web-Mercator world pixels and viewport coverage areas
//!
//! ```rust
//! use geocache::{Anchor, DirectoryEvent, GeoLocation, GeoLocationCache, ObjectClass, TrackedObject};
//!
//! let cache = GeoLocationCache::new();
//! cache.handle(DirectoryEvent::FullSync(
//!     vec![
//!         TrackedObject::new(1, ObjectClass::Node, "berlin-gw", GeoLocation::gps(52.52, 13.40)),
//!         TrackedObject::new(2, ObjectClass::Node, "tokyo-gw", GeoLocation::gps(35.68, 139.69)),
//!     ]
//!     .into_iter()
//!     .collect(),
//! ));
//!
//! // What does a 1024x768 map centered on Berlin at zoom 6 show?
//! let area = cache.coverage((1024, 768), &GeoLocation::manual(52.52, 13.40), Anchor::Center, 6)?;
//! let visible = cache.objects_in(&area);
//! assert_eq!(visible.len(), 1);
//! assert_eq!(visible[0].name, "berlin-gw");
//! # Ok::<(), geocache::GeoCacheError>(())
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod directory;
pub mod error;
pub mod index;
pub mod notify;
pub mod projection;
pub mod store;

pub use builder::CacheBuilder;
pub use cache::{CacheStats, GeoLocationCache, Phase};
pub use config::{CacheConfig, DispatchMode};
pub use directory::{DirectoryEvent, FullSyncSnapshot};
pub use error::{GeoCacheError, Result};
pub use index::SpatialIndex;
pub use notify::{ChangeNotifier, LocationChange, LocationListener, SubscriptionId};
pub use projection::{Anchor, MAX_MERCATOR_LATITUDE, MAX_ZOOM, TILE_SIZE};
pub use store::ObjectStore;

pub use geo::Rect;
pub use geocache_types::area::Area;
pub use geocache_types::location::{GeoLocation, LocationKind};
pub use geocache_types::object::{ObjectClass, ObjectId, TrackedObject};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{CacheBuilder, GeoCacheError, GeoLocationCache, Result};

    pub use crate::{Area, GeoLocation, LocationKind, ObjectClass, ObjectId, TrackedObject};

    pub use crate::{DirectoryEvent, FullSyncSnapshot};

    pub use crate::{LocationListener, SubscriptionId};

    pub use crate::projection::{Anchor, coverage, from_world_pixel, to_world_pixel};

    pub use crate::{CacheConfig, DispatchMode};
}
