//! # geocache-types
//!
//! Value types shared by the geocache location index and its callers.
//!
//! - **Locations**: `GeoLocation`, `LocationKind`
//! - **Areas**: `Area`, an axis-aligned latitude/longitude box
//! - **Objects**: `TrackedObject`, `ObjectClass`, `ObjectId`
//!
//! All types are serializable with Serde and built on top of the `geo` crate's
//! geometric primitives.
//!
//! ## Examples
//!
//! ```rust
//! use geocache_types::area::Area;
//! use geocache_types::location::GeoLocation;
//!
//! let berlin = GeoLocation::gps(52.52, 13.405);
//! let europe = Area::new(35.0, -10.0, 70.0, 40.0);
//! assert!(europe.contains_location(&berlin));
//! ```

pub mod area;
pub mod location;
pub mod object;
