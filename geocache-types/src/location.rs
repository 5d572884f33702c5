use geo::Point;
use serde::{Deserialize, Serialize};

/// How a geographic location was determined.
///
/// `Unset` is an explicit "no location" state; objects carrying it never
/// participate in spatial indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    #[default]
    Unset,
    /// Entered by an operator.
    Manual,
    /// Reported by a GPS receiver on the device.
    Gps,
    /// Derived from network information (e.g. cell or Wi-Fi positioning).
    Network,
}

/// A geographic coordinate together with the way it was obtained.
///
/// Coordinates are stored as a `geo::Point` with x = longitude and
/// y = latitude. Ranges are not enforced: malformed values pass through
/// untouched and are only rejected where they would break a computation
/// (see the projection functions in `geocache`).
///
/// # Examples
///
/// ```
/// use geocache_types::location::{GeoLocation, LocationKind};
///
/// let loc = GeoLocation::new(LocationKind::Manual, 48.8566, 2.3522);
/// assert_eq!(loc.latitude(), 48.8566);
/// assert_eq!(loc.longitude(), 2.3522);
/// assert!(loc.is_set());
///
/// assert!(!GeoLocation::unset().is_set());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    kind: LocationKind,
    point: Point<f64>,
}

impl GeoLocation {
    /// Create a location of the given kind from latitude and longitude in degrees.
    #[inline]
    pub fn new(kind: LocationKind, latitude: f64, longitude: f64) -> Self {
        Self {
            kind,
            point: Point::new(longitude, latitude),
        }
    }

    /// The "no location" value.
    #[inline]
    pub fn unset() -> Self {
        Self::new(LocationKind::Unset, 0.0, 0.0)
    }

    /// Shorthand for a manually entered location.
    #[inline]
    pub fn manual(latitude: f64, longitude: f64) -> Self {
        Self::new(LocationKind::Manual, latitude, longitude)
    }

    /// Shorthand for a GPS-reported location.
    #[inline]
    pub fn gps(latitude: f64, longitude: f64) -> Self {
        Self::new(LocationKind::Gps, latitude, longitude)
    }

    #[inline]
    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    /// Latitude in degrees.
    #[inline]
    pub fn latitude(&self) -> f64 {
        self.point.y()
    }

    /// Longitude in degrees.
    #[inline]
    pub fn longitude(&self) -> f64 {
        self.point.x()
    }

    /// Whether this location participates in indexing (`kind != Unset`).
    #[inline]
    pub fn is_set(&self) -> bool {
        self.kind != LocationKind::Unset
    }

    /// Whether both coordinates are finite numbers.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.latitude().is_finite() && self.longitude().is_finite()
    }

    /// Whether two locations describe the same indexed position.
    ///
    /// Two unset locations are always the same place regardless of their
    /// stored coordinates. The kind is ignored otherwise, so a manual fix
    /// being confirmed by GPS at the same coordinates is not a move.
    /// Malformed coordinates are compared as delivered: `NaN` matches `NaN`.
    pub fn same_position(&self, other: &GeoLocation) -> bool {
        match (self.is_set(), other.is_set()) {
            (false, false) => true,
            (true, true) => {
                same_coordinate(self.latitude(), other.latitude())
                    && same_coordinate(self.longitude(), other.longitude())
            }
            _ => false,
        }
    }

    /// Access the inner `geo::Point` (x = longitude, y = latitude).
    #[inline]
    pub fn point(&self) -> &Point<f64> {
        &self.point
    }
}

#[inline]
fn same_coordinate(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl Default for GeoLocation {
    fn default() -> Self {
        Self::unset()
    }
}
