use crate::location::GeoLocation;
use geo::Rect;
use serde::{Deserialize, Serialize};

/// An axis-aligned latitude/longitude bounding box.
///
/// Used both as a query argument and as the result of viewport coverage
/// computation. This is a wrapper around `geo::Rect` with x = longitude and
/// y = latitude; corners are normalized on construction so the minimum is
/// always below the maximum. All containment tests are inclusive of the
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Area {
    /// The underlying geometric rectangle
    pub rect: Rect<f64>,
}

impl Area {
    /// Create a new area from its latitude and longitude bounds.
    ///
    /// # Arguments
    ///
    /// * `lat_min` - Southern edge in degrees
    /// * `lon_min` - Western edge in degrees
    /// * `lat_max` - Northern edge in degrees
    /// * `lon_max` - Eastern edge in degrees
    ///
    /// # Examples
    ///
    /// ```
    /// use geocache_types::area::Area;
    ///
    /// let area = Area::new(0.0, 0.0, 15.0, 25.0);
    /// assert_eq!(area.lat_max(), 15.0);
    /// assert_eq!(area.lon_max(), 25.0);
    /// ```
    pub fn new(lat_min: f64, lon_min: f64, lat_max: f64, lon_max: f64) -> Self {
        Self {
            rect: Rect::new(
                geo::coord! { x: lon_min, y: lat_min },
                geo::coord! { x: lon_max, y: lat_max },
            ),
        }
    }

    /// The whole globe: latitude [-90, 90], longitude [-180, 180].
    pub fn world() -> Self {
        Self::new(-90.0, -180.0, 90.0, 180.0)
    }

    /// Create an area from a `geo::Rect` (x = longitude, y = latitude).
    pub fn from_rect(rect: Rect<f64>) -> Self {
        Self { rect }
    }

    pub fn lat_min(&self) -> f64 {
        self.rect.min().y
    }

    pub fn lon_min(&self) -> f64 {
        self.rect.min().x
    }

    pub fn lat_max(&self) -> f64 {
        self.rect.max().y
    }

    pub fn lon_max(&self) -> f64 {
        self.rect.max().x
    }

    /// Extent in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.lat_max() - self.lat_min()
    }

    /// Extent in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.lon_max() - self.lon_min()
    }

    /// Midpoint of the area as `(latitude, longitude)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.lat_min() + self.lat_max()) / 2.0,
            (self.lon_min() + self.lon_max()) / 2.0,
        )
    }

    /// Check if a coordinate lies inside the area, boundaries included.
    #[inline]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.lat_min()
            && latitude <= self.lat_max()
            && longitude >= self.lon_min()
            && longitude <= self.lon_max()
    }

    /// Check if a location lies inside the area. Unset locations never do.
    pub fn contains_location(&self, location: &GeoLocation) -> bool {
        location.is_set() && self.contains(location.latitude(), location.longitude())
    }

    /// Check if this area shares at least one point with another.
    #[inline]
    pub fn intersects(&self, other: &Area) -> bool {
        !(self.lat_max() < other.lat_min()
            || self.lat_min() > other.lat_max()
            || self.lon_max() < other.lon_min()
            || self.lon_min() > other.lon_max())
    }

    /// Whether all four bounds are finite numbers.
    pub fn is_finite(&self) -> bool {
        [self.lat_min(), self.lon_min(), self.lat_max(), self.lon_max()]
            .iter()
            .all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_creation() {
        let area = Area::new(-5.0, 10.0, 5.0, 20.0);
        assert_eq!(area.lat_min(), -5.0);
        assert_eq!(area.lon_min(), 10.0);
        assert_eq!(area.lat_max(), 5.0);
        assert_eq!(area.lon_max(), 20.0);
        assert_eq!(area.height(), 10.0);
        assert_eq!(area.width(), 10.0);
        assert_eq!(area.center(), (0.0, 15.0));
    }

    #[test]
    fn test_area_normalizes_swapped_corners() {
        let area = Area::new(5.0, 20.0, -5.0, 10.0);
        assert_eq!(area.lat_min(), -5.0);
        assert_eq!(area.lon_min(), 10.0);
        assert_eq!(area.lat_max(), 5.0);
        assert_eq!(area.lon_max(), 20.0);
    }

    #[test]
    fn test_area_contains_is_inclusive() {
        let area = Area::new(0.0, 0.0, 10.0, 10.0);
        assert!(area.contains(5.0, 5.0));
        assert!(area.contains(0.0, 0.0));
        assert!(area.contains(10.0, 10.0));
        assert!(!area.contains(-0.1, 5.0));
        assert!(!area.contains(5.0, 10.1));
        assert!(!area.contains(f64::NAN, 5.0));
    }

    #[test]
    fn test_area_contains_location() {
        let area = Area::new(0.0, 0.0, 10.0, 10.0);
        assert!(area.contains_location(&GeoLocation::gps(1.0, 1.0)));
        assert!(!area.contains_location(&GeoLocation::unset()));
    }

    #[test]
    fn test_area_intersects() {
        let a = Area::new(0.0, 0.0, 10.0, 10.0);
        let b = Area::new(5.0, 5.0, 15.0, 15.0);
        let c = Area::new(20.0, 20.0, 30.0, 30.0);
        let touching = Area::new(10.0, 10.0, 12.0, 12.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(a.intersects(&touching));
    }

    #[test]
    fn test_world_covers_globe() {
        let world = Area::world();
        assert!(world.contains(90.0, 180.0));
        assert!(world.contains(-90.0, -180.0));
        assert!(world.is_finite());
    }
}
