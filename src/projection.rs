//! Web-Mercator conversion between geographic coordinates and world pixels.
//!
//! World pixel space covers the whole globe at a given zoom level: the world is
//! `2^zoom × 2^zoom` tiles of [`TILE_SIZE`] pixels each, with the origin at the
//! top-left corner (longitude -180°, latitude ≈ +85.05°) and y growing
//! southwards.
//!
//! All functions are pure. Inputs that would make the math undefined are
//! rejected with an error instead of leaking `NaN` or infinities to callers.
//!
//! ```rust
//! use geocache::projection::{from_world_pixel, to_world_pixel};
//! use geocache::GeoLocation;
//!
//! let loc = GeoLocation::manual(51.5, -0.12);
//! let (x, y) = to_world_pixel(&loc, 10)?;
//! let back = from_world_pixel(x, y, 10)?;
//! assert!((back.latitude() - 51.5).abs() < 1e-9);
//! # Ok::<(), geocache::GeoCacheError>(())
//! ```

use geocache_types::area::Area;
use geocache_types::location::GeoLocation;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{GeoCacheError, Result};

/// Edge length of a map tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Highest supported zoom level. `TILE_SIZE << MAX_ZOOM` still fits in a `u64`
/// and is exactly representable as `f64`.
pub const MAX_ZOOM: u32 = 30;

/// Latitude at which the square Mercator world map ends.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// Reference point of a viewport relative to its base location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// The base point is the middle of the viewport.
    #[default]
    Center,
    /// The base point is the north-west corner.
    TopLeft,
    /// The base point is the south-east corner.
    BottomRight,
}

fn check_zoom(zoom: u32) -> Result<()> {
    if zoom > MAX_ZOOM {
        return Err(GeoCacheError::InvalidInput(format!(
            "zoom {} exceeds maximum {}",
            zoom, MAX_ZOOM
        )));
    }
    Ok(())
}

/// Number of tiles along each axis at `zoom`.
#[inline]
fn tiles(zoom: u32) -> f64 {
    (1u64 << zoom) as f64
}

/// Edge length of the world in pixels at `zoom`.
#[inline]
fn world_size(zoom: u32) -> f64 {
    tiles(zoom) * f64::from(TILE_SIZE)
}

/// Size of the whole world map in pixels at `zoom`, as `(width, height)`.
pub fn virtual_map_size(zoom: u32) -> Result<(u64, u64)> {
    check_zoom(zoom)?;
    let size = u64::from(TILE_SIZE) << zoom;
    Ok((size, size))
}

/// Project a location into world pixel space.
///
/// # Errors
///
/// - [`GeoCacheError::UnsetLocation`] if the location has no coordinates
/// - [`GeoCacheError::ProjectionSingularity`] if latitude is at or beyond ±90°
///   or not finite
/// - [`GeoCacheError::InvalidInput`] for a non-finite longitude or an
///   unsupported zoom
pub fn to_world_pixel(location: &GeoLocation, zoom: u32) -> Result<(f64, f64)> {
    check_zoom(zoom)?;
    if !location.is_set() {
        return Err(GeoCacheError::UnsetLocation);
    }

    let lat = location.latitude();
    let lon = location.longitude();

    if !lat.is_finite() || lat.abs() >= 90.0 {
        return Err(GeoCacheError::ProjectionSingularity { latitude: lat });
    }
    if !lon.is_finite() {
        return Err(GeoCacheError::InvalidInput(format!(
            "Longitude must be finite, got: {}",
            lon
        )));
    }

    let size = world_size(zoom);
    let lat_rad = lat.to_radians();

    let x = (lon + 180.0) * size / 360.0;
    let y = (1.0 - (PI / 4.0 + lat_rad / 2.0).tan().ln() / PI) / 2.0 * size;

    // tan() can still overflow to infinity for latitudes a hair below 90°.
    if !y.is_finite() {
        return Err(GeoCacheError::ProjectionSingularity { latitude: lat });
    }

    Ok((x, y))
}

/// Inverse of [`to_world_pixel`]. The result has kind `Manual`.
///
/// Pixels outside the world square are not clamped: x beyond the map yields
/// longitudes outside [-180, 180], y beyond the map yields latitudes past the
/// Mercator limit (but always strictly within ±90°).
pub fn from_world_pixel(x: f64, y: f64, zoom: u32) -> Result<GeoLocation> {
    check_zoom(zoom)?;
    if !x.is_finite() || !y.is_finite() {
        return Err(GeoCacheError::InvalidInput(format!(
            "World pixel must be finite, got: ({}, {})",
            x, y
        )));
    }

    let size = world_size(zoom);
    let lon = x / size * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y / size)).sinh().atan().to_degrees();

    Ok(GeoLocation::manual(lat, lon))
}

/// Clamp a latitude into the range the square Mercator map can display.
pub fn clamp_latitude(latitude: f64) -> f64 {
    latitude.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
}

/// Wrap a longitude into [-180, 180).
pub fn wrap_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

/// Convert a display point to a location, optionally normalizing it onto the map.
///
/// With `normalize` set, longitude is wrapped into [-180, 180) and latitude is
/// clamped to ±[`MAX_MERCATOR_LATITUDE`], which is what a panned map needs
/// when its center drifts off the edge of the world.
pub fn display_to_location(x: f64, y: f64, zoom: u32, normalize: bool) -> Result<GeoLocation> {
    let location = from_world_pixel(x, y, zoom)?;
    if !normalize {
        return Ok(location);
    }
    Ok(GeoLocation::new(
        location.kind(),
        clamp_latitude(location.latitude()),
        wrap_longitude(location.longitude()),
    ))
}

/// Geographic area covered by a viewport of `viewport_size` pixels.
///
/// `base_point` is placed according to `anchor`: in the middle of the
/// viewport for `Center`, at its north-west corner for `TopLeft` and at its
/// south-east corner for `BottomRight`.
pub fn coverage(
    viewport_size: (u32, u32),
    base_point: &GeoLocation,
    anchor: Anchor,
    zoom: u32,
) -> Result<Area> {
    let (bx, by) = to_world_pixel(base_point, zoom)?;
    let w = f64::from(viewport_size.0);
    let h = f64::from(viewport_size.1);

    let (left, top, right, bottom) = match anchor {
        Anchor::Center => (bx - w / 2.0, by - h / 2.0, bx + w / 2.0, by + h / 2.0),
        Anchor::TopLeft => (bx, by, bx + w, by + h),
        Anchor::BottomRight => (bx - w, by - h, bx, by),
    };

    let north_west = from_world_pixel(left, top, zoom)?;
    let south_east = from_world_pixel(right, bottom, zoom)?;

    Ok(Area::new(
        south_east.latitude(),
        north_west.longitude(),
        north_west.latitude(),
        south_east.longitude(),
    ))
}
