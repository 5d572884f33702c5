//! Error types for the location cache.

use thiserror::Error;

/// Errors reported by the cache and its projection functions.
///
/// Expected conditions (unset locations, untracked classes, queries before the
/// first sync) are not errors and never produce one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoCacheError {
    /// The forward Mercator projection is undefined at or beyond the poles.
    #[error("latitude {latitude} cannot be projected: Mercator is singular at or beyond ±90°")]
    ProjectionSingularity { latitude: f64 },

    /// A location with `LocationKind::Unset` was passed where coordinates are required.
    #[error("location is unset")]
    UnsetLocation,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, GeoCacheError>;
