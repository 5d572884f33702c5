//! Cache builder for flexible configuration
//!
//! This module provides a builder pattern for creating a cache without
//! spelling out a full [`CacheConfig`].

use geocache_types::object::ObjectClass;

use crate::cache::GeoLocationCache;
use crate::config::{CacheConfig, DispatchMode};
use crate::error::Result;

/// Builder for a [`GeoLocationCache`].
#[derive(Debug, Default)]
pub struct CacheBuilder {
    config: CacheConfig,
}

impl CacheBuilder {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Quadtree leaf capacity before splitting.
    pub fn node_capacity(mut self, capacity: usize) -> Self {
        self.config.node_capacity = capacity;
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Object classes admitted into the cache.
    pub fn track(mut self, classes: impl IntoIterator<Item = ObjectClass>) -> Self {
        self.config.tracked_classes = classes.into_iter().collect();
        self
    }

    pub fn max_zoom(mut self, zoom: u32) -> Self {
        self.config.max_zoom = zoom;
        self
    }

    pub fn dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.config.dispatch_mode = mode;
        self
    }

    /// Validate the configuration and build the cache.
    pub fn build(self) -> Result<GeoLocationCache> {
        GeoLocationCache::with_config(self.config)
    }
}
