//! Configuration for the location cache.
//!
//! Every field has a default, so an empty JSON object (`{}`) is a valid
//! configuration.

use geocache_types::object::ObjectClass;
use serde::de::Error;

use crate::projection::MAX_ZOOM;

/// When change notifications are delivered relative to the cache write lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Collect notifications during a write, release the lock, then deliver them.
    /// Listeners may query the cache from their callback.
    #[default]
    Deferred,
    /// Deliver while the write lock is still held. Listeners observe exactly the
    /// index state produced by the change but must not touch the cache.
    UnderLock,
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Number of points a quadtree leaf holds before it splits.
    #[serde(default = "CacheConfig::default_node_capacity")]
    pub node_capacity: usize,

    /// Leaves at this depth keep accepting points instead of splitting.
    #[serde(default = "CacheConfig::default_max_depth")]
    pub max_depth: u32,

    /// Object classes admitted into the cache.
    #[serde(default = "CacheConfig::default_tracked_classes")]
    pub tracked_classes: Vec<ObjectClass>,

    /// Highest zoom level accepted by the projection pass-throughs.
    #[serde(default = "CacheConfig::default_max_zoom")]
    pub max_zoom: u32,

    #[serde(default)]
    pub dispatch_mode: DispatchMode,
}

impl CacheConfig {
    const fn default_node_capacity() -> usize {
        16
    }

    const fn default_max_depth() -> u32 {
        16
    }

    const fn default_max_zoom() -> u32 {
        18
    }

    fn default_tracked_classes() -> Vec<ObjectClass> {
        ObjectClass::geo_trackable().collect()
    }

    pub fn with_node_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Node capacity must be greater than zero");
        self.node_capacity = capacity;
        self
    }

    pub fn with_max_depth(mut self, depth: u32) -> Self {
        assert!(depth > 0, "Max depth must be greater than zero");
        self.max_depth = depth;
        self
    }

    pub fn with_tracked_classes(mut self, classes: impl IntoIterator<Item = ObjectClass>) -> Self {
        self.tracked_classes = classes.into_iter().collect();
        self
    }

    pub fn with_max_zoom(mut self, zoom: u32) -> Self {
        self.max_zoom = zoom;
        self
    }

    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = mode;
        self
    }

    /// Whether objects of `class` are admitted into the cache.
    pub fn tracks(&self, class: ObjectClass) -> bool {
        self.tracked_classes.contains(&class)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.node_capacity == 0 {
            return Err("Node capacity must be greater than zero".to_string());
        }

        if self.max_depth == 0 {
            return Err("Max depth must be greater than zero".to_string());
        }

        if self.max_depth > 32 {
            log::warn!(
                "Max depth of {} is deeper than any useful subdivision of the globe",
                self.max_depth
            );
        }

        if self.tracked_classes.is_empty() {
            return Err("At least one object class must be tracked".to_string());
        }

        if let Some(class) = self
            .tracked_classes
            .iter()
            .find(|class| !class.is_geo_trackable())
        {
            return Err(format!("Object class {:?} cannot carry a location", class));
        }

        if self.max_zoom > MAX_ZOOM {
            return Err(format!(
                "Max zoom {} exceeds supported maximum {}",
                self.max_zoom, MAX_ZOOM
            ));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: CacheConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: CacheConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            node_capacity: Self::default_node_capacity(),
            max_depth: Self::default_max_depth(),
            tracked_classes: Self::default_tracked_classes(),
            max_zoom: Self::default_max_zoom(),
            dispatch_mode: DispatchMode::default(),
        }
    }
}
