use crate::location::GeoLocation;
use serde::{Deserialize, Serialize};

/// Identifier of an object in the external object directory.
pub type ObjectId = u64;

/// Class of a monitored infrastructure object.
///
/// The set is closed: whether a class can carry a geographic location is
/// decided by a single exhaustive match in [`ObjectClass::is_geo_trackable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectClass {
    Node,
    MobileDevice,
    Cluster,
    Container,
    AccessPoint,
    Sensor,
    Interface,
    Subnet,
    Template,
}

impl ObjectClass {
    /// Every class, in declaration order.
    pub const ALL: [ObjectClass; 9] = [
        ObjectClass::Node,
        ObjectClass::MobileDevice,
        ObjectClass::Cluster,
        ObjectClass::Container,
        ObjectClass::AccessPoint,
        ObjectClass::Sensor,
        ObjectClass::Interface,
        ObjectClass::Subnet,
        ObjectClass::Template,
    ];

    /// Whether objects of this class can be placed on a map.
    pub fn is_geo_trackable(self) -> bool {
        match self {
            ObjectClass::Node
            | ObjectClass::MobileDevice
            | ObjectClass::Cluster
            | ObjectClass::Container
            | ObjectClass::AccessPoint
            | ObjectClass::Sensor => true,
            ObjectClass::Interface | ObjectClass::Subnet | ObjectClass::Template => false,
        }
    }

    /// All classes for which [`is_geo_trackable`](Self::is_geo_trackable) holds.
    pub fn geo_trackable() -> impl Iterator<Item = ObjectClass> {
        Self::ALL.into_iter().filter(|class| class.is_geo_trackable())
    }
}

/// Last-known snapshot of an object as delivered by the object directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub id: ObjectId,
    pub class: ObjectClass,
    /// Display name, used for name filtering of query results.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: GeoLocation,
    /// Containers this object sits under, direct or indirect, as supplied
    /// by the directory.
    #[serde(default)]
    pub parents: Vec<ObjectId>,
}

impl TrackedObject {
    pub fn new(
        id: ObjectId,
        class: ObjectClass,
        name: impl Into<String>,
        location: GeoLocation,
    ) -> Self {
        Self {
            id,
            class,
            name: name.into(),
            location,
            parents: Vec::new(),
        }
    }

    /// Set the ancestor containers of this object.
    pub fn with_parents(mut self, parents: impl IntoIterator<Item = ObjectId>) -> Self {
        self.parents = parents.into_iter().collect();
        self
    }

    /// Whether this object sits somewhere below `root`. The object itself
    /// is not its own descendant.
    pub fn is_under(&self, root: ObjectId) -> bool {
        self.parents.contains(&root)
    }

    /// Replace the location, keeping every other field.
    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = location;
        self
    }

    /// Case-insensitive substring match against the display name.
    pub fn name_matches(&self, filter: &str) -> bool {
        filter.is_empty() || self.name.to_lowercase().contains(&filter.to_lowercase())
    }
}
