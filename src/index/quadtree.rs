//! Point quadtree keyed by latitude/longitude.
//!
//! Nodes live in an arena and refer to each other by index, so splitting a
//! leaf never invalidates anything held elsewhere. A side table maps every
//! object id to the leaf currently holding it, which makes removal by id a
//! hash lookup plus a scan of one leaf.
//!
//! The root covers the whole globe. Points outside it (malformed coordinates
//! are stored as delivered) go to an overflow list that every query scans;
//! non-finite coordinates never match a query.
//!
//! ```rust
//! use geocache::index::SpatialIndex;
//! use geocache::Area;
//!
//! let mut index = SpatialIndex::new(8, 16);
//! index.insert(10.0, 20.0, 1);
//! index.insert(-5.0, 100.0, 2);
//!
//! assert_eq!(index.query(&Area::new(0.0, 0.0, 15.0, 25.0)), vec![1]);
//! assert!(index.remove(1));
//! assert_eq!(index.query(&Area::world()), vec![2]);
//! ```

use geocache_types::area::Area;
use geocache_types::object::ObjectId;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

type NodeId = usize;

const ROOT: NodeId = 0;

/// A stored point.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    lat: f64,
    lon: f64,
    id: ObjectId,
}

impl Entry {
    #[inline]
    fn within(&self, area: &Area) -> bool {
        area.contains(self.lat, self.lon)
    }
}

type Entries = SmallVec<[Entry; 8]>;

#[derive(Debug)]
enum NodeKind {
    Leaf(Entries),
    /// Children in quadrant order: SW, SE, NW, NE.
    Branch([NodeId; 4]),
}

#[derive(Debug)]
struct Node {
    bounds: Area,
    depth: u32,
    kind: NodeKind,
}

impl Node {
    fn leaf(bounds: Area, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            kind: NodeKind::Leaf(SmallVec::new()),
        }
    }
}

/// Where an id's point is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Leaf(NodeId),
    Overflow,
}

/// Quadrant of `bounds` that holds `(lat, lon)`. Points on a midline go north/east.
#[inline]
fn quadrant(bounds: &Area, lat: f64, lon: f64) -> usize {
    let (mid_lat, mid_lon) = bounds.center();
    (usize::from(lat >= mid_lat) << 1) | usize::from(lon >= mid_lon)
}

fn quadrant_bounds(bounds: &Area) -> [Area; 4] {
    let (mid_lat, mid_lon) = bounds.center();
    [
        Area::new(bounds.lat_min(), bounds.lon_min(), mid_lat, mid_lon),
        Area::new(bounds.lat_min(), mid_lon, mid_lat, bounds.lon_max()),
        Area::new(mid_lat, bounds.lon_min(), bounds.lat_max(), mid_lon),
        Area::new(mid_lat, mid_lon, bounds.lat_max(), bounds.lon_max()),
    ]
}

/// Spatial index of `(latitude, longitude) -> object id` points.
///
/// Holds at most one point per id. Inserting an id that is already present
/// is a caller bug: debug builds panic, release builds move the point.
#[derive(Debug)]
pub struct SpatialIndex {
    nodes: Vec<Node>,
    slots: FxHashMap<ObjectId, Slot>,
    overflow: Vec<Entry>,
    node_capacity: usize,
    max_depth: u32,
}

impl SpatialIndex {
    /// Create an empty index whose leaves split beyond `node_capacity` points,
    /// down to `max_depth` levels below the root.
    pub fn new(node_capacity: usize, max_depth: u32) -> Self {
        Self {
            nodes: vec![Node::leaf(Area::world(), 0)],
            slots: FxHashMap::default(),
            overflow: Vec::new(),
            node_capacity: node_capacity.max(1),
            max_depth,
        }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `id` currently has a point in the index.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Number of arena nodes, leaves and branches together.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Add a point for `id`.
    pub fn insert(&mut self, lat: f64, lon: f64, id: ObjectId) {
        if self.slots.contains_key(&id) {
            debug_assert!(false, "object {} inserted twice into spatial index", id);
            log::warn!("Object {} already indexed; replacing its point", id);
            self.remove(id);
        }

        let entry = Entry { lat, lon, id };
        if !self.nodes[ROOT].bounds.contains(lat, lon) {
            self.overflow.push(entry);
            self.slots.insert(id, Slot::Overflow);
            return;
        }

        let leaf = self.descend(lat, lon);
        self.push_into_leaf(leaf, entry);
    }

    /// Remove the point stored for `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        let Some(slot) = self.slots.remove(&id) else {
            return false;
        };

        let removed = match slot {
            Slot::Overflow => {
                let pos = self.overflow.iter().position(|e| e.id == id);
                pos.map(|pos| self.overflow.swap_remove(pos))
            }
            Slot::Leaf(node) => match &mut self.nodes[node].kind {
                NodeKind::Leaf(entries) => {
                    let pos = entries.iter().position(|e| e.id == id);
                    pos.map(|pos| entries.swap_remove(pos))
                }
                NodeKind::Branch(_) => None,
            },
        };

        if removed.is_none() {
            log::warn!("Spatial index lost track of object {}", id);
        }
        removed.is_some()
    }

    /// Every id whose point lies within `area`, boundaries included. Order is unspecified.
    pub fn query(&self, area: &Area) -> Vec<ObjectId> {
        if !area.is_finite() {
            log::warn!("Rejecting area query with non-finite bounds");
            return Vec::new();
        }

        let mut result = Vec::new();
        let mut stack = vec![ROOT];

        while let Some(node_id) = stack.pop() {
            let node = &self.nodes[node_id];
            if !node.bounds.intersects(area) {
                continue;
            }
            match &node.kind {
                NodeKind::Leaf(entries) => {
                    result.extend(entries.iter().filter(|e| e.within(area)).map(|e| e.id));
                }
                NodeKind::Branch(children) => stack.extend_from_slice(children),
            }
        }

        result.extend(
            self.overflow
                .iter()
                .filter(|e| e.within(area))
                .map(|e| e.id),
        );
        result
    }

    /// Remove every point and collapse the tree back to a single root leaf.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node::leaf(Area::world(), 0));
        self.slots.clear();
        self.overflow.clear();
    }

    /// Walk from the root to the leaf whose region holds `(lat, lon)`.
    fn descend(&self, lat: f64, lon: f64) -> NodeId {
        let mut current = ROOT;
        loop {
            let node = &self.nodes[current];
            match &node.kind {
                NodeKind::Leaf(_) => return current,
                NodeKind::Branch(children) => {
                    current = children[quadrant(&node.bounds, lat, lon)];
                }
            }
        }
    }

    fn push_into_leaf(&mut self, leaf: NodeId, entry: Entry) {
        let node = &mut self.nodes[leaf];
        let NodeKind::Leaf(entries) = &mut node.kind else {
            unreachable!("descend always ends at a leaf");
        };
        entries.push(entry);
        self.slots.insert(entry.id, Slot::Leaf(leaf));

        if entries.len() > self.node_capacity && node.depth < self.max_depth {
            self.split(leaf);
        }
    }

    /// Turn a full leaf into a branch and redistribute its points.
    ///
    /// If every point lands in the same quadrant (a cluster of nearly
    /// coincident points), that child is split again until the points
    /// separate or `max_depth` is reached.
    fn split(&mut self, leaf: NodeId) {
        let mut pending = vec![leaf];

        while let Some(node_id) = pending.pop() {
            let depth = self.nodes[node_id].depth;
            let bounds = self.nodes[node_id].bounds;
            let first_child = self.nodes.len();
            let children = [first_child, first_child + 1, first_child + 2, first_child + 3];

            let entries = match std::mem::replace(
                &mut self.nodes[node_id].kind,
                NodeKind::Branch(children),
            ) {
                NodeKind::Leaf(entries) => entries,
                NodeKind::Branch(existing) => {
                    self.nodes[node_id].kind = NodeKind::Branch(existing);
                    continue;
                }
            };

            for child_bounds in quadrant_bounds(&bounds) {
                self.nodes.push(Node::leaf(child_bounds, depth + 1));
            }

            for entry in entries {
                let child = children[quadrant(&bounds, entry.lat, entry.lon)];
                if let NodeKind::Leaf(child_entries) = &mut self.nodes[child].kind {
                    child_entries.push(entry);
                }
                self.slots.insert(entry.id, Slot::Leaf(child));
            }

            for child in children {
                if let NodeKind::Leaf(child_entries) = &self.nodes[child].kind
                    && child_entries.len() > self.node_capacity
                    && depth + 1 < self.max_depth
                {
                    pending.push(child);
                }
            }
        }
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(16, 16)
    }
}
