use geo::LineString;
use rstar::{RTree, RTreeObject, AABB};

use crate::bounds::BoundingBox;

/// Envelope of one stored road, keyed by its external id
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedEnvelope {
    pub external_id: u64,
    pub envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-Tree over road envelopes.
///
/// Only a pre-filter: a hit means the bounding boxes overlap, the caller still
/// checks the actual line against the query rectangle.
#[derive(Default)]
pub struct RoadIndex {
    tree: RTree<IndexedEnvelope>,
}

impl RoadIndex {
    pub fn new() -> Self {
        RoadIndex { tree: RTree::new() }
    }

    pub fn bulk_load(entries: Vec<IndexedEnvelope>) -> Self {
        RoadIndex {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn insert(&mut self, entry: IndexedEnvelope) {
        self.tree.insert(entry);
    }

    /// Remove a previously inserted entry. Returns false if it was not present.
    pub fn remove(&mut self, entry: &IndexedEnvelope) -> bool {
        self.tree.remove(entry).is_some()
    }

    /// External ids whose envelope intersects the box
    ///
    /// # Arguments
    /// * `bounds` - Query rectangle in degrees
    ///
    /// # Returns
    /// Candidate ids in no particular order; exact geometry is not checked
    pub fn candidates(&self, bounds: &BoundingBox) -> Vec<u64> {
        let envelope = AABB::from_corners([bounds.west, bounds.south], [bounds.east, bounds.north]);

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.external_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounding box of a line as an rstar envelope
pub fn compute_envelope(line: &LineString<f64>) -> AABB<[f64; 2]> {
    let mut coords = line.coords();

    let first = match coords.next() {
        Some(c) => c,
        // Degenerate case: zero-size envelope at origin
        None => return AABB::from_corners([0.0, 0.0], [0.0, 0.0]),
    };

    let (mut min_lon, mut max_lon, mut min_lat, mut max_lat) = (first.x, first.x, first.y, first.y);

    for coord in coords {
        min_lon = min_lon.min(coord.x);
        max_lon = max_lon.max(coord.x);
        min_lat = min_lat.min(coord.y);
        max_lat = max_lat.max(coord.y);
    }

    AABB::from_corners([min_lon, min_lat], [max_lon, max_lat])
}
