//! Spatial indexing for routable items
//!
//! Items are stored in an R-tree by bounding box. Layer filtering is done
//! after the envelope query, since most items live on one or two layers.

use super::types::BoundingBox;
use crate::item::{ItemId, LayerRange};
use rstar::{RTree, RTreeObject, AABB};

/// Object wrapper for R-tree spatial indexing
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedItem {
    pub id: ItemId,
    pub layers: LayerRange,
    pub bounds: AABB<[i64; 2]>,
}

impl IndexedItem {
    pub fn new(id: ItemId, layers: LayerRange, bbox: &BoundingBox) -> Self {
        Self { id, layers, bounds: bbox.to_aabb() }
    }
}

impl RTreeObject for IndexedItem {
    type Envelope = AABB<[i64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.bounds
    }
}

/// R-tree of item envelopes
#[derive(Clone, Debug, Default)]
pub struct SpatialIndex {
    tree: RTree<IndexedItem>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: IndexedItem) {
        self.tree.insert(entry);
    }

    pub fn remove(&mut self, entry: &IndexedItem) -> bool {
        self.tree.remove(entry).is_some()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Ids of items whose envelope touches `area` on any of `layers`
    pub fn query(&self, area: &BoundingBox, layers: LayerRange) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self
            .tree
            .locate_in_envelope_intersecting(&area.to_aabb())
            .filter(|e| e.layers.overlaps(&layers))
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}
