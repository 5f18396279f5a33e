//! Cluster assembly: everything touching the seed, transitively

use super::Topology;
use crate::item::{Item, ItemId, ItemSet, KindMask, LayerRange, Marker, NetId};
use crate::node::CollisionOptions;
use indexmap::IndexSet;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Cluster {
    pub items: ItemSet,
}

impl Topology<'_> {
    /// Breadth-first collection of items touching `start` on `layer`. Growth
    /// stops once the cluster bounding box exceeds `area_expansion_limit` times
    /// the seed's own area (a limit of 0 disables the check).
    pub fn assemble_cluster(
        &self,
        start: &Rc<Item>,
        layer: i32,
        area_expansion_limit: f64,
        excluded_net: Option<NetId>,
    ) -> Cluster {
        let opts = CollisionOptions { different_nets_only: false, override_clearance: Some(0), ..Default::default() };
        let layer_range = LayerRange::single(layer);

        let mut seen: IndexSet<ItemId> = IndexSet::new();
        let mut cluster = ItemSet::new();
        let mut pending: VecDeque<Rc<Item>> = VecDeque::from([start.clone()]);
        if let Some(id) = start.id() {
            seen.insert(id);
        }

        let mut bbox = start.shape_on(layer).bbox();
        let initial_area = bbox.area() as f64;

        'outer: while let Some(top) = pending.pop_front() {
            cluster.add(top.clone());
            for obs in self.world.query_colliding(&top, &opts) {
                let other = &obs.item;
                let track_on_track = other.net != top.net && other.of_kind(KindMask::SEGMENT) && top.of_kind(KindMask::SEGMENT);
                if track_on_track {
                    continue;
                }
                if excluded_net.is_some() && other.net == excluded_net {
                    continue;
                }
                if !other.of_kind(KindMask::SOLID | KindMask::LINKED) || !other.layers.overlaps(&layer_range) {
                    continue;
                }

                let grown = match other.id().filter(|_| other.is_linked()) {
                    Some(id) => self.world.assemble_line(id, false).bbox().unwrap_or_else(|| other.bbox()),
                    None => other.bbox(),
                };
                bbox = bbox.merged(&grown);
                let ratio = bbox.area() as f64 / (initial_area + 1.0);
                if area_expansion_limit > 0.0 && ratio > area_expansion_limit {
                    debug!(ratio, items = cluster.len(), "cluster expansion limit reached");
                    break 'outer;
                }

                let Some(id) = other.id() else {
                    continue;
                };
                if other.marker.contains(Marker::HEAD) || !seen.insert(id) {
                    continue;
                }
                pending.push_back(other.clone());
            }
        }
        Cluster { items: cluster }
    }
}
