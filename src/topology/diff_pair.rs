//! Differential pair assembly

use super::Topology;
use crate::geometry::{Point, Shape};
use crate::item::{Item, ItemData, Line, NetId};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Maximum deviation (nm) for two segments to count as parallel
pub const DP_PARALLELITY_THRESHOLD: i64 = 5;

/// Coupled lines, positive first
#[derive(Debug, Clone)]
pub struct DiffPair {
    pub p: Line,
    pub n: Line,
    pub width: i64,
    /// Edge-to-edge spacing measured at the matched pieces; -1 if unknown
    pub gap: i64,
    pub layer: i32,
    /// Net of the seed the pair was assembled from
    pub reference_net: Option<NetId>,
}

impl DiffPair {
    pub fn nets(&self) -> (Option<NetId>, Option<NetId>) {
        (self.p.net(), self.n.net())
    }
}

struct Match {
    dist_sq: i128,
    target_sq: i128,
    reference: Rc<Item>,
    coupled: Rc<Item>,
}

impl Topology<'_> {
    /// Best coupled counterpart of `p_item` among `candidates`: same kind and
    /// width, parallel with a common projection (or concentric for arcs),
    /// closest to `target`
    fn find_coupled(p_item: &Rc<Item>, candidates: &[Rc<Item>], target: Point, best: &mut Option<Match>) {
        for n_item in candidates {
            if n_item.kind() != p_item.kind() || n_item.width() != p_item.width() {
                continue;
            }
            let dist_sq: i128 = match (&p_item.data, &n_item.data) {
                (ItemData::Segment(ps), ItemData::Segment(ns)) => {
                    if !ps.seg.approx_parallel(&ns.seg, DP_PARALLELITY_THRESHOLD) {
                        continue;
                    }
                    if ps.seg.common_parallel_projection(&ns.seg).is_none() {
                        continue;
                    }
                    let d = ns.seg.distance(&ps.seg) as i128;
                    d * d
                }
                (ItemData::Arc(pa), ItemData::Arc(na)) => {
                    let centre_diff = na.arc.center() - pa.arc.center();
                    let t = DP_PARALLELITY_THRESHOLD as i128;
                    if centre_diff.squared_norm() > t * t {
                        continue;
                    }
                    let d = (pa.arc.radius() - na.arc.radius()) as i128;
                    d * d
                }
                _ => continue,
            };

            let target_d = n_item.shape().distance(&Shape::Circle { center: target, radius: 0 });
            let target_sq = (target_d * target_d) as i128;
            let better = match best {
                None => true,
                Some(m) => dist_sq <= m.dist_sq && target_sq < m.target_sq,
            };
            if better {
                *best = Some(Match { dist_sq, target_sq, reference: p_item.clone(), coupled: n_item.clone() });
            }
        }
    }

    /// Pair through `start`. Fails when the net has no coupled net or no
    /// parallel counterpart exists near the seed.
    pub fn assemble_diff_pair(&self, start: &Rc<Item>) -> Option<DiffPair> {
        let ref_net = start.net?;
        let resolver = self.world.resolver();
        let coupled_net = resolver.dp_coupled_net(ref_net)?;
        if !start.is_linked() {
            return None;
        }
        let start_id = start.id()?;

        let n_items: Vec<Rc<Item>> = self
            .world
            .all_items_in_net(Some(coupled_net))
            .into_iter()
            .filter(|i| i.is_linked() && i.layers == start.layers)
            .collect();

        let target = start.shape().centre();
        let mut best = None;
        Self::find_coupled(start, &n_items, target, &mut best);

        if best.is_none() {
            // try the neighbours of the seed, the seed itself may be a short jog
            let mut neighbours = BTreeSet::new();
            for anchor in start.anchors() {
                if let Some(jt) = self.world.find_joint_for(anchor, start) {
                    neighbours.extend(jt.link_ids().filter(|&id| id != start_id));
                }
            }
            for id in neighbours {
                if let Some(item) = self.world.lookup(id).cloned() {
                    Self::find_coupled(&item, &n_items, target, &mut best);
                }
            }
        }

        let Match { reference: ref_item, coupled: coupled_item, .. } = best?;
        let mut lp = self.world.assemble_line(start_id, false);
        let mut ln = self.world.assemble_line(coupled_item.id()?, false);

        let width = lp.width();
        let gap = match (&ref_item.data, &coupled_item.data) {
            (ItemData::Segment(rs), ItemData::Segment(cs)) => {
                let ref_dir = rs.seg.b - rs.seg.a;
                let displacement = rs.seg.b - cs.seg.b;
                let norm = ref_dir.euclidean_norm();
                if norm > 0.0 {
                    (ref_dir.cross(displacement) as f64 / norm).abs() as i64 - width
                } else {
                    -1
                }
            }
            (ItemData::Arc(ra), ItemData::Arc(ca)) => (ra.arc.radius() - ca.arc.radius()).abs() as i64 - width,
            _ => -1,
        };

        if resolver.dp_net_polarity(ref_net) < 0 {
            std::mem::swap(&mut lp, &mut ln);
        }
        let layer = lp.layer();
        Some(DiffPair { p: lp, n: ln, width, gap, layer, reference_net: Some(ref_net) })
    }
}
