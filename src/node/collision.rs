//! Collision queries
//!
//! Candidates come from the R-tree, inflated by the largest clearance the
//! rules can produce, then get an exact per-layer shape test against the
//! clearance the resolver reports for the pair. Drilled holes of vias and
//! through-hole pads are checked as separate shapes.

use super::Node;
use crate::item::{Item, ItemId, ItemKind, KindMask, Line, SolidKind};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct CollisionOptions {
    pub different_nets_only: bool,
    pub override_clearance: Option<i64>,
    pub kinds: KindMask,
    pub limit: Option<usize>,
    pub use_epsilon: bool,
    /// Items that never count as obstacles (e.g. the segments being replaced)
    pub ignore: Vec<ItemId>,
}

impl Default for CollisionOptions {
    fn default() -> Self {
        Self {
            different_nets_only: true,
            override_clearance: None,
            kinds: KindMask::ANY,
            limit: None,
            use_epsilon: true,
            ignore: Vec::new(),
        }
    }
}

impl CollisionOptions {
    pub fn first_only() -> Self {
        Self { limit: Some(1), ..Default::default() }
    }

    pub fn with_kinds(mut self, kinds: KindMask) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn ignoring(mut self, ids: impl IntoIterator<Item = ItemId>) -> Self {
        self.ignore.extend(ids);
        self
    }
}

/// A stored item colliding with a probe
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub item: Rc<Item>,
    pub clearance: i64,
    pub layer: i32,
}

/// Obstacle hit by a line, with the index of the first offending piece
#[derive(Debug, Clone)]
pub struct LineObstacle {
    pub obstacle: Obstacle,
    pub piece: usize,
}

impl Node {
    fn pair_clearance(&self, a: &Item, b: &Item, opts: &CollisionOptions) -> i64 {
        match opts.override_clearance {
            Some(c) => c,
            None => self.resolver.clearance(a, b, opts.use_epsilon),
        }
    }

    /// Layer on which `probe` and `other` collide, if any
    fn collide_items(&self, probe: &Item, other: &Item, opts: &CollisionOptions) -> Option<(i64, i32)> {
        let layers = probe.layers.intersection(&other.layers)?;
        let clearance = self.pair_clearance(probe, other, opts);
        if clearance < 0 {
            return None;
        }
        for layer in layers.layers() {
            if probe.shape_on(layer).collide(&other.shape_on(layer), clearance) {
                return Some((clearance, layer));
            }
        }

        // a drilled hole is checked against the other item's copper and hole with
        // the hole clearance; the net filter has already run in `is_candidate`
        let holes = [probe.hole_item(), other.hole_item()];
        let pairs = [
            (holes[0].as_ref(), Some(other)),
            (Some(probe), holes[1].as_ref()),
            (holes[0].as_ref(), holes[1].as_ref()),
        ];
        for (a, b) in pairs {
            let (Some(a), Some(b)) = (a, b) else {
                continue;
            };
            if !(a.is_hole() || b.is_hole()) {
                continue;
            }
            let clearance = self.pair_clearance(a, b, opts);
            if clearance < 0 {
                continue;
            }
            if a.shape_on(layers.start()).collide(&b.shape_on(layers.start()), clearance) {
                return Some((clearance, layers.start()));
            }
        }
        None
    }

    fn is_candidate(&self, probe: &Item, other: &Item, opts: &CollisionOptions) -> bool {
        if probe.same_identity(other) || !other.of_kind(opts.kinds) {
            return false;
        }
        if let Some(id) = other.id() {
            if opts.ignore.contains(&id) {
                return false;
            }
        }
        if opts.different_nets_only && probe.net.is_some() && probe.net == other.net {
            return false;
        }
        // keepouts only block what their rules forbid
        if let Some(SolidKind::Keepout(rules)) = other.as_solid().map(|s| s.kind) {
            return match probe.kind() {
                ItemKind::Segment | ItemKind::Arc => rules.no_tracks,
                ItemKind::Via => rules.no_vias,
                ItemKind::Solid => rules.no_pads,
                ItemKind::Hole => false,
            };
        }
        true
    }

    /// Stored items colliding with `probe`, in id order
    pub fn query_colliding(&self, probe: &Item, opts: &CollisionOptions) -> Vec<Obstacle> {
        let area = probe.bbox().inflated(self.resolver.max_clearance());
        let mut found = Vec::new();
        for id in self.query_area(&area, probe.layers) {
            let Some(other) = self.lookup(id) else {
                continue;
            };
            if !self.is_candidate(probe, other, opts) {
                continue;
            }
            if let Some((clearance, layer)) = self.collide_items(probe, other, opts) {
                found.push(Obstacle { item: other.clone(), clearance, layer });
                if opts.limit.is_some_and(|l| found.len() >= l) {
                    break;
                }
            }
        }
        found
    }

    pub fn check_colliding(&self, probe: &Item, opts: &CollisionOptions) -> Option<Obstacle> {
        let opts = CollisionOptions { limit: Some(1), ..opts.clone() };
        self.query_colliding(probe, &opts).into_iter().next()
    }

    /// Obstacles of every piece of `line` (and its end via); an obstacle hit by
    /// several pieces is reported once
    pub fn query_colliding_line(&self, line: &Line, opts: &CollisionOptions) -> Vec<Obstacle> {
        let mut found: Vec<Obstacle> = Vec::new();
        let opts = self.line_options(line, opts);
        for probe in line.to_items().iter().chain(line.via()) {
            for obs in self.query_colliding(probe, &opts) {
                if !found.iter().any(|f| f.item.same_identity(&obs.item)) {
                    found.push(obs);
                }
            }
        }
        found
    }

    pub fn check_colliding_line(&self, line: &Line, opts: &CollisionOptions) -> Option<Obstacle> {
        let opts = CollisionOptions { limit: Some(1), ..self.line_options(line, opts) };
        line.to_items()
            .iter()
            .chain(line.via())
            .find_map(|probe| self.query_colliding(probe, &opts).into_iter().next())
    }

    /// First piece along `line` that collides with anything
    pub fn nearest_obstacle(&self, line: &Line, opts: &CollisionOptions) -> Option<LineObstacle> {
        let opts = CollisionOptions { limit: Some(1), ..self.line_options(line, opts) };
        for (piece, probe) in line.to_items().iter().enumerate() {
            if let Some(obstacle) = self.query_colliding(probe, &opts).into_iter().next() {
                return Some(LineObstacle { obstacle, piece });
            }
        }
        None
    }

    fn line_options(&self, line: &Line, opts: &CollisionOptions) -> CollisionOptions {
        let mut opts = opts.clone();
        opts.ignore.extend(line.links().iter().copied());
        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Seg};
    use crate::item::{LayerRange, NetId, Via};
    use crate::rules::{DesignRules, MemoizedRuleResolver};

    fn node() -> Node {
        Node::new(Rc::new(MemoizedRuleResolver::new(DesignRules::default())))
    }

    fn track(y: i64, layer: i32, net: u32) -> Item {
        Item::segment(Seg::new(Point::new(0, y), Point::new(1_000_000, y)), 200_000, layer, Some(NetId(net)))
    }

    #[test]
    fn test_clearance_and_layer_filtering() {
        let mut n = node();
        n.add(track(0, 0, 1));
        n.add(track(0, 1, 2));
        // 350um centre spacing leaves 150um of air, below the 200um rule
        let probe = track(350_000, 0, 2);
        let hits = n.query_colliding(&probe, &CollisionOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].layer, 0);

        let far = track(500_000, 0, 2);
        assert!(n.check_colliding(&far, &CollisionOptions::default()).is_none());
        let same_net = track(350_000, 0, 1);
        assert!(n.check_colliding(&same_net, &CollisionOptions::default()).is_none());
        let opts = CollisionOptions { different_nets_only: false, ..Default::default() };
        assert!(n.check_colliding(&same_net, &opts).is_some());
    }

    #[test]
    fn test_via_hole_hits_foreign_copper() {
        let mut n = node();
        n.add(track(0, 0, 1));
        let via = Item::via(Via::new(Point::new(500_000, 450_000), 600_000, 300_000), LayerRange::new(0, 1), Some(NetId(2)));
        let hits = n.query_colliding(&via, &CollisionOptions::default());
        assert_eq!(hits.len(), 1);
        let opts = CollisionOptions { override_clearance: Some(0), ..Default::default() };
        assert!(n.query_colliding(&via, &opts).is_empty());
    }
}
