//! Differential pair placement
//!
//! Both lines follow a common centreline from the midpoint of the two start
//! anchors to the cursor, offset to either side by half the pair pitch
//! (gap plus width). Items of the pair's own nets never count as obstacles
//! for each other.

use super::algo::PlacementAlgo;
use super::error::{Result, RouterError};
use super::iface::RouterInterface;
use super::settings::{PnsMode, RoutingSettings, SizesSettings};
use super::shove::Shove;
use crate::geometry::{build_initial_trace, LineChain, Point, Posture, Seg};
use crate::item::{Item, ItemSet, KindMask, Line, Marker, NetId};
use crate::node::{CollisionOptions, Node};
use std::rc::Rc;
use tracing::debug;

/// Coupled anchors further apart than this many pair pitches are not a pair start
const MAX_ANCHOR_PITCHES: i64 = 10;

struct PairLeg {
    node: Node,
    anchors: (Point, Point),
}

pub struct DiffPairPlacer {
    routing: RoutingSettings,
    sizes: SizesSettings,
    world: Node,
    fixed: Node,
    shoved: Node,
    current: Node,
    /// Positive net first
    nets: (Option<NetId>, Option<NetId>),
    anchors: (Point, Point),
    heads: (Line, Line),
    layer: i32,
    posture: Posture,
    violating: bool,
    last_pos: Point,
    history: Vec<PairLeg>,
}

fn line_intersection(a: &Seg, b: &Seg) -> Option<Point> {
    let (da, db) = (a.direction(), b.direction());
    let denom = da.cross(db);
    if denom == 0 {
        return None;
    }
    let t = (b.a - a.a).cross(db) as f64 / denom as f64;
    Some(Point::from_f64(a.a.x as f64 + da.x as f64 * t, a.a.y as f64 + da.y as f64 * t))
}

/// Mitred offset of a straight chain; positive `d` is to the left
pub fn offset_chain(chain: &LineChain, d: i64) -> LineChain {
    let pts = chain.points();
    if pts.len() < 2 {
        return chain.clone();
    }
    let shift = |a: Point, b: Point| (b - a).perpendicular().resize(d);
    let mut out = Vec::with_capacity(pts.len());
    out.push(pts[0] + shift(pts[0], pts[1]));
    for w in pts.windows(3) {
        let (s1, s2) = (shift(w[0], w[1]), shift(w[1], w[2]));
        let l1 = Seg::new(w[0] + s1, w[1] + s1);
        let l2 = Seg::new(w[1] + s2, w[2] + s2);
        out.push(line_intersection(&l1, &l2).unwrap_or(w[1] + s1));
    }
    let n = pts.len();
    out.push(pts[n - 1] + shift(pts[n - 2], pts[n - 1]));
    LineChain::from_points(&out)
}

impl DiffPairPlacer {
    pub fn new(world: &Node, routing: RoutingSettings, sizes: SizesSettings, layer: i32) -> Self {
        let world = world.branch();
        let empty = Line::new(LineChain::new(), sizes.diff_pair_width, layer, None);
        Self {
            routing,
            fixed: world.clone(),
            shoved: world.branch(),
            current: world.branch(),
            world,
            sizes,
            nets: (None, None),
            anchors: (Point::default(), Point::default()),
            heads: (empty.clone(), empty),
            layer,
            posture: Posture::StraightFirst,
            violating: false,
            last_pos: Point::default(),
            history: Vec::new(),
        }
    }

    pub fn is_violating(&self) -> bool {
        self.violating
    }

    pub fn nets(&self) -> (Option<NetId>, Option<NetId>) {
        self.nets
    }

    fn pitch(&self) -> i64 {
        self.sizes.diff_pair_gap + self.sizes.diff_pair_width
    }

    /// Anchor of `item` closest to `pos`
    fn item_anchor(item: &Item, pos: Point) -> Point {
        item.anchors()
            .into_iter()
            .min_by(|a, b| a.distance(pos).total_cmp(&b.distance(pos)))
            .unwrap_or(pos)
    }

    fn coupled_anchor(&self, net: NetId, near: Point) -> Option<Point> {
        let limit = (self.pitch() * MAX_ANCHOR_PITCHES) as f64;
        self.world
            .all_items_in_net(Some(net))
            .iter()
            .filter(|i| i.layers.contains(self.layer) && i.of_kind(KindMask::SOLID | KindMask::VIA | KindMask::LINKED))
            .flat_map(|i| i.anchors())
            .filter(|p| p.distance(near) <= limit)
            .min_by(|a, b| a.distance(near).total_cmp(&b.distance(near)))
    }

    fn options(&self) -> CollisionOptions {
        let mut ignore = self.fixed.all_items_in_net(self.nets.0).ids();
        ignore.extend(self.fixed.all_items_in_net(self.nets.1).ids());
        CollisionOptions::default().ignoring(ignore)
    }

    fn build_heads(&self, pos: Point) -> (Line, Line) {
        let (ap, an) = self.anchors;
        let centre = Point::new((ap.x + an.x) / 2, (ap.y + an.y) / 2);
        let spine = build_initial_trace(centre, pos, self.posture);
        let half = self.pitch() / 2;
        let left = offset_chain(&spine, half);
        let right = offset_chain(&spine, -half);

        let p_left = left.first().map_or(f64::INFINITY, |p| p.distance(ap)) <= right.first().map_or(f64::INFINITY, |p| p.distance(ap));
        let (p_chain, n_chain) = if p_left { (left, right) } else { (right, left) };
        let line = |anchor: Point, tail: &LineChain, net| {
            let mut chain = LineChain::from_points(&[anchor]);
            if spine.piece_count() > 0 {
                chain.append(tail);
            }
            Line::new(chain, self.sizes.diff_pair_width, self.layer, net)
        };
        (line(ap, &p_chain, self.nets.0), line(an, &n_chain, self.nets.1))
    }

    fn route_heads(&mut self, pos: Point) {
        self.last_pos = pos;
        let (p, n) = self.build_heads(pos);
        let opts = self.options();
        let collides = |node: &Node| {
            node.check_colliding_line(&p, &opts).is_some() || node.check_colliding_line(&n, &opts).is_some()
        };

        let (shoved, violating) = match self.routing.mode {
            PnsMode::Shove => {
                let mut node = self.fixed.branch();
                let mut shove = Shove::new(self.routing.shove_iteration_limit).with_options(opts.clone());
                match shove.shove_lines(&mut node, &[p.clone(), n.clone()]) {
                    Ok(_) => (node, false),
                    Err(err) => {
                        debug!(%err, "pair shove failed, marking obstacles");
                        (self.fixed.branch(), collides(&self.fixed))
                    }
                }
            }
            PnsMode::MarkObstacles | PnsMode::Walkaround => (self.fixed.branch(), collides(&self.fixed)),
        };

        let mut current = shoved.branch();
        let marker = if violating { Marker::HEAD | Marker::VIOLATION } else { Marker::HEAD };
        for line in [&p, &n] {
            let mut marked = line.clone();
            marked.set_marker(marker);
            current.add_line(&mut marked);
        }
        self.shoved = shoved;
        self.current = current;
        self.heads = (p, n);
        self.violating = violating;
    }
}

impl PlacementAlgo for DiffPairPlacer {
    fn start(&mut self, pos: Point, start_item: Option<&Rc<Item>>, _iface: &dyn RouterInterface) -> Result<()> {
        let item = start_item.ok_or(RouterError::NoDiffPairAnchor(pos, None))?;
        let net = item.net.ok_or(RouterError::NoDiffPairAnchor(pos, None))?;
        let resolver = self.world.resolver().clone();
        let coupled = resolver.dp_coupled_net(net).ok_or(RouterError::NoCoupledNet)?;

        let ref_anchor = Self::item_anchor(item, pos);
        let coupled_anchor = self
            .coupled_anchor(coupled, ref_anchor)
            .ok_or(RouterError::NoDiffPairAnchor(ref_anchor, Some(coupled)))?;

        if resolver.dp_net_polarity(net) < 0 {
            self.nets = (Some(coupled), Some(net));
            self.anchors = (coupled_anchor, ref_anchor);
        } else {
            self.nets = (Some(net), Some(coupled));
            self.anchors = (ref_anchor, coupled_anchor);
        }
        self.fixed = self.world.clone();
        self.history.clear();
        self.route_heads(pos);
        debug!(nets = ?self.nets, anchors = ?self.anchors, "diff pair placement started");
        Ok(())
    }

    fn move_to(&mut self, pos: Point, _iface: &dyn RouterInterface) -> bool {
        self.route_heads(pos);
        true
    }

    fn fix_route(&mut self, pos: Point, end_item: Option<&Rc<Item>>, force: bool, _iface: &dyn RouterInterface) -> bool {
        self.route_heads(pos);
        if self.heads.0.piece_count() == 0 {
            return force && !self.history.is_empty();
        }
        if self.violating && !self.routing.allow_drc_violations && !force {
            return false;
        }

        self.history.push(PairLeg { node: self.fixed.clone(), anchors: self.anchors });
        let mut fixed = self.shoved.clone();
        let (mut p, mut n) = self.heads.clone();
        fixed.add_line(&mut p);
        fixed.add_line(&mut n);
        self.fixed = fixed;
        self.anchors = (p.end().unwrap_or(self.anchors.0), n.end().unwrap_or(self.anchors.1));
        let (a, b) = self.anchors;
        self.route_heads(Point::new((a.x + b.x) / 2, (a.y + b.y) / 2));

        let reached = end_item.is_some_and(|e| e.net.is_some() && (e.net == self.nets.0 || e.net == self.nets.1));
        let done = force || reached;
        debug!(legs = self.history.len(), done, "pair leg fixed");
        done
    }

    fn unfix_route(&mut self, _iface: &dyn RouterInterface) -> bool {
        let Some(leg) = self.history.pop() else {
            return false;
        };
        self.fixed = leg.node;
        self.anchors = leg.anchors;
        self.route_heads(self.last_pos);
        true
    }

    fn commit_placement(&mut self) -> Option<Node> {
        if self.history.is_empty() {
            return None;
        }
        self.history.clear();
        Some(self.fixed.clone())
    }

    fn has_placed_anything(&self) -> bool {
        !self.history.is_empty()
    }

    fn current_node(&self) -> &Node {
        &self.current
    }

    fn traces(&self) -> ItemSet {
        self.current
            .delta()
            .added
            .into_iter()
            .filter(|i| i.net == self.nets.0 || i.net == self.nets.1)
            .collect()
    }

    fn current_end(&self) -> Point {
        self.heads.0.end().unwrap_or(self.anchors.0)
    }

    fn current_nets(&self) -> Vec<Option<NetId>> {
        vec![self.nets.0, self.nets.1]
    }

    fn current_layer(&self) -> i32 {
        self.layer
    }

    fn head(&self) -> Option<&Line> {
        Some(&self.heads.0)
    }

    fn flip_posture(&mut self, _iface: &dyn RouterInterface) {
        self.posture = self.posture.flipped();
        self.route_heads(self.last_pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_keeps_distance_on_straight_runs() {
        let spine = LineChain::from_points(&[Point::new(0, 0), Point::new(1_000_000, 0), Point::new(2_000_000, 1_000_000)]);
        let left = offset_chain(&spine, 100_000);
        assert_eq!(left.point_count(), 3);
        assert_eq!(left.first(), Some(Point::new(0, 100_000)));
        let right = offset_chain(&spine, -100_000);
        assert_eq!(right.first(), Some(Point::new(0, -100_000)));
        // the mitre point lies on both offset lines
        let corner = left.point(1);
        assert_eq!(corner.y, 100_000);
        assert!(corner.x < 1_000_000);
    }
}
