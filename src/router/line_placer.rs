//! Single track placement
//!
//! The head runs from the last fixed point to the cursor as a two-piece
//! 45-degree trace. How it deals with obstacles depends on the routing mode:
//! marking them, shoving foreign tracks aside (marking when that fails), or
//! walking around by trying both postures and otherwise stopping short of the
//! first obstacle. Each fix folds the head and whatever it shoved into the
//! fixed node and remembers the previous state for undo.

use super::algo::PlacementAlgo;
use super::error::{Result, RouterError};
use super::iface::RouterInterface;
use super::settings::{PnsMode, RoutingSettings, SizesSettings};
use super::shove::Shove;
use crate::geometry::{build_initial_trace, ChainPiece, LineChain, Point, Posture, Seg};
use crate::item::{Item, ItemSet, KindMask, LayerRange, Line, Marker, NetId, Via};
use crate::node::{CollisionOptions, Node};
use std::rc::Rc;
use tracing::debug;

/// Walkaround clipping resolution along the colliding piece
const CLIP_ITERATIONS: usize = 24;

struct FixedLeg {
    node: Node,
    start: Point,
    layer: i32,
    via: bool,
}

pub struct LinePlacer {
    routing: RoutingSettings,
    sizes: SizesSettings,
    world: Node,
    /// World plus every fixed leg
    fixed: Node,
    /// `fixed` after shoving for the current head
    shoved: Node,
    /// `shoved` with the head added
    current: Node,
    head: Line,
    start: Point,
    layer: i32,
    net: Option<NetId>,
    posture: Posture,
    place_via: bool,
    violating: bool,
    last_pos: Point,
    history: Vec<FixedLeg>,
    start_item: Option<Rc<Item>>,
}

impl LinePlacer {
    pub fn new(world: &Node, routing: RoutingSettings, sizes: SizesSettings, layer: i32) -> Self {
        let world = world.branch();
        let posture = if routing.start_diagonal { Posture::DiagonalFirst } else { Posture::StraightFirst };
        Self {
            routing,
            fixed: world.clone(),
            shoved: world.branch(),
            current: world.branch(),
            world,
            head: Line::new(LineChain::new(), sizes.track_width, layer, None),
            sizes,
            start: Point::default(),
            layer,
            net: None,
            posture,
            place_via: false,
            violating: false,
            last_pos: Point::default(),
            history: Vec::new(),
            start_item: None,
        }
    }

    pub fn is_violating(&self) -> bool {
        self.violating
    }

    pub fn posture(&self) -> Posture {
        self.posture
    }

    fn width(&self) -> i64 {
        self.sizes.track_width
    }

    fn empty_head(&self) -> Line {
        Line::new(LineChain::from_points(&[self.start]), self.width(), self.layer, self.net)
    }

    /// Start on a segment: snap to an end if close, otherwise split it so the
    /// new track joins at a real joint
    fn snap_to_segment(&mut self, item: &Item, pos: Point) -> Point {
        let (Some(id), Some(s)) = (item.id(), item.as_segment()) else {
            return pos;
        };
        let snapped = s.seg.nearest_point(pos);
        let tolerance = (s.width / 2) as f64;
        for end in [s.seg.a, s.seg.b] {
            if end.distance(snapped) <= tolerance {
                return end;
            }
        }
        let (layer, net) = (item.layer(), item.net);
        self.fixed.replace(id, Item::segment(Seg::new(s.seg.a, snapped), s.width, layer, net));
        self.fixed.add(Item::segment(Seg::new(snapped, s.seg.b), s.width, layer, net));
        debug!(item = %id, ?snapped, "split start segment");
        snapped
    }

    fn build_head(&self, pos: Point, posture: Posture) -> Line {
        let chain = build_initial_trace(self.start, pos, posture);
        let mut head = Line::new(chain, self.width(), self.layer, self.net);
        if self.place_via {
            let (a, b) = self.sizes.via_layers;
            let via = Via::new(pos, self.sizes.via_diameter, self.sizes.via_drill);
            head.set_via(Some(Item::via(via, LayerRange::new(a, b), self.net)));
        }
        head
    }

    fn route_mark(&self, head: Line) -> (Node, Line, bool) {
        let violating = self.fixed.check_colliding_line(&head, &CollisionOptions::default()).is_some();
        (self.fixed.branch(), head, violating)
    }

    fn route_shove(&self, head: Line) -> (Node, Line, bool) {
        let mut node = self.fixed.branch();
        match Shove::new(self.routing.shove_iteration_limit).shove_line(&mut node, &head) {
            Ok(stats) => {
                if stats.pushed > 0 {
                    debug!(pushed = stats.pushed, "head shoved obstacles");
                }
                (node, head, false)
            }
            Err(err) => {
                debug!(%err, "shove failed, marking obstacles");
                self.route_mark(head)
            }
        }
    }

    fn route_walkaround(&self, pos: Point, head: Line) -> (Node, Line, bool) {
        let opts = CollisionOptions::default();
        for posture in [self.posture, self.posture.flipped()] {
            let candidate = self.build_head(pos, posture);
            if self.fixed.check_colliding_line(&candidate, &opts).is_none() {
                return (self.fixed.branch(), candidate, false);
            }
        }
        let clipped = self.clip_to_obstacle(&head);
        let violating = self.fixed.check_colliding_line(&clipped, &opts).is_some();
        (self.fixed.branch(), clipped, violating)
    }

    /// Longest collision-free prefix of `head`
    fn clip_to_obstacle(&self, head: &Line) -> Line {
        let opts = CollisionOptions::default();
        let Some(hit) = self.fixed.nearest_obstacle(head, &opts) else {
            return head.clone();
        };
        let mut chain = head.chain().slice(0, hit.piece);
        let lerp = |seg: &Seg, t: f64| {
            let d = seg.direction();
            Point::from_f64(seg.a.x as f64 + d.x as f64 * t, seg.a.y as f64 + d.y as f64 * t)
        };
        if let ChainPiece::Segment(seg) = head.chain().piece(hit.piece) {
            let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
            for _ in 0..CLIP_ITERATIONS {
                let mid = (lo + hi) / 2.0;
                let probe = head.with_chain(LineChain::from_points(&[seg.a, lerp(&seg, mid)]));
                if self.fixed.check_colliding_line(&probe, &opts).is_none() {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            chain.push_point(lerp(&seg, lo));
        }
        let mut clipped = head.with_chain(chain);
        clipped.set_via(None);
        clipped
    }

    fn route_head(&mut self, pos: Point) {
        self.last_pos = pos;
        let head = self.build_head(pos, self.posture);
        let (shoved, head, violating) = match self.routing.mode {
            PnsMode::MarkObstacles => self.route_mark(head),
            PnsMode::Shove => self.route_shove(head),
            PnsMode::Walkaround => self.route_walkaround(pos, head),
        };

        let mut current = shoved.branch();
        let mut marked = head.clone();
        let marker = if violating { Marker::HEAD | Marker::VIOLATION } else { Marker::HEAD };
        marked.set_marker(marker);
        current.add_line(&mut marked);
        if let Some(via) = marked.via() {
            current.add(via.detached().with_marker(marker));
        }

        self.shoved = shoved;
        self.head = head;
        self.violating = violating;
        self.current = current;
    }

    /// True if the fixed track now ends on something else of its net
    fn end_connected(&self) -> bool {
        let own = if self.history.last().is_some_and(|leg| leg.via) { 2 } else { 1 };
        self.net.is_some()
            && self
                .fixed
                .find_joint(self.start, self.layer, self.net)
                .is_some_and(|jt| jt.link_count() > own)
    }
}

impl PlacementAlgo for LinePlacer {
    fn start(&mut self, pos: Point, start_item: Option<&Rc<Item>>, _iface: &dyn RouterInterface) -> Result<()> {
        self.net = start_item.and_then(|i| i.net);
        self.start_item = start_item.cloned();
        self.fixed = self.world.clone();
        self.history.clear();

        self.start = match start_item {
            Some(item) if item.as_segment().is_some() => self.snap_to_segment(item, pos),
            Some(item) if item.as_arc().is_some() => {
                let anchors = item.anchors();
                if anchors[0].distance(pos) <= anchors[1].distance(pos) { anchors[0] } else { anchors[1] }
            }
            Some(item) => item.anchor(0),
            None => pos,
        };

        if self.routing.mode != PnsMode::MarkObstacles && !self.routing.allow_drc_violations {
            let probe = Item::segment(Seg::new(self.start, self.start), self.width(), self.layer, self.net);
            if let Some(obs) = self.fixed.check_colliding(&probe, &CollisionOptions::default()) {
                debug!(obstacle = ?obs.item.id(), "start point violates clearance");
                return Err(RouterError::StartViolatesDrc);
            }
        }

        self.head = self.empty_head();
        self.shoved = self.fixed.branch();
        self.current = self.fixed.branch();
        self.last_pos = self.start;
        debug!(start = ?self.start, layer = self.layer, net = ?self.net, "line placement started");
        Ok(())
    }

    fn move_to(&mut self, pos: Point, _iface: &dyn RouterInterface) -> bool {
        self.route_head(pos);
        true
    }

    fn fix_route(&mut self, pos: Point, end_item: Option<&Rc<Item>>, force: bool, _iface: &dyn RouterInterface) -> bool {
        self.route_head(pos);
        if self.head.is_empty() && !self.head.ends_with_via() {
            return force && !self.history.is_empty();
        }
        if self.violating && !self.routing.allow_drc_violations && !force {
            debug!("refusing to fix a violating head");
            return false;
        }

        self.history.push(FixedLeg { node: self.fixed.clone(), start: self.start, layer: self.layer, via: self.place_via });

        let mut fixed = self.shoved.clone();
        let mut line = self.head.clone();
        if self.violating {
            line.set_marker(Marker::VIOLATION);
        }
        fixed.add_line(&mut line);
        if let Some(via) = line.via() {
            fixed.add(via.detached());
        }
        self.fixed = fixed;
        self.start = line.end().unwrap_or(self.start);
        let ended_on_via = self.place_via;
        if self.place_via {
            self.layer = self.sizes.paired_layer(self.layer);
            self.place_via = false;
        }

        let reached = end_item.is_some_and(|e| self.net.is_some() && e.net == self.net);
        let done = force || (!ended_on_via && (reached || self.end_connected()));

        self.head = self.empty_head();
        self.shoved = self.fixed.branch();
        self.current = self.fixed.branch();
        debug!(end = ?self.start, legs = self.history.len(), done, "leg fixed");
        done
    }

    fn unfix_route(&mut self, _iface: &dyn RouterInterface) -> bool {
        let Some(leg) = self.history.pop() else {
            return false;
        };
        self.fixed = leg.node;
        self.start = leg.start;
        self.layer = leg.layer;
        self.place_via = leg.via;
        self.route_head(self.last_pos);
        debug!(legs = self.history.len(), "leg undone");
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
            .filter(|i| i.net == self.net && i.of_kind(KindMask::LINKED | KindMask::VIA))
            .collect()
    }

    fn current_end(&self) -> Point {
        self.head.end().unwrap_or(self.start)
    }

    fn current_nets(&self) -> Vec<Option<NetId>> {
        vec![self.net]
    }

    fn current_layer(&self) -> i32 {
        self.layer
    }

    fn head(&self) -> Option<&Line> {
        Some(&self.head)
    }

    fn toggle_via(&mut self, enabled: bool, _iface: &dyn RouterInterface) -> bool {
        self.place_via = enabled;
        self.route_head(self.last_pos);
        true
    }

    fn is_placing_via(&self) -> bool {
        self.place_via
    }

    /// Only where the start point reaches the new layer: a free start, or a
    /// joint spanning it (through pad, via)
    fn set_layer(&mut self, layer: i32, _iface: &dyn RouterInterface) -> bool {
        if layer == self.layer {
            return true;
        }
        let free_start = self.history.is_empty() && self.start_item.is_none();
        let spans = self
            .fixed
            .find_joint(self.start, self.layer, self.net)
            .is_some_and(|jt| jt.layers().contains(layer));
        if !free_start && !spans {
            return false;
        }
        self.layer = layer;
        self.route_head(self.last_pos);
        true
    }

    fn flip_posture(&mut self, _iface: &dyn RouterInterface) {
        self.posture = self.posture.flipped();
        self.route_head(self.last_pos);
    }

    fn violations(&self) -> ItemSet {
        if !self.violating {
            return ItemSet::new();
        }
        let obstacles = self.shoved.query_colliding_line(&self.head, &CollisionOptions::default());
        obstacles.into_iter().map(|o| o.item).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, Shape};
    use crate::item::{KeepoutRules, Solid};
    use crate::router::iface::NullHost;
    use crate::rules::{DesignRules, MemoizedRuleResolver};

    fn world() -> Node {
        Node::new(Rc::new(MemoizedRuleResolver::new(DesignRules::default())))
    }

    fn placer(world: &Node, mode: PnsMode) -> LinePlacer {
        let routing = RoutingSettings { mode, ..Default::default() };
        LinePlacer::new(world, routing, SizesSettings::default(), 0)
    }

    fn wall(world: &mut Node) {
        let rules = KeepoutRules { no_tracks: true, ..Default::default() };
        let shape = Shape::Rect(BoundingBox::new(Point::new(2_000_000, -1_000_000), Point::new(2_500_000, 1_000_000)));
        world.add(Item::solid(Solid::keepout(shape, rules), LayerRange::single(0), None));
    }

    #[test]
    fn test_two_legs_and_undo() {
        let w = world();
        let mut p = placer(&w, PnsMode::Shove);
        p.start(Point::new(0, 0), None, &NullHost).unwrap();
        assert!(!p.fix_route(Point::new(1_000_000, 0), None, false, &NullHost));
        assert!(!p.fix_route(Point::new(1_000_000, 1_000_000), None, false, &NullHost));
        assert_eq!(p.current_end(), Point::new(1_000_000, 1_000_000));
        assert!(p.unfix_route(&NullHost));
        assert!(p.has_placed_anything());
        let node = p.commit_placement().unwrap();
        assert_eq!(node.item_count(), 1);
    }

    #[test]
    fn test_mark_mode_keeps_violating_head() {
        let mut w = world();
        wall(&mut w);
        let mut p = placer(&w, PnsMode::MarkObstacles);
        p.start(Point::new(0, 0), None, &NullHost).unwrap();
        p.move_to(Point::new(4_000_000, 0), &NullHost);
        assert!(p.is_violating());
        assert_eq!(p.current_end(), Point::new(4_000_000, 0));
        assert_eq!(p.violations().len(), 1);
        assert!(!p.fix_route(Point::new(4_000_000, 0), None, false, &NullHost));
        assert!(!p.has_placed_anything());
    }

    #[test]
    fn test_walkaround_stops_short_of_obstacle() {
        let mut w = world();
        wall(&mut w);
        let mut p = placer(&w, PnsMode::Walkaround);
        p.start(Point::new(0, 0), None, &NullHost).unwrap();
        p.move_to(Point::new(4_000_000, 0), &NullHost);
        assert!(!p.is_violating());
        let end = p.current_end();
        assert_eq!(end.y, 0);
        // keepouts use zero clearance, so the copper edge stops at the wall
        assert!(end.x < 2_000_000 - 125_000 + 1 && end.x > 1_800_000);
    }

    #[test]
    fn test_start_on_segment_splits_it() {
        let mut w = world();
        let net = Some(NetId(4));
        let id = w.add(Item::segment(Seg::new(Point::new(0, 0), Point::new(2_000_000, 0)), 250_000, 0, net));
        let seed = w.lookup(id).cloned().unwrap();
        let mut p = placer(&w, PnsMode::Shove);
        p.start(Point::new(1_000_000, 50_000), Some(&seed), &NullHost).unwrap();
        assert!(!p.fix_route(Point::new(1_000_000, 1_000_000), None, false, &NullHost));
        let node = p.commit_placement().unwrap();
        assert!(!node.contains(id));
        let jt = node.find_joint(Point::new(1_000_000, 0), 0, net).unwrap();
        assert_eq!(jt.link_count(), 3);
    }

    #[test]
    fn test_via_switches_layer() {
        let w = world();
        let mut p = placer(&w, PnsMode::Shove);
        p.start(Point::new(0, 0), None, &NullHost).unwrap();
        assert!(p.toggle_via(true, &NullHost));
        assert!(!p.fix_route(Point::new(1_000_000, 0), None, false, &NullHost));
        assert_eq!(p.current_layer(), 1);
        assert!(!p.is_placing_via());
        let node = p.commit_placement().unwrap();
        assert_eq!(node.items().filter(|i| i.as_via().is_some()).count(), 1);
    }
}
