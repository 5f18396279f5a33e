//! Dragging existing tracks and vias
//!
//! A segment grabbed in its interior moves perpendicular to itself; its
//! neighbours across line corners stretch to follow, and an end attached to
//! anything else gets a short connecting segment. A segment grabbed near a
//! free or corner end moves that vertex instead. A via drags the ends of
//! every segment attached to it. Each move is rebuilt from the world as it
//! was when the drag started.

use super::algo::PlacementAlgo;
use super::error::{Result, RouterError};
use super::iface::RouterInterface;
use super::settings::{PnsMode, RoutingSettings};
use super::shove::Shove;
use crate::geometry::{LineChain, Point, Seg};
use crate::item::{Item, ItemId, ItemSet, Line, NetId};
use crate::node::{CollisionOptions, Node};
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Segment,
    Corner(Point),
    Via,
}

pub struct Dragger {
    routing: RoutingSettings,
    world: Node,
    current: Node,
    mode: DragMode,
    dragged: Option<Rc<Item>>,
    origin: Point,
    last_pos: Point,
    violations: ItemSet,
}

fn segment_line(node: &Node, id: ItemId) -> Option<Line> {
    let item = node.lookup(id)?;
    let s = item.as_segment()?;
    let mut line = Line::new(LineChain::from_points(&[s.seg.a, s.seg.b]), s.width, item.layer(), item.net);
    line.set_links(vec![id]);
    Some(line)
}

fn via_line(node: &Node, id: ItemId) -> Option<Line> {
    let item = node.lookup(id)?;
    let mut line = Line::new(LineChain::from_points(&[item.anchor(0)]), 0, item.layer(), item.net);
    line.set_via(Some((**item).clone()));
    line.set_links(vec![id]);
    Some(line)
}

impl Dragger {
    pub fn new(world: &Node, routing: RoutingSettings) -> Self {
        let world = world.branch();
        Self {
            routing,
            current: world.branch(),
            world,
            mode: DragMode::Segment,
            dragged: None,
            origin: Point::default(),
            last_pos: Point::default(),
            violations: ItemSet::new(),
        }
    }

    pub fn mode(&self) -> DragMode {
        self.mode
    }

    pub fn is_violating(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Move the end of segment `id` sitting at `from` to `to`; a segment that
    /// would collapse is dropped
    pub(super) fn move_segment_end(node: &mut Node, id: ItemId, from: Point, to: Point) -> Option<ItemId> {
        let item = node.lookup(id)?.clone();
        let s = item.as_segment()?;
        let far = if s.seg.a == from { s.seg.b } else { s.seg.a };
        if far == to {
            node.remove(id);
            return None;
        }
        Some(node.replace(id, Item::segment(Seg::new(far, to), s.width, item.layer(), item.net)))
    }

    fn drag_segment(&self, node: &mut Node, item: &Item, offset: Point) -> Vec<ItemId> {
        let (Some(id), Some(s)) = (item.id(), item.as_segment()) else {
            return Vec::new();
        };
        let mut touched = Vec::new();
        if offset == Point::default() {
            return touched;
        }
        for end in [s.seg.a, s.seg.b] {
            let Some(jt) = self.world.find_joint_for(end, item) else {
                continue;
            };
            if jt.link_count() == 1 {
                continue;
            }
            match jt.next_segment(id, false) {
                Some(nid) if self.world.lookup(nid).is_some_and(|n| n.as_segment().is_some()) => {
                    touched.extend(Self::move_segment_end(node, nid, end, end + offset));
                }
                _ => {
                    let link = Item::segment(Seg::new(end, end + offset), s.width, item.layer(), item.net);
                    touched.push(node.add(link));
                }
            }
        }
        let moved = Item::segment(Seg::new(s.seg.a + offset, s.seg.b + offset), s.width, item.layer(), item.net);
        touched.push(node.replace(id, moved));
        touched
    }

    fn drag_corner(&self, node: &mut Node, corner: Point, pos: Point) -> Vec<ItemId> {
        let Some(item) = &self.dragged else {
            return Vec::new();
        };
        let Some(jt) = self.world.find_joint_for(corner, item) else {
            return Vec::new();
        };
        let ids: Vec<ItemId> = jt.link_ids().collect();
        ids.into_iter().filter_map(|id| Self::move_segment_end(node, id, corner, pos)).collect()
    }

    fn drag_via(&self, node: &mut Node, item: &Item, offset: Point) -> Vec<ItemId> {
        let Some(id) = item.id() else {
            return Vec::new();
        };
        let centre = item.anchor(0);
        let mut touched = Vec::new();
        if let Some(jt) = self.world.find_joint_for(centre, item) {
            let attached: Vec<ItemId> = jt.link_ids().filter(|l| *l != id).collect();
            for sid in attached {
                touched.extend(Self::move_segment_end(node, sid, centre, centre + offset));
            }
        }
        touched.push(node.replace(id, item.translated(offset).detached()));
        touched
    }

    fn pushers(node: &Node, ids: &[ItemId]) -> Vec<Line> {
        ids.iter()
            .filter_map(|&id| {
                let item = node.lookup(id)?;
                if item.as_via().is_some() {
                    via_line(node, id)
                } else {
                    segment_line(node, id)
                }
            })
            .collect()
    }

    fn collect_violations(node: &Node, pushers: &[Line]) -> ItemSet {
        let mut found = ItemSet::new();
        for line in pushers {
            for obs in node.query_colliding_line(line, &CollisionOptions::default()) {
                if !found.contains(obs.item.id().unwrap_or(ItemId(0))) {
                    found.add(obs.item);
                }
            }
        }
        found
    }

    fn drag_to(&mut self, pos: Point) {
        self.last_pos = pos;
        let Some(item) = self.dragged.clone() else {
            return;
        };
        let delta = pos - self.origin;
        let mut node = self.world.branch();
        let touched = match self.mode {
            DragMode::Segment => {
                let Some(s) = item.as_segment() else {
                    return;
                };
                let normal = s.seg.direction().perpendicular();
                let norm = normal.euclidean_norm();
                let along = if norm > 0.0 { delta.dot(normal) as f64 / norm } else { 0.0 };
                self.drag_segment(&mut node, &item, normal.resize(along.round() as i64))
            }
            DragMode::Corner(corner) => self.drag_corner(&mut node, corner, pos),
            DragMode::Via => self.drag_via(&mut node, &item, delta),
        };

        let pushers = Self::pushers(&node, &touched);
        if self.routing.mode == PnsMode::Shove {
            let mut shoved = node.branch();
            match Shove::new(self.routing.shove_iteration_limit).shove_lines(&mut shoved, &pushers) {
                Ok(stats) => {
                    if stats.pushed > 0 {
                        debug!(pushed = stats.pushed, "drag shoved obstacles");
                    }
                    node.commit(shoved);
                }
                Err(err) => debug!(%err, "drag shove failed, marking obstacles"),
            }
        }
        self.violations = Self::collect_violations(&node, &pushers);
        self.current = node;
    }
}

impl PlacementAlgo for Dragger {
    fn start(&mut self, pos: Point, start_item: Option<&Rc<Item>>, _iface: &dyn RouterInterface) -> Result<()> {
        let item = start_item.ok_or(RouterError::NotDraggable)?;
        if item.locked || item.id().is_none() {
            return Err(RouterError::NotDraggable);
        }
        self.mode = if let Some(s) = item.as_segment() {
            let tolerance = (s.width / 2) as f64;
            let grabbed_end = [s.seg.a, s.seg.b].into_iter().find(|end| end.distance(pos) <= tolerance);
            let corner = grabbed_end.filter(|end| {
                self.world
                    .find_joint_for(*end, item)
                    .is_some_and(|jt| jt.is_trivial_endpoint() || jt.is_line_corner(false))
            });
            match corner {
                Some(end) => DragMode::Corner(end),
                None => DragMode::Segment,
            }
        } else if item.as_via().is_some() {
            let centre = item.anchor(0);
            let attached_arc = self.world.find_joint_for(centre, item).is_some_and(|jt| {
                jt.link_ids().any(|l| self.world.lookup(l).is_some_and(|i| i.as_arc().is_some()))
            });
            if attached_arc {
                return Err(RouterError::NotDraggable);
            }
            DragMode::Via
        } else {
            return Err(RouterError::NotDraggable);
        };
        self.dragged = Some(item.clone());
        self.origin = pos;
        self.last_pos = pos;
        self.current = self.world.branch();
        self.violations = ItemSet::new();
        debug!(mode = ?self.mode, "drag started");
        Ok(())
    }

    fn move_to(&mut self, pos: Point, _iface: &dyn RouterInterface) -> bool {
        self.drag_to(pos);
        true
    }

    fn fix_route(&mut self, pos: Point, _end_item: Option<&Rc<Item>>, force: bool, _iface: &dyn RouterInterface) -> bool {
        self.drag_to(pos);
        let strict = self.routing.mode != PnsMode::MarkObstacles && !self.routing.allow_drc_violations;
        !(strict && self.is_violating() && !force)
    }

    fn commit_placement(&mut self) -> Option<Node> {
        if !self.current.has_changes() {
            return None;
        }
        let node = self.current.clone();
        self.current = self.world.branch();
        Some(node)
    }

    fn has_placed_anything(&self) -> bool {
        self.current.has_changes()
    }

    fn current_node(&self) -> &Node {
        &self.current
    }

    fn traces(&self) -> ItemSet {
        self.current.delta().added.into_iter().collect()
    }

    fn current_end(&self) -> Point {
        self.last_pos
    }

    fn current_nets(&self) -> Vec<Option<NetId>> {
        vec![self.dragged.as_ref().and_then(|d| d.net)]
    }

    fn current_layer(&self) -> i32 {
        self.dragged.as_ref().map_or(0, |d| d.layer())
    }

    fn violations(&self) -> ItemSet {
        self.violations.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Shape;
    use crate::item::{LayerRange, Solid, Via};
    use crate::router::iface::NullHost;
    use crate::rules::{DesignRules, MemoizedRuleResolver};

    const W: i64 = 200_000;

    fn node() -> Node {
        Node::new(Rc::new(MemoizedRuleResolver::new(DesignRules::default())))
    }

    fn seg(node: &mut Node, a: (i64, i64), b: (i64, i64)) -> Rc<Item> {
        let id = node.add(Item::segment(Seg::new(Point::new(a.0, a.1), Point::new(b.0, b.1)), W, 0, Some(NetId(1))));
        node.lookup(id).cloned().unwrap()
    }

    fn mark_mode() -> RoutingSettings {
        RoutingSettings { mode: PnsMode::MarkObstacles, ..Default::default() }
    }

    #[test]
    fn test_segment_drag_stretches_neighbours() {
        let mut world = node();
        seg(&mut world, (0, 0), (1_000_000, 0));
        let mid = seg(&mut world, (1_000_000, 0), (1_000_000, 2_000_000));
        seg(&mut world, (1_000_000, 2_000_000), (2_000_000, 2_000_000));

        let mut d = Dragger::new(&world, mark_mode());
        d.start(Point::new(1_000_000, 1_000_000), Some(&mid), &NullHost).unwrap();
        assert_eq!(d.mode(), DragMode::Segment);
        // the along-track part of the motion is dropped
        d.move_to(Point::new(1_500_000, 1_300_000), &NullHost);

        let node = d.current_node();
        assert_eq!(node.item_count(), 3);
        assert!(!node.contains(mid.id().unwrap()));
        let net = Some(NetId(1));
        assert!(node.find_joint(Point::new(1_500_000, 0), 0, net).unwrap().is_line_corner(false));
        assert!(node.find_joint(Point::new(1_500_000, 2_000_000), 0, net).unwrap().is_line_corner(false));
        assert!(d.fix_route(Point::new(1_500_000, 1_300_000), None, false, &NullHost));
        assert!(d.commit_placement().is_some());
        assert_eq!(world.item_count(), 3);
    }

    #[test]
    fn test_end_on_pad_gets_connecting_segment() {
        let mut world = node();
        let pad = Solid::pad(Point::new(0, 0), Shape::Circle { center: Point::new(0, 0), radius: 300_000 });
        world.add(Item::solid(pad, LayerRange::single(0), Some(NetId(1))));
        let track = seg(&mut world, (0, 0), (2_000_000, 0));

        let mut d = Dragger::new(&world, mark_mode());
        d.start(Point::new(1_000_000, 0), Some(&track), &NullHost).unwrap();
        d.move_to(Point::new(1_000_000, 500_000), &NullHost);
        let node = d.current_node();
        assert_eq!(node.item_count(), 3);
        let jt = node.find_joint(Point::new(0, 0), 0, Some(NetId(1))).unwrap();
        assert_eq!(jt.link_count(), 2);
        assert!(node.find_joint(Point::new(0, 500_000), 0, Some(NetId(1))).unwrap().is_line_corner(false));
    }

    #[test]
    fn test_corner_drag_moves_vertex() {
        let mut world = node();
        let first = seg(&mut world, (0, 0), (1_000_000, 0));
        seg(&mut world, (1_000_000, 0), (1_000_000, 1_000_000));

        let mut d = Dragger::new(&world, mark_mode());
        d.start(Point::new(1_000_000, 0), Some(&first), &NullHost).unwrap();
        assert_eq!(d.mode(), DragMode::Corner(Point::new(1_000_000, 0)));
        d.move_to(Point::new(1_200_000, -300_000), &NullHost);
        let jt = d.current_node().find_joint(Point::new(1_200_000, -300_000), 0, Some(NetId(1))).unwrap();
        assert!(jt.is_line_corner(false));
        assert!(d.current_node().find_joint(Point::new(1_000_000, 0), 0, Some(NetId(1))).is_none());
    }

    #[test]
    fn test_via_drag_carries_track_ends() {
        let mut world = node();
        let via = world.add(Item::via(Via::new(Point::new(1_000_000, 0), 600_000, 300_000), LayerRange::new(0, 1), Some(NetId(1))));
        seg(&mut world, (0, 0), (1_000_000, 0));
        let via = world.lookup(via).cloned().unwrap();

        let mut d = Dragger::new(&world, mark_mode());
        d.start(Point::new(1_000_000, 0), Some(&via), &NullHost).unwrap();
        assert_eq!(d.mode(), DragMode::Via);
        d.move_to(Point::new(1_000_000, 400_000), &NullHost);
        let jt = d.current_node().find_joint(Point::new(1_000_000, 400_000), 0, Some(NetId(1))).unwrap();
        assert_eq!(jt.link_count(), 2);
        assert!(jt.via().is_some());
    }

    #[test]
    fn test_locked_and_pads_are_not_draggable() {
        let mut world = node();
        let id = world.add(Item::segment(Seg::new(Point::new(0, 0), Point::new(1_000_000, 0)), W, 0, None).with_locked(true));
        let locked = world.lookup(id).cloned().unwrap();
        let pad = Solid::pad(Point::new(0, 0), Shape::Circle { center: Point::new(0, 0), radius: 300_000 });
        let pid = world.add(Item::solid(pad, LayerRange::single(0), None));
        let pad = world.lookup(pid).cloned().unwrap();

        let mut d = Dragger::new(&world, RoutingSettings::default());
        assert_eq!(d.start(Point::new(500_000, 0), Some(&locked), &NullHost), Err(RouterError::NotDraggable));
        assert_eq!(d.start(Point::new(0, 0), Some(&pad), &NullHost), Err(RouterError::NotDraggable));
        assert_eq!(d.start(Point::new(0, 0), None, &NullHost), Err(RouterError::NotDraggable));
    }

    #[test]
    fn test_mark_mode_reports_violations() {
        let mut world = node();
        let track = seg(&mut world, (0, 0), (2_000_000, 0));
        world.add(Item::segment(Seg::new(Point::new(0, 600_000), Point::new(2_000_000, 600_000)), W, 0, Some(NetId(2))));

        let mut d = Dragger::new(&world, mark_mode());
        d.start(Point::new(1_000_000, 0), Some(&track), &NullHost).unwrap();
        d.move_to(Point::new(1_000_000, 400_000), &NullHost);
        assert!(d.is_violating());
        assert_eq!(d.violations().len(), 1);
        // mark mode keeps the violating drag
        assert!(d.fix_route(Point::new(1_000_000, 400_000), None, false, &NullHost));
    }
}
