//! Component drag
//!
//! Every pad of the grabbed pad's component moves rigidly with the cursor.
//! Track ends sitting on those pads stretch to follow. Obstacles are reported,
//! never shoved: the cluster around each moved pad gives the overlaps, the
//! resolver clearance gives everything else.

use super::algo::PlacementAlgo;
use super::dragger::Dragger;
use super::error::{Result, RouterError};
use super::iface::RouterInterface;
use super::settings::{PnsMode, RoutingSettings};
use crate::geometry::Point;
use crate::item::{Item, ItemId, ItemSet, NetId};
use crate::node::{CollisionOptions, Node};
use crate::topology::Topology;
use std::rc::Rc;
use tracing::debug;

/// A track end resting on a dragged pad
#[derive(Debug, Clone, Copy)]
struct AttachedEnd {
    segment: ItemId,
    pos: Point,
}

pub struct ComponentDragger {
    routing: RoutingSettings,
    world: Node,
    current: Node,
    component: Option<String>,
    solids: Vec<Rc<Item>>,
    attached: Vec<AttachedEnd>,
    origin: Point,
    last_pos: Point,
    violations: ItemSet,
}

impl ComponentDragger {
    pub fn new(world: &Node, routing: RoutingSettings) -> Self {
        let world = world.branch();
        Self {
            routing,
            current: world.branch(),
            world,
            component: None,
            solids: Vec::new(),
            attached: Vec::new(),
            origin: Point::default(),
            last_pos: Point::default(),
            violations: ItemSet::new(),
        }
    }

    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    pub fn is_violating(&self) -> bool {
        !self.violations.is_empty()
    }

    fn moved_ids(&self, node: &Node) -> Vec<ItemId> {
        node.delta().added.iter().filter_map(|i| i.id()).collect()
    }

    fn find_violations(&self, node: &Node, moved: &[ItemId]) -> ItemSet {
        let topo = Topology::new(node);
        let mut found = ItemSet::new();
        let report = |item: &Rc<Item>, found: &mut ItemSet| {
            let Some(id) = item.id() else {
                return;
            };
            if !moved.contains(&id) && !found.contains(id) {
                found.add(item.clone());
            }
        };
        for &id in moved {
            let Some(item) = node.lookup(id).cloned() else {
                continue;
            };
            if item.as_solid().is_some() {
                for layer in item.layers.layers() {
                    let cluster = topo.assemble_cluster(&item, layer, self.routing.cluster_area_expansion_limit, item.net);
                    for other in cluster.items.iter().filter(|o| o.net != item.net || o.net.is_none()) {
                        report(other, &mut found);
                    }
                }
            }
            for obs in node.query_colliding(&item, &CollisionOptions::default()) {
                report(&obs.item, &mut found);
            }
        }
        found
    }

    fn drag_to(&mut self, pos: Point) {
        self.last_pos = pos;
        let delta = pos - self.origin;
        let mut node = self.world.branch();
        if delta != Point::default() {
            for end in &self.attached {
                Dragger::move_segment_end(&mut node, end.segment, end.pos, end.pos + delta);
            }
            for solid in &self.solids {
                if let Some(id) = solid.id() {
                    node.replace(id, solid.translated(delta).detached());
                }
            }
        }
        let moved = self.moved_ids(&node);
        self.violations = self.find_violations(&node, &moved);
        self.current = node;
    }
}

impl PlacementAlgo for ComponentDragger {
    fn start(&mut self, pos: Point, start_item: Option<&Rc<Item>>, _iface: &dyn RouterInterface) -> Result<()> {
        let item = start_item.ok_or(RouterError::NotDraggable)?;
        let component = item
            .as_solid()
            .filter(|s| !s.is_keepout())
            .and_then(|s| s.component.clone())
            .ok_or(RouterError::NotDraggable)?;
        if item.locked {
            return Err(RouterError::NotDraggable);
        }

        let solids: Vec<Rc<Item>> = self
            .world
            .items()
            .filter(|i| i.as_solid().is_some_and(|s| s.component.as_deref() == Some(component.as_str())))
            .cloned()
            .collect();
        let mut attached = Vec::new();
        for solid in &solids {
            let centre = solid.anchor(0);
            let Some(jt) = self.world.find_joint_for(centre, solid) else {
                continue;
            };
            for id in jt.link_ids() {
                if self.world.lookup(id).is_some_and(|i| i.as_segment().is_some()) {
                    attached.push(AttachedEnd { segment: id, pos: centre });
                }
            }
        }
        debug!(component = %component, pads = solids.len(), tracks = attached.len(), "component drag started");
        self.component = Some(component);
        self.solids = solids;
        self.attached = attached;
        self.origin = pos;
        self.last_pos = pos;
        self.current = self.world.branch();
        self.violations = ItemSet::new();
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
        let mut nets: Vec<Option<NetId>> = self.solids.iter().map(|s| s.net).collect();
        nets.sort();
        nets.dedup();
        nets
    }

    fn current_layer(&self) -> i32 {
        self.solids.first().map_or(0, |s| s.layers.start())
    }

    fn violations(&self) -> ItemSet {
        self.violations.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Seg, Shape};
    use crate::item::{LayerRange, Solid};
    use crate::router::iface::NullHost;
    use crate::rules::{DesignRules, MemoizedRuleResolver};

    fn pad(node: &mut Node, x: i64, net: u32, component: &str) -> Rc<Item> {
        let centre = Point::new(x, 0);
        let mut solid = Solid::pad(centre, Shape::Circle { center: centre, radius: 300_000 });
        solid.component = Some(component.to_string());
        let id = node.add(Item::solid(solid, LayerRange::single(0), Some(NetId(net))));
        node.lookup(id).cloned().unwrap()
    }

    fn world() -> (Node, Rc<Item>) {
        let mut n = Node::new(Rc::new(MemoizedRuleResolver::new(DesignRules::default())));
        let grabbed = pad(&mut n, 0, 1, "U1");
        pad(&mut n, 1_000_000, 2, "U1");
        n.add(Item::segment(Seg::new(Point::new(0, 0), Point::new(0, 3_000_000)), 200_000, 0, Some(NetId(1))));
        pad(&mut n, 4_000_000, 3, "U2");
        (n, grabbed)
    }

    #[test]
    fn test_pads_and_track_ends_move_together() {
        let (world, grabbed) = world();
        let mut d = ComponentDragger::new(&world, RoutingSettings::default());
        d.start(Point::new(0, 0), Some(&grabbed), &NullHost).unwrap();
        assert_eq!(d.component(), Some("U1"));
        d.move_to(Point::new(500_000, -1_000_000), &NullHost);

        let node = d.current_node();
        assert_eq!(node.item_count(), 4);
        let jt = node.find_joint(Point::new(500_000, -1_000_000), 0, Some(NetId(1))).unwrap();
        assert_eq!(jt.link_count(), 2);
        assert!(node.find_joint(Point::new(1_500_000, -1_000_000), 0, Some(NetId(2))).is_some());
        assert!(node.find_joint(Point::new(0, 3_000_000), 0, Some(NetId(1))).is_some());
        assert!(!d.is_violating());
        assert!(d.fix_route(Point::new(500_000, -1_000_000), None, false, &NullHost));
        assert!(d.commit_placement().is_some());
    }

    #[test]
    fn test_overlapping_foreign_pad_is_reported() {
        let (world, grabbed) = world();
        let mut d = ComponentDragger::new(&world, RoutingSettings::default());
        d.start(Point::new(0, 0), Some(&grabbed), &NullHost).unwrap();
        // the second pad lands on U2's pad
        d.move_to(Point::new(3_000_000, 0), &NullHost);
        assert!(d.is_violating());
        assert!(d.violations().iter().any(|i| i.net == Some(NetId(3))));
        assert!(!d.fix_route(Point::new(3_000_000, 0), None, false, &NullHost));
        assert!(d.fix_route(Point::new(3_000_000, 0), None, true, &NullHost));
    }

    #[test]
    fn test_only_component_pads_can_be_grabbed() {
        let mut n = Node::new(Rc::new(MemoizedRuleResolver::new(DesignRules::default())));
        let id = n.add(Item::solid(
            Solid::pad(Point::new(0, 0), Shape::Circle { center: Point::new(0, 0), radius: 100_000 }),
            LayerRange::single(0),
            None,
        ));
        let loose = n.lookup(id).cloned().unwrap();
        let mut d = ComponentDragger::new(&n, RoutingSettings::default());
        assert_eq!(d.start(Point::new(0, 0), Some(&loose), &NullHost), Err(RouterError::NotDraggable));
    }
}
