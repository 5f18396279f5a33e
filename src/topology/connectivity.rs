//! Connectivity: reachable joints/items and the nearest unconnected anchor

use super::Topology;
use crate::geometry::{LineChain, Point};
use crate::item::{Item, ItemId, ItemSet, Joint, JointTag, KindMask, LayerRange, Line};
use indexmap::IndexSet;
use std::collections::VecDeque;
use std::rc::Rc;

/// Where an unfinished track should go next
#[derive(Debug, Clone)]
pub struct UnconnectedAnchor {
    pub point: Point,
    pub layers: LayerRange,
    pub item: Rc<Item>,
}

impl Topology<'_> {
    /// Joints reachable from `start` through linked items
    pub fn connected_joints(&self, start: &Joint) -> Vec<Joint> {
        let mut seen: IndexSet<(JointTag, LayerRange)> = IndexSet::new();
        let mut out = Vec::new();
        let mut pending = VecDeque::from([start.clone()]);
        seen.insert((start.tag(), start.layers()));

        while let Some(jt) = pending.pop_front() {
            for id in jt.link_ids() {
                let Some(item) = self.world.lookup(id) else {
                    continue;
                };
                for anchor in item.anchors() {
                    if let Some(next) = self.world.find_joint_for(anchor, item) {
                        if seen.insert((next.tag(), next.layers())) {
                            pending.push_back(next.clone());
                        }
                    }
                }
            }
            out.push(jt);
        }
        out
    }

    /// Items electrically reachable from `start`, filtered by `kinds`
    pub fn connected_items(&self, start: &Joint, kinds: KindMask) -> ItemSet {
        let mut ids: IndexSet<ItemId> = IndexSet::new();
        for jt in self.connected_joints(start) {
            ids.extend(jt.link_ids());
        }
        ids.into_iter()
            .filter_map(|id| self.world.lookup(id))
            .filter(|item| item.of_kind(kinds))
            .cloned()
            .collect()
    }

    /// Closest anchor of an item on `start`'s net that is not reachable from it
    pub fn nearest_unconnected_item(&self, start: &Joint, kinds: KindMask) -> Option<(Rc<Item>, usize)> {
        let connected: IndexSet<ItemId> = self.connected_items(start, KindMask::ANY).ids().into_iter().collect();
        let mut best: Option<(f64, Rc<Item>, usize)> = None;
        for item in self.world.all_items_in_net(start.net()) {
            if !item.of_kind(kinds) || item.id().is_some_and(|id| connected.contains(&id)) {
                continue;
            }
            for (i, p) in item.anchors().into_iter().enumerate() {
                let d = p.distance(start.pos());
                if best.as_ref().is_none_or(|(bd, _, _)| d < *bd) {
                    best = Some((d, item.clone(), i));
                }
            }
        }
        best.map(|(_, item, i)| (item, i))
    }

    /// Anchor the end of `track` should connect to next. Works on a throwaway
    /// branch; the world is never touched.
    pub fn nearest_unconnected_anchor_point(&self, track: &Line) -> Option<UnconnectedAnchor> {
        let end = track.end()?;
        track.net()?;

        let mut tmp = self.world.branch();
        let mut line = track.clone();
        line.clear_links();
        tmp.add_line(&mut line);
        if let Some(via) = track.via() {
            tmp.add(via.detached());
        }

        let last = *line.links().last()?;
        let last_item = tmp.lookup(last)?.clone();
        let jt = tmp.find_joint_for(end, &last_item)?.clone();

        let connected = if track.ends_with_via() { jt.link_count() >= 3 } else { jt.link_count() >= 2 };
        if connected {
            let first = jt.link_ids().next()?;
            return Some(UnconnectedAnchor { point: jt.pos(), layers: jt.layers(), item: tmp.lookup(first)?.clone() });
        }

        let topo = Topology::new(&tmp);
        let (item, anchor) = topo.nearest_unconnected_item(&jt, KindMask::ANY)?;
        Some(UnconnectedAnchor { point: item.anchor(anchor), layers: item.layers, item })
    }

    /// Two-point ratline from the end of `track` to its nearest unconnected anchor
    pub fn leading_ratline(&self, track: &Line) -> Option<LineChain> {
        let target = self.nearest_unconnected_anchor_point(track)?;
        Some(LineChain::from_points(&[track.end()?, target.point]))
    }
}
