//! Joints: connectivity vertices keyed by position and net
//!
//! A joint references its items by id. Each link carries a snapshot of the
//! attributes the topology predicates look at; since items are immutable
//! once stored, the snapshot cannot go stale.

use super::{Item, ItemId, ItemKind, KindMask, LayerRange, NetId};
use crate::geometry::Point;

/// Hash key of a joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointTag {
    pub pos: Point,
    pub net: Option<NetId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointLink {
    pub item: ItemId,
    pub kind: ItemKind,
    pub layers: LayerRange,
    pub width: Option<i64>,
    pub locked: bool,
}

impl JointLink {
    pub fn from_item(id: ItemId, item: &Item) -> Self {
        Self { item: id, kind: item.kind(), layers: item.layers, width: item.width(), locked: item.locked }
    }

    fn is_linked(&self) -> bool {
        matches!(self.kind, ItemKind::Segment | ItemKind::Arc)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    tag: JointTag,
    layers: LayerRange,
    links: Vec<JointLink>,
    locked: bool,
}

impl Joint {
    pub fn new(pos: Point, layers: LayerRange, net: Option<NetId>) -> Self {
        Self { tag: JointTag { pos, net }, layers, links: Vec::new(), locked: false }
    }

    pub fn tag(&self) -> JointTag {
        self.tag
    }

    pub fn pos(&self) -> Point {
        self.tag.pos
    }

    pub fn net(&self) -> Option<NetId> {
        self.tag.net
    }

    pub fn layers(&self) -> LayerRange {
        self.layers
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn links(&self) -> &[JointLink] {
        &self.links
    }

    pub fn link_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.links.iter().map(|l| l.item)
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn count(&self, mask: KindMask) -> usize {
        self.links.iter().filter(|l| mask.contains(l.kind.mask())).count()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.links.iter().any(|l| l.item == id)
    }

    /// Add a link; linking an already linked item is a no-op. Returns true if added.
    pub fn link(&mut self, link: JointLink) -> bool {
        if self.contains(link.item) {
            return false;
        }
        self.layers = if self.links.is_empty() { link.layers } else { self.layers.merged(&link.layers) };
        self.links.push(link);
        true
    }

    /// Remove a link. Returns true if the joint is now empty and should be dropped.
    pub fn unlink(&mut self, id: ItemId) -> bool {
        self.links.retain(|l| l.item != id);
        if let Some(first) = self.links.first() {
            self.layers = self.links.iter().fold(first.layers, |acc, l| acc.merged(&l.layers));
        }
        self.links.is_empty()
    }

    /// Regroup the links into joints whose members share at least one layer.
    /// A via that bridged two layers leaves two joints behind once it is gone.
    pub fn split_by_layers(&self) -> Vec<Joint> {
        let mut parts: Vec<Joint> = Vec::new();
        for link in &self.links {
            let mut single = Joint::new(self.tag.pos, link.layers, self.tag.net);
            single.locked = self.locked;
            single.link(*link);
            let (mut hits, rest): (Vec<Joint>, Vec<Joint>) =
                std::mem::take(&mut parts).into_iter().partition(|j| j.overlaps(&single));
            parts = rest;
            if hits.is_empty() {
                parts.push(single);
                continue;
            }
            let mut joint = hits.remove(0);
            joint.merge(&single);
            for other in &hits {
                joint.merge(other);
            }
            parts.push(joint);
        }
        parts
    }

    /// Same position, same net, overlapping layers
    pub fn overlaps(&self, other: &Joint) -> bool {
        self.tag == other.tag && self.layers.overlaps(&other.layers)
    }

    /// Absorb `other` if the two joints overlap; otherwise nothing happens
    pub fn merge(&mut self, other: &Joint) {
        if !self.overlaps(other) {
            return;
        }
        self.layers = self.layers.merged(&other.layers);
        self.locked |= other.locked;
        for link in &other.links {
            self.link(*link);
        }
    }

    fn linked_pair(&self) -> Option<(&JointLink, &JointLink)> {
        let mut segs = self.links.iter().filter(|l| l.is_linked());
        let a = segs.next()?;
        let b = segs.next()?;
        segs.next().is_none().then_some((a, b))
    }

    /// Two same-width segments/arcs and nothing else: the line passes straight through
    pub fn is_line_corner(&self, allow_locked: bool) -> bool {
        if self.links.len() != 2 {
            return false;
        }
        match self.linked_pair() {
            Some((a, b)) => {
                if !allow_locked && (a.locked || b.locked) {
                    return false;
                }
                a.width == b.width
            }
            None => false,
        }
    }

    /// Via joining exactly two segments (a layer change within one line)
    pub fn is_non_fanout_via(&self) -> bool {
        self.links.len() == 3 && self.count(KindMask::VIA) == 1 && self.count(KindMask::LINKED) == 2
    }

    /// A via with nothing attached
    pub fn is_stitching_via(&self) -> bool {
        self.links.len() == 1 && self.count(KindMask::VIA) == 1
    }

    /// Dangling end of a line
    pub fn is_trivial_endpoint(&self) -> bool {
        self.links.len() == 1 && self.count(KindMask::LINKED) == 1
    }

    /// At least two segments/arcs meet here and their widths differ
    pub fn is_trace_width_change(&self) -> bool {
        let mut widths = self.links.iter().filter(|l| l.is_linked()).map(|l| l.width);
        let Some(first) = widths.next() else {
            return false;
        };
        let mut seen_second = false;
        let mut differs = false;
        for w in widths {
            seen_second = true;
            differs |= w != first;
        }
        seen_second && differs
    }

    pub fn via(&self) -> Option<ItemId> {
        self.links.iter().find(|l| l.kind == ItemKind::Via).map(|l| l.item)
    }

    /// The other segment of a line corner
    pub fn next_segment(&self, current: ItemId, allow_locked: bool) -> Option<ItemId> {
        if !self.is_line_corner(allow_locked) {
            return None;
        }
        self.links.iter().find(|l| l.is_linked() && l.item != current).map(|l| l.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg_link(id: u32, width: i64) -> JointLink {
        JointLink { item: ItemId(id), kind: ItemKind::Segment, layers: LayerRange::single(0), width: Some(width), locked: false }
    }

    #[test]
    fn test_link_is_idempotent_and_unlink_reports_empty() {
        let mut jt = Joint::new(Point::new(0, 0), LayerRange::single(0), Some(NetId(1)));
        assert!(jt.link(seg_link(1, 100)));
        assert!(!jt.link(seg_link(1, 100)));
        assert_eq!(jt.link_count(), 1);
        assert!(jt.is_trivial_endpoint());
        assert!(jt.unlink(ItemId(1)));
    }

    #[test]
    fn test_merge_requires_overlap() {
        let mut a = Joint::new(Point::new(0, 0), LayerRange::single(0), Some(NetId(1)));
        a.link(seg_link(1, 100));
        let mut far = Joint::new(Point::new(5, 0), LayerRange::single(0), Some(NetId(1)));
        far.link(seg_link(2, 100));
        a.merge(&far);
        assert_eq!(a.link_count(), 1);

        let mut near = Joint::new(Point::new(0, 0), LayerRange::single(0), Some(NetId(1)));
        near.link(seg_link(2, 100));
        a.merge(&near);
        assert_eq!(a.link_count(), 2);
        assert!(a.is_line_corner(false));
    }

    #[test]
    fn test_width_change_with_three_segments() {
        let mut jt = Joint::new(Point::new(0, 0), LayerRange::single(0), None);
        jt.link(seg_link(1, 100));
        jt.link(seg_link(2, 100));
        assert!(!jt.is_trace_width_change());
        jt.link(seg_link(3, 250));
        assert!(!jt.is_line_corner(false));
        assert!(jt.is_trace_width_change());
    }

    #[test]
    fn test_split_separates_layers_once_the_bridge_is_gone() {
        let mut jt = Joint::new(Point::new(0, 0), LayerRange::single(0), Some(NetId(1)));
        jt.link(seg_link(1, 100));
        jt.link(JointLink { item: ItemId(2), kind: ItemKind::Via, layers: LayerRange::new(0, 1), width: None, locked: false });
        jt.link(JointLink { layers: LayerRange::single(1), ..seg_link(3, 100) });
        assert_eq!(jt.split_by_layers().len(), 1);

        jt.unlink(ItemId(2));
        let parts = jt.split_by_layers();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains(ItemId(1)) && parts[0].layers() == LayerRange::single(0));
        assert!(parts[1].contains(ItemId(3)) && parts[1].layers() == LayerRange::single(1));
    }
}
