//! Line assembly: walking line corners outward from a seed segment

use super::Node;
use crate::geometry::{LineChain, Point};
use crate::item::{Item, ItemData, ItemId, Joint, Line, NetId};
use std::collections::HashSet;
use std::rc::Rc;

impl Node {
    /// Joints at both ends of a stored segment/arc
    pub fn item_end_joints(&self, item: &Item) -> Option<(&Joint, &Joint)> {
        if !item.is_linked() {
            return None;
        }
        let anchors = item.anchors();
        Some((self.find_joint_for(anchors[0], item)?, self.find_joint_for(anchors[1], item)?))
    }

    /// Follow line corners from `start` (an end of `seed`), collecting
    /// (item, entry point) pairs in walk order
    fn walk_corners(&self, seed: &Rc<Item>, start: Point, follow_locked: bool, visited: &mut HashSet<ItemId>) -> Vec<(Rc<Item>, Point)> {
        let mut out = Vec::new();
        let mut current = seed.clone();
        let mut pos = start;
        loop {
            let Some(id) = current.id() else {
                break;
            };
            let Some(joint) = self.find_joint_for(pos, &current) else {
                break;
            };
            if joint.is_locked() && !follow_locked {
                break;
            }
            let Some(next_id) = joint.next_segment(id, follow_locked) else {
                break;
            };
            if !visited.insert(next_id) {
                break;
            }
            let Some(next) = self.lookup(next_id).cloned() else {
                break;
            };
            let anchors = next.anchors();
            let far = if anchors[0] == pos { anchors[1] } else { anchors[0] };
            out.push((next.clone(), pos));
            current = next;
            pos = far;
        }
        out
    }

    /// Maximal line through `seed` along trivial line corners. A non-linked or
    /// unknown seed yields an empty line.
    pub fn assemble_line(&self, seed: ItemId, follow_locked: bool) -> Line {
        let Some(seed_item) = self.lookup(seed).cloned() else {
            return Line::new(LineChain::new(), 0, 0, None);
        };
        let width = seed_item.width().unwrap_or(0);
        if !seed_item.is_linked() {
            return Line::new(LineChain::new(), width, seed_item.layer(), seed_item.net);
        }

        let anchors = seed_item.anchors();
        let mut visited = HashSet::from([seed]);
        let backward = self.walk_corners(&seed_item, anchors[0], follow_locked, &mut visited);
        let forward = self.walk_corners(&seed_item, anchors[1], follow_locked, &mut visited);

        // pieces in start-to-end order, each with its entry point
        let mut pieces: Vec<(Rc<Item>, Point)> = Vec::with_capacity(backward.len() + forward.len() + 1);
        for (item, entry) in backward.into_iter().rev() {
            let a = item.anchors();
            let far = if a[0] == entry { a[1] } else { a[0] };
            pieces.push((item, far));
        }
        pieces.push((seed_item.clone(), anchors[0]));
        pieces.extend(forward);

        let mut chain = LineChain::new();
        let mut links = Vec::with_capacity(pieces.len());
        for (item, entry) in &pieces {
            append_piece(&mut chain, item, *entry);
            if let Some(id) = item.id() {
                links.push(id);
            }
        }

        let mut line = Line::new(chain, width, seed_item.layer(), seed_item.net);
        line.set_links(links);
        line
    }

    /// An identical segment already present between `a` and `b`
    pub fn find_redundant_segment(&self, a: Point, b: Point, width: i64, layer: i32, net: Option<NetId>) -> Option<ItemId> {
        let joint = self.find_joint(a, layer, net)?;
        joint.link_ids().find(|&id| {
            self.lookup(id)
                .and_then(|item| item.as_segment().map(|s| (item, s)))
                .is_some_and(|(item, s)| {
                    item.layers.contains(layer)
                        && s.width == width
                        && ((s.seg.a == a && s.seg.b == b) || (s.seg.a == b && s.seg.b == a))
                })
        })
    }
}

fn append_piece(chain: &mut LineChain, item: &Item, entry: Point) {
    match &item.data {
        ItemData::Segment(s) => {
            let exit = if s.seg.a == entry { s.seg.b } else { s.seg.a };
            chain.push_point(entry);
            chain.push_point(exit);
        }
        ItemData::Arc(a) => {
            let arc = if a.arc.start == entry { a.arc } else { a.arc.reversed() };
            chain.push_point(entry);
            chain.push_arc(arc.mid, arc.end);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Seg;
    use crate::rules::{DesignRules, MemoizedRuleResolver};

    fn node() -> Node {
        Node::new(Rc::new(MemoizedRuleResolver::new(DesignRules::default())))
    }

    fn seg(n: &mut Node, a: (i64, i64), b: (i64, i64), width: i64) -> ItemId {
        n.add(Item::segment(Seg::new(Point::new(a.0, a.1), Point::new(b.0, b.1)), width, 0, Some(NetId(1))))
    }

    #[test]
    fn test_assemble_walks_both_directions() {
        let mut n = node();
        let s1 = seg(&mut n, (0, 0), (1000, 0), 100);
        // stored reversed on purpose
        let s2 = seg(&mut n, (2000, 1000), (1000, 0), 100);
        let s3 = seg(&mut n, (2000, 1000), (3000, 1000), 100);
        // the line runs in the direction of the seed's own anchors
        let line = n.assemble_line(s2, false);
        assert_eq!(line.links(), &[s3, s2, s1]);
        assert_eq!(line.point_count(), 4);
        assert_eq!(line.start(), Some(Point::new(3000, 1000)));
        assert_eq!(line.end(), Some(Point::new(0, 0)));

        let line = n.assemble_line(s1, false);
        assert_eq!(line.links(), &[s1, s2, s3]);
    }

    #[test]
    fn test_assemble_stops_at_width_change_and_locks() {
        let mut n = node();
        let s1 = seg(&mut n, (0, 0), (1000, 0), 100);
        seg(&mut n, (1000, 0), (2000, 0), 300);
        assert_eq!(n.assemble_line(s1, false).links(), &[s1]);

        let mut n = node();
        let s1 = seg(&mut n, (0, 0), (1000, 0), 100);
        let locked = n.add(
            Item::segment(Seg::new(Point::new(1000, 0), Point::new(2000, 0)), 100, 0, Some(NetId(1))).with_locked(true),
        );
        assert_eq!(n.assemble_line(s1, false).links(), &[s1]);
        assert_eq!(n.assemble_line(s1, true).links(), &[s1, locked]);
    }

    #[test]
    fn test_closed_loop_terminates() {
        let mut n = node();
        let s1 = seg(&mut n, (0, 0), (1000, 0), 100);
        seg(&mut n, (1000, 0), (1000, 1000), 100);
        seg(&mut n, (1000, 1000), (0, 0), 100);
        assert_eq!(n.assemble_line(s1, false).links().len(), 3);
    }
}
