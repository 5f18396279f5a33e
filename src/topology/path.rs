//! Trivial path assembly
//!
//! Starting from a line, the path is extended through every joint that does
//! not really end the connection: vias joining exactly two tracks and points
//! where the track width changes. Where a width-change joint forks, each
//! branch is explored depth-first for its longest dead-end under a wall-clock
//! budget; when the budget runs out the best branch found so far is taken.

use super::Topology;
use crate::geometry::Point;
use crate::item::{Item, ItemId, ItemSet, Joint, KindMask, Line};
use crate::node::Node;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::time::Instant;
use tracing::debug;

const MAX_BRANCH_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub enum PathElement {
    Line(Line),
    Via(Rc<Item>),
}

/// Lines and vias between two terminal joints, in order from `start` to `end`
#[derive(Debug, Clone)]
pub struct TrivialPath {
    pub elements: Vec<PathElement>,
    pub start: Joint,
    pub end: Joint,
}

impl TrivialPath {
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.elements.iter().filter_map(|e| match e {
            PathElement::Line(l) => Some(l),
            PathElement::Via(_) => None,
        })
    }

    pub fn vias(&self) -> impl Iterator<Item = &Rc<Item>> {
        self.elements.iter().filter_map(|e| match e {
            PathElement::Via(v) => Some(v),
            PathElement::Line(_) => None,
        })
    }

    /// Every stored item on the path
    pub fn item_ids(&self) -> Vec<ItemId> {
        let mut ids = Vec::new();
        for e in &self.elements {
            match e {
                PathElement::Line(l) => ids.extend(l.links().iter().copied()),
                PathElement::Via(v) => ids.extend(v.id()),
            }
        }
        ids
    }

    pub fn items(&self, world: &Node) -> ItemSet {
        self.item_ids().into_iter().filter_map(|id| world.lookup(id).cloned()).collect()
    }

    /// Track length, vias excluded
    pub fn length(&self) -> f64 {
        self.lines().map(Line::length).sum()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.item_ids().contains(&id)
    }
}

impl Topology<'_> {
    /// Path through `start` (a segment, arc, or a via joining two tracks).
    /// Returns `None` for other seeds and for degenerate paths.
    pub fn assemble_trivial_path(&self, start: &Item, follow_locked: bool) -> Option<TrivialPath> {
        let seed = if start.is_linked() {
            start.id()?
        } else if start.as_via().is_some() {
            let via_pos = start.anchor(0);
            let jt = self.world.find_joint_for(via_pos, start)?;
            if !jt.is_non_fanout_via() {
                return None;
            }
            jt.links().iter().find(|l| l.kind.mask().intersects(KindMask::LINKED))?.item
        } else {
            return None;
        };

        let line = self.world.assemble_line(seed, follow_locked);
        if line.is_empty() {
            return None;
        }
        let mut visited: HashSet<ItemId> = line.links().iter().copied().collect();
        let mut elements = VecDeque::from([PathElement::Line(line)]);

        let deadline = Instant::now() + self.branch_timeout;
        let end = self.follow(&mut elements, false, &mut visited, follow_locked, deadline)?;
        let start = self.follow(&mut elements, true, &mut visited, follow_locked, deadline)?;

        if start.pos() == end.pos() && start.net() == end.net() && start.layers() == end.layers() {
            return None;
        }
        Some(TrivialPath { elements: elements.into(), start, end })
    }

    fn end_line(elements: &VecDeque<PathElement>, left: bool) -> Option<&Line> {
        let e = if left { elements.front() } else { elements.back() };
        match e? {
            PathElement::Line(l) => Some(l),
            PathElement::Via(_) => None,
        }
    }

    fn follow(
        &self,
        elements: &mut VecDeque<PathElement>,
        left: bool,
        visited: &mut HashSet<ItemId>,
        follow_locked: bool,
        deadline: Instant,
    ) -> Option<Joint> {
        loop {
            let curr = Self::end_line(elements, left)?;
            let (anchor, last) = if left {
                (curr.start()?, *curr.links().first()?)
            } else {
                (curr.end()?, *curr.links().last()?)
            };
            let last_item = self.world.lookup(last)?;
            let jt = self.world.find_joint_for(anchor, last_item)?.clone();

            if !jt.is_non_fanout_via() && !jt.is_trace_width_change() {
                return Some(jt);
            }

            let mut candidates: Vec<ItemId> = jt
                .links()
                .iter()
                .filter(|l| l.kind.mask().intersects(KindMask::LINKED) && !visited.contains(&l.item))
                .map(|l| l.item)
                .collect();
            candidates.sort_unstable();

            let next = match candidates.len() {
                0 => return Some(jt),
                1 => candidates[0],
                _ => self.pick_branch(anchor, &candidates, visited, follow_locked, deadline),
            };

            let mut line = self.world.assemble_line(next, follow_locked);
            if line.is_empty() {
                return Some(jt);
            }
            let near = if left { line.end() } else { line.start() };
            if near != Some(anchor) {
                line.reverse();
            }
            visited.extend(line.links().iter().copied());

            let via = jt.via().and_then(|id| self.world.lookup(id)).cloned();
            if left {
                elements.push_front(PathElement::Line(line));
                if let Some(via) = via {
                    elements.insert(1, PathElement::Via(via));
                }
            } else {
                if let Some(via) = via {
                    elements.push_back(PathElement::Via(via));
                }
                elements.push_back(PathElement::Line(line));
            }
        }
    }

    /// Branch leading to the longest dead-end; ties keep the lowest id
    fn pick_branch(
        &self,
        anchor: Point,
        candidates: &[ItemId],
        visited: &HashSet<ItemId>,
        follow_locked: bool,
        deadline: Instant,
    ) -> ItemId {
        let mut best: Option<(f64, ItemId)> = None;
        for &c in candidates {
            if Instant::now() >= deadline {
                debug!(?anchor, explored = ?best.map(|b| b.1), "trivial path branch search timed out");
                break;
            }
            let len = self.branch_length(anchor, c, visited.clone(), follow_locked, deadline, 0);
            if best.is_none_or(|(l, _)| len > l) {
                best = Some((len, c));
            }
        }
        best.map(|(_, id)| id).unwrap_or(candidates[0])
    }

    fn branch_length(
        &self,
        anchor: Point,
        seed: ItemId,
        mut visited: HashSet<ItemId>,
        follow_locked: bool,
        deadline: Instant,
        depth: usize,
    ) -> f64 {
        let mut line = self.world.assemble_line(seed, follow_locked);
        if line.is_empty() {
            return 0.0;
        }
        if line.start() != Some(anchor) {
            line.reverse();
        }
        visited.extend(line.links().iter().copied());
        let total = line.length();

        let (Some(far), Some(&last)) = (line.end(), line.links().last()) else {
            return total;
        };
        let Some(jt) = self.world.lookup(last).and_then(|item| self.world.find_joint_for(far, item)) else {
            return total;
        };
        if !jt.is_non_fanout_via() && !jt.is_trace_width_change() {
            return total;
        }
        if depth >= MAX_BRANCH_DEPTH || Instant::now() >= deadline {
            return total;
        }

        let mut next: Vec<ItemId> = jt
            .links()
            .iter()
            .filter(|l| l.kind.mask().intersects(KindMask::LINKED) && !visited.contains(&l.item))
            .map(|l| l.item)
            .collect();
        next.sort_unstable();
        let best = next
            .into_iter()
            .map(|c| self.branch_length(far, c, visited.clone(), follow_locked, deadline, depth + 1))
            .fold(0.0, f64::max);
        total + best
    }
}
