//! Shove: pushing foreign tracks out of the way of a new route
//!
//! A colliding segment is translated perpendicular to itself, away from the
//! pusher, far enough to meet the clearance. Its neighbours across line
//! corners are stretched to follow. Pushed segments become pushers in turn;
//! the cascade is capped by an iteration limit. Solids, vias, arcs, locked
//! segments and segment ends that sit on anything but a line corner or a
//! dangling end cannot move, and hitting one fails the shove.

use crate::geometry::{ChainPiece, LineChain, Point, Seg, Shape};
use crate::item::{Item, ItemId, Line};
use crate::node::{CollisionOptions, Node, Obstacle};
use std::collections::VecDeque;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShoveError {
    #[error("obstacle {0:?} cannot be moved")]
    Immovable(ItemId),
    /// A segment end is attached to a pad, via or junction
    #[error("segment {0:?} has a fixed end")]
    EndpointFixed(ItemId),
    #[error("shove gave up after {0} iterations")]
    IterationLimit(usize),
    #[error("pushing segment {0:?} would collapse it")]
    Degenerate(ItemId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShoveStats {
    pub pushed: usize,
}

pub struct Shove {
    iteration_limit: usize,
    iterations: usize,
    opts: CollisionOptions,
}

impl Shove {
    pub fn new(iteration_limit: usize) -> Self {
        Self { iteration_limit, iterations: 0, opts: CollisionOptions::default() }
    }

    /// Collision options used to find what the pushers hit
    pub fn with_options(mut self, opts: CollisionOptions) -> Self {
        self.opts = opts;
        self
    }

    /// Make room for `pushers` in `node`. On error `node` is left half-shoved
    /// and should be discarded.
    pub fn shove_lines(&mut self, node: &mut Node, pushers: &[Line]) -> Result<ShoveStats, ShoveError> {
        let mut stats = ShoveStats::default();
        let mut pending: VecDeque<Line> = pushers.iter().cloned().collect();
        while let Some(pusher) = pending.pop_front() {
            while let Some(obs) = node.check_colliding_line(&pusher, &self.opts) {
                self.iterations += 1;
                if self.iterations > self.iteration_limit {
                    debug!(limit = self.iteration_limit, "shove iteration limit reached");
                    return Err(ShoveError::IterationLimit(self.iteration_limit));
                }
                let moved = self.push_segment(node, &pusher, &obs)?;
                stats.pushed += 1;
                pending.extend(moved);
            }
        }
        Ok(stats)
    }

    pub fn shove_line(&mut self, node: &mut Node, head: &Line) -> Result<ShoveStats, ShoveError> {
        self.shove_lines(node, std::slice::from_ref(head))
    }

    fn pusher_shapes(pusher: &Line) -> Vec<Shape> {
        let mut shapes = pusher.shapes();
        if let Some(via) = pusher.via() {
            shapes.push(via.shape());
        }
        shapes
    }

    /// Point of the pusher closest to `seg`, used to decide the push side
    fn pusher_point(pusher: &Line, seg: &Seg) -> Option<Point> {
        let mut probes: Vec<Point> = Vec::new();
        for piece in pusher.chain().pieces() {
            match piece {
                ChainPiece::Segment(ps) => {
                    probes.extend([ps.a, ps.b, ps.nearest_point(seg.a), ps.nearest_point(seg.b), ps.center()]);
                }
                ChainPiece::Arc(arc) => probes.extend([arc.start, arc.mid, arc.end]),
            }
        }
        if let Some(via) = pusher.via() {
            probes.push(via.anchor(0));
        }
        probes.into_iter().min_by(|a, b| seg.distance_to_point(*a).total_cmp(&seg.distance_to_point(*b)))
    }

    fn push_segment(&mut self, node: &mut Node, pusher: &Line, obs: &Obstacle) -> Result<Vec<Line>, ShoveError> {
        let item = &obs.item;
        let id = item.id().ok_or(ShoveError::Immovable(ItemId(0)))?;
        let Some(segment) = item.as_segment() else {
            return Err(ShoveError::Immovable(id));
        };
        if item.locked {
            return Err(ShoveError::Immovable(id));
        }
        let seg = segment.seg;

        let obstacle_shape = item.shape();
        let dist = Self::pusher_shapes(pusher)
            .iter()
            .map(|s| s.distance(&obstacle_shape))
            .fold(f64::INFINITY, f64::min);
        let needed = ((obs.clearance as f64 - dist).ceil() as i64).max(0) + 1;

        let probe = Self::pusher_point(pusher, &seg).unwrap_or(seg.center());
        let side = match seg.side(probe) {
            0 => 1,
            s => s,
        };
        let offset = seg.direction().perpendicular().resize(needed) * (-side as i64);

        // neighbours that must follow each end
        let mut followers: Vec<(Rc<Item>, Point, Point)> = Vec::new();
        for end in [seg.a, seg.b] {
            let jt = node.find_joint_for(end, item).ok_or(ShoveError::EndpointFixed(id))?;
            if jt.link_count() == 1 {
                continue;
            }
            if jt.is_locked() || !jt.is_line_corner(false) {
                return Err(ShoveError::EndpointFixed(id));
            }
            let nid = jt.next_segment(id, false).ok_or(ShoveError::EndpointFixed(id))?;
            let neighbour = node.lookup(nid).cloned().ok_or(ShoveError::EndpointFixed(id))?;
            let Some(ns) = neighbour.as_segment() else {
                return Err(ShoveError::Immovable(nid));
            };
            let far = if ns.seg.a == end { ns.seg.b } else { ns.seg.a };
            if far == end + offset {
                return Err(ShoveError::Degenerate(nid));
            }
            followers.push((neighbour.clone(), far, end + offset));
        }

        let shifted = Seg::new(seg.a + offset, seg.b + offset);
        let mut moved = Vec::with_capacity(1 + followers.len());
        let new_id = node.replace(id, Item::segment(shifted, segment.width, item.layer(), item.net));
        moved.push(single_segment_line(node, new_id));
        for (neighbour, far, moved_end) in followers {
            let Some(nid) = neighbour.id() else {
                continue;
            };
            let width = neighbour.width().unwrap_or(segment.width);
            let replacement = Item::segment(Seg::new(far, moved_end), width, neighbour.layer(), neighbour.net);
            let new_nid = node.replace(nid, replacement);
            moved.push(single_segment_line(node, new_nid));
        }
        debug!(item = %id, ?offset, "shoved segment");
        Ok(moved.into_iter().flatten().collect())
    }
}

fn single_segment_line(node: &Node, id: ItemId) -> Option<Line> {
    let item = node.lookup(id)?;
    let s = item.as_segment()?;
    let mut line = Line::new(LineChain::from_points(&[s.seg.a, s.seg.b]), s.width, item.layer(), item.net);
    line.set_links(vec![id]);
    Some(line)
}
