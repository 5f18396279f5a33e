//! Point chains made of straight and arc pieces
//!
//! A chain with `n` points has `n - 1` pieces. Piece `i` runs from point `i`
//! to point `i + 1` and is an arc when `arc_mids[i]` is set.

use super::arc::{ArcGeom, ARC_APPROX_ERROR};
use super::segment::Seg;
use super::types::{BoundingBox, Point};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPiece {
    Segment(Seg),
    Arc(ArcGeom),
}

impl ChainPiece {
    pub fn start(&self) -> Point {
        match self {
            ChainPiece::Segment(s) => s.a,
            ChainPiece::Arc(a) => a.start,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            ChainPiece::Segment(s) => s.b,
            ChainPiece::Arc(a) => a.end,
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            ChainPiece::Segment(s) => s.length(),
            ChainPiece::Arc(a) => a.length(),
        }
    }

    pub fn distance_to_point(&self, p: Point) -> f64 {
        match self {
            ChainPiece::Segment(s) => s.distance_to_point(p),
            ChainPiece::Arc(a) => a.distance_to_point(p),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChain {
    points: Vec<Point>,
    arc_mids: Vec<Option<Point>>,
}

impl LineChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Straight chain through `points`; consecutive duplicates are dropped
    pub fn from_points(points: &[Point]) -> Self {
        let mut chain = Self::new();
        for p in points {
            chain.push_point(*p);
        }
        chain
    }

    pub fn from_piece(piece: ChainPiece) -> Self {
        let mut chain = Self::new();
        chain.push_point(piece.start());
        chain.push_piece(piece);
        chain
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.arc_mids.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn piece_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point(&self, i: usize) -> Point {
        self.points[i]
    }

    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    pub fn piece(&self, i: usize) -> ChainPiece {
        let a = self.points[i];
        let b = self.points[i + 1];
        match self.arc_mids[i] {
            Some(mid) => ChainPiece::Arc(ArcGeom::new(a, mid, b)),
            None => ChainPiece::Segment(Seg::new(a, b)),
        }
    }

    pub fn pieces(&self) -> impl Iterator<Item = ChainPiece> + '_ {
        (0..self.piece_count()).map(move |i| self.piece(i))
    }

    pub fn is_arc(&self, i: usize) -> bool {
        self.arc_mids.get(i).is_some_and(|m| m.is_some())
    }

    /// Append a straight piece ending at `p`
    pub fn push_point(&mut self, p: Point) {
        if self.points.last() == Some(&p) {
            return;
        }
        if !self.points.is_empty() {
            self.arc_mids.push(None);
        }
        self.points.push(p);
    }

    /// Append an arc piece through `mid` ending at `end`
    pub fn push_arc(&mut self, mid: Point, end: Point) {
        if self.points.is_empty() || self.points.last() == Some(&end) {
            self.push_point(end);
            return;
        }
        self.arc_mids.push(Some(mid));
        self.points.push(end);
    }

    pub fn push_piece(&mut self, piece: ChainPiece) {
        if self.points.last() != Some(&piece.start()) {
            self.push_point(piece.start());
        }
        match piece {
            ChainPiece::Segment(s) => self.push_point(s.b),
            ChainPiece::Arc(a) => self.push_arc(a.mid, a.end),
        }
    }

    /// Append another chain; a shared junction point is not duplicated
    pub fn append(&mut self, other: &LineChain) {
        if other.is_empty() {
            return;
        }
        self.push_point(other.points[0]);
        for piece in other.pieces() {
            self.push_piece(piece);
        }
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
        self.arc_mids.reverse();
    }

    pub fn reversed(&self) -> LineChain {
        let mut r = self.clone();
        r.reverse();
        r
    }

    pub fn length(&self) -> f64 {
        self.pieces().map(|p| p.length()).sum()
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        let mut bb = BoundingBox::from_points(&self.points)?;
        for piece in self.pieces() {
            if let ChainPiece::Arc(arc) = piece {
                bb = bb.merged(&arc.bbox());
            }
        }
        Some(bb)
    }

    /// Flattened vertices, arcs approximated with short chords
    pub fn approximated_points(&self) -> Vec<Point> {
        let mut out: Vec<Point> = Vec::with_capacity(self.points.len());
        for piece in self.pieces() {
            let pts = match piece {
                ChainPiece::Segment(s) => vec![s.a, s.b],
                ChainPiece::Arc(a) => a.to_polyline(ARC_APPROX_ERROR),
            };
            for p in pts {
                if out.last() != Some(&p) {
                    out.push(p);
                }
            }
        }
        if out.is_empty() {
            out.extend(self.points.first().copied());
        }
        out
    }

    pub fn distance_to_point(&self, p: Point) -> f64 {
        if self.points.len() == 1 {
            return self.points[0].distance(p);
        }
        self.pieces()
            .map(|piece| piece.distance_to_point(p))
            .fold(f64::INFINITY, f64::min)
    }

    /// Index of the piece closest to `p` and the closest point on it
    pub fn nearest_point(&self, p: Point) -> Option<(usize, Point)> {
        if self.points.len() == 1 {
            return Some((0, self.points[0]));
        }
        let mut best: Option<(f64, usize, Point)> = None;
        for (i, piece) in self.pieces().enumerate() {
            let candidate = match piece {
                ChainPiece::Segment(s) => s.nearest_point(p),
                ChainPiece::Arc(a) => {
                    if a.start.distance(p) <= a.end.distance(p) {
                        a.start
                    } else {
                        a.end
                    }
                }
            };
            let d = candidate.distance(p);
            if best.is_none_or(|(bd, _, _)| d < bd) {
                best = Some((d, i, candidate));
            }
        }
        best.map(|(_, i, pt)| (i, pt))
    }

    pub fn find_point(&self, p: Point) -> Option<usize> {
        self.points.iter().position(|q| *q == p)
    }

    /// Ensure the chain has a vertex at the point nearest to `p` and return its index.
    /// Arc pieces are never subdivided; the nearer arc endpoint is used instead.
    pub fn split_at(&mut self, p: Point) -> Option<usize> {
        let (piece, at) = self.nearest_point(p)?;
        if let Some(idx) = self.find_point(at) {
            return Some(idx);
        }
        if self.is_arc(piece) {
            return Some(piece);
        }
        self.points.insert(piece + 1, at);
        self.arc_mids.insert(piece + 1, None);
        Some(piece + 1)
    }

    /// Sub-chain between vertex indices `from..=to`
    pub fn slice(&self, from: usize, to: usize) -> LineChain {
        let mut out = LineChain::new();
        if from >= self.points.len() {
            return out;
        }
        let to = to.min(self.points.len() - 1);
        out.push_point(self.points[from]);
        for i in from..to {
            out.push_piece(self.piece(i));
        }
        out
    }

    /// Drop zero-length pieces and merge consecutive collinear straight pieces
    pub fn simplify(&mut self) {
        if self.points.len() < 3 {
            return;
        }
        let mut out = LineChain::new();
        out.push_point(self.points[0]);
        for piece in self.pieces().collect::<Vec<_>>() {
            if let ChainPiece::Segment(s) = piece {
                let n = out.points.len();
                if n >= 2 && !out.is_arc(n - 2) {
                    let prev = Seg::new(out.points[n - 2], out.points[n - 1]);
                    let same_direction = prev.direction().dot(s.direction()) > 0;
                    if prev.collinear(&s) && same_direction {
                        out.points[n - 1] = s.b;
                        continue;
                    }
                }
            }
            out.push_piece(piece);
        }
        *self = out;
    }

    /// True if any two non-adjacent pieces touch
    pub fn self_intersects(&self) -> bool {
        let segs: Vec<Seg> = self
            .approximated_points()
            .windows(2)
            .map(|w| Seg::new(w[0], w[1]))
            .collect();
        for i in 0..segs.len() {
            for j in (i + 2)..segs.len() {
                if segs[i].intersects(&segs[j]) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_merges_collinear() {
        let mut chain = LineChain::from_points(&[
            Point::new(0, 0),
            Point::new(1000, 0),
            Point::new(2000, 0),
            Point::new(2000, 1000),
        ]);
        chain.simplify();
        assert_eq!(chain.point_count(), 3);
        assert_eq!(chain.point(1), Point::new(2000, 0));
    }

    #[test]
    fn test_split_and_slice() {
        let mut chain = LineChain::from_points(&[Point::new(0, 0), Point::new(10_000, 0)]);
        let i = chain.split_at(Point::new(4000, 300)).unwrap();
        assert_eq!(i, 1);
        assert_eq!(chain.point(1), Point::new(4000, 0));
        let tail = chain.slice(1, 2);
        assert!((tail.length() - 6000.0).abs() < 1e-6);
    }
}
