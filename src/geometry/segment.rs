//! Straight segment math
//!
//! Distance routines follow the closest-approach scheme used by the clearance
//! checker: segment-to-segment distance is the minimum over the four
//! endpoint-to-segment distances unless the segments cross.

use super::types::Point;
use serde::{Deserialize, Serialize};

/// A directed line segment from `a` to `b`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seg {
    pub a: Point,
    pub b: Point,
}

fn orientation(a: Point, b: Point, c: Point) -> i32 {
    let v = (b - a).cross(c - a);
    v.signum() as i32
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

impl Seg {
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    pub fn direction(&self) -> Point {
        self.b - self.a
    }

    pub fn length(&self) -> f64 {
        self.direction().euclidean_norm()
    }

    pub fn squared_length(&self) -> i128 {
        self.direction().squared_norm()
    }

    pub fn is_degenerate(&self) -> bool {
        self.a == self.b
    }

    pub fn reversed(&self) -> Seg {
        Seg::new(self.b, self.a)
    }

    pub fn center(&self) -> Point {
        Point::new((self.a.x + self.b.x) / 2, (self.a.y + self.b.y) / 2)
    }

    /// Parameter of the projection of `p` on the supporting line (0 at `a`, 1 at `b`)
    pub fn project_t(&self, p: Point) -> f64 {
        let len2 = self.squared_length();
        if len2 == 0 {
            return 0.0;
        }
        (p - self.a).dot(self.direction()) as f64 / len2 as f64
    }

    /// Point of the segment closest to `p`
    pub fn nearest_point(&self, p: Point) -> Point {
        if self.is_degenerate() {
            return self.a;
        }
        let t = self.project_t(p).clamp(0.0, 1.0);
        let d = self.direction();
        Point::from_f64(
            self.a.x as f64 + t * d.x as f64,
            self.a.y as f64 + t * d.y as f64,
        )
    }

    /// Point-to-segment minimum distance
    pub fn distance_to_point(&self, p: Point) -> f64 {
        if self.is_degenerate() {
            return self.a.distance(p);
        }
        let t = self.project_t(p).clamp(0.0, 1.0);
        let d = self.direction();
        let cx = self.a.x as f64 + t * d.x as f64;
        let cy = self.a.y as f64 + t * d.y as f64;
        ((p.x as f64 - cx).powi(2) + (p.y as f64 - cy).powi(2)).sqrt()
    }

    /// Signed distance of `p` from the supporting line (positive on the left)
    pub fn line_distance(&self, p: Point) -> f64 {
        let len = self.length();
        if len == 0.0 {
            return self.a.distance(p);
        }
        self.direction().cross(p - self.a) as f64 / len
    }

    /// -1, 0 or 1 depending on which side of the supporting line `p` lies
    pub fn side(&self, p: Point) -> i32 {
        orientation(self.a, self.b, p)
    }

    pub fn contains(&self, p: Point) -> bool {
        self.side(p) == 0 && on_segment(self.a, self.b, p)
    }

    /// True if the segments touch or cross
    pub fn intersects(&self, other: &Seg) -> bool {
        let o1 = orientation(self.a, self.b, other.a);
        let o2 = orientation(self.a, self.b, other.b);
        let o3 = orientation(other.a, other.b, self.a);
        let o4 = orientation(other.a, other.b, self.b);

        if o1 != o2 && o3 != o4 {
            return true;
        }

        (o1 == 0 && on_segment(self.a, self.b, other.a))
            || (o2 == 0 && on_segment(self.a, self.b, other.b))
            || (o3 == 0 && on_segment(other.a, other.b, self.a))
            || (o4 == 0 && on_segment(other.a, other.b, self.b))
    }

    /// Crossing point of two non-parallel segments
    pub fn intersection(&self, other: &Seg) -> Option<Point> {
        if !self.intersects(other) {
            return None;
        }
        let r = self.direction();
        let s = other.direction();
        let denom = r.cross(s);
        if denom == 0 {
            // Collinear overlap: report the first shared endpoint
            return [other.a, other.b, self.a, self.b]
                .into_iter()
                .find(|p| self.contains(*p) && other.contains(*p));
        }
        let t = (other.a - self.a).cross(s) as f64 / denom as f64;
        Some(Point::from_f64(
            self.a.x as f64 + t * r.x as f64,
            self.a.y as f64 + t * r.y as f64,
        ))
    }

    /// Segment-to-segment minimum distance
    pub fn distance(&self, other: &Seg) -> f64 {
        if self.intersects(other) {
            return 0.0;
        }
        self.distance_to_point(other.a)
            .min(self.distance_to_point(other.b))
            .min(other.distance_to_point(self.a))
            .min(other.distance_to_point(self.b))
    }

    pub fn collinear(&self, other: &Seg) -> bool {
        self.side(other.a) == 0 && self.side(other.b) == 0
    }

    /// Parallel within `threshold`: both endpoints of `other` sit at the same
    /// distance from this segment's line, give or take `threshold`.
    pub fn approx_parallel(&self, other: &Seg, threshold: i64) -> bool {
        if self.is_degenerate() || other.is_degenerate() {
            return false;
        }
        let d1 = self.line_distance(other.a);
        let d2 = self.line_distance(other.b);
        (d1 - d2).abs() <= threshold as f64
    }

    /// Portions of the two segments that face each other along this segment's
    /// direction, or `None` if their projections do not overlap.
    pub fn common_parallel_projection(&self, other: &Seg) -> Option<(Seg, Seg)> {
        if self.is_degenerate() {
            return None;
        }
        let ta = self.project_t(other.a);
        let tb = self.project_t(other.b);
        let (lo, hi) = (ta.min(tb), ta.max(tb));
        let start = lo.max(0.0);
        let end = hi.min(1.0);
        if end <= start {
            return None;
        }
        let d = self.direction();
        let at = |t: f64| Point::from_f64(self.a.x as f64 + t * d.x as f64, self.a.y as f64 + t * d.y as f64);
        let own = Seg::new(at(start), at(end));
        let theirs = Seg::new(other.nearest_point(own.a), other.nearest_point(own.b));
        Some((own, theirs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_segment_distance() {
        let s = Seg::new(Point::new(0, 0), Point::new(2000, 0));
        assert!((s.distance_to_point(Point::new(0, 1000)) - 1000.0).abs() < 1e-6);
        assert!((s.distance_to_point(Point::new(3000, 0)) - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_crossing_segments_have_zero_distance() {
        let a = Seg::new(Point::new(0, 0), Point::new(1000, 1000));
        let b = Seg::new(Point::new(0, 1000), Point::new(1000, 0));
        assert!(a.intersects(&b));
        assert_eq!(a.distance(&b), 0.0);
        assert_eq!(a.intersection(&b), Some(Point::new(500, 500)));
    }

    #[test]
    fn test_approx_parallel() {
        let a = Seg::new(Point::new(0, 0), Point::new(10_000, 0));
        let b = Seg::new(Point::new(0, 500), Point::new(10_000, 500));
        let c = Seg::new(Point::new(0, 500), Point::new(10_000, 900));
        assert!(a.approx_parallel(&b, 5));
        assert!(!a.approx_parallel(&c, 5));
        assert!(a.common_parallel_projection(&b).is_some());
    }
}
