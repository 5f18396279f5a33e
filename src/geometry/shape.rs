//! Collision shapes
//!
//! Every shape reduces to a skeleton (a point, a polyline or a filled polygon)
//! plus a radius. Distance between two shapes is the skeleton distance minus
//! both radii, clamped at zero.

use super::arc::{ArcGeom, ARC_APPROX_ERROR};
use super::segment::Seg;
use super::types::{BoundingBox, Point};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Segment { seg: Seg, width: i64 },
    Arc { arc: ArcGeom, width: i64 },
    Circle { center: Point, radius: i64 },
    Rect(BoundingBox),
    /// Simple polygon, implicitly closed
    Polygon(Vec<Point>),
}

enum Skeleton {
    Point(Point),
    Polyline(Vec<Point>),
    Polygon(Vec<Point>),
}

impl Skeleton {
    fn edges(&self) -> Vec<Seg> {
        match self {
            Skeleton::Point(p) => vec![Seg::new(*p, *p)],
            Skeleton::Polyline(pts) => {
                if pts.len() == 1 {
                    vec![Seg::new(pts[0], pts[0])]
                } else {
                    pts.windows(2).map(|w| Seg::new(w[0], w[1])).collect()
                }
            }
            Skeleton::Polygon(pts) => (0..pts.len())
                .map(|i| Seg::new(pts[i], pts[(i + 1) % pts.len()]))
                .collect(),
        }
    }

    fn any_point(&self) -> Option<Point> {
        match self {
            Skeleton::Point(p) => Some(*p),
            Skeleton::Polyline(pts) | Skeleton::Polygon(pts) => pts.first().copied(),
        }
    }

    fn encloses(&self, p: Point) -> bool {
        match self {
            Skeleton::Polygon(pts) => point_in_polygon(p, pts),
            _ => false,
        }
    }
}

/// Even-odd point in polygon test; points on the outline count as inside
pub fn point_in_polygon(p: Point, poly: &[Point]) -> bool {
    if poly.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let (a, b) = (poly[i], poly[j]);
        if Seg::new(a, b).contains(p) {
            return true;
        }
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x as f64 + (p.y - a.y) as f64 * (b.x - a.x) as f64 / (b.y - a.y) as f64;
            if (p.x as f64) < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

impl Shape {
    fn skeleton(&self) -> (Skeleton, f64) {
        match self {
            Shape::Segment { seg, width } => (Skeleton::Polyline(vec![seg.a, seg.b]), *width as f64 / 2.0),
            Shape::Arc { arc, width } => (
                Skeleton::Polyline(arc.to_polyline(ARC_APPROX_ERROR)),
                *width as f64 / 2.0,
            ),
            Shape::Circle { center, radius } => (Skeleton::Point(*center), *radius as f64),
            Shape::Rect(bb) => (Skeleton::Polygon(bb.corners().to_vec()), 0.0),
            Shape::Polygon(pts) => (Skeleton::Polygon(pts.clone()), 0.0),
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        match self {
            Shape::Segment { seg, width } => BoundingBox::new(seg.a, seg.b).inflated(width / 2),
            Shape::Arc { arc, width } => arc.bbox().inflated(width / 2),
            Shape::Circle { center, radius } => BoundingBox::from_point(*center).inflated(*radius),
            Shape::Rect(bb) => *bb,
            Shape::Polygon(pts) => BoundingBox::from_points(pts).unwrap_or(BoundingBox::from_point(Point::default())),
        }
    }

    pub fn centre(&self) -> Point {
        match self {
            Shape::Circle { center, .. } => *center,
            other => other.bbox().center(),
        }
    }

    /// Minimum copper-to-copper distance (0 when overlapping)
    pub fn distance(&self, other: &Shape) -> f64 {
        let (sa, ra) = self.skeleton();
        let (sb, rb) = other.skeleton();

        let contained = sb.any_point().is_some_and(|p| sa.encloses(p))
            || sa.any_point().is_some_and(|p| sb.encloses(p));
        if contained {
            return 0.0;
        }

        let mut best = f64::INFINITY;
        for ea in sa.edges() {
            for eb in sb.edges() {
                best = best.min(ea.distance(&eb));
                if best == 0.0 {
                    return 0.0;
                }
            }
        }
        (best - ra - rb).max(0.0)
    }

    /// True if the shapes come closer than `clearance`
    pub fn collide(&self, other: &Shape, clearance: i64) -> bool {
        if !self.bbox().inflated(clearance.max(0)).intersects(&other.bbox()) {
            return false;
        }
        if clearance > 0 {
            self.distance(other) < clearance as f64
        } else {
            self.overlaps_strictly(other)
        }
    }

    fn overlaps_strictly(&self, other: &Shape) -> bool {
        let (sa, ra) = self.skeleton();
        let (sb, rb) = other.skeleton();
        let mut best = f64::INFINITY;
        for ea in sa.edges() {
            for eb in sb.edges() {
                best = best.min(ea.distance(&eb));
            }
        }
        best < ra + rb
            || sb.any_point().is_some_and(|p| sa.encloses(p))
            || sa.any_point().is_some_and(|p| sb.encloses(p))
    }

    pub fn contains_point(&self, p: Point) -> bool {
        let (sk, r) = self.skeleton();
        if sk.encloses(p) {
            return true;
        }
        sk.edges()
            .iter()
            .map(|e| e.distance_to_point(p))
            .fold(f64::INFINITY, f64::min)
            <= r
    }

    pub fn translated(&self, d: Point) -> Shape {
        match self {
            Shape::Segment { seg, width } => Shape::Segment { seg: Seg::new(seg.a + d, seg.b + d), width: *width },
            Shape::Arc { arc, width } => Shape::Arc {
                arc: ArcGeom::new(arc.start + d, arc.mid + d, arc.end + d),
                width: *width,
            },
            Shape::Circle { center, radius } => Shape::Circle { center: *center + d, radius: *radius },
            Shape::Rect(bb) => Shape::Rect(BoundingBox::new(bb.min + d, bb.max + d)),
            Shape::Polygon(pts) => Shape::Polygon(pts.iter().map(|p| *p + d).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x0: i64, y0: i64, x1: i64, y1: i64, w: i64) -> Shape {
        Shape::Segment { seg: Seg::new(Point::new(x0, y0), Point::new(x1, y1)), width: w }
    }

    #[test]
    fn test_parallel_tracks_distance() {
        let a = seg(0, 0, 10_000, 0, 200);
        let b = seg(0, 1000, 10_000, 1000, 200);
        assert!((a.distance(&b) - 800.0).abs() < 1e-6);
        assert!(a.collide(&b, 900));
        assert!(!a.collide(&b, 800));
    }

    #[test]
    fn test_track_inside_keepout_rect() {
        let keepout = Shape::Rect(BoundingBox::new(Point::new(-5000, -5000), Point::new(5000, 5000)));
        let t = seg(-100, 0, 100, 0, 50);
        assert_eq!(keepout.distance(&t), 0.0);
        assert!(keepout.collide(&t, 0));
        assert!(keepout.contains_point(Point::new(0, 0)));
        assert!(!keepout.contains_point(Point::new(6000, 0)));
    }
}
