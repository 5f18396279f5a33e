//! Circular arcs defined by start, mid and end points

use super::segment::Seg;
use super::types::{BoundingBox, Point};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Maximum deviation of the polyline approximation from the true arc (nm)
pub const ARC_APPROX_ERROR: f64 = 5_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArcGeom {
    pub start: Point,
    pub mid: Point,
    pub end: Point,
}

impl ArcGeom {
    pub const fn new(start: Point, mid: Point, end: Point) -> Self {
        Self { start, mid, end }
    }

    /// Three collinear points do not define a circle
    pub fn is_degenerate(&self) -> bool {
        (self.mid - self.start).cross(self.end - self.start) == 0
    }

    pub fn chord(&self) -> Seg {
        Seg::new(self.start, self.end)
    }

    pub fn center_f64(&self) -> Option<(f64, f64)> {
        if self.is_degenerate() {
            return None;
        }
        let [ax, ay] = self.start.to_f64();
        let [bx, by] = self.mid.to_f64();
        let [cx, cy] = self.end.to_f64();
        let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
        let a2 = ax * ax + ay * ay;
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
        let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
        Some((ux, uy))
    }

    pub fn center(&self) -> Point {
        match self.center_f64() {
            Some((x, y)) => Point::from_f64(x, y),
            None => self.chord().center(),
        }
    }

    pub fn radius(&self) -> f64 {
        match self.center_f64() {
            Some((x, y)) => ((self.start.x as f64 - x).powi(2) + (self.start.y as f64 - y).powi(2)).sqrt(),
            None => f64::INFINITY,
        }
    }

    fn angle_of(&self, p: Point, c: (f64, f64)) -> f64 {
        (p.y as f64 - c.1).atan2(p.x as f64 - c.0)
    }

    /// Start angle and signed sweep (counter-clockwise positive)
    pub fn angles(&self) -> Option<(f64, f64)> {
        let c = self.center_f64()?;
        let a0 = self.angle_of(self.start, c);
        let am = self.angle_of(self.mid, c);
        let a1 = self.angle_of(self.end, c);
        let ccw = |from: f64, to: f64| (to - from).rem_euclid(TAU);
        let sweep_ccw = ccw(a0, a1);
        if ccw(a0, am) <= sweep_ccw {
            Some((a0, sweep_ccw))
        } else {
            Some((a0, sweep_ccw - TAU))
        }
    }

    pub fn central_angle(&self) -> f64 {
        self.angles().map(|(_, s)| s).unwrap_or(0.0)
    }

    pub fn length(&self) -> f64 {
        match self.angles() {
            Some((_, sweep)) => self.radius() * sweep.abs(),
            None => self.chord().length(),
        }
    }

    pub fn reversed(&self) -> ArcGeom {
        ArcGeom::new(self.end, self.mid, self.start)
    }

    /// True if the ray from the centre through `p` falls inside the sweep
    fn sweep_contains(&self, p: Point) -> bool {
        let (Some(c), Some((a0, sweep))) = (self.center_f64(), self.angles()) else {
            return false;
        };
        let ap = self.angle_of(p, c);
        if sweep >= 0.0 {
            (ap - a0).rem_euclid(TAU) <= sweep
        } else {
            (a0 - ap).rem_euclid(TAU) <= -sweep
        }
    }

    pub fn distance_to_point(&self, p: Point) -> f64 {
        let Some(c) = self.center_f64() else {
            return self.chord().distance_to_point(p);
        };
        let endpoints = self.start.distance(p).min(self.end.distance(p));
        if self.sweep_contains(p) {
            let dc = ((p.x as f64 - c.0).powi(2) + (p.y as f64 - c.1).powi(2)).sqrt();
            (dc - self.radius()).abs().min(endpoints)
        } else {
            endpoints
        }
    }

    /// Polyline approximation with the given maximum chord error
    pub fn to_polyline(&self, max_error: f64) -> Vec<Point> {
        let (Some(c), Some((a0, sweep))) = (self.center_f64(), self.angles()) else {
            return vec![self.start, self.end];
        };
        let r = self.radius();
        let max_error = max_error.max(1.0);
        let step = if r > max_error {
            2.0 * (1.0 - max_error / r).acos()
        } else {
            sweep.abs()
        };
        let n = ((sweep.abs() / step.max(1e-6)).ceil() as usize).clamp(2, 360);
        let mut points = Vec::with_capacity(n + 1);
        points.push(self.start);
        for i in 1..n {
            let a = a0 + sweep * i as f64 / n as f64;
            points.push(Point::from_f64(c.0 + r * a.cos(), c.1 + r * a.sin()));
        }
        points.push(self.end);
        points
    }

    pub fn bbox(&self) -> BoundingBox {
        let pts = self.to_polyline(ARC_APPROX_ERROR);
        BoundingBox::from_points(&pts).unwrap_or_else(|| BoundingBox::new(self.start, self.end))
    }
}
