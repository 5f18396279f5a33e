//! Meander geometry
//!
//! A meander is a U-shaped excursion of `amplitude` away from a straight
//! base, `spacing` wide, optionally with chamfered corners. Meanders sit on
//! slots two spacings apart so neighbouring excursions keep one spacing of
//! air between them.

use crate::geometry::Point;
use crate::router::settings::CornerStyle;

const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// One excursion placed on the base segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeanderShape {
    pub origin: Point,
    pub amplitude: i64,
    /// +1 left of the base direction, -1 right
    pub side: i32,
    pub points: Vec<Point>,
}

/// Corner cut for a chamfered meander
pub fn chamfer_size(amplitude: i64, spacing: i64, style: CornerStyle, radius_percentage: i32) -> i64 {
    match style {
        CornerStyle::Square => 0,
        CornerStyle::Chamfer => spacing.min(amplitude).max(0) * radius_percentage.clamp(0, 100) as i64 / 200,
    }
}

/// Length a meander adds over the straight base it replaces
pub fn extra_length(amplitude: i64, spacing: i64, style: CornerStyle, radius_percentage: i32) -> f64 {
    let c = chamfer_size(amplitude, spacing, style, radius_percentage) as f64;
    2.0 * amplitude as f64 - 4.0 * c * (2.0 - SQRT_2)
}

/// Amplitude whose meander adds `extra`; the inverse of `extra_length`
pub fn amplitude_for_extra(extra: f64, spacing: i64, style: CornerStyle, radius_percentage: i32) -> i64 {
    let k = match style {
        CornerStyle::Square => return (extra / 2.0).round() as i64,
        CornerStyle::Chamfer => radius_percentage.clamp(0, 100) as f64 / 200.0,
    };
    // below `spacing` the chamfer grows with the amplitude
    let small = extra / (2.0 - 4.0 * k * (2.0 - SQRT_2));
    if small <= spacing as f64 {
        return small.round() as i64;
    }
    let c = chamfer_size(spacing, spacing, style, radius_percentage) as f64;
    ((extra + 4.0 * c * (2.0 - SQRT_2)) / 2.0).round() as i64
}

/// Number of meander slots in a base run of `region` nm
pub fn slot_count(region: i64, spacing: i64) -> usize {
    if spacing <= 0 || region < 2 * spacing {
        return 0;
    }
    ((region - 2 * spacing) / (2 * spacing) + 1) as usize
}

/// Offset (from the region start) of slot `k`'s origin
pub fn slot_offset(k: usize, spacing: i64) -> i64 {
    spacing / 2 + k as i64 * 2 * spacing
}

/// Vertices of a meander starting at `origin`, heading along `dir`
pub fn meander_points(
    origin: Point,
    dir: Point,
    spacing: i64,
    amplitude: i64,
    side: i32,
    style: CornerStyle,
    radius_percentage: i32,
) -> Vec<Point> {
    let along = dir.resize(spacing);
    let normal = dir.perpendicular().resize(amplitude) * side as i64;
    let c = chamfer_size(amplitude, spacing, style, radius_percentage);
    if c == 0 {
        return vec![origin, origin + normal, origin + normal + along, origin + along];
    }
    let along_c = dir.resize(c);
    let normal_c = dir.perpendicular().resize(c) * side as i64;
    vec![
        origin - along_c,
        origin + normal_c,
        origin + normal - normal_c,
        origin + normal + along_c,
        origin + normal + along - along_c,
        origin + normal + along - normal_c,
        origin + along + normal_c,
        origin + along + along_c,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polyline_length(points: &[Point]) -> f64 {
        points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    #[test]
    fn test_extra_length_matches_geometry() {
        let dir = Point::new(1, 0);
        let (spacing, amplitude) = (600_000, 400_000);

        let square = meander_points(Point::new(0, 0), dir, spacing, amplitude, 1, CornerStyle::Square, 80);
        assert_eq!(square[1], Point::new(0, 400_000));
        let extra = extra_length(amplitude, spacing, CornerStyle::Square, 80);
        assert!((polyline_length(&square) - spacing as f64 - extra).abs() < 1e-6);

        let chamfer = meander_points(Point::new(0, 0), dir, spacing, amplitude, -1, CornerStyle::Chamfer, 80);
        let c = chamfer_size(amplitude, spacing, CornerStyle::Chamfer, 80);
        assert_eq!(c, 160_000);
        assert!(chamfer.iter().all(|p| p.y <= 0));
        let extra = extra_length(amplitude, spacing, CornerStyle::Chamfer, 80);
        let span = (spacing + 2 * c) as f64;
        assert!((polyline_length(&chamfer) - span - extra).abs() < 4.0);
    }

    #[test]
    fn test_amplitude_inverse() {
        for style in [CornerStyle::Square, CornerStyle::Chamfer] {
            let a = amplitude_for_extra(500_000.0, 600_000, style, 80);
            assert!((extra_length(a, 600_000, style, 80) - 500_000.0).abs() < 4.0);
        }
    }

    #[test]
    fn test_slots() {
        assert_eq!(slot_count(1_000_000, 600_000), 0);
        assert_eq!(slot_count(1_200_000, 600_000), 1);
        assert_eq!(slot_count(3_600_000, 600_000), 3);
        assert_eq!(slot_offset(2, 600_000), 2_700_000);
    }
}
