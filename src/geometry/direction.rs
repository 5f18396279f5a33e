//! 45-degree trace construction

use super::chain::LineChain;
use super::types::Point;
use serde::{Deserialize, Serialize};

/// Which half of a two-piece 45-degree trace comes first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Posture {
    #[default]
    StraightFirst,
    DiagonalFirst,
}

impl Posture {
    pub fn flipped(self) -> Posture {
        match self {
            Posture::StraightFirst => Posture::DiagonalFirst,
            Posture::DiagonalFirst => Posture::StraightFirst,
        }
    }
}

/// Build a trace from `start` to `end` using at most one straight (axis
/// aligned) and one diagonal piece.
pub fn build_initial_trace(start: Point, end: Point, posture: Posture) -> LineChain {
    let d = end - start;
    let (ax, ay) = (d.x.abs(), d.y.abs());

    if ax == 0 || ay == 0 || ax == ay {
        return LineChain::from_points(&[start, end]);
    }

    let diag = ax.min(ay);
    let diag_vec = Point::new(d.x.signum() * diag, d.y.signum() * diag);
    let mid = match posture {
        Posture::StraightFirst => end - diag_vec,
        Posture::DiagonalFirst => start + diag_vec,
    };
    LineChain::from_points(&[start, mid, end])
}

/// True if `d` is horizontal, vertical or at 45 degrees
pub fn is_octilinear(d: Point) -> bool {
    d.x == 0 || d.y == 0 || d.x.abs() == d.y.abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_postures_end_at_target() {
        let start = Point::new(0, 0);
        let end = Point::new(10_000, 4_000);
        for posture in [Posture::StraightFirst, Posture::DiagonalFirst] {
            let chain = build_initial_trace(start, end, posture);
            assert_eq!(chain.point_count(), 3);
            assert_eq!(chain.first(), Some(start));
            assert_eq!(chain.last(), Some(end));
            for piece in chain.points().windows(2) {
                assert!(is_octilinear(piece[1] - piece[0]));
            }
        }
        let straight = build_initial_trace(start, end, Posture::StraightFirst);
        assert_eq!(straight.point(1), Point::new(6_000, 0));
    }
}
