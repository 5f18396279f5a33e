//! Contiguous layer spans

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive range of dense router layer indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerRange {
    start: i32,
    end: i32,
}

impl LayerRange {
    pub fn new(a: i32, b: i32) -> Self {
        Self { start: a.min(b), end: a.max(b) }
    }

    pub fn single(layer: i32) -> Self {
        Self { start: layer, end: layer }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn is_multilayer(&self) -> bool {
        self.start != self.end
    }

    pub fn contains(&self, layer: i32) -> bool {
        layer >= self.start && layer <= self.end
    }

    pub fn overlaps(&self, other: &LayerRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn merged(&self, other: &LayerRange) -> LayerRange {
        LayerRange { start: self.start.min(other.start), end: self.end.max(other.end) }
    }

    pub fn intersection(&self, other: &LayerRange) -> Option<LayerRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(LayerRange { start, end })
    }

    pub fn layers(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }
}

impl fmt::Display for LayerRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_multilayer() {
            write!(f, "{}-{}", self.start, self.end)
        } else {
            write!(f, "{}", self.start)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_and_merge() {
        let a = LayerRange::new(3, 0);
        assert_eq!(a.start(), 0);
        assert!(a.overlaps(&LayerRange::single(3)));
        assert!(!LayerRange::single(1).overlaps(&LayerRange::single(2)));
        assert_eq!(LayerRange::single(1).merged(&LayerRange::single(4)), LayerRange::new(1, 4));
        assert_eq!(a.intersection(&LayerRange::new(2, 7)), Some(LayerRange::new(2, 3)));
        assert_eq!(LayerRange::single(0).intersection(&LayerRange::single(1)), None);
    }
}
