//! Per-kind payloads of routable items

use crate::geometry::{ArcGeom, Point, Seg, Shape};
use serde::{Deserialize, Serialize};

/// Straight track segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub seg: Seg,
    pub width: i64,
}

/// Arc track segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcSegment {
    pub arc: ArcGeom,
    pub width: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ViaType {
    #[default]
    Through,
    BlindBuried,
    Micro,
}

/// Plated via. `diameters[i]` is the pad diameter on layer `layers.start() + i`;
/// layers past the end of the stack use the last entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub pos: Point,
    pub diameters: Vec<i64>,
    pub drill: i64,
    #[serde(default)]
    pub via_type: ViaType,
    /// Not attached to any net connection (stitching/free via)
    #[serde(default)]
    pub free: bool,
}

impl Via {
    pub fn new(pos: Point, diameter: i64, drill: i64) -> Self {
        Self { pos, diameters: vec![diameter], drill, via_type: ViaType::Through, free: false }
    }

    /// Pad diameter on the `offset`-th layer of the via span
    pub fn diameter_at(&self, offset: usize) -> i64 {
        self.diameters
            .get(offset)
            .or(self.diameters.last())
            .copied()
            .unwrap_or(self.drill)
    }

    pub fn max_diameter(&self) -> i64 {
        self.diameters.iter().copied().max().unwrap_or(self.drill)
    }
}

/// Rules carried by a keepout (rule area) solid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct KeepoutRules {
    #[serde(default)]
    pub no_tracks: bool,
    #[serde(default)]
    pub no_vias: bool,
    #[serde(default)]
    pub no_pads: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolidKind {
    Pad,
    Keepout(KeepoutRules),
    Graphic,
    BoardEdge,
}

/// Pad, keepout fragment or graphic outline. Never moved by the router
/// except as part of a component drag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solid {
    pub pos: Point,
    pub shape: Shape,
    pub kind: SolidKind,
    /// Drill diameter of a through-hole pad
    #[serde(default)]
    pub drill: Option<i64>,
    #[serde(default)]
    pub component: Option<String>,
}

impl Solid {
    pub fn pad(pos: Point, shape: Shape) -> Self {
        Self { pos, shape, kind: SolidKind::Pad, drill: None, component: None }
    }

    pub fn keepout(shape: Shape, rules: KeepoutRules) -> Self {
        Self { pos: shape.centre(), shape, kind: SolidKind::Keepout(rules), drill: None, component: None }
    }

    pub fn is_keepout(&self) -> bool {
        matches!(self.kind, SolidKind::Keepout(_))
    }

    pub fn forbids_tracks(&self) -> bool {
        matches!(self.kind, SolidKind::Keepout(rules) if rules.no_tracks)
    }

    pub fn forbids_vias(&self) -> bool {
        matches!(self.kind, SolidKind::Keepout(rules) if rules.no_vias)
    }
}

/// Drilled feature derived from a via or through-hole pad
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    pub center: Point,
    pub radius: i64,
    pub plated: bool,
}
