//! Routable and collidable items
//!
//! `Item` is a closed sum type over the primitive kinds the router knows.
//! Items are immutable once added to a node: an edit replaces the item with a
//! new one carrying a fresh id (and the same host reference, so the host can
//! tell an update from an add/remove pair).
//!
//! # Submodules
//! - `layers` - Layer spans
//! - `primitives` - Per-kind payloads
//! - `line` - Ephemeral multi-segment lines
//! - `joint` - Connectivity vertices
//! - `item_set` - Filterable item collections

mod layers;
mod primitives;
mod line;
mod joint;
mod item_set;

pub use layers::LayerRange;
pub use primitives::{ArcSegment, Hole, KeepoutRules, Segment, Solid, SolidKind, Via, ViaType};
pub use line::Line;
pub use joint::{Joint, JointLink, JointTag};
pub use item_set::ItemSet;

use crate::geometry::{ArcGeom, BoundingBox, Point, Seg, Shape};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Identity of an item inside a node lineage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Host net code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetId(pub u32);

/// Identifier of the persisted host object an item mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostRef(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Solid,
    Segment,
    Arc,
    Via,
    Hole,
}

impl ItemKind {
    pub fn mask(self) -> KindMask {
        match self {
            ItemKind::Solid => KindMask::SOLID,
            ItemKind::Segment => KindMask::SEGMENT,
            ItemKind::Arc => KindMask::ARC,
            ItemKind::Via => KindMask::VIA,
            ItemKind::Hole => KindMask::HOLE,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KindMask: u8 {
        const SOLID = 1;
        const SEGMENT = 1 << 1;
        const ARC = 1 << 2;
        const VIA = 1 << 3;
        const HOLE = 1 << 4;
        const LINKED = Self::SEGMENT.bits() | Self::ARC.bits();
        const ANY = Self::SOLID.bits() | Self::SEGMENT.bits() | Self::ARC.bits() | Self::VIA.bits() | Self::HOLE.bits();
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Marker: u8 {
        const HEAD = 1;
        const VIOLATION = 1 << 1;
        const LOCKED = 1 << 2;
        const DP_COUPLED = 1 << 3;
        const HOLE = 1 << 4;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemData {
    Segment(Segment),
    Arc(ArcSegment),
    Via(Via),
    Solid(Solid),
    Hole(Hole),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(skip)]
    id: Option<ItemId>,
    pub net: Option<NetId>,
    pub layers: LayerRange,
    #[serde(default)]
    pub host: Option<HostRef>,
    #[serde(skip)]
    pub marker: Marker,
    #[serde(default)]
    pub locked: bool,
    pub data: ItemData,
}

impl Item {
    fn with_data(data: ItemData, layers: LayerRange, net: Option<NetId>) -> Self {
        Self { id: None, net, layers, host: None, marker: Marker::empty(), locked: false, data }
    }

    pub fn segment(seg: Seg, width: i64, layer: i32, net: Option<NetId>) -> Self {
        Self::with_data(ItemData::Segment(Segment { seg, width }), LayerRange::single(layer), net)
    }

    pub fn arc(arc: ArcGeom, width: i64, layer: i32, net: Option<NetId>) -> Self {
        Self::with_data(ItemData::Arc(ArcSegment { arc, width }), LayerRange::single(layer), net)
    }

    pub fn via(via: Via, layers: LayerRange, net: Option<NetId>) -> Self {
        Self::with_data(ItemData::Via(via), layers, net)
    }

    pub fn solid(solid: Solid, layers: LayerRange, net: Option<NetId>) -> Self {
        Self::with_data(ItemData::Solid(solid), layers, net)
    }

    pub fn hole(hole: Hole, layers: LayerRange, net: Option<NetId>) -> Self {
        let mut item = Self::with_data(ItemData::Hole(hole), layers, net);
        item.marker |= Marker::HOLE;
        item
    }

    pub fn with_host(mut self, host: HostRef) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.marker |= marker;
        self
    }

    /// Node-assigned id; `None` for transient probes
    pub fn id(&self) -> Option<ItemId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ItemId) {
        self.id = Some(id);
    }

    /// Copy without node identity, suitable for adding as a new item
    pub fn detached(&self) -> Item {
        let mut item = self.clone();
        item.id = None;
        item
    }

    pub fn kind(&self) -> ItemKind {
        match self.data {
            ItemData::Segment(_) => ItemKind::Segment,
            ItemData::Arc(_) => ItemKind::Arc,
            ItemData::Via(_) => ItemKind::Via,
            ItemData::Solid(_) => ItemKind::Solid,
            ItemData::Hole(_) => ItemKind::Hole,
        }
    }

    pub fn of_kind(&self, mask: KindMask) -> bool {
        mask.contains(self.kind().mask())
    }

    /// Segments and arcs: pieces of a line, joined through joints
    pub fn is_linked(&self) -> bool {
        self.of_kind(KindMask::LINKED)
    }

    pub fn layer(&self) -> i32 {
        self.layers.start()
    }

    pub fn width(&self) -> Option<i64> {
        match &self.data {
            ItemData::Segment(s) => Some(s.width),
            ItemData::Arc(a) => Some(a.width),
            _ => None,
        }
    }

    pub fn as_segment(&self) -> Option<&Segment> {
        match &self.data {
            ItemData::Segment(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_arc(&self) -> Option<&ArcSegment> {
        match &self.data {
            ItemData::Arc(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_via(&self) -> Option<&Via> {
        match &self.data {
            ItemData::Via(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_solid(&self) -> Option<&Solid> {
        match &self.data {
            ItemData::Solid(s) => Some(s),
            _ => None,
        }
    }

    /// Pads, tracks and vias are routable; keepouts, graphics and holes are not
    pub fn is_routable(&self) -> bool {
        match &self.data {
            ItemData::Solid(s) => matches!(s.kind, SolidKind::Pad),
            ItemData::Hole(_) => false,
            _ => true,
        }
    }

    pub fn is_edge(&self) -> bool {
        matches!(&self.data, ItemData::Solid(s) if s.kind == SolidKind::BoardEdge)
    }

    pub fn is_hole(&self) -> bool {
        matches!(self.data, ItemData::Hole(_))
    }

    pub fn is_copper(&self) -> bool {
        match &self.data {
            ItemData::Solid(s) => matches!(s.kind, SolidKind::Pad),
            ItemData::Hole(h) => h.plated,
            _ => true,
        }
    }

    /// Connection points: segment/arc ends, via or pad centre
    pub fn anchors(&self) -> Vec<Point> {
        match &self.data {
            ItemData::Segment(s) => vec![s.seg.a, s.seg.b],
            ItemData::Arc(a) => vec![a.arc.start, a.arc.end],
            ItemData::Via(v) => vec![v.pos],
            ItemData::Solid(s) => vec![s.pos],
            ItemData::Hole(h) => vec![h.center],
        }
    }

    pub fn anchor(&self, i: usize) -> Point {
        let anchors = self.anchors();
        anchors[i.min(anchors.len() - 1)]
    }

    /// Copper shape on `layer`
    pub fn shape_on(&self, layer: i32) -> Shape {
        match &self.data {
            ItemData::Segment(s) => Shape::Segment { seg: s.seg, width: s.width },
            ItemData::Arc(a) => Shape::Arc { arc: a.arc, width: a.width },
            ItemData::Via(v) => {
                let offset = (layer - self.layers.start()).max(0) as usize;
                Shape::Circle { center: v.pos, radius: v.diameter_at(offset) / 2 }
            }
            ItemData::Solid(s) => s.shape.clone(),
            ItemData::Hole(h) => Shape::Circle { center: h.center, radius: h.radius },
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape_on(self.layers.start())
    }

    pub fn bbox(&self) -> BoundingBox {
        match &self.data {
            ItemData::Via(v) => BoundingBox::from_point(v.pos).inflated(v.max_diameter() / 2),
            _ => self.shape().bbox(),
        }
    }

    /// Drilled hole of a via or through-hole pad, as a transient item
    pub fn hole_item(&self) -> Option<Item> {
        let (center, drill) = match &self.data {
            ItemData::Via(v) => (v.pos, v.drill),
            ItemData::Solid(s) => (s.pos, s.drill?),
            _ => return None,
        };
        let plated = self.is_copper();
        Some(Item::hole(Hole { center, radius: drill / 2, plated }, self.layers, self.net))
    }

    pub fn same_identity(&self, other: &Item) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => std::ptr::eq(self, other),
        }
    }

    pub fn translated(&self, d: Point) -> Item {
        let mut item = self.clone();
        match &mut item.data {
            ItemData::Segment(s) => s.seg = Seg::new(s.seg.a + d, s.seg.b + d),
            ItemData::Arc(a) => a.arc = ArcGeom::new(a.arc.start + d, a.arc.mid + d, a.arc.end + d),
            ItemData::Via(v) => v.pos += d,
            ItemData::Solid(s) => {
                s.pos += d;
                s.shape = s.shape.translated(d);
            }
            ItemData::Hole(h) => h.center += d,
        }
        item
    }
}

/// Read access to items by id
pub trait ItemLookup {
    fn lookup(&self, id: ItemId) -> Option<&Rc<Item>>;
}
