//! Constraint value types shared by rule sources and the resolver

use crate::item::{HostRef, Item, ItemKind, LayerRange, NetId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    Clearance,
    HoleClearance,
    HoleToHole,
    EdgeClearance,
    PhysicalClearance,
    Width,
    DiffPairGap,
    DiffPairWidth,
    ViaDiameter,
    ViaHole,
    Length,
    Skew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Ignore,
}

/// Min/opt/max triple; any bound may be absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MinOptMax {
    pub min: Option<i64>,
    pub opt: Option<i64>,
    pub max: Option<i64>,
}

impl MinOptMax {
    pub fn exact(value: i64) -> Self {
        Self { min: Some(value), opt: Some(value), max: Some(value) }
    }

    pub fn with_min(min: i64) -> Self {
        Self { min: Some(min), ..Default::default() }
    }

    pub fn range(min: i64, opt: i64, max: i64) -> Self {
        Self { min: Some(min), opt: Some(opt), max: Some(max) }
    }

    pub fn has_min(&self) -> bool {
        self.min.is_some()
    }

    /// Preferred value: opt, else the midpoint of min/max, else whichever bound exists
    pub fn target(&self) -> Option<i64> {
        match (self.min, self.opt, self.max) {
            (_, Some(opt), _) => Some(opt),
            (Some(min), None, Some(max)) => Some((min + max) / 2),
            (min, None, max) => min.or(max),
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.min.is_none_or(|m| value >= m) && self.max.is_none_or(|m| value <= m)
    }
}

/// Result of a constraint query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub value: MinOptMax,
    pub rule_name: String,
    #[serde(default)]
    pub time_domain: bool,
    #[serde(default)]
    pub severity: Severity,
}

impl Constraint {
    pub fn new(kind: ConstraintKind, value: MinOptMax, rule_name: impl Into<String>) -> Self {
        Self { kind, value, rule_name: rule_name.into(), time_domain: false, severity: Severity::Error }
    }

    pub fn ignored(kind: ConstraintKind, rule_name: impl Into<String>) -> Self {
        Self { severity: Severity::Ignore, ..Self::new(kind, MinOptMax::with_min(0), rule_name) }
    }
}

/// What a rule engine sees of an item; also the cache key for probes that
/// have no node identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleItem {
    pub kind: ItemKind,
    pub net: Option<NetId>,
    pub layers: LayerRange,
    pub host: Option<HostRef>,
    pub is_hole: bool,
    pub is_edge: bool,
    pub is_copper: bool,
}

impl RuleItem {
    pub fn from_item(item: &Item) -> Self {
        Self {
            kind: item.kind(),
            net: item.net,
            layers: item.layers,
            host: item.host,
            is_hole: item.is_hole(),
            is_edge: item.is_edge(),
            is_copper: item.is_copper(),
        }
    }
}
