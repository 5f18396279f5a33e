//! Config-driven constraint source
//!
//! `DesignRules` stands in for a host design-rule engine: board defaults,
//! net classes, net membership and explicit or name-derived diff pairs.

use super::types::{Constraint, ConstraintKind, MinOptMax, RuleItem};
use crate::item::NetId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Seam to the host's rule engine
pub trait ConstraintSource {
    fn query(&self, kind: ConstraintKind, a: &RuleItem, b: Option<&RuleItem>, layer: i32) -> Option<Constraint>;
    fn coupled_net(&self, net: NetId) -> Option<NetId>;
    /// +1 for the positive line of a pair, -1 for the negative one, 0 otherwise
    fn net_polarity(&self, net: NetId) -> i32;
    fn clearance_epsilon(&self) -> i64;
    /// Upper bound of any clearance this source can return
    fn max_clearance(&self) -> i64;
    fn net_name(&self, net: NetId) -> Option<String> {
        let _ = net;
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetClass {
    pub clearance: Option<i64>,
    pub track_width: Option<i64>,
    pub via_diameter: Option<i64>,
    pub via_drill: Option<i64>,
    pub diff_pair_width: Option<i64>,
    pub diff_pair_gap: Option<i64>,
    pub length: Option<MinOptMax>,
    pub skew: Option<MinOptMax>,
    /// Length/skew targets are propagation delays (ps) instead of lengths
    pub time_domain: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetInfo {
    pub id: NetId,
    pub name: String,
    #[serde(default)]
    pub class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignRules {
    pub clearance: i64,
    pub hole_clearance: i64,
    pub hole_to_hole: i64,
    pub edge_clearance: i64,
    pub physical_clearance: i64,
    pub clearance_epsilon: i64,
    pub track_width: i64,
    pub via_diameter: i64,
    pub via_drill: i64,
    pub diff_pair_width: i64,
    pub diff_pair_gap: i64,
    pub net_classes: IndexMap<String, NetClass>,
    pub nets: Vec<NetInfo>,
    /// Explicit (positive, negative) pairs; take precedence over name matching
    pub diff_pairs: Vec<(NetId, NetId)>,
    /// Net pairs whose clearance violations are ignored
    pub ignored_pairs: Vec<(NetId, NetId)>,
}

impl Default for DesignRules {
    fn default() -> Self {
        Self {
            clearance: 200_000,
            hole_clearance: 0,
            hole_to_hole: 250_000,
            edge_clearance: 500_000,
            physical_clearance: 0,
            clearance_epsilon: 500,
            track_width: 250_000,
            via_diameter: 600_000,
            via_drill: 300_000,
            diff_pair_width: 200_000,
            diff_pair_gap: 180_000,
            net_classes: IndexMap::new(),
            nets: Vec::new(),
            diff_pairs: Vec::new(),
            ignored_pairs: Vec::new(),
        }
    }
}

const PAIR_SUFFIXES: [(&str, &str); 2] = [("+", "-"), ("P", "N")];

impl DesignRules {
    pub fn net(&self, id: NetId) -> Option<&NetInfo> {
        self.nets.iter().find(|n| n.id == id)
    }

    pub fn net_by_name(&self, name: &str) -> Option<&NetInfo> {
        self.nets.iter().find(|n| n.name == name)
    }

    pub fn class_of(&self, net: Option<NetId>) -> Option<(&str, &NetClass)> {
        let name = self.net(net?)?.class.as_deref()?;
        self.net_classes.get_key_value(name).map(|(k, v)| (k.as_str(), v))
    }

    fn class_value(&self, net: Option<NetId>, pick: impl Fn(&NetClass) -> Option<i64>, default: i64) -> (i64, String) {
        match self.class_of(net) {
            Some((name, class)) => match pick(class) {
                Some(v) => (v, format!("netclass '{name}'")),
                None => (default, "board default".to_string()),
            },
            None => (default, "board default".to_string()),
        }
    }

    fn is_ignored_pair(&self, a: Option<NetId>, b: Option<NetId>) -> bool {
        let (Some(a), Some(b)) = (a, b) else {
            return false;
        };
        self.ignored_pairs.iter().any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
    }

    /// Name-based pairing: `CLK+`/`CLK-`, `USB_P`/`USB_N`, `DP`/`DN`
    fn name_pair(&self, net: NetId) -> Option<(NetId, i32)> {
        let name = &self.net(net)?.name;
        for (pos, neg) in PAIR_SUFFIXES {
            let (base, other_suffix, polarity) = if let Some(base) = name.strip_suffix(pos) {
                (base, neg, 1)
            } else if let Some(base) = name.strip_suffix(neg) {
                (base, pos, -1)
            } else {
                continue;
            };
            if base.is_empty() {
                continue;
            }
            let partner = format!("{base}{other_suffix}");
            if let Some(info) = self.net_by_name(&partner) {
                return Some((info.id, polarity));
            }
        }
        None
    }

    fn pair_of(&self, net: NetId) -> Option<(NetId, i32)> {
        for &(p, n) in &self.diff_pairs {
            if p == net {
                return Some((n, 1));
            }
            if n == net {
                return Some((p, -1));
            }
        }
        self.name_pair(net)
    }

    fn board_constraint(kind: ConstraintKind, value: i64, rule: &str) -> Option<Constraint> {
        (value > 0).then(|| Constraint::new(kind, MinOptMax::with_min(value), rule))
    }

    fn class_target(&self, kind: ConstraintKind, net: Option<NetId>) -> Option<Constraint> {
        let (name, class) = self.class_of(net)?;
        let value = match kind {
            ConstraintKind::Length => class.length?,
            _ => class.skew?,
        };
        let mut c = Constraint::new(kind, value, format!("netclass '{name}'"));
        c.time_domain = class.time_domain;
        Some(c)
    }
}

impl ConstraintSource for DesignRules {
    fn query(&self, kind: ConstraintKind, a: &RuleItem, b: Option<&RuleItem>, _layer: i32) -> Option<Constraint> {
        match kind {
            ConstraintKind::Clearance => {
                let b_net = b.and_then(|b| b.net);
                if self.is_ignored_pair(a.net, b_net) {
                    return Some(Constraint::ignored(kind, "ignored net pair"));
                }
                let (ca, ra) = self.class_value(a.net, |c| c.clearance, self.clearance);
                let (cb, rb) = self.class_value(b_net, |c| c.clearance, self.clearance);
                let (value, rule) = if cb > ca { (cb, rb) } else { (ca, ra) };
                Self::board_constraint(kind, value, &rule)
            }
            ConstraintKind::HoleClearance => Self::board_constraint(kind, self.hole_clearance, "hole clearance"),
            ConstraintKind::HoleToHole => Self::board_constraint(kind, self.hole_to_hole, "hole to hole"),
            ConstraintKind::EdgeClearance => Self::board_constraint(kind, self.edge_clearance, "edge clearance"),
            ConstraintKind::PhysicalClearance => {
                Self::board_constraint(kind, self.physical_clearance, "physical clearance")
            }
            ConstraintKind::Width => {
                let (w, rule) = self.class_value(a.net, |c| c.track_width, self.track_width);
                Some(Constraint::new(kind, MinOptMax { opt: Some(w), ..Default::default() }, rule))
            }
            ConstraintKind::DiffPairGap => {
                let (g, rule) = self.class_value(a.net, |c| c.diff_pair_gap, self.diff_pair_gap);
                Some(Constraint::new(kind, MinOptMax { opt: Some(g), ..Default::default() }, rule))
            }
            ConstraintKind::DiffPairWidth => {
                let (w, rule) = self.class_value(a.net, |c| c.diff_pair_width, self.diff_pair_width);
                Some(Constraint::new(kind, MinOptMax { opt: Some(w), ..Default::default() }, rule))
            }
            ConstraintKind::ViaDiameter => {
                let (d, rule) = self.class_value(a.net, |c| c.via_diameter, self.via_diameter);
                Some(Constraint::new(kind, MinOptMax { opt: Some(d), ..Default::default() }, rule))
            }
            ConstraintKind::ViaHole => {
                let (d, rule) = self.class_value(a.net, |c| c.via_drill, self.via_drill);
                Some(Constraint::new(kind, MinOptMax { opt: Some(d), ..Default::default() }, rule))
            }
            ConstraintKind::Length | ConstraintKind::Skew => self.class_target(kind, a.net),
        }
    }

    fn coupled_net(&self, net: NetId) -> Option<NetId> {
        self.pair_of(net).map(|(other, _)| other)
    }

    fn net_polarity(&self, net: NetId) -> i32 {
        self.pair_of(net).map(|(_, p)| p).unwrap_or(0)
    }

    fn clearance_epsilon(&self) -> i64 {
        self.clearance_epsilon
    }

    fn max_clearance(&self) -> i64 {
        let class_max = self.net_classes.values().filter_map(|c| c.clearance).max().unwrap_or(0);
        [
            self.clearance,
            self.hole_clearance,
            self.hole_to_hole,
            self.edge_clearance,
            self.physical_clearance,
            class_max,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    fn net_name(&self, net: NetId) -> Option<String> {
        self.net(net).map(|n| n.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemKind, LayerRange};

    fn rules() -> DesignRules {
        let mut rules = DesignRules {
            nets: vec![
                NetInfo { id: NetId(1), name: "USB_P".into(), class: Some("usb".into()) },
                NetInfo { id: NetId(2), name: "USB_N".into(), class: Some("usb".into()) },
                NetInfo { id: NetId(3), name: "CLK+".into(), class: None },
                NetInfo { id: NetId(4), name: "CLK-".into(), class: None },
                NetInfo { id: NetId(5), name: "GND".into(), class: None },
            ],
            ..Default::default()
        };
        rules.net_classes.insert("usb".into(), NetClass { clearance: Some(300_000), ..Default::default() });
        rules
    }

    fn probe(net: u32) -> RuleItem {
        RuleItem {
            kind: ItemKind::Segment,
            net: Some(NetId(net)),
            layers: LayerRange::single(0),
            host: None,
            is_hole: false,
            is_edge: false,
            is_copper: true,
        }
    }

    #[test]
    fn test_name_based_pairs() {
        let rules = rules();
        assert_eq!(rules.coupled_net(NetId(1)), Some(NetId(2)));
        assert_eq!(rules.coupled_net(NetId(4)), Some(NetId(3)));
        assert_eq!(rules.net_polarity(NetId(1)), 1);
        assert_eq!(rules.net_polarity(NetId(4)), -1);
        assert_eq!(rules.coupled_net(NetId(5)), None);
    }

    #[test]
    fn test_clearance_takes_larger_class() {
        let rules = rules();
        let c = rules.query(ConstraintKind::Clearance, &probe(5), Some(&probe(1)), 0).unwrap();
        assert_eq!(c.value.min, Some(300_000));
        assert_eq!(c.rule_name, "netclass 'usb'");
        assert_eq!(rules.max_clearance(), 500_000);
    }
}
