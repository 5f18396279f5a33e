//! Memoizing rule resolver
//!
//! Clearances between stored items are cached by (item, other, epsilon).
//! Probes without a node id go to a separate temporary cache keyed by the
//! item content, which the router clears on every cursor move.

use super::source::ConstraintSource;
use super::types::{Constraint, ConstraintKind, RuleItem, Severity};
use crate::item::{Item, ItemId, NetId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Rule queries as the router consumes them
pub trait RuleResolver {
    /// Required clearance between `a` and `b`; -1 means they may overlap
    fn clearance(&self, a: &Item, b: &Item, use_epsilon: bool) -> i64;
    fn query_constraint(&self, kind: ConstraintKind, a: &Item, b: Option<&Item>, layer: i32) -> Option<Constraint>;
    fn dp_coupled_net(&self, net: NetId) -> Option<NetId>;
    fn dp_net_polarity(&self, net: NetId) -> i32;
    fn clearance_epsilon(&self) -> i64;
    fn max_clearance(&self) -> i64;
    /// Mark every cached entry that mentions `id` for pruning
    fn clear_cache_for_item(&self, id: ItemId);
    fn clear_temporary_caches(&self);
    fn net_name(&self, net: NetId) -> Option<String> {
        let _ = net;
        None
    }
}

type IdKey = (ItemId, ItemId, bool);
type TempKey = (RuleItem, RuleItem, bool);

pub struct MemoizedRuleResolver<S: ConstraintSource> {
    source: S,
    cache: RefCell<HashMap<IdKey, i64>>,
    temp_cache: RefCell<HashMap<TempKey, i64>>,
    dirty: RefCell<HashSet<ItemId>>,
}

impl<S: ConstraintSource> MemoizedRuleResolver<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: RefCell::new(HashMap::new()),
            temp_cache: RefCell::new(HashMap::new()),
            dirty: RefCell::new(HashSet::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache_len(&self) -> usize {
        self.prune_dirty();
        self.cache.borrow().len()
    }

    pub fn temp_cache_len(&self) -> usize {
        self.temp_cache.borrow().len()
    }

    fn prune_dirty(&self) {
        let mut dirty = self.dirty.borrow_mut();
        if dirty.is_empty() {
            return;
        }
        let mut cache = self.cache.borrow_mut();
        let before = cache.len();
        cache.retain(|(a, b, _), _| !dirty.contains(a) && !dirty.contains(b));
        debug!(pruned = before - cache.len(), dirty = dirty.len(), "clearance cache pruned");
        dirty.clear();
    }

    fn query_min(&self, kind: ConstraintKind, a: &RuleItem, b: &RuleItem, layer: i32) -> Option<(i64, Severity)> {
        self.source
            .query(kind, a, Some(b), layer)
            .map(|c| (c.value.min.unwrap_or(0), c.severity))
    }

    /// Per-layer maximum over every applicable clearance category
    fn compute_clearance(&self, a: &RuleItem, b: &RuleItem) -> i64 {
        let layers = a.layers.intersection(&b.layers).unwrap_or(a.layers);
        let mut rv: i64 = 0;
        let mut ignored = false;

        for layer in layers.layers() {
            let mut bind = |hit: Option<(i64, Severity)>| match hit {
                Some((_, Severity::Ignore)) => ignored = true,
                Some((v, _)) => rv = rv.max(v),
                None => {}
            };
            if a.is_hole && b.is_hole {
                bind(self.query_min(ConstraintKind::HoleToHole, a, b, layer));
            }
            if a.is_hole || b.is_hole {
                bind(self.query_min(ConstraintKind::HoleClearance, a, b, layer));
            }
            if a.is_copper && b.is_copper {
                bind(self.query_min(ConstraintKind::Clearance, a, b, layer));
            }
            if a.is_edge || b.is_edge {
                bind(self.query_min(ConstraintKind::EdgeClearance, a, b, layer));
            }
            bind(self.query_min(ConstraintKind::PhysicalClearance, a, b, layer));
        }

        if ignored && rv <= 0 {
            return -1;
        }
        rv
    }

    fn apply_epsilon(&self, rv: i64, use_epsilon: bool) -> i64 {
        if use_epsilon && rv > 0 {
            (rv - self.source.clearance_epsilon()).max(0)
        } else {
            rv
        }
    }
}

impl<S: ConstraintSource> RuleResolver for MemoizedRuleResolver<S> {
    fn clearance(&self, a: &Item, b: &Item, use_epsilon: bool) -> i64 {
        self.prune_dirty();

        if let (Some(ia), Some(ib)) = (a.id(), b.id()) {
            let key = (ia, ib, use_epsilon);
            if let Some(&v) = self.cache.borrow().get(&key) {
                return v;
            }
            let rv = self.compute_clearance(&RuleItem::from_item(a), &RuleItem::from_item(b));
            let rv = self.apply_epsilon(rv, use_epsilon);
            self.cache.borrow_mut().insert(key, rv);
            return rv;
        }

        let (ra, rb) = (RuleItem::from_item(a), RuleItem::from_item(b));
        let key = (ra, rb, use_epsilon);
        if let Some(&v) = self.temp_cache.borrow().get(&key) {
            return v;
        }
        let rv = self.apply_epsilon(self.compute_clearance(&ra, &rb), use_epsilon);
        self.temp_cache.borrow_mut().insert(key, rv);
        rv
    }

    fn query_constraint(&self, kind: ConstraintKind, a: &Item, b: Option<&Item>, layer: i32) -> Option<Constraint> {
        let ra = RuleItem::from_item(a);
        let rb = b.map(RuleItem::from_item);
        self.source.query(kind, &ra, rb.as_ref(), layer)
    }

    fn dp_coupled_net(&self, net: NetId) -> Option<NetId> {
        self.source.coupled_net(net)
    }

    fn dp_net_polarity(&self, net: NetId) -> i32 {
        self.source.net_polarity(net)
    }

    fn clearance_epsilon(&self) -> i64 {
        self.source.clearance_epsilon()
    }

    fn max_clearance(&self) -> i64 {
        self.source.max_clearance()
    }

    fn clear_cache_for_item(&self, id: ItemId) {
        self.dirty.borrow_mut().insert(id);
    }

    fn clear_temporary_caches(&self) {
        self.temp_cache.borrow_mut().clear();
    }

    fn net_name(&self, net: NetId) -> Option<String> {
        self.source.net_name(net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Seg};
    use crate::item::{Hole, LayerRange, Via};
    use crate::rules::DesignRules;

    fn track(id: u32, net: u32) -> Item {
        let mut item = Item::segment(Seg::new(Point::new(0, 0), Point::new(1000, 0)), 100, 0, Some(NetId(net)));
        item.set_id(ItemId(id));
        item
    }

    #[test]
    fn test_epsilon_never_increases_clearance() {
        let resolver = MemoizedRuleResolver::new(DesignRules::default());
        let (a, b) = (track(1, 1), track(2, 2));
        let plain = resolver.clearance(&a, &b, false);
        let eps = resolver.clearance(&a, &b, true);
        assert_eq!(plain, 200_000);
        assert_eq!(eps, 200_000 - 500);
        assert!(eps <= plain);
    }

    #[test]
    fn test_categories_combine_by_maximum() {
        let rules = DesignRules { hole_clearance: 350_000, ..Default::default() };
        let resolver = MemoizedRuleResolver::new(rules);
        let hole = Item::hole(Hole { center: Point::new(0, 0), radius: 100, plated: true }, LayerRange::single(0), Some(NetId(3)));
        assert_eq!(resolver.clearance(&hole, &track(1, 1), false), 350_000);
        let npth = Item::hole(Hole { center: Point::new(0, 0), radius: 100, plated: false }, LayerRange::single(0), None);
        let other = Item::hole(Hole { center: Point::new(9, 0), radius: 100, plated: false }, LayerRange::single(0), None);
        assert_eq!(resolver.clearance(&npth, &other, false), 350_000);
    }

    #[test]
    fn test_ignored_pair_yields_no_constraint() {
        let rules = DesignRules { ignored_pairs: vec![(NetId(1), NetId(2))], ..Default::default() };
        let resolver = MemoizedRuleResolver::new(rules);
        assert_eq!(resolver.clearance(&track(1, 1), &track(2, 2), false), -1);
        assert_eq!(resolver.clearance(&track(1, 1), &track(3, 3), false), 200_000);
    }

    #[test]
    fn test_dirty_items_are_pruned_and_probes_use_temp_cache() {
        let resolver = MemoizedRuleResolver::new(DesignRules::default());
        resolver.clearance(&track(1, 1), &track(2, 2), false);
        resolver.clearance(&track(3, 1), &track(2, 2), false);
        assert_eq!(resolver.cache_len(), 2);
        resolver.clear_cache_for_item(ItemId(2));
        assert_eq!(resolver.cache_len(), 0);

        let probe = Item::via(Via::new(Point::new(0, 0), 600, 300), LayerRange::new(0, 1), Some(NetId(5)));
        resolver.clearance(&probe, &track(1, 1), true);
        assert_eq!(resolver.cache_len(), 0);
        assert_eq!(resolver.temp_cache_len(), 1);
        resolver.clear_temporary_caches();
        assert_eq!(resolver.temp_cache_len(), 0);
    }
}
