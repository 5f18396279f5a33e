//! Length tuning
//!
//! The tuned line is the trivial path through the seed segment. Meanders are
//! laid on the seed segment between the point where tuning started and the
//! cursor, each one on its own slot, until the path length reaches the
//! target; the last meander's amplitude is trimmed to land on it. Meanders
//! that would collide are shrunk, then tried on the other side, then dropped.
//!
//! In skew mode the target is the coupled line's length plus the skew target.
//!
//! # Submodules
//! - `shape` - Meander geometry

pub mod shape;

use super::algo::PlacementAlgo;
use super::error::{Result, RouterError};
use super::iface::RouterInterface;
use super::settings::{MeanderSettings, RoutingSettings};
use crate::geometry::{LineChain, Point, Seg};
use crate::item::{Item, ItemId, ItemSet, Line, NetId};
use crate::node::{CollisionOptions, Node};
use crate::rules::{ConstraintKind, MinOptMax};
use crate::topology::{Topology, TrivialPath};
use serde::{Deserialize, Serialize};
use shape::{amplitude_for_extra, extra_length, meander_points, slot_count, slot_offset, MeanderShape};
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TuningMode {
    Single,
    DiffPairSkew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TuningStatus {
    TooShort,
    TooLong,
    Tuned,
}

/// Tuning progress as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningInfo {
    pub status: TuningStatus,
    /// Current length, or skew in skew mode
    pub value: i64,
    pub target: MinOptMax,
}

pub struct MeanderPlacer {
    mode: TuningMode,
    settings: MeanderSettings,
    routing: RoutingSettings,
    world: Node,
    current: Node,
    seed: Option<Rc<Item>>,
    path: Option<TrivialPath>,
    coupled_length: i64,
    /// Target for the tuned line's own length
    target: MinOptMax,
    amplitude: i64,
    spacing: i64,
    start_pos: Point,
    last_pos: Point,
    status: TuningStatus,
    length: i64,
    meanders: Vec<MeanderShape>,
}

impl MeanderPlacer {
    pub fn new(world: &Node, mode: TuningMode, settings: MeanderSettings, routing: RoutingSettings) -> Self {
        let world = world.branch();
        let half_range = (settings.max_amplitude - settings.min_amplitude) / 2;
        let steps = if settings.step > 0 { half_range / settings.step } else { 0 };
        let amplitude = settings.min_amplitude + steps * settings.step.max(0);
        Self {
            mode,
            amplitude,
            spacing: settings.spacing,
            settings,
            routing,
            current: world.branch(),
            world,
            seed: None,
            path: None,
            coupled_length: 0,
            target: MinOptMax::default(),
            start_pos: Point::default(),
            last_pos: Point::default(),
            status: TuningStatus::TooShort,
            length: 0,
            meanders: Vec::new(),
        }
    }

    pub fn status(&self) -> TuningStatus {
        self.status
    }

    pub fn amplitude(&self) -> i64 {
        self.amplitude
    }

    pub fn spacing(&self) -> i64 {
        self.spacing
    }

    pub fn meanders(&self) -> &[MeanderShape] {
        &self.meanders
    }

    /// Length of the tuned line after the last update
    pub fn current_length(&self) -> i64 {
        self.length
    }

    pub fn target(&self) -> MinOptMax {
        self.target
    }

    fn topology(&self) -> Topology<'_> {
        Topology::new(&self.world).with_branch_timeout(self.routing.branch_search_timeout())
    }

    fn seed_segment(&self) -> Option<(ItemId, Seg, i64)> {
        let seed = self.seed.as_ref()?;
        let s = seed.as_segment()?;
        Some((seed.id()?, s.seg, s.width))
    }

    fn path_length(&self, items: &ItemSet, iface: &dyn RouterInterface) -> i64 {
        iface.calculate_routed_path_length(items, None, None)
    }

    /// Convert a constraint (possibly a delay) into a length range
    fn to_length(&self, value: MinOptMax, time_domain: bool, iface: &dyn RouterInterface) -> MinOptMax {
        if !time_domain {
            return value;
        }
        let (width, net) = match &self.seed {
            Some(seed) => (seed.width().unwrap_or(0), seed.net),
            None => (0, None),
        };
        let is_pair = self.mode == TuningMode::DiffPairSkew;
        let convert = |v: Option<i64>| v.map(|d| iface.calculate_length_for_delay(d, width, is_pair, net));
        MinOptMax { min: convert(value.min), opt: convert(value.opt), max: convert(value.max) }
    }

    fn resolve_target(&self, seed: &Item, iface: &dyn RouterInterface) -> MinOptMax {
        let resolver = self.world.resolver();
        match self.mode {
            TuningMode::Single => match resolver.query_constraint(ConstraintKind::Length, seed, None, seed.layer()) {
                Some(c) => self.to_length(c.value, c.time_domain, iface),
                None => self.settings.target_length,
            },
            TuningMode::DiffPairSkew => {
                let skew = match resolver.query_constraint(ConstraintKind::Skew, seed, None, seed.layer()) {
                    Some(c) => self.to_length(c.value, c.time_domain, iface),
                    None => self.settings.target_skew,
                };
                let shift = |v: Option<i64>| v.map(|s| s + self.coupled_length);
                MinOptMax { min: shift(skew.min), opt: shift(skew.opt), max: shift(skew.max) }
            }
        }
    }

    /// Length of the line coupled to the seed
    fn coupled_path_length(&self, seed: &Rc<Item>, iface: &dyn RouterInterface) -> Result<i64> {
        let topo = self.topology();
        let pair = topo.assemble_diff_pair(seed).ok_or(RouterError::NoDiffPairToTune(seed.net))?;
        let coupled = if pair.p.net() == seed.net { &pair.n } else { &pair.p };
        let first = coupled.links().first().copied().ok_or(RouterError::NoDiffPairToTune(seed.net))?;
        let item = self.world.lookup(first).cloned().ok_or(RouterError::NoDiffPairToTune(seed.net))?;
        let path = topo
            .assemble_trivial_path(&item, self.routing.follow_locked_segments)
            .ok_or(RouterError::NoDiffPairToTune(seed.net))?;
        Ok(self.path_length(&path.items(&self.world), iface))
    }

    fn refresh_path(&mut self) {
        let Some(seed) = self.seed.clone() else {
            return;
        };
        let fresh = self.topology().assemble_trivial_path(&seed, self.routing.follow_locked_segments);
        let changed = match (&fresh, &self.path) {
            (Some(a), Some(b)) => a.item_ids() != b.item_ids(),
            (a, b) => a.is_some() != b.is_some(),
        };
        if changed {
            debug!("tuned path changed");
            self.path = fresh;
        }
    }

    fn fits(&self, node: &Node, points: &[Point], width: i64, layer: i32, net: Option<NetId>) -> bool {
        let line = Line::new(LineChain::from_points(points), width, layer, net);
        node.check_colliding_line(&line, &CollisionOptions::default()).is_none()
    }

    /// Largest legal meander at `origin` no bigger than `amplitude`
    fn fit_meander(&self, node: &Node, origin: Point, dir: Point, amplitude: i64, side: i32, seed: &Item) -> Option<MeanderShape> {
        let width = seed.width().unwrap_or(0);
        let (layer, net) = (seed.layer(), seed.net);
        let step = self.settings.step.max(1);
        let sides = if self.settings.single_sided { vec![side] } else { vec![side, -side] };
        for side in sides {
            let mut a = amplitude;
            while a >= self.settings.min_amplitude {
                let points = meander_points(origin, dir, self.spacing, a, side, self.settings.corner_style, self.settings.corner_radius_percentage);
                if self.fits(node, &points, width, layer, net) {
                    return Some(MeanderShape { origin, amplitude: a, side, points });
                }
                a -= step;
            }
        }
        None
    }

    /// Rebuild the meanders for the current cursor and parameters
    fn relay(&mut self, iface: &dyn RouterInterface) {
        self.refresh_path();
        let (Some(seed), Some(path), Some((seed_id, seg, _))) = (self.seed.clone(), self.path.clone(), self.seed_segment()) else {
            return;
        };

        let base_items = path.items(&self.world);
        let base_length = self.path_length(&base_items, iface);
        let mut node = self.world.branch();
        node.remove(seed_id);

        let seg_len = seg.length();
        let along = |p: Point| (seg.project_t(p).clamp(0.0, 1.0) * seg_len).round() as i64;
        let (t0, t1) = {
            let (a, b) = (along(self.start_pos), along(self.last_pos));
            (a.min(b), a.max(b))
        };
        let dir = seg.direction();
        let point_at = |t: i64| seg.a + dir.resize(t);

        let style = self.settings.corner_style;
        let pct = self.settings.corner_radius_percentage;
        let mut needed = self.target.target().map_or(0.0, |t| (t - base_length) as f64);
        let full = extra_length(self.amplitude, self.spacing, style, pct);
        let mut meanders = Vec::new();
        let mut side = if self.settings.initial_side < 0 { -1 } else { 1 };

        for k in 0..slot_count(t1 - t0, self.spacing) {
            if needed <= 0.0 {
                break;
            }
            let amplitude = if needed >= full {
                self.amplitude
            } else {
                amplitude_for_extra(needed, self.spacing, style, pct).min(self.amplitude)
            };
            if amplitude < self.settings.min_amplitude {
                break;
            }
            let origin = point_at(t0 + slot_offset(k, self.spacing));
            if let Some(m) = self.fit_meander(&node, origin, dir, amplitude, side, &seed) {
                needed -= extra_length(m.amplitude, self.spacing, style, pct);
                meanders.push(m);
            }
            if !self.settings.single_sided {
                side = -side;
            }
        }

        let mut points = vec![seg.a];
        for m in &meanders {
            points.extend(m.points.iter().copied());
        }
        points.push(seg.b);
        let width = seed.width().unwrap_or(0);
        let line = Line::new(LineChain::from_points(&points), width, seed.layer(), seed.net);
        let mut added = Vec::new();
        for (i, item) in line.to_items().into_iter().enumerate() {
            let item = match (i, seed.host) {
                (0, Some(host)) => item.with_host(host),
                _ => item,
            };
            added.push(node.add(item));
        }

        let mut tuned: ItemSet = base_items.iter().filter(|i| i.id() != Some(seed_id)).cloned().collect();
        for id in added {
            if let Some(item) = node.lookup(id) {
                tuned.add(item.clone());
            }
        }
        self.length = self.path_length(&tuned, iface);
        self.status = self.classify(self.length);
        self.meanders = meanders;
        self.current = node;
        debug!(length = self.length, status = ?self.status, meanders = self.meanders.len(), "meanders laid");
    }

    fn classify(&self, length: i64) -> TuningStatus {
        let target = self.target;
        let tolerance = self.settings.length_tolerance;
        let (min, max) = match (target.min, target.max, target.opt) {
            (None, None, Some(opt)) => (Some(opt - tolerance), Some(opt + tolerance)),
            (min, max, _) => (min, max),
        };
        if min.is_some_and(|m| length < m) {
            TuningStatus::TooShort
        } else if max.is_some_and(|m| length > m) {
            TuningStatus::TooLong
        } else {
            TuningStatus::Tuned
        }
    }

    pub fn tuning_info(&self) -> TuningInfo {
        let (value, target) = match self.mode {
            TuningMode::Single => (self.length, self.target),
            TuningMode::DiffPairSkew => {
                let unshift = |v: Option<i64>| v.map(|t| t - self.coupled_length);
                let t = self.target;
                (self.length - self.coupled_length, MinOptMax { min: unshift(t.min), opt: unshift(t.opt), max: unshift(t.max) })
            }
        };
        TuningInfo { status: self.status, value, target }
    }
}

impl PlacementAlgo for MeanderPlacer {
    fn start(&mut self, pos: Point, start_item: Option<&Rc<Item>>, iface: &dyn RouterInterface) -> Result<()> {
        let seed = start_item.filter(|i| i.as_segment().is_some()).ok_or(RouterError::NothingToTune)?;
        if self.mode == TuningMode::DiffPairSkew {
            self.coupled_length = self.coupled_path_length(seed, iface)?;
        }
        let path = self
            .topology()
            .assemble_trivial_path(seed, self.routing.follow_locked_segments)
            .ok_or(RouterError::NothingToTune)?;

        self.seed = Some(seed.clone());
        self.path = Some(path);
        self.target = self.resolve_target(seed, iface);
        self.start_pos = pos;
        self.last_pos = pos;
        debug!(mode = ?self.mode, target = ?self.target, "tuning started");
        self.relay(iface);
        Ok(())
    }

    fn move_to(&mut self, pos: Point, iface: &dyn RouterInterface) -> bool {
        self.last_pos = pos;
        self.relay(iface);
        true
    }

    fn fix_route(&mut self, pos: Point, _end_item: Option<&Rc<Item>>, _force: bool, iface: &dyn RouterInterface) -> bool {
        self.move_to(pos, iface);
        true
    }

    fn commit_placement(&mut self) -> Option<Node> {
        if self.meanders.is_empty() {
            return None;
        }
        self.meanders.clear();
        Some(self.current.clone())
    }

    fn has_placed_anything(&self) -> bool {
        !self.meanders.is_empty()
    }

    fn current_node(&self) -> &Node {
        &self.current
    }

    fn traces(&self) -> ItemSet {
        self.current.delta().added.into_iter().collect()
    }

    fn current_end(&self) -> Point {
        self.last_pos
    }

    fn current_nets(&self) -> Vec<Option<NetId>> {
        vec![self.seed.as_ref().and_then(|s| s.net)]
    }

    fn current_layer(&self) -> i32 {
        self.seed.as_ref().map_or(0, |s| s.layer())
    }

    fn amplitude_step(&mut self, dir: i32, iface: &dyn RouterInterface) -> bool {
        // a step that would leave the range is refused rather than clamped, so
        // stepping back always lands on the same grid
        let next = self.amplitude + dir.signum() as i64 * self.settings.step;
        if next == self.amplitude || !(self.settings.min_amplitude..=self.settings.max_amplitude).contains(&next) {
            return false;
        }
        self.amplitude = next;
        self.relay(iface);
        true
    }

    fn spacing_step(&mut self, dir: i32, iface: &dyn RouterInterface) -> bool {
        let min_spacing = 2 * self.seed.as_ref().and_then(|s| s.width()).unwrap_or(0);
        let next = self.spacing + dir.signum() as i64 * self.settings.step;
        if next == self.spacing || next < min_spacing {
            return false;
        }
        self.spacing = next;
        self.relay(iface);
        true
    }

    fn tuning(&self) -> Option<TuningInfo> {
        Some(self.tuning_info())
    }
}
