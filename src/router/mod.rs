//! Interactive router
//!
//! `Router` is an explicit state machine. The host feeds it `RouterEvent`s
//! (or calls the matching methods directly) and gets a `RouterAction` back.
//! Each gesture runs one placement or drag algorithm on its own branch of the
//! world; only a finished gesture is committed, first to the host through
//! `RouterInterface` and then into the root node.
//!
//! # Submodules
//! - `settings` - Routing, meander and size settings plus `RouterConfig`
//! - `error` - `RouterError`
//! - `iface` - Host interface consumed by the router
//! - `algo` - `PlacementAlgo`, the surface shared by all algorithms
//! - `shove` - Pushing foreign tracks aside
//! - `line_placer` - Single track placement
//! - `diff_pair_placer` - Coupled pair placement
//! - `meander` - Length and skew tuning
//! - `dragger` - Segment, corner and via drag
//! - `component_dragger` - Rigid component drag

pub mod settings;
pub mod error;
pub mod iface;
pub mod algo;
pub mod shove;
pub mod line_placer;
pub mod diff_pair_placer;
pub mod meander;
pub mod dragger;
pub mod component_dragger;

pub use algo::PlacementAlgo;
pub use component_dragger::ComponentDragger;
pub use diff_pair_placer::DiffPairPlacer;
pub use dragger::{DragMode, Dragger};
pub use error::{Result, RouterError};
pub use iface::RouterInterface;
pub use line_placer::LinePlacer;
pub use meander::{MeanderPlacer, TuningInfo, TuningMode, TuningStatus};
pub use settings::{CornerStyle, MeanderSettings, PnsMode, RouterConfig, RoutingSettings, SizesSettings};

use crate::geometry::{Point, Seg};
use crate::item::{HostRef, Item, ItemKind, ItemSet, Marker, NetId};
use crate::node::Node;
use crate::rules::{ConstraintKind, MemoizedRuleResolver, RuleResolver};
use crate::topology::Topology;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::rc::Rc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterState {
    Idle,
    RouteTrack,
    DragSegment,
    DragComponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RouterMode {
    #[default]
    RouteSingle,
    RouteDiffPair,
    TuneSingle,
    TuneDiffPairSkew,
}

impl RouterMode {
    fn is_tuning(self) -> bool {
        matches!(self, RouterMode::TuneSingle | RouterMode::TuneDiffPairSkew)
    }
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RouterEvent {
    StartRouting { pos: Point, layer: i32 },
    StartDrag { pos: Point, layer: i32 },
    Move { pos: Point },
    Fix { pos: Point, force: bool },
    Undo,
    Cancel,
    ToggleVia,
    SwitchLayer { layer: i32 },
    FlipPosture,
    AmplitudeStep { dir: i32 },
    SpacingStep { dir: i32 },
    SetMode { mode: RouterMode },
}

/// What the host should do after an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RouterAction {
    /// Nothing changed
    None,
    /// The preview changed; redraw
    Updated,
    /// A gesture finished and its result was committed
    Committed,
    /// The gesture was dropped without touching the board
    Cancelled,
    /// The event was refused; the text says why
    Rejected(String),
}

pub struct Router<I: RouterInterface> {
    iface: I,
    config: RouterConfig,
    resolver: Rc<dyn RuleResolver>,
    world: Node,
    state: RouterState,
    mode: RouterMode,
    layer: i32,
    sizes: SizesSettings,
    algo: Option<Box<dyn PlacementAlgo>>,
    failure_reason: Option<String>,
}

impl<I: RouterInterface> Router<I> {
    /// Router over the rules in `config`, with the world synchronized from `iface`
    pub fn new(iface: I, config: RouterConfig) -> Self {
        let resolver: Rc<dyn RuleResolver> = Rc::new(MemoizedRuleResolver::new(config.rules.clone()));
        let mut router = Self {
            iface,
            sizes: config.sizes.clone(),
            config,
            world: Node::new(resolver.clone()),
            resolver,
            state: RouterState::Idle,
            mode: RouterMode::RouteSingle,
            layer: 0,
            algo: None,
            failure_reason: None,
        };
        router.sync_world();
        router
    }

    pub fn state(&self) -> RouterState {
        self.state
    }

    pub fn mode(&self) -> RouterMode {
        self.mode
    }

    pub fn layer(&self) -> i32 {
        self.layer
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn sizes(&self) -> &SizesSettings {
        &self.sizes
    }

    /// Why the last start was refused
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn world(&self) -> &Node {
        &self.world
    }

    pub fn iface(&self) -> &I {
        &self.iface
    }

    pub fn iface_mut(&mut self) -> &mut I {
        &mut self.iface
    }

    /// The world as the running gesture sees it
    pub fn current_node(&self) -> &Node {
        match &self.algo {
            Some(algo) => algo.current_node(),
            None => &self.world,
        }
    }

    pub fn traces(&self) -> ItemSet {
        self.algo.as_ref().map(|a| a.traces()).unwrap_or_default()
    }

    pub fn violations(&self) -> ItemSet {
        self.algo.as_ref().map(|a| a.violations()).unwrap_or_default()
    }

    pub fn tuning(&self) -> Option<TuningInfo> {
        self.algo.as_ref().and_then(|a| a.tuning())
    }

    pub fn is_placing_via(&self) -> bool {
        self.algo.as_ref().is_some_and(|a| a.is_placing_via())
    }

    /// Rebuild the world from the host. Refused while a gesture is running.
    pub fn sync_world(&mut self) -> bool {
        if self.state != RouterState::Idle {
            return false;
        }
        self.world.clear();
        self.iface.sync_world(&mut self.world);
        self.resolver.clear_temporary_caches();
        info!(items = self.world.item_count(), "world synchronized");
        true
    }

    pub fn set_mode(&mut self, mode: RouterMode) -> Result<()> {
        if self.state != RouterState::Idle {
            return Err(RouterError::Busy("a gesture is in progress"));
        }
        self.mode = mode;
        debug!(?mode, "router mode set");
        Ok(())
    }

    /// Items under `pos` on `layer`, keepouts included
    fn hits(&self, pos: Point, layer: i32) -> Vec<Rc<Item>> {
        let mut hits = self.world.hit_test(pos, layer).into_vec();
        hits.retain(|i| !i.is_hole());
        hits
    }

    /// Preferred item under the cursor for starting a gesture
    fn pick(hits: &[Rc<Item>], order: &[ItemKind]) -> Option<Rc<Item>> {
        order.iter().find_map(|kind| {
            hits.iter()
                .filter(|i| i.kind() == *kind && i.is_routable())
                .min_by_key(|i| (i.net.is_none(), i.id()))
                .cloned()
        })
    }

    fn fail(&mut self, err: RouterError) -> RouterError {
        warn!(%err, "router start refused");
        self.failure_reason = Some(err.to_string());
        err
    }

    /// Sizes for a route starting on `start`: the host's choice, else the rules
    fn resolve_sizes(&self, start: Option<&Item>, net: Option<NetId>, pos: Point, layer: i32) -> SizesSettings {
        let mut sizes = self.config.sizes.clone();
        if self.iface.import_sizes(&mut sizes, start, net, pos) {
            return sizes;
        }
        let probe = Item::segment(Seg::new(pos, pos), sizes.track_width, layer, net);
        let opt = |kind| self.resolver.query_constraint(kind, &probe, None, layer).and_then(|c| c.value.opt);
        if let Some(w) = opt(ConstraintKind::Width) {
            sizes.track_width = w;
        }
        if let Some(d) = opt(ConstraintKind::ViaDiameter) {
            sizes.via_diameter = d;
        }
        if let Some(d) = opt(ConstraintKind::ViaHole) {
            sizes.via_drill = d;
        }
        if let Some(w) = opt(ConstraintKind::DiffPairWidth) {
            sizes.diff_pair_width = w;
        }
        if let Some(g) = opt(ConstraintKind::DiffPairGap) {
            sizes.diff_pair_gap = g;
        }
        sizes
    }

    pub fn start_routing(&mut self, pos: Point, layer: i32) -> Result<()> {
        if self.state != RouterState::Idle {
            return Err(RouterError::Busy("already routing"));
        }
        self.failure_reason = None;
        self.resolver.clear_temporary_caches();

        let hits = self.hits(pos, layer);
        if !self.mode.is_tuning() && hits.iter().any(|i| i.as_solid().is_some_and(|s| s.forbids_tracks())) {
            return Err(self.fail(RouterError::InsideKeepout));
        }
        let order: &[ItemKind] = if self.mode.is_tuning() {
            &[ItemKind::Segment, ItemKind::Arc]
        } else {
            &[ItemKind::Via, ItemKind::Solid, ItemKind::Segment, ItemKind::Arc]
        };
        let start = Self::pick(&hits, order);
        if start.is_none() && hits.iter().any(|i| i.is_copper() && !i.is_routable()) {
            return Err(self.fail(RouterError::NotRoutable));
        }

        let net = start.as_ref().and_then(|i| i.net);
        self.sizes = self.resolve_sizes(start.as_deref(), net, pos, layer);
        self.layer = layer;

        let routing = self.config.routing.clone();
        let mut algo: Box<dyn PlacementAlgo> = match self.mode {
            RouterMode::RouteSingle => Box::new(LinePlacer::new(&self.world, routing, self.sizes.clone(), layer)),
            RouterMode::RouteDiffPair => Box::new(DiffPairPlacer::new(&self.world, routing, self.sizes.clone(), layer)),
            RouterMode::TuneSingle => {
                Box::new(MeanderPlacer::new(&self.world, TuningMode::Single, self.config.meander.clone(), routing))
            }
            RouterMode::TuneDiffPairSkew => {
                Box::new(MeanderPlacer::new(&self.world, TuningMode::DiffPairSkew, self.config.meander.clone(), routing))
            }
        };
        if let Err(err) = algo.start(pos, start.as_ref(), &self.iface) {
            return Err(self.fail(err));
        }
        self.algo = Some(algo);
        self.state = RouterState::RouteTrack;
        info!(mode = ?self.mode, ?net, layer, "routing started");
        Ok(())
    }

    pub fn start_dragging(&mut self, pos: Point, layer: i32) -> Result<()> {
        if self.state != RouterState::Idle {
            return Err(RouterError::Busy("already routing"));
        }
        self.failure_reason = None;
        let hits = self.hits(pos, layer);
        let item = Self::pick(&hits, &[ItemKind::Via, ItemKind::Segment, ItemKind::Arc, ItemKind::Solid]);
        let Some(item) = item else {
            return Err(self.fail(RouterError::NotDraggable));
        };

        let component = item.as_solid().is_some_and(|s| s.component.is_some());
        let routing = self.config.routing.clone();
        let (mut algo, state): (Box<dyn PlacementAlgo>, RouterState) = if component {
            (Box::new(ComponentDragger::new(&self.world, routing)), RouterState::DragComponent)
        } else {
            (Box::new(Dragger::new(&self.world, routing)), RouterState::DragSegment)
        };
        if let Err(err) = algo.start(pos, Some(&item), &self.iface) {
            return Err(self.fail(err));
        }
        self.algo = Some(algo);
        self.state = state;
        self.layer = layer;
        info!(?state, item = ?item.id(), "drag started");
        Ok(())
    }

    /// Follow the cursor. Never fails; does nothing while idle.
    pub fn move_to(&mut self, pos: Point) -> bool {
        self.resolver.clear_temporary_caches();
        let Some(algo) = self.algo.as_mut() else {
            return false;
        };
        algo.move_to(pos, &self.iface);
        self.update_view();
        true
    }

    fn update_view(&mut self) {
        let Some(algo) = self.algo.as_ref() else {
            return;
        };
        self.iface.erase_view();
        for item in algo.traces().iter() {
            self.iface.display_item(item, 0);
        }
        for item in algo.violations().iter() {
            self.iface.display_item(item, -1);
        }
        if let Some(head) = algo.head() {
            if let Some(ratline) = Topology::new(algo.current_node()).leading_ratline(head) {
                self.iface.display_ratline(&ratline, head.net());
            }
        }
    }

    /// Item of one of the routed nets under `pos`, for deciding whether a fix ends the route
    fn end_item(&self, pos: Point) -> Option<Rc<Item>> {
        let algo = self.algo.as_ref()?;
        let nets = algo.current_nets();
        let layer = algo.current_layer();
        algo.current_node()
            .hit_test(pos, layer)
            .into_vec()
            .into_iter()
            .filter(|i| i.net.is_some() && nets.contains(&i.net) && i.is_routable())
            .filter(|i| !i.marker.contains(Marker::HEAD))
            .min_by_key(|i| i.id())
    }

    /// Fix the current leg. True once the gesture is complete and committed.
    pub fn fix_route(&mut self, pos: Point, force: bool) -> bool {
        let end_item = self.end_item(pos);
        let Some(algo) = self.algo.as_mut() else {
            return false;
        };
        let done = algo.fix_route(pos, end_item.as_ref(), force, &self.iface);
        debug!(done, force, "route fixed");
        if done {
            self.commit_routing();
            return true;
        }
        self.update_view();
        false
    }

    /// Push whatever the running gesture has placed to the host and the
    /// world, then go idle
    pub fn commit_routing(&mut self) {
        let placed = self.algo.as_mut().and_then(|algo| algo.commit_placement());
        match placed {
            Some(branch) => self.commit_node(branch),
            None => debug!("nothing to commit"),
        }
        self.stop_routing();
    }

    fn commit_node(&mut self, mut branch: Node) {
        let delta = branch.delta();
        if delta.is_empty() {
            return;
        }
        // a host ref on both sides of the delta is an in-place update
        let replaced: HashSet<HostRef> = delta.removed.iter().filter_map(|i| i.host).collect();
        let mut updated = 0;
        for item in &delta.added {
            match item.host.filter(|h| replaced.contains(h)) {
                Some(_) => {
                    self.iface.update_item(item);
                    updated += 1;
                }
                None => {
                    if let (Some(host), Some(id)) = (self.iface.add_item(item), item.id()) {
                        branch.assign_host(id, host);
                    }
                }
            }
        }
        let added_hosts: HashSet<HostRef> = delta.added.iter().filter_map(|i| i.host).collect();
        for item in &delta.removed {
            if item.host.is_some_and(|h| added_hosts.contains(&h)) {
                continue;
            }
            self.iface.remove_item(item);
        }
        // the algorithm's branches must be gone before the root store is touched
        self.algo = None;
        self.world.commit(branch);
        self.iface.commit();
        info!(
            added = delta.added.len().saturating_sub(updated),
            updated,
            removed = delta.removed.len().saturating_sub(updated),
            "committed"
        );
    }

    /// Drop the running gesture without touching the board
    pub fn stop_routing(&mut self) {
        if self.algo.take().is_some() {
            debug!(state = ?self.state, "gesture stopped");
        }
        self.state = RouterState::Idle;
        self.iface.erase_view();
        self.resolver.clear_temporary_caches();
    }

    pub fn undo_last_segment(&mut self) -> bool {
        let Some(algo) = self.algo.as_mut() else {
            return false;
        };
        let undone = algo.unfix_route(&self.iface);
        if undone {
            self.update_view();
        }
        undone
    }

    pub fn toggle_via(&mut self) -> bool {
        let Some(algo) = self.algo.as_mut() else {
            return false;
        };
        let enable = !algo.is_placing_via();
        algo.toggle_via(enable, &self.iface)
    }

    pub fn switch_layer(&mut self, layer: i32) -> bool {
        match self.algo.as_mut() {
            None => {
                self.layer = layer;
                true
            }
            Some(algo) => {
                let switched = algo.set_layer(layer, &self.iface);
                if switched {
                    self.layer = layer;
                }
                switched
            }
        }
    }

    pub fn flip_posture(&mut self) {
        if let Some(algo) = self.algo.as_mut() {
            algo.flip_posture(&self.iface);
        }
    }

    pub fn amplitude_step(&mut self, dir: i32) -> bool {
        self.algo.as_mut().is_some_and(|a| a.amplitude_step(dir, &self.iface))
    }

    pub fn spacing_step(&mut self, dir: i32) -> bool {
        self.algo.as_mut().is_some_and(|a| a.spacing_step(dir, &self.iface))
    }

    pub fn handle_event(&mut self, event: RouterEvent) -> RouterAction {
        let changed = |ok: bool| if ok { RouterAction::Updated } else { RouterAction::None };
        match event {
            RouterEvent::StartRouting { pos, layer } => match self.start_routing(pos, layer) {
                Ok(()) => RouterAction::Updated,
                Err(err) => RouterAction::Rejected(err.to_string()),
            },
            RouterEvent::StartDrag { pos, layer } => match self.start_dragging(pos, layer) {
                Ok(()) => RouterAction::Updated,
                Err(err) => RouterAction::Rejected(err.to_string()),
            },
            RouterEvent::Move { pos } => changed(self.move_to(pos)),
            RouterEvent::Fix { pos, force } => {
                if self.state == RouterState::Idle {
                    RouterAction::None
                } else if self.fix_route(pos, force) {
                    RouterAction::Committed
                } else {
                    RouterAction::Updated
                }
            }
            RouterEvent::Undo => changed(self.undo_last_segment()),
            RouterEvent::Cancel => {
                if self.state == RouterState::Idle {
                    return RouterAction::None;
                }
                self.stop_routing();
                RouterAction::Cancelled
            }
            RouterEvent::ToggleVia => changed(self.toggle_via()),
            RouterEvent::SwitchLayer { layer } => changed(self.switch_layer(layer)),
            RouterEvent::FlipPosture => {
                self.flip_posture();
                changed(self.state != RouterState::Idle)
            }
            RouterEvent::AmplitudeStep { dir } => changed(self.amplitude_step(dir)),
            RouterEvent::SpacingStep { dir } => changed(self.spacing_step(dir)),
            RouterEvent::SetMode { mode } => match self.set_mode(mode) {
                Ok(()) => RouterAction::None,
                Err(err) => RouterAction::Rejected(err.to_string()),
            },
        }
    }
}
