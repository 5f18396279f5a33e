//! Common surface of the placement and drag algorithms
//!
//! The router owns exactly one algorithm at a time and drives it through this
//! trait. Every algorithm works on its own branch of the world and hands the
//! final branch back from `commit_placement`; the router alone commits it.

use super::error::Result;
use super::iface::RouterInterface;
use super::meander::TuningInfo;
use crate::geometry::Point;
use crate::item::{Item, ItemSet, Line, NetId};
use crate::node::Node;
use std::rc::Rc;

pub trait PlacementAlgo {
    fn start(&mut self, pos: Point, start_item: Option<&Rc<Item>>, iface: &dyn RouterInterface) -> Result<()>;

    /// Re-evaluate against a new cursor position. Never fails; an infeasible
    /// position degrades to the closest legal (or marked) result.
    fn move_to(&mut self, pos: Point, iface: &dyn RouterInterface) -> bool;

    /// Fix the current leg. Returns true once the whole operation is done.
    fn fix_route(&mut self, pos: Point, end_item: Option<&Rc<Item>>, force: bool, iface: &dyn RouterInterface) -> bool;

    /// Step back to the previously fixed point
    fn unfix_route(&mut self, iface: &dyn RouterInterface) -> bool {
        let _ = iface;
        false
    }

    /// Branch to commit, or `None` when nothing was placed
    fn commit_placement(&mut self) -> Option<Node>;

    fn has_placed_anything(&self) -> bool;

    /// World as the algorithm currently sees it, head included
    fn current_node(&self) -> &Node;

    /// Items created or moved by the algorithm so far
    fn traces(&self) -> ItemSet;

    fn current_end(&self) -> Point;

    fn current_nets(&self) -> Vec<Option<NetId>>;

    fn current_layer(&self) -> i32;

    /// Unfixed head, for ratline display
    fn head(&self) -> Option<&Line> {
        None
    }

    fn toggle_via(&mut self, enabled: bool, iface: &dyn RouterInterface) -> bool {
        let _ = (enabled, iface);
        false
    }

    fn is_placing_via(&self) -> bool {
        false
    }

    fn set_layer(&mut self, layer: i32, iface: &dyn RouterInterface) -> bool {
        let _ = (layer, iface);
        false
    }

    fn flip_posture(&mut self, iface: &dyn RouterInterface) {
        let _ = iface;
    }

    fn amplitude_step(&mut self, dir: i32, iface: &dyn RouterInterface) -> bool {
        let _ = (dir, iface);
        false
    }

    fn spacing_step(&mut self, dir: i32, iface: &dyn RouterInterface) -> bool {
        let _ = (dir, iface);
        false
    }

    /// Violations the current geometry leaves on the board
    fn violations(&self) -> ItemSet {
        ItemSet::new()
    }

    /// Length tuning progress, for tuning algorithms only
    fn tuning(&self) -> Option<TuningInfo> {
        None
    }
}
