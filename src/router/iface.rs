//! Host interface consumed by the router
//!
//! The host owns the persisted board. The router only asks it to populate a
//! fresh world, to materialize committed changes, for default sizes, and for
//! electrical length/delay figures. Display calls are notifications; a
//! headless host leaves them as the default no-ops.

use super::settings::SizesSettings;
use crate::geometry::{LineChain, Point};
use crate::item::{HostRef, Item, ItemSet, NetId};
use crate::node::Node;

/// Propagation delay assumed when the host has no stackup model
pub const DEFAULT_DELAY_PS_PER_MM: f64 = 6.0;

/// Track length of every segment/arc in `items`
pub fn track_length(items: &ItemSet) -> f64 {
    items
        .iter()
        .map(|item| match (item.as_segment(), item.as_arc()) {
            (Some(s), _) => s.seg.length(),
            (_, Some(a)) => a.arc.length(),
            _ => 0.0,
        })
        .sum()
}

pub trait RouterInterface {
    /// Fill an empty root node from the persisted board
    fn sync_world(&mut self, world: &mut Node);

    /// Materialize a new item; returns the host object created for it
    fn add_item(&mut self, item: &Item) -> Option<HostRef>;

    /// Replace the host object `item.host` with the geometry of `item`
    fn update_item(&mut self, item: &Item);

    fn remove_item(&mut self, item: &Item);

    /// Close the current batch of add/update/remove calls as one undo step
    fn commit(&mut self);

    /// Adjust `sizes` for a route starting at `pos` on `start`/`net`
    fn import_sizes(&self, sizes: &mut SizesSettings, start: Option<&Item>, net: Option<NetId>, pos: Point) -> bool {
        let _ = (sizes, start, net, pos);
        false
    }

    fn calculate_routed_path_length(&self, path: &ItemSet, start_pad: Option<&Item>, end_pad: Option<&Item>) -> i64 {
        let _ = (start_pad, end_pad);
        track_length(path).round() as i64
    }

    /// Delay in picoseconds
    fn calculate_routed_path_delay(&self, path: &ItemSet, start_pad: Option<&Item>, end_pad: Option<&Item>) -> i64 {
        let length = self.calculate_routed_path_length(path, start_pad, end_pad);
        (length as f64 / 1_000_000.0 * DEFAULT_DELAY_PS_PER_MM).round() as i64
    }

    /// Track length (nm) matching a delay in picoseconds
    fn calculate_length_for_delay(&self, delay_ps: i64, width: i64, is_diff_pair: bool, net: Option<NetId>) -> i64 {
        let _ = (width, is_diff_pair, net);
        (delay_ps as f64 / DEFAULT_DELAY_PS_PER_MM * 1_000_000.0).round() as i64
    }

    /// Host layer name of a router layer index
    fn board_layer_from_pns(&self, layer: i32) -> Option<String> {
        Some(layer.to_string())
    }

    fn pns_layer_from_board(&self, layer: &str) -> Option<i32> {
        layer.parse().ok()
    }

    fn display_item(&mut self, item: &Item, clearance: i64) {
        let _ = (item, clearance);
    }

    fn display_path_line(&mut self, path: &LineChain, importance: i32) {
        let _ = (path, importance);
    }

    fn display_ratline(&mut self, ratline: &LineChain, net: Option<NetId>) {
        let _ = (ratline, net);
    }

    fn hide_item(&mut self, item: &Item) {
        let _ = item;
    }

    fn erase_view(&mut self) {}
}

/// Host that keeps nothing, for unit tests of the algorithms
#[cfg(test)]
pub(crate) struct NullHost;

#[cfg(test)]
impl RouterInterface for NullHost {
    fn sync_world(&mut self, _world: &mut Node) {}

    fn add_item(&mut self, _item: &Item) -> Option<HostRef> {
        None
    }

    fn update_item(&mut self, _item: &Item) {}

    fn remove_item(&mut self, _item: &Item) {}

    fn commit(&mut self) {}
}
