//! Headless host
//!
//! Keeps the board as a map from host reference to item and applies the
//! router's add/update/remove calls to it. Each `commit` closes one undo
//! step. Display calls are collected into a preview that the server hands
//! to its client.

use super::board::BoardDescription;
use crate::geometry::LineChain;
use crate::item::{HostRef, Item, Marker, NetId};
use crate::node::Node;
use crate::router::RouterInterface;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

/// One board edit, as needed to undo it
#[derive(Debug, Clone)]
enum BoardChange {
    Added(HostRef),
    Updated(Item),
    Removed(Item),
}

/// What the router asked the host to draw since the last erase
#[derive(Debug, Clone, Default, Serialize)]
pub struct Preview {
    pub items: Vec<Item>,
    pub violations: Vec<Item>,
    pub ratline: Option<Vec<[i64; 2]>>,
}

pub struct HeadlessHost {
    layers: Vec<String>,
    board: IndexMap<HostRef, Item>,
    next_host: u64,
    pending: Vec<BoardChange>,
    undo_stack: Vec<Vec<BoardChange>>,
    preview: Preview,
}

impl HeadlessHost {
    pub fn new(description: &BoardDescription) -> Self {
        let mut board = IndexMap::new();
        for item in &description.items {
            if let Some(host) = item.host {
                board.insert(host, item.detached());
            }
        }
        let next_host = board.keys().map(|h| h.0 + 1).max().unwrap_or(1);
        Self {
            layers: description.layers.clone(),
            board,
            next_host,
            pending: Vec::new(),
            undo_stack: Vec::new(),
            preview: Preview::default(),
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.board.values()
    }

    pub fn item(&self, host: HostRef) -> Option<&Item> {
        self.board.get(&host)
    }

    pub fn item_count(&self) -> usize {
        self.board.len()
    }

    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    /// Number of committed edits that can be undone
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    /// Revert the last committed edit. The router must resync afterwards.
    pub fn undo(&mut self) -> bool {
        let Some(changes) = self.undo_stack.pop() else {
            return false;
        };
        for change in changes.into_iter().rev() {
            match change {
                BoardChange::Added(host) => {
                    self.board.shift_remove(&host);
                }
                BoardChange::Updated(old) | BoardChange::Removed(old) => {
                    if let Some(host) = old.host {
                        self.board.insert(host, old);
                    }
                }
            }
        }
        debug!(remaining = self.undo_stack.len(), "board edit undone");
        true
    }

    /// Current board as a description, e.g. for saving
    pub fn describe(&self, config: &crate::router::RouterConfig) -> BoardDescription {
        BoardDescription { layers: self.layers.clone(), config: config.clone(), items: self.board.values().cloned().collect() }
    }
}

impl RouterInterface for HeadlessHost {
    fn sync_world(&mut self, world: &mut Node) {
        for item in self.board.values() {
            world.add(item.clone());
        }
        debug!(items = self.board.len(), "world populated from board");
    }

    fn add_item(&mut self, item: &Item) -> Option<HostRef> {
        let host = HostRef(self.next_host);
        self.next_host += 1;
        let mut stored = item.detached();
        stored.host = Some(host);
        stored.marker.remove(Marker::HEAD | Marker::VIOLATION);
        self.board.insert(host, stored);
        self.pending.push(BoardChange::Added(host));
        Some(host)
    }

    fn update_item(&mut self, item: &Item) {
        let Some(host) = item.host else {
            return;
        };
        let mut stored = item.detached();
        stored.marker.remove(Marker::HEAD | Marker::VIOLATION);
        if let Some(old) = self.board.insert(host, stored) {
            self.pending.push(BoardChange::Updated(old));
        }
    }

    fn remove_item(&mut self, item: &Item) {
        let Some(host) = item.host else {
            return;
        };
        if let Some(old) = self.board.shift_remove(&host) {
            self.pending.push(BoardChange::Removed(old));
        }
    }

    fn commit(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let changes = std::mem::take(&mut self.pending);
        debug!(changes = changes.len(), "board edit committed");
        self.undo_stack.push(changes);
    }

    fn board_layer_from_pns(&self, layer: i32) -> Option<String> {
        usize::try_from(layer).ok().and_then(|i| self.layers.get(i)).cloned()
    }

    fn pns_layer_from_board(&self, layer: &str) -> Option<i32> {
        self.layers.iter().position(|l| l == layer).map(|i| i as i32)
    }

    fn display_item(&mut self, item: &Item, clearance: i64) {
        if clearance < 0 {
            self.preview.violations.push(item.clone());
        } else {
            self.preview.items.push(item.clone());
        }
    }

    fn display_ratline(&mut self, ratline: &LineChain, _net: Option<NetId>) {
        self.preview.ratline = Some(ratline.points().iter().map(|p| p.to_array()).collect());
    }

    fn erase_view(&mut self) {
        self.preview = Preview::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Seg};

    fn host() -> HeadlessHost {
        let track = Item::segment(Seg::new(Point::new(0, 0), Point::new(1_000_000, 0)), 200_000, 0, Some(NetId(1)))
            .with_host(HostRef(1));
        HeadlessHost::new(&BoardDescription { layers: vec!["F.Cu".into(), "B.Cu".into()], items: vec![track], ..Default::default() })
    }

    #[test]
    fn test_commit_batches_undo_as_one_step() {
        let mut h = host();
        let original = h.item(HostRef(1)).cloned().unwrap();
        let added = h.add_item(&Item::segment(Seg::new(Point::new(0, 0), Point::new(0, 500_000)), 200_000, 0, Some(NetId(1))));
        assert_eq!(added, Some(HostRef(2)));
        let moved = Item::segment(Seg::new(Point::new(0, 0), Point::new(2_000_000, 0)), 200_000, 0, Some(NetId(1)))
            .with_host(HostRef(1));
        h.update_item(&moved);
        h.commit();
        assert_eq!(h.item_count(), 2);
        assert_eq!(h.undo_depth(), 1);

        assert!(h.undo());
        assert_eq!(h.item_count(), 1);
        assert_eq!(h.item(HostRef(1)), Some(&original));
        assert!(!h.undo());
    }

    #[test]
    fn test_layer_mapping() {
        let h = host();
        assert_eq!(h.board_layer_from_pns(1).as_deref(), Some("B.Cu"));
        assert_eq!(h.board_layer_from_pns(2), None);
        assert_eq!(h.pns_layer_from_board("F.Cu"), Some(0));
    }
}
