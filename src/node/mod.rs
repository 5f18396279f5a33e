//! Branchable snapshot of the routable world
//!
//! The root node owns the synchronized board. `branch()` produces a child that
//! sees the same content and records its own additions and removals in a small
//! overlay on top of the root's shared store, so mutating the child never
//! touches the parent. Committing a child hands its overlay to the parent; for
//! the root this folds the delta into the shared store.
//!
//! Branches of branches copy their parent's overlay, so every overlay is
//! relative to the root and a parent must stay untouched while it has live
//! children.
//!
//! # Submodules
//! - `store` - Item map plus R-tree
//! - `joints` - Copy-on-write joint table
//! - `collision` - Clearance-aware collision queries
//! - `assemble` - Line assembly from linked segments

mod store;
mod joints;
mod collision;
mod assemble;

pub use collision::{CollisionOptions, LineObstacle, Obstacle};

use crate::geometry::{BoundingBox, Point};
use crate::item::{
    HostRef, Item, ItemId, ItemLookup, ItemSet, Joint, JointLink, JointTag, LayerRange, Line, NetId,
};
use crate::rules::RuleResolver;
use indexmap::IndexSet;
use joints::JointTable;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use store::ItemStore;
use tracing::debug;

/// Net effect of a branch relative to the root
#[derive(Debug, Clone, Default)]
pub struct NodeDelta {
    pub removed: Vec<Rc<Item>>,
    pub added: Vec<Rc<Item>>,
}

impl NodeDelta {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

#[derive(Clone)]
pub struct Node {
    depth: usize,
    base: Rc<ItemStore>,
    local: ItemStore,
    overridden: IndexSet<ItemId>,
    removed_base: Vec<Rc<Item>>,
    joints: JointTable,
    next_id: Rc<Cell<u32>>,
    resolver: Rc<dyn RuleResolver>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("depth", &self.depth)
            .field("items", &self.item_count())
            .field("local", &self.local.len())
            .field("overridden", &self.overridden.len())
            .finish()
    }
}

impl Node {
    /// Empty root node
    pub fn new(resolver: Rc<dyn RuleResolver>) -> Self {
        Self {
            depth: 0,
            base: Rc::new(ItemStore::default()),
            local: ItemStore::default(),
            overridden: IndexSet::new(),
            removed_base: Vec::new(),
            joints: JointTable::default(),
            next_id: Rc::new(Cell::new(1)),
            resolver,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    pub fn resolver(&self) -> &Rc<dyn RuleResolver> {
        &self.resolver
    }

    /// Child node with identical visible content and isolated mutation
    pub fn branch(&self) -> Node {
        let mut child = self.clone();
        child.depth = self.depth + 1;
        child
    }

    fn alloc_id(&self) -> ItemId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        ItemId(id)
    }

    fn link_joints(&mut self, id: ItemId, item: &Item) {
        if item.is_hole() {
            return;
        }
        let root = self.is_root();
        let link = JointLink::from_item(id, item);
        for pos in item.anchors() {
            self.joints.link(pos, item.net, link, root);
        }
    }

    fn unlink_joints(&mut self, id: ItemId, item: &Item) {
        let root = self.is_root();
        for pos in item.anchors() {
            self.joints.unlink(pos, item.net, id, root);
        }
    }

    /// Store `item` under a fresh id
    pub fn add(&mut self, item: Item) -> ItemId {
        let id = self.alloc_id();
        let mut item = item;
        item.set_id(id);
        self.link_joints(id, &item);
        let item = Rc::new(item);
        if self.is_root() {
            Rc::make_mut(&mut self.base).insert(id, item);
        } else {
            self.local.insert(id, item);
        }
        id
    }

    /// Add every piece of `line`, reusing identical segments already present,
    /// and record the resulting links on the line
    pub fn add_line(&mut self, line: &mut Line) {
        let mut links = Vec::new();
        for item in line.to_items() {
            let existing = match item.as_segment() {
                Some(s) => self.find_redundant_segment(s.seg.a, s.seg.b, s.width, item.layer(), item.net),
                None => None,
            };
            let id = match existing {
                Some(id) => id,
                None => self.add(item),
            };
            links.push(id);
        }
        line.set_links(links);
    }

    pub fn remove(&mut self, id: ItemId) -> Option<Rc<Item>> {
        let item = if let Some(item) = self.local.remove(id) {
            item
        } else if self.is_root() {
            Rc::make_mut(&mut self.base).remove(id)?
        } else if self.base.contains(id) && !self.overridden.contains(&id) {
            self.overridden.insert(id);
            let item = self.base.get(id)?.clone();
            self.removed_base.push(item.clone());
            item
        } else {
            return None;
        };
        self.unlink_joints(id, &item);
        self.resolver.clear_cache_for_item(id);
        Some(item)
    }

    pub fn remove_line(&mut self, line: &Line) {
        for &id in line.links() {
            self.remove(id);
        }
    }

    /// Swap `old` for `new`, carrying the host reference over
    pub fn replace(&mut self, old: ItemId, new: Item) -> ItemId {
        let host = self.remove(old).and_then(|o| o.host);
        let mut new = new.detached();
        if new.host.is_none() {
            new.host = host;
        }
        self.add(new)
    }

    /// Record the host object created for an item this node added. Root items
    /// are updated in place; a branch can only touch its own additions.
    pub fn assign_host(&mut self, id: ItemId, host: HostRef) -> bool {
        let slot = if self.is_root() {
            Rc::make_mut(&mut self.base).get_mut(id)
        } else {
            self.local.get_mut(id)
        };
        match slot {
            Some(item) => {
                Rc::make_mut(item).host = Some(host);
                true
            }
            None => false,
        }
    }

    pub fn replace_line(&mut self, old: &Line, new: &mut Line) {
        self.remove_line(old);
        self.add_line(new);
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.lookup(id).is_some()
    }

    /// Every visible item, root items first in insertion order
    pub fn items(&self) -> impl Iterator<Item = &Rc<Item>> {
        self.base
            .iter()
            .filter(|(id, _)| !self.overridden.contains(*id))
            .chain(self.local.iter())
            .map(|(_, item)| item)
    }

    pub fn item_count(&self) -> usize {
        self.base.len() - self.overridden.len() + self.local.len()
    }

    /// Ids of items whose bounding boxes touch `area` on `layers`
    pub fn query_area(&self, area: &BoundingBox, layers: LayerRange) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self
            .base
            .query(area, layers)
            .into_iter()
            .filter(|id| !self.overridden.contains(id))
            .chain(self.local.query(area, layers))
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn find_joint(&self, pos: Point, layer: i32, net: Option<NetId>) -> Option<&Joint> {
        self.joints.at(&JointTag { pos, net }).iter().find(|j| j.layers().contains(layer))
    }

    /// Joint at `pos` that `item` is (or would be) linked to
    pub fn find_joint_for(&self, pos: Point, item: &Item) -> Option<&Joint> {
        let joints = self.joints.at(&JointTag { pos, net: item.net });
        match item.id() {
            Some(id) => joints.iter().find(|j| j.contains(id)),
            None => joints.iter().find(|j| j.layers().overlaps(&item.layers)),
        }
    }

    pub fn joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter()
    }

    /// Lock or unlock the joint at `pos`
    pub fn lock_joint(&mut self, pos: Point, layer: i32, net: Option<NetId>, locked: bool) -> bool {
        let root = self.is_root();
        match self.joints.find_mut(JointTag { pos, net }, layer, root) {
            Some(jt) => {
                jt.set_locked(locked);
                true
            }
            None => false,
        }
    }

    pub fn find_by_host(&self, host: HostRef) -> Option<&Rc<Item>> {
        self.items().find(|i| i.host == Some(host))
    }

    pub fn all_items_in_net(&self, net: Option<NetId>) -> ItemSet {
        self.items().filter(|i| i.net == net).cloned().collect()
    }

    /// Items whose copper covers `p` on `layer`
    pub fn hit_test(&self, p: Point, layer: i32) -> ItemSet {
        let area = BoundingBox::from_point(p);
        self.query_area(&area, LayerRange::single(layer))
            .into_iter()
            .filter_map(|id| self.lookup(id))
            .filter(|item| item.shape_on(layer).contains_point(p))
            .cloned()
            .collect()
    }

    /// Items added and removed by this branch relative to the root
    pub fn delta(&self) -> NodeDelta {
        NodeDelta {
            removed: self.removed_base.clone(),
            added: self.local.iter().map(|(_, item)| item.clone()).collect(),
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.overridden.is_empty() || !self.local.is_empty()
    }

    /// Absorb a child's changes. The child must be a branch of `self`.
    pub fn commit(&mut self, child: Node) {
        if self.is_root() {
            let Node { base: shared, local, overridden, joints, .. } = child;
            drop(shared);
            let base = Rc::make_mut(&mut self.base);
            for id in &overridden {
                base.remove(*id);
            }
            for (id, item) in local.iter() {
                base.insert(*id, item.clone());
            }
            self.joints.absorb(joints, true);
            debug!(added = local.len(), removed = overridden.len(), "committed branch into root");
        } else {
            self.local = child.local;
            self.overridden = child.overridden;
            self.removed_base = child.removed_base;
            self.joints.absorb(child.joints, false);
        }
    }

    /// Drop every item and joint; the id counter keeps running
    pub fn clear(&mut self) {
        self.base = Rc::new(ItemStore::default());
        self.local.clear();
        self.overridden.clear();
        self.removed_base.clear();
        self.joints = JointTable::default();
    }

    pub fn local_joint_count(&self) -> usize {
        self.joints.local_len()
    }
}

impl ItemLookup for Node {
    fn lookup(&self, id: ItemId) -> Option<&Rc<Item>> {
        if let Some(item) = self.local.get(id) {
            return Some(item);
        }
        if self.overridden.contains(&id) {
            return None;
        }
        self.base.get(id)
    }
}

impl Node {
    pub fn lookup(&self, id: ItemId) -> Option<&Rc<Item>> {
        ItemLookup::lookup(self, id)
    }
}
