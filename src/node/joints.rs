//! Joint table with copy-on-write overlay
//!
//! The root writes straight into the shared base map. A branch copies a tag's
//! joint list into its local overlay on first write; an empty local list
//! hides the base entry.

use crate::geometry::Point;
use crate::item::{ItemId, Joint, JointLink, JointTag, NetId};
use indexmap::IndexMap;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub(crate) struct JointTable {
    base: Rc<IndexMap<JointTag, Vec<Joint>>>,
    local: IndexMap<JointTag, Vec<Joint>>,
}

impl JointTable {
    pub fn at(&self, tag: &JointTag) -> &[Joint] {
        match self.local.get(tag) {
            Some(list) => list,
            None => self.base.get(tag).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    fn list_mut(&mut self, tag: JointTag, root: bool) -> &mut Vec<Joint> {
        if root {
            Rc::make_mut(&mut self.base).entry(tag).or_default()
        } else {
            let base = &self.base;
            self.local.entry(tag).or_insert_with(|| base.get(&tag).cloned().unwrap_or_default())
        }
    }

    fn prune(&mut self, tag: &JointTag, root: bool) {
        if root {
            let base = Rc::make_mut(&mut self.base);
            if base.get(tag).is_some_and(Vec::is_empty) {
                base.shift_remove(tag);
            }
        }
    }

    /// Link an item at `pos`, merging every joint it bridges
    pub fn link(&mut self, pos: Point, net: Option<NetId>, link: JointLink, root: bool) {
        let tag = JointTag { pos, net };
        let list = self.list_mut(tag, root);
        let mut probe = Joint::new(pos, link.layers, net);
        probe.link(link);

        let (mut hits, rest): (Vec<Joint>, Vec<Joint>) =
            std::mem::take(list).into_iter().partition(|j| j.overlaps(&probe));
        let joint = if hits.is_empty() {
            probe
        } else {
            let mut joint = hits.remove(0);
            joint.merge(&probe);
            for other in &hits {
                joint.merge(other);
            }
            joint
        };
        *list = rest;
        list.push(joint);
    }

    pub fn unlink(&mut self, pos: Point, net: Option<NetId>, id: ItemId, root: bool) {
        let tag = JointTag { pos, net };
        if !self.at(&tag).iter().any(|j| j.contains(id)) {
            return;
        }
        let list = self.list_mut(tag, root);
        if let Some(idx) = list.iter().position(|j| j.contains(id)) {
            let mut joint = list.remove(idx);
            if !joint.unlink(id) {
                list.extend(joint.split_by_layers());
            }
        }
        self.prune(&tag, root);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Joint> {
        let shadowed = self.base.iter().filter(|(tag, _)| !self.local.contains_key(*tag)).flat_map(|(_, v)| v.iter());
        shadowed.chain(self.local.values().flat_map(|v| v.iter()))
    }

    pub fn find_mut(&mut self, tag: JointTag, layer: i32, root: bool) -> Option<&mut Joint> {
        if !self.at(&tag).iter().any(|j| j.layers().contains(layer)) {
            return None;
        }
        self.list_mut(tag, root).iter_mut().find(|j| j.layers().contains(layer))
    }

    /// Take over a child branch's overlay
    pub fn absorb(&mut self, child: JointTable, root: bool) {
        let JointTable { base: shared, local } = child;
        drop(shared);
        if root {
            let base = Rc::make_mut(&mut self.base);
            for (tag, list) in local {
                if list.is_empty() {
                    base.shift_remove(&tag);
                } else {
                    base.insert(tag, list);
                }
            }
        } else {
            self.local = local;
        }
    }

    pub fn local_len(&self) -> usize {
        self.local.len()
    }
}
