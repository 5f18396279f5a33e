//! Item storage with an attached spatial index

use crate::geometry::{BoundingBox, IndexedItem, SpatialIndex};
use crate::item::{Item, ItemId, LayerRange};
use indexmap::IndexMap;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub(crate) struct ItemStore {
    items: IndexMap<ItemId, Rc<Item>>,
    index: SpatialIndex,
}

fn index_entry(id: ItemId, item: &Item) -> IndexedItem {
    IndexedItem::new(id, item.layers, &item.bbox())
}

impl ItemStore {
    /// Insert an item that already carries its id
    pub fn insert(&mut self, id: ItemId, item: Rc<Item>) {
        self.index.insert(index_entry(id, &item));
        self.items.insert(id, item);
    }

    pub fn remove(&mut self, id: ItemId) -> Option<Rc<Item>> {
        let item = self.items.shift_remove(&id)?;
        self.index.remove(&index_entry(id, &item));
        Some(item)
    }

    pub fn get(&self, id: ItemId) -> Option<&Rc<Item>> {
        self.items.get(&id)
    }

    /// Geometry must not change through this reference
    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Rc<Item>> {
        self.items.get_mut(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &Rc<Item>)> {
        self.items.iter()
    }

    pub fn query(&self, area: &BoundingBox, layers: LayerRange) -> Vec<ItemId> {
        self.index.query(area, layers)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index = SpatialIndex::new();
    }
}
