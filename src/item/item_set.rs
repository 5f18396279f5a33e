//! Ordered, filterable bags of items
//!
//! Entries are shared references to stored items (or fresh items wrapped for
//! the occasion). Order is insertion order, duplicates are kept, and the
//! filters mutate in place and return `&mut Self` so they chain.

use super::{Item, ItemId, KindMask, LayerRange, Line, Marker, NetId};
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct ItemSet {
    items: Vec<Rc<Item>>,
}

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items<I: IntoIterator<Item = Rc<Item>>>(items: I) -> Self {
        Self { items: items.into_iter().collect() }
    }

    /// Owned copies of a temporary line's pieces (plus its end via)
    pub fn from_line(line: &Line) -> Self {
        let mut set = Self::new();
        set.add_line(line);
        set
    }

    pub fn add(&mut self, item: Rc<Item>) {
        self.items.push(item);
    }

    pub fn prepend(&mut self, item: Rc<Item>) {
        self.items.insert(0, item);
    }

    pub fn add_line(&mut self, line: &Line) {
        for item in line.to_items() {
            self.items.push(Rc::new(item));
        }
        if let Some(via) = line.via() {
            self.items.push(Rc::new(via.clone()));
        }
    }

    pub fn prepend_line(&mut self, line: &Line) {
        let mut front: Vec<Rc<Item>> = line.to_items().into_iter().map(Rc::new).collect();
        if let Some(via) = line.via() {
            front.push(Rc::new(via.clone()));
        }
        front.append(&mut self.items);
        self.items = front;
    }

    pub fn extend(&mut self, other: &ItemSet) {
        self.items.extend(other.items.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rc<Item>> {
        self.items.iter()
    }

    pub fn get(&self, i: usize) -> Option<&Rc<Item>> {
        self.items.get(i)
    }

    pub fn first(&self) -> Option<&Rc<Item>> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&Rc<Item>> {
        self.items.last()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.iter().any(|i| i.id() == Some(id))
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().filter_map(|i| i.id()).collect()
    }

    pub fn count(&self, mask: KindMask) -> usize {
        self.items.iter().filter(|i| i.of_kind(mask)).count()
    }

    pub fn filter_layers(&mut self, layers: LayerRange, invert: bool) -> &mut Self {
        self.items.retain(|i| i.layers.overlaps(&layers) != invert);
        self
    }

    pub fn filter_kinds(&mut self, mask: KindMask, invert: bool) -> &mut Self {
        self.items.retain(|i| i.of_kind(mask) != invert);
        self
    }

    pub fn filter_marker(&mut self, marker: Marker, invert: bool) -> &mut Self {
        self.items.retain(|i| i.marker.intersects(marker) != invert);
        self
    }

    pub fn filter_net(&mut self, net: Option<NetId>, invert: bool) -> &mut Self {
        self.items.retain(|i| (i.net == net) != invert);
        self
    }

    pub fn exclude_item(&mut self, item: &Item) -> &mut Self {
        self.items.retain(|i| !i.same_identity(item));
        self
    }

    pub fn into_vec(self) -> Vec<Rc<Item>> {
        self.items
    }
}

impl IntoIterator for ItemSet {
    type Item = Rc<Item>;
    type IntoIter = std::vec::IntoIter<Rc<Item>>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ItemSet {
    type Item = &'a Rc<Item>;
    type IntoIter = std::slice::Iter<'a, Rc<Item>>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Rc<Item>> for ItemSet {
    fn from_iter<T: IntoIterator<Item = Rc<Item>>>(iter: T) -> Self {
        Self::from_items(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Seg};
    use crate::item::Via;

    fn track(layer: i32, net: u32) -> Rc<Item> {
        Rc::new(Item::segment(Seg::new(Point::new(0, 0), Point::new(10, 0)), 5, layer, Some(NetId(net))))
    }

    #[test]
    fn test_chained_filters_keep_order_and_duplicates() {
        let a = track(0, 1);
        let via = Rc::new(Item::via(Via::new(Point::new(0, 0), 10, 5), LayerRange::new(0, 1), Some(NetId(1))));
        let mut set = ItemSet::from_items([a.clone(), track(1, 1), a.clone(), via, track(0, 2)]);
        set.filter_layers(LayerRange::single(0), false).filter_kinds(KindMask::SEGMENT, false);
        assert_eq!(set.len(), 3);
        set.filter_net(Some(NetId(2)), true);
        assert_eq!(set.len(), 2);
        assert!(Rc::ptr_eq(set.get(0).unwrap(), &a));
        assert!(Rc::ptr_eq(set.get(1).unwrap(), &a));
    }

    #[test]
    fn test_marker_filter() {
        let head = Rc::new(Item::segment(Seg::new(Point::new(0, 0), Point::new(1, 0)), 1, 0, None).with_marker(Marker::HEAD));
        let mut set = ItemSet::from_items([head, track(0, 1)]);
        set.filter_marker(Marker::HEAD, true);
        assert_eq!(set.len(), 1);
        assert_eq!(set.count(KindMask::SEGMENT), 1);
    }
}
