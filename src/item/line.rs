//! Lines: ordered chains of segments/arcs forming one electrical stub
//!
//! A line is never stored in a node. It is either assembled from linked
//! segments (and then references them through `links`) or freshly built by a
//! placer, in which case it owns only geometry until added to a node.

use super::{Item, ItemId, LayerRange, Marker, NetId};
use crate::geometry::{BoundingBox, ChainPiece, LineChain, Point, Shape};

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    chain: LineChain,
    width: i64,
    layer: i32,
    net: Option<NetId>,
    links: Vec<ItemId>,
    via: Option<Item>,
    marker: Marker,
}

impl Line {
    pub fn new(chain: LineChain, width: i64, layer: i32, net: Option<NetId>) -> Self {
        Self { chain, width, layer, net, links: Vec::new(), via: None, marker: Marker::empty() }
    }

    /// Same width/layer/net, different geometry, no links
    pub fn with_chain(&self, chain: LineChain) -> Line {
        Line { chain, links: Vec::new(), ..self.clone() }
    }

    pub fn chain(&self) -> &LineChain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut LineChain {
        &mut self.chain
    }

    pub fn set_chain(&mut self, chain: LineChain) {
        self.chain = chain;
        self.links.clear();
    }

    pub fn width(&self) -> i64 {
        self.width
    }

    pub fn set_width(&mut self, width: i64) {
        self.width = width;
    }

    pub fn layer(&self) -> i32 {
        self.layer
    }

    pub fn set_layer(&mut self, layer: i32) {
        self.layer = layer;
    }

    pub fn layers(&self) -> LayerRange {
        LayerRange::single(self.layer)
    }

    pub fn net(&self) -> Option<NetId> {
        self.net
    }

    pub fn marker(&self) -> Marker {
        self.marker
    }

    pub fn set_marker(&mut self, marker: Marker) {
        self.marker = marker;
    }

    pub fn links(&self) -> &[ItemId] {
        &self.links
    }

    pub fn set_links(&mut self, links: Vec<ItemId>) {
        self.links = links;
    }

    pub fn clear_links(&mut self) {
        self.links.clear();
    }

    pub fn is_linked(&self) -> bool {
        !self.links.is_empty()
    }

    pub fn contains_link(&self, id: ItemId) -> bool {
        self.links.contains(&id)
    }

    pub fn point_count(&self) -> usize {
        self.chain.point_count()
    }

    pub fn point(&self, i: usize) -> Point {
        self.chain.point(i)
    }

    pub fn start(&self) -> Option<Point> {
        self.chain.first()
    }

    pub fn end(&self) -> Option<Point> {
        self.chain.last()
    }

    pub fn piece_count(&self) -> usize {
        self.chain.piece_count()
    }

    pub fn length(&self) -> f64 {
        self.chain.length()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.piece_count() == 0
    }

    pub fn reverse(&mut self) {
        self.chain.reverse();
        self.links.reverse();
    }

    pub fn ends_with_via(&self) -> bool {
        self.via.is_some()
    }

    pub fn via(&self) -> Option<&Item> {
        self.via.as_ref()
    }

    pub fn set_via(&mut self, via: Option<Item>) {
        self.via = via;
    }

    /// Copper shape of every piece
    pub fn shapes(&self) -> Vec<Shape> {
        self.chain
            .pieces()
            .map(|piece| match piece {
                ChainPiece::Segment(seg) => Shape::Segment { seg, width: self.width },
                ChainPiece::Arc(arc) => Shape::Arc { arc, width: self.width },
            })
            .collect()
    }

    /// Segment/arc items for every non-degenerate piece, ready to add to a node
    pub fn to_items(&self) -> Vec<Item> {
        self.chain
            .pieces()
            .filter(|piece| piece.start() != piece.end())
            .map(|piece| {
                let item = match piece {
                    ChainPiece::Segment(seg) => Item::segment(seg, self.width, self.layer, self.net),
                    ChainPiece::Arc(arc) => Item::arc(arc, self.width, self.layer, self.net),
                };
                item.with_marker(self.marker)
            })
            .collect()
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.chain.bbox().map(|bb| bb.inflated(self.width / 2))
    }

    /// Collapse collinear pieces; links no longer match the geometry afterwards
    pub fn simplify(&mut self) {
        self.chain.simplify();
        self.links.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_items_skips_degenerate_pieces() {
        let chain = LineChain::from_points(&[Point::new(0, 0), Point::new(1000, 0), Point::new(1000, 1000)]);
        let line = Line::new(chain, 200, 0, Some(NetId(3)));
        let items = line.to_items();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.width() == Some(200) && i.net == Some(NetId(3))));
        assert!((line.length() - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_reverse_keeps_links_aligned() {
        let chain = LineChain::from_points(&[Point::new(0, 0), Point::new(1000, 0), Point::new(1000, 1000)]);
        let mut line = Line::new(chain, 200, 0, None);
        line.set_links(vec![ItemId(1), ItemId(2)]);
        line.reverse();
        assert_eq!(line.links(), &[ItemId(2), ItemId(1)]);
        assert_eq!(line.start(), Some(Point::new(1000, 1000)));
    }
}
