//! Board builders shared by the integration tests

#![allow(dead_code)]

use pns_router::geometry::{BoundingBox, Point, Seg, Shape};
use pns_router::host::{BoardDescription, HeadlessHost};
use pns_router::item::{HostRef, Item, ItemId, KeepoutRules, LayerRange, NetId, Solid, Via};
use pns_router::node::Node;
use pns_router::router::{Router, RouterConfig};
use pns_router::rules::{DesignRules, MemoizedRuleResolver};
use std::rc::Rc;

pub const MM: i64 = 1_000_000;

pub fn pt(x: i64, y: i64) -> Point {
    Point::new(x, y)
}

pub fn world() -> Node {
    world_with(DesignRules::default())
}

pub fn world_with(rules: DesignRules) -> Node {
    Node::new(Rc::new(MemoizedRuleResolver::new(rules)))
}

pub fn track_item(a: Point, b: Point, width: i64, net: u32) -> Item {
    Item::segment(Seg::new(a, b), width, 0, Some(NetId(net)))
}

pub fn pad_item(pos: Point, radius: i64, net: u32) -> Item {
    Item::solid(Solid::pad(pos, Shape::Circle { center: pos, radius }), LayerRange::single(0), Some(NetId(net)))
}

pub fn via_item(pos: Point, net: u32) -> Item {
    Item::via(Via::new(pos, 600_000, 300_000), LayerRange::new(0, 1), Some(NetId(net)))
}

pub fn keepout_item(a: Point, b: Point) -> Item {
    let rules = KeepoutRules { no_tracks: true, ..Default::default() };
    Item::solid(Solid::keepout(Shape::Rect(BoundingBox::new(a, b)), rules), LayerRange::single(0), None)
}

pub fn track(node: &mut Node, a: Point, b: Point, width: i64, net: u32) -> ItemId {
    node.add(track_item(a, b, width, net))
}

pub fn pad(node: &mut Node, pos: Point, radius: i64, net: u32) -> ItemId {
    node.add(pad_item(pos, radius, net))
}

/// Two-layer board; items are numbered as host objects in order
pub fn board(items: Vec<Item>) -> BoardDescription {
    let items = items.into_iter().enumerate().map(|(i, item)| item.with_host(HostRef(i as u64 + 1))).collect();
    BoardDescription { layers: vec!["F.Cu".to_string(), "B.Cu".to_string()], items, ..Default::default() }
}

pub fn router(items: Vec<Item>) -> Router<HeadlessHost> {
    router_with(items, RouterConfig::default())
}

pub fn router_with(items: Vec<Item>, config: RouterConfig) -> Router<HeadlessHost> {
    let board = BoardDescription { config: config.clone(), ..board(items) };
    Router::new(HeadlessHost::new(&board), config)
}
