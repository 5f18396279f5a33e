mod common;

#[cfg(test)]
mod tests {
    use super::common::*;
    use pns_router::geometry::{Point, Shape};
    use pns_router::item::{HostRef, Item, ItemSet, LayerRange, NetId, Solid};
    use pns_router::router::iface::track_length;
    use pns_router::router::{
        MeanderSettings, RouterAction, RouterConfig, RouterError, RouterEvent, RouterMode, RouterState, TuningStatus,
    };
    use pns_router::rules::{DesignRules, MinOptMax};
    use std::rc::Rc;

    fn two_pads() -> Vec<Item> {
        vec![pad_item(pt(0, 0), 300_000, 1), pad_item(pt(3 * MM, 0), 300_000, 1)]
    }

    fn host_segments(router: &pns_router::router::Router<pns_router::host::HeadlessHost>) -> Vec<Item> {
        router.iface().items().filter(|i| i.as_segment().is_some()).cloned().collect()
    }

    #[test]
    fn test_start_inside_keepout_fails_and_stays_idle() {
        let mut router = router(vec![keepout_item(pt(-MM, -MM), pt(MM, MM))]);
        let result = router.start_routing(pt(0, 0), 0);
        assert_eq!(result, Err(RouterError::InsideKeepout));
        assert_eq!(router.state(), RouterState::Idle);
        let reason = router.failure_reason().unwrap();
        println!("failure reason: {reason}");
        assert!(!reason.is_empty());

        // the same point outside the keepout is fine
        assert!(router.start_routing(pt(2 * MM, 0), 0).is_ok());
        assert_eq!(router.state(), RouterState::RouteTrack);
        assert!(router.failure_reason().is_none());
    }

    #[test]
    fn test_route_pad_to_pad_commits_to_host() {
        let mut router = router(two_pads());
        assert_eq!(router.world().item_count(), 2);

        router.start_routing(pt(0, 0), 0).unwrap();
        assert!(router.move_to(pt(3 * MM, 0)));
        assert!(!router.traces().is_empty());
        assert!(!router.iface().preview().items.is_empty());

        assert!(router.fix_route(pt(3 * MM, 0), false));
        assert_eq!(router.state(), RouterState::Idle);
        assert_eq!(router.world().item_count(), 3);
        assert_eq!(router.iface().item_count(), 3);
        assert_eq!(router.iface().undo_depth(), 1);

        let segments = host_segments(&router);
        assert_eq!(segments.len(), 1);
        let s = segments[0].as_segment().unwrap();
        assert_eq!(segments[0].net, Some(NetId(1)));
        assert_eq!(s.width, 250_000);
        let mut ends = [s.seg.a, s.seg.b];
        ends.sort();
        assert_eq!(ends, [pt(0, 0), pt(3 * MM, 0)]);
        // the world item mirrors the new host object
        let host = segments[0].host.unwrap();
        assert!(router.world().find_by_host(host).is_some());
    }

    #[test]
    fn test_cancel_leaves_board_untouched() {
        let mut router = router(two_pads());
        assert_eq!(router.handle_event(RouterEvent::StartRouting { pos: pt(0, 0), layer: 0 }), RouterAction::Updated);
        assert_eq!(router.handle_event(RouterEvent::Fix { pos: pt(MM, MM), force: false }), RouterAction::Updated);
        assert_eq!(router.handle_event(RouterEvent::Undo), RouterAction::Updated);
        assert_eq!(router.handle_event(RouterEvent::Undo), RouterAction::None);
        assert_eq!(router.handle_event(RouterEvent::Cancel), RouterAction::Cancelled);
        assert_eq!(router.state(), RouterState::Idle);
        assert_eq!(router.iface().item_count(), 2);
        assert_eq!(router.iface().undo_depth(), 0);
        assert_eq!(router.handle_event(RouterEvent::Cancel), RouterAction::None);
    }

    #[test]
    fn test_mode_change_refused_while_routing() {
        let mut router = router(two_pads());
        router.start_routing(pt(0, 0), 0).unwrap();
        let action = router.handle_event(RouterEvent::SetMode { mode: RouterMode::RouteDiffPair });
        assert!(matches!(action, RouterAction::Rejected(_)));
        assert_eq!(router.mode(), RouterMode::RouteSingle);
        router.stop_routing();
        assert_eq!(router.handle_event(RouterEvent::SetMode { mode: RouterMode::RouteDiffPair }), RouterAction::None);
        assert_eq!(router.mode(), RouterMode::RouteDiffPair);
    }

    #[test]
    fn test_host_undo_then_resync() {
        let mut router = router(two_pads());
        router.start_routing(pt(0, 0), 0).unwrap();
        router.move_to(pt(3 * MM, 0));
        assert!(router.fix_route(pt(3 * MM, 0), false));
        assert_eq!(router.world().item_count(), 3);

        assert!(router.iface_mut().undo());
        assert!(router.sync_world());
        assert_eq!(router.world().item_count(), 2);
        assert!(host_segments(&router).is_empty());
    }

    #[test]
    fn test_segment_drag_updates_host_objects_in_place() {
        let items = vec![
            track_item(pt(0, 0), pt(MM, 0), 250_000, 1),
            track_item(pt(MM, 0), pt(3 * MM, 0), 250_000, 1),
            track_item(pt(3 * MM, 0), pt(4 * MM, 0), 250_000, 1),
        ];
        let mut router = router(items);
        router.start_dragging(pt(2 * MM, 0), 0).unwrap();
        assert_eq!(router.state(), RouterState::DragSegment);
        router.move_to(pt(2 * MM, MM));
        assert!(router.violations().is_empty());
        assert!(router.fix_route(pt(2 * MM, MM), false));

        assert_eq!(router.state(), RouterState::Idle);
        assert_eq!(router.iface().item_count(), 3);
        let middle = router.iface().item(HostRef(2)).and_then(|i| i.as_segment()).unwrap();
        let mut ends = [middle.seg.a, middle.seg.b];
        ends.sort();
        assert_eq!(ends, [pt(MM, MM), pt(3 * MM, MM)]);
        let left = router.iface().item(HostRef(1)).and_then(|i| i.as_segment()).unwrap();
        assert!([left.seg.a, left.seg.b].contains(&pt(0, 0)));
        assert!([left.seg.a, left.seg.b].contains(&pt(MM, MM)));
    }

    #[test]
    fn test_component_drag_moves_pads_on_host() {
        let mut solid = Solid::pad(pt(0, 0), Shape::Circle { center: pt(0, 0), radius: 300_000 });
        solid.component = Some("U1".to_string());
        let mut other = Solid::pad(pt(MM, 0), Shape::Circle { center: pt(MM, 0), radius: 300_000 });
        other.component = Some("U1".to_string());
        let items = vec![
            Item::solid(solid, LayerRange::single(0), Some(NetId(1))),
            Item::solid(other, LayerRange::single(0), Some(NetId(2))),
        ];
        let mut router = router(items);
        router.start_dragging(pt(0, 0), 0).unwrap();
        assert_eq!(router.state(), RouterState::DragComponent);
        router.move_to(pt(0, 2 * MM));
        assert!(router.fix_route(pt(0, 2 * MM), false));

        let first = router.iface().item(HostRef(1)).and_then(|i| i.as_solid()).unwrap();
        let second = router.iface().item(HostRef(2)).and_then(|i| i.as_solid()).unwrap();
        assert_eq!(first.pos, pt(0, 2 * MM));
        assert_eq!(second.pos, pt(MM, 2 * MM));
        assert_eq!(router.iface().item_count(), 2);
    }

    #[test]
    fn test_length_tuning_through_router() {
        let meander = MeanderSettings {
            target_length: MinOptMax::range(23 * MM - 50_000, 23 * MM, 23 * MM + 50_000),
            ..Default::default()
        };
        let config = RouterConfig { meander, ..Default::default() };
        let mut router = router_with(vec![track_item(pt(0, 0), pt(20 * MM, 0), 200_000, 1)], config);
        router.set_mode(RouterMode::TuneSingle).unwrap();
        router.start_routing(pt(MM, 0), 0).unwrap();
        router.move_to(pt(19 * MM, 0));

        let tuning = router.tuning().unwrap();
        println!("tuning: {:?}", tuning);
        assert_eq!(tuning.status, TuningStatus::Tuned);
        assert!(router.fix_route(pt(19 * MM, 0), false));

        let items: ItemSet = router.iface().items().cloned().map(Rc::new).collect();
        let length = track_length(&items);
        assert!((length - 23.0 * MM as f64).abs() <= 50_000.0, "length {length}");
        assert!(router.iface().item_count() > 1);
        // the seed's host object was reused for the first piece
        assert!(router.iface().item(HostRef(1)).is_some());
        assert_eq!(router.iface().undo_depth(), 1);
    }

    #[test]
    fn test_diff_pair_route_is_symmetric() {
        let rules = DesignRules { diff_pairs: vec![(NetId(1), NetId(2))], ..Default::default() };
        let config = RouterConfig { rules, ..Default::default() };
        let items = vec![pad_item(pt(0, 190_000), 100_000, 1), pad_item(pt(0, -190_000), 100_000, 2)];
        let mut router = router_with(items, config);
        router.set_mode(RouterMode::RouteDiffPair).unwrap();
        router.start_routing(pt(0, 190_000), 0).unwrap();
        router.move_to(pt(5 * MM, 0));
        assert!(router.fix_route(pt(5 * MM, 0), true));

        let segments = host_segments(&router);
        let of_net = |net: u32| -> Vec<_> {
            segments.iter().filter(|i| i.net == Some(NetId(net))).filter_map(|i| i.as_segment()).cloned().collect()
        };
        let (p, n) = (of_net(1), of_net(2));
        assert_eq!(p.len(), n.len());
        assert!(!p.is_empty());
        let mirror = |q: Point| Point::new(q.x, -q.y);
        for s in &p {
            assert!(
                n.iter().any(|t| (t.seg.a == mirror(s.seg.a) && t.seg.b == mirror(s.seg.b))
                    || (t.seg.b == mirror(s.seg.a) && t.seg.a == mirror(s.seg.b))),
                "no mirror for {:?}",
                s.seg
            );
            assert_eq!(s.width, 200_000);
        }
        let p_len: f64 = p.iter().map(|s| s.seg.length()).sum();
        let n_len: f64 = n.iter().map(|s| s.seg.length()).sum();
        assert!((p_len - n_len).abs() < 1.0);
        assert_eq!(p[0].seg.distance(&n[0].seg).round() as i64, 380_000);
    }
}
