mod common;

#[cfg(test)]
mod tests {
    use super::common::*;
    use pns_router::geometry::{ArcGeom, LineChain, Seg};
    use pns_router::item::{Item, Line, NetId};
    use pns_router::node::Node;
    use pns_router::rules::{DesignRules, NetClass, NetInfo};
    use pns_router::topology::Topology;
    use std::time::Duration;

    #[test]
    fn test_line_corner_becomes_width_change() {
        let mut node = world();
        track(&mut node, pt(0, 0), pt(MM, 0), 250_000, 1);
        track(&mut node, pt(MM, 0), pt(2 * MM, 0), 250_000, 1);

        let jt = node.find_joint(pt(MM, 0), 0, Some(NetId(1))).unwrap();
        assert!(jt.is_line_corner(false));
        assert!(!jt.is_trace_width_change());

        track(&mut node, pt(MM, 0), pt(MM, MM), 150_000, 1);
        let jt = node.find_joint(pt(MM, 0), 0, Some(NetId(1))).unwrap();
        assert_eq!(jt.link_count(), 3);
        assert!(!jt.is_line_corner(false));
        assert!(jt.is_trace_width_change());
    }

    /// s1 -via- s2 =width change= (s3, s4) or the longer s5
    fn forked_net(node: &mut Node) -> Vec<pns_router::item::ItemId> {
        let net = Some(NetId(1));
        let s1 = track(node, pt(0, 0), pt(MM, 0), 250_000, 1);
        let via = node.add(via_item(pt(MM, 0), 1));
        let s2 = node.add(Item::segment(Seg::new(pt(MM, 0), pt(2 * MM, 0)), 250_000, 1, net));
        let s3 = node.add(Item::segment(Seg::new(pt(2 * MM, 0), pt(3 * MM, 0)), 150_000, 1, net));
        let s4 = node.add(Item::segment(Seg::new(pt(3 * MM, 0), pt(3 * MM, MM)), 150_000, 1, net));
        let s5 = node.add(Item::segment(Seg::new(pt(2 * MM, 0), pt(2 * MM, -3 * MM)), 150_000, 1, net));
        vec![s1, via, s2, s3, s4, s5]
    }

    #[test]
    fn test_trivial_path_crosses_via_and_takes_longest_branch() {
        let mut node = world();
        let ids = forked_net(&mut node);
        let seed = node.lookup(ids[0]).cloned().unwrap();
        let topo = Topology::new(&node);

        let path = topo.assemble_trivial_path(&seed, false).unwrap();
        let path_ids = path.item_ids();
        println!("path items: {:?}", path_ids);
        assert!(path_ids.contains(&ids[0]));
        assert!(path_ids.contains(&ids[1]));
        assert!(path_ids.contains(&ids[2]));
        assert!(path_ids.contains(&ids[5]));
        assert!(!path_ids.contains(&ids[3]));
        assert!(!path_ids.contains(&ids[4]));
        assert_eq!(path.vias().count(), 1);

        let mut ends = [path.start.pos(), path.end.pos()];
        ends.sort();
        let mut expected = [pt(0, 0), pt(2 * MM, -3 * MM)];
        expected.sort();
        assert_eq!(ends, expected);
        assert!((path.length() - 5.0 * MM as f64).abs() < 1.0);
    }

    #[test]
    fn test_trivial_path_is_deterministic() {
        let mut node = world();
        let ids = forked_net(&mut node);
        let topo = Topology::new(&node);
        for &seed_id in &ids {
            let seed = node.lookup(seed_id).cloned().unwrap();
            let first = topo.assemble_trivial_path(&seed, false);
            let second = topo.assemble_trivial_path(&seed, false);
            match (first, second) {
                (Some(a), Some(b)) => {
                    assert_eq!(a.item_ids(), b.item_ids());
                    assert_eq!(a.start.pos(), b.start.pos());
                    assert_eq!(a.end.pos(), b.end.pos());
                    let chains = |p: &pns_router::topology::TrivialPath| {
                        p.lines().map(|l| l.chain().points().to_vec()).collect::<Vec<_>>()
                    };
                    assert_eq!(chains(&a), chains(&b));
                }
                (None, None) => {}
                _ => panic!("path assembly from {seed_id:?} is not repeatable"),
            }
        }
    }

    #[test]
    fn test_epsilon_clearance_is_never_larger() {
        let mut rules = DesignRules {
            nets: vec![
                NetInfo { id: NetId(1), name: "A".into(), class: Some("wide".into()) },
                NetInfo { id: NetId(2), name: "B".into(), class: None },
            ],
            ..Default::default()
        };
        rules.net_classes.insert("wide".into(), NetClass { clearance: Some(400_000), ..Default::default() });
        let mut node = world_with(rules);
        let a = track(&mut node, pt(0, 0), pt(MM, 0), 250_000, 1);
        let b = track(&mut node, pt(0, MM), pt(MM, MM), 250_000, 2);
        let v = node.add(via_item(pt(3 * MM, 0), 2));
        let p = pad(&mut node, pt(5 * MM, 0), 300_000, 1);

        let resolver = node.resolver().clone();
        let stored: Vec<_> = [a, b, v, p].iter().map(|&id| node.lookup(id).cloned().unwrap()).collect();
        let probe = track_item(pt(0, 2 * MM), pt(MM, 2 * MM), 250_000, 2);
        for x in &stored {
            for y in stored.iter().map(|i| i.as_ref()).chain([&probe]) {
                let with = resolver.clearance(x, y, true);
                let without = resolver.clearance(x, y, false);
                assert!(with <= without, "{with} > {without}");
            }
        }
        // the larger class clearance wins
        assert_eq!(resolver.clearance(&stored[0], &stored[1], false), 400_000);
    }

    #[test]
    fn test_diff_pair_assembles_the_same_from_either_net() {
        let rules = DesignRules { diff_pairs: vec![(NetId(1), NetId(2))], ..Default::default() };
        let mut node = world_with(rules);
        let p_seg = track(&mut node, pt(0, 0), pt(5 * MM, 0), 200_000, 1);
        track(&mut node, pt(5 * MM, 0), pt(6 * MM, MM), 200_000, 1);
        let n_seg = track(&mut node, pt(0, 380_000), pt(5 * MM, 380_000), 200_000, 2);
        let topo = Topology::new(&node);

        let from_p = topo.assemble_diff_pair(&node.lookup(p_seg).cloned().unwrap()).unwrap();
        let from_n = topo.assemble_diff_pair(&node.lookup(n_seg).cloned().unwrap()).unwrap();

        assert_eq!(from_p.nets(), (Some(NetId(1)), Some(NetId(2))));
        assert_eq!(from_n.nets(), (Some(NetId(1)), Some(NetId(2))));
        let sorted = |mut ids: Vec<_>| {
            ids.sort();
            ids
        };
        assert_eq!(sorted(from_p.p.links().to_vec()), sorted(from_n.p.links().to_vec()));
        assert_eq!(sorted(from_p.n.links().to_vec()), sorted(from_n.n.links().to_vec()));
        assert_eq!(from_p.p.links().len(), 2);
        assert_eq!(from_p.gap, 180_000);
        assert_eq!(from_n.gap, 180_000);
        assert_eq!(from_p.reference_net, Some(NetId(1)));
        assert_eq!(from_n.reference_net, Some(NetId(2)));
    }

    #[test]
    fn test_uncoupled_net_has_no_pair() {
        let mut node = world();
        let id = track(&mut node, pt(0, 0), pt(MM, 0), 200_000, 1);
        let seed = node.lookup(id).cloned().unwrap();
        assert!(Topology::new(&node).assemble_diff_pair(&seed).is_none());
    }

    #[test]
    fn test_expired_branch_budget_still_returns_a_path() {
        let mut node = world();
        let ids = forked_net(&mut node);
        let seed = node.lookup(ids[0]).cloned().unwrap();
        let topo = Topology::new(&node).with_branch_timeout(Duration::ZERO);

        // no time to compare branches: the first candidate is taken
        let path = topo.assemble_trivial_path(&seed, false).unwrap();
        let path_ids = path.item_ids();
        println!("path items without budget: {:?}", path_ids);
        for id in [ids[0], ids[1], ids[2], ids[3], ids[4]] {
            assert!(path_ids.contains(&id));
        }
        assert!(!path_ids.contains(&ids[5]));
        assert!((path.length() - 4.0 * MM as f64).abs() < 1.0);
    }

    #[test]
    fn test_diff_pair_gap_between_concentric_arcs() {
        let rules = DesignRules { diff_pairs: vec![(NetId(1), NetId(2))], ..Default::default() };
        let mut node = world_with(rules);
        let inner = ArcGeom::new(pt(5 * MM, 0), pt(3 * MM, 4 * MM), pt(0, 5 * MM));
        let outer = ArcGeom::new(pt(5_200_000, 0), pt(3_120_000, 4_160_000), pt(0, 5_200_000));
        let p_arc = node.add(Item::arc(inner, 100_000, 0, Some(NetId(1))));
        let n_arc = node.add(Item::arc(outer, 100_000, 0, Some(NetId(2))));

        let pair = Topology::new(&node).assemble_diff_pair(&node.lookup(p_arc).cloned().unwrap()).unwrap();
        println!("arc pair gap {}", pair.gap);
        assert_eq!(pair.nets(), (Some(NetId(1)), Some(NetId(2))));
        assert_eq!(pair.n.links(), &[n_arc]);
        assert!((pair.gap - 100_000).abs() <= 2);
    }

    /// pad(1) - track(2) - pad(3) - long track(3)
    fn chained_board(node: &mut Node) -> Vec<pns_router::item::ItemId> {
        let a = pad(node, pt(0, 0), 300_000, 1);
        let t = track(node, pt(0, 0), pt(MM, 0), 200_000, 2);
        let b = pad(node, pt(MM, 0), 300_000, 3);
        let c = track(node, pt(MM, 0), pt(MM, 10 * MM), 200_000, 3);
        vec![a, t, b, c]
    }

    #[test]
    fn test_cluster_growth_stops_at_area_limit() {
        let mut node = world();
        let ids = chained_board(&mut node);
        let seed = node.lookup(ids[0]).cloned().unwrap();
        let topo = Topology::new(&node);

        let unbounded = topo.assemble_cluster(&seed, 0, 0.0, None);
        println!("unbounded cluster: {:?}", unbounded.items.ids());
        assert_eq!(unbounded.items.len(), 4);

        let bounded = topo.assemble_cluster(&seed, 0, 16.0, None);
        println!("bounded cluster: {:?}", bounded.items.ids());
        assert!(bounded.items.contains(ids[0]));
        assert!(bounded.items.contains(ids[1]));
        assert!(bounded.items.contains(ids[2]));
        assert!(!bounded.items.contains(ids[3]));
    }

    #[test]
    fn test_cluster_skips_excluded_net() {
        let mut node = world();
        let ids = chained_board(&mut node);
        let seed = node.lookup(ids[0]).cloned().unwrap();
        let cluster = Topology::new(&node).assemble_cluster(&seed, 0, 0.0, Some(NetId(2)));
        assert_eq!(cluster.items.ids(), vec![ids[0]]);
    }

    fn pads_on_net_one(node: &mut Node) {
        pad(node, pt(0, 0), 300_000, 1);
        pad(node, pt(5 * MM, 0), 300_000, 1);
        pad(node, pt(20 * MM, 0), 300_000, 1);
    }

    fn stub(to: i64) -> Line {
        Line::new(LineChain::from_points(&[pt(0, 0), pt(to, 0)]), 200_000, 0, Some(NetId(1)))
    }

    #[test]
    fn test_nearest_unconnected_anchor_leaves_world_alone() {
        let mut node = world();
        pads_on_net_one(&mut node);
        let items_before = node.item_count();
        let joints_before = node.joints().count();
        let topo = Topology::new(&node);

        let anchor = topo.nearest_unconnected_anchor_point(&stub(MM)).unwrap();
        assert_eq!(anchor.point, pt(5 * MM, 0));
        assert_eq!(anchor.item.net, Some(NetId(1)));

        let ratline = topo.leading_ratline(&stub(MM)).unwrap();
        assert_eq!(ratline.points(), &[pt(MM, 0), pt(5 * MM, 0)]);

        assert_eq!(node.item_count(), items_before);
        assert_eq!(node.joints().count(), joints_before);
        assert!(node.find_joint(pt(MM, 0), 0, Some(NetId(1))).is_none());
        assert!(!node.has_changes());
    }

    #[test]
    fn test_stub_ending_on_a_pad_is_connected() {
        let mut node = world();
        pads_on_net_one(&mut node);
        let anchor = Topology::new(&node).nearest_unconnected_anchor_point(&stub(5 * MM)).unwrap();
        assert_eq!(anchor.point, pt(5 * MM, 0));
        assert!(Topology::new(&node).nearest_unconnected_anchor_point(&Line::new(LineChain::new(), 200_000, 0, Some(NetId(1)))).is_none());
    }
}
