use sirenia::{Algorithm, Edge, Graph, HierarchicalOptions, Node, RankDir, layout};

fn opts(rankdir: RankDir, nodesep: f64, ranksep: f64) -> Algorithm {
    Algorithm::Hierarchical(HierarchicalOptions {
        rankdir,
        nodesep,
        ranksep,
        ..Default::default()
    })
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn single_node_sits_at_the_origin_corner() {
    let g = Graph {
        nodes: vec![Node::new("a", 50.0, 100.0)],
        edges: vec![],
    };
    let out = layout(&g, &opts(RankDir::TB, 50.0, 50.0)).unwrap();
    let a = out.positions["a"];
    assert_eq!((a.x, a.y), (25.0, 50.0));
    assert_eq!((out.width, out.height), (50.0, 100.0));
}

#[test]
fn nodes_on_one_rank_are_separated_by_nodesep() {
    let g = Graph {
        nodes: vec![Node::new("a", 50.0, 100.0), Node::new("b", 75.0, 100.0)],
        edges: vec![],
    };
    let out = layout(&g, &opts(RankDir::TB, 200.0, 50.0)).unwrap();
    assert!(close(out.positions["a"].x, 25.0));
    assert!(close(out.positions["b"].x, 50.0 + 200.0 + 37.5));
    assert!(close(out.positions["a"].y, out.positions["b"].y));
}

#[test]
fn connected_nodes_are_separated_by_ranksep() {
    let g = Graph {
        nodes: vec![Node::new("a", 50.0, 100.0), Node::new("b", 75.0, 200.0)],
        edges: vec![Edge::new("e", "a", "b")],
    };
    let out = layout(&g, &opts(RankDir::TB, 50.0, 300.0)).unwrap();
    let (a, b) = (out.positions["a"], out.positions["b"]);
    assert!(close(a.x, 37.5) && close(b.x, 37.5));
    assert!(close(a.y, 50.0));
    assert!(close(b.y, 100.0 + 300.0 + 100.0));
    assert!(close(out.height, 600.0));

    let route = &out.edges[0].points;
    assert_eq!(route.len(), 2);
    assert!(close(route[0].y, 100.0));
    assert!(close(route[1].y, 400.0));
}

#[test]
fn left_to_right_swaps_axes() {
    let g = Graph {
        nodes: vec![Node::new("a", 50.0, 100.0), Node::new("b", 75.0, 200.0)],
        edges: vec![Edge::new("e", "a", "b")],
    };
    let out = layout(&g, &opts(RankDir::LR, 50.0, 300.0)).unwrap();
    let (a, b) = (out.positions["a"], out.positions["b"]);
    assert!(close(a.x, 25.0));
    assert!(close(b.x, 50.0 + 300.0 + 37.5));
    assert!(close(a.y, b.y));
    assert!(close(out.width, 425.0));
    assert!(close(out.edges[0].points[0].x, 50.0));
}

#[test]
fn bottom_to_top_puts_sources_last() {
    let g = Graph {
        nodes: vec![Node::new("a", 50.0, 100.0), Node::new("b", 50.0, 100.0)],
        edges: vec![Edge::new("e", "a", "b")],
    };
    let out = layout(&g, &opts(RankDir::BT, 50.0, 50.0)).unwrap();
    assert!(out.positions["a"].y > out.positions["b"].y);
    assert!(close(out.positions["b"].y, 50.0));
}

#[test]
fn parallel_edges_stay_vertical() {
    let g = Graph {
        nodes: vec![
            Node::new("a", 50.0, 50.0),
            Node::new("b", 50.0, 50.0),
            Node::new("c", 50.0, 50.0),
            Node::new("d", 50.0, 50.0),
        ],
        edges: vec![Edge::new("ad", "a", "d"), Edge::new("bc", "b", "c")],
    };
    let out = layout(&g, &opts(RankDir::TB, 50.0, 50.0)).unwrap();
    let p = &out.positions;
    assert!(close(p["a"].x, p["d"].x));
    assert!(close(p["b"].x, p["c"].x));
    assert!(p["a"].x < p["b"].x);
}

#[test]
fn long_edges_bend_through_the_skipped_rank() {
    let g = Graph {
        nodes: vec![
            Node::new("a", 40.0, 40.0),
            Node::new("b", 40.0, 40.0),
            Node::new("c", 40.0, 40.0),
        ],
        edges: vec![
            Edge::new("ab", "a", "b"),
            Edge::new("bc", "b", "c"),
            Edge::new("ac", "a", "c"),
        ],
    };
    let out = layout(&g, &opts(RankDir::TB, 50.0, 50.0)).unwrap();
    let ac = out.edges.iter().find(|e| e.id == "ac").unwrap();
    assert_eq!(ac.points.len(), 3);
    assert!(close(ac.points[1].y, out.positions["b"].y));
}

#[test]
fn cycles_are_laid_out_with_edges_pointing_back() {
    let g = Graph {
        nodes: vec![Node::new("a", 40.0, 40.0), Node::new("b", 40.0, 40.0)],
        edges: vec![Edge::new("ab", "a", "b"), Edge::new("ba", "b", "a")],
    };
    let out = layout(&g, &opts(RankDir::TB, 50.0, 50.0)).unwrap();
    let ba = out.edges.iter().find(|e| e.id == "ba").unwrap();
    let first = ba.points.first().unwrap();
    let last = ba.points.last().unwrap();
    assert!(first.y > last.y);
    assert!(out.positions["a"].y < out.positions["b"].y);
}

#[test]
fn edges_to_unknown_nodes_are_rejected() {
    let g = Graph {
        nodes: vec![Node::new("a", 40.0, 40.0)],
        edges: vec![Edge::new("e", "a", "zzz")],
    };
    let err = layout(&g, &opts(RankDir::TB, 50.0, 50.0)).unwrap_err();
    assert!(matches!(err, sirenia::Error::MissingEndpoint { .. }));
}

#[test]
fn duplicate_nodes_are_rejected() {
    let g = Graph {
        nodes: vec![Node::new("a", 40.0, 40.0), Node::new("a", 10.0, 10.0)],
        edges: vec![],
    };
    let err = layout(&g, &opts(RankDir::TB, 50.0, 50.0)).unwrap_err();
    assert!(matches!(err, sirenia::Error::DuplicateNode { .. }));
}
