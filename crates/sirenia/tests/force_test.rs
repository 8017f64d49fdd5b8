use sirenia::{Algorithm, Edge, ForceOptions, Graph, Node, layout};

fn force() -> Algorithm {
    Algorithm::ForceDirected(ForceOptions {
        random_seed: 42,
        ideal_edge_length: 80.0,
        iterations: 100,
    })
}

#[test]
fn pinned_nodes_never_move() {
    let g = Graph {
        nodes: vec![
            Node::new("a", 40.0, 20.0).pinned_at(100.0, 100.0),
            Node::new("b", 40.0, 20.0).pinned_at(300.0, 250.0),
        ],
        edges: vec![Edge::new("ab", "a", "b")],
    };
    let out = layout(&g, &force()).unwrap();
    assert_eq!((out.positions["a"].x, out.positions["a"].y), (100.0, 100.0));
    assert_eq!((out.positions["b"].x, out.positions["b"].y), (300.0, 250.0));
    assert_eq!((out.width, out.height), (320.0, 260.0));

    let route = &out.edges[0].points;
    assert_eq!(route.len(), 2);
    // The segment starts on a's box and ends on b's box.
    assert!((route[0].x - 100.0).abs() <= 20.0 + 1e-9);
    assert!((route[0].y - 100.0).abs() <= 10.0 + 1e-9);
    assert!((route[1].x - 300.0).abs() <= 20.0 + 1e-9);
    assert!((route[1].y - 250.0).abs() <= 10.0 + 1e-9);
}

#[test]
fn same_seed_gives_the_same_drawing() {
    let g = Graph {
        nodes: vec![
            Node::new("a", 30.0, 30.0),
            Node::new("b", 30.0, 30.0),
            Node::new("c", 30.0, 30.0),
        ],
        edges: vec![Edge::new("ab", "a", "b"), Edge::new("bc", "b", "c")],
    };
    let first = layout(&g, &force()).unwrap();
    let second = layout(&g, &force()).unwrap();
    assert_eq!(first.positions, second.positions);
}

#[test]
fn unpinned_drawings_start_at_the_origin() {
    let g = Graph {
        nodes: vec![Node::new("a", 30.0, 10.0), Node::new("b", 30.0, 10.0)],
        edges: vec![Edge::new("ab", "a", "b")],
    };
    let out = layout(&g, &force()).unwrap();
    let min_left = out
        .positions
        .values()
        .map(|p| p.x - 15.0)
        .fold(f64::INFINITY, f64::min);
    let min_top = out
        .positions
        .values()
        .map(|p| p.y - 5.0)
        .fold(f64::INFINITY, f64::min);
    assert!(min_left.abs() < 1e-9);
    assert!(min_top.abs() < 1e-9);
    assert!(out.width > 0.0 && out.height > 0.0);
}

#[test]
fn free_nodes_settle_near_pinned_neighbors() {
    let g = Graph {
        nodes: vec![
            Node::new("a", 20.0, 20.0).pinned_at(500.0, 500.0),
            Node::new("b", 20.0, 20.0),
        ],
        edges: vec![Edge::new("ab", "a", "b")],
    };
    let out = layout(&g, &force()).unwrap();
    let (a, b) = (out.positions["a"], out.positions["b"]);
    let d = (a.x - b.x).hypot(a.y - b.y);
    assert!(d > 0.0 && d < 400.0, "distance {d}");
}
