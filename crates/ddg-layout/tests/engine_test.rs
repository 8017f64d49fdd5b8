use ddg_layout::backend::{Builtin, EngineKind, LayoutBackend};
use ddg_layout::{
    Edge, EngineInput, EngineOutput, Error, LayoutDone, LayoutInput, LayoutOptions, LayoutVertex,
    Phase, SizeVertex, compute,
};
use sirenia::RankDir;

fn size(key: &str) -> SizeVertex {
    SizeVertex::new(key, 72.0, 36.0)
}

fn run(phase: Phase, request: LayoutInput) -> ddg_layout::Result<EngineOutput> {
    compute(
        phase,
        &EngineInput {
            request,
            options: LayoutOptions::default(),
        },
        &Builtin,
    )
}

fn vertex<'a>(out: &'a [LayoutVertex], key: &str) -> &'a LayoutVertex {
    out.iter()
        .find(|v| &*v.key == key)
        .unwrap_or_else(|| panic!("missing vertex {key}"))
}

fn done(out: EngineOutput) -> LayoutDone {
    LayoutDone {
        graph: out.graph,
        vertices: out.vertices,
        edges: out.edges,
        unrouted_edges: out.dropped_edges,
        warnings: out.warnings,
    }
}

fn overlaps(a: &LayoutVertex, b: &LayoutVertex) -> bool {
    a.left < b.left + b.width
        && b.left < a.left + a.width
        && a.top < b.top + b.height
        && b.top < a.top + a.height
}

#[test]
fn positions_phase_places_vertices_top_down() {
    let edges = vec![Edge::new("a", "b"), Edge::new("b", "c")];
    let out = run(
        Phase::Positions,
        LayoutInput::fresh(edges.clone(), vec![size("a"), size("b"), size("c")]),
    )
    .unwrap();

    let (a, b, c) = (
        vertex(&out.vertices, "a"),
        vertex(&out.vertices, "b"),
        vertex(&out.vertices, "c"),
    );
    assert!(a.top < b.top && b.top < c.top);
    assert!((b.width - 72.0).abs() < 1e-6);
    assert!((b.height - 36.0).abs() < 1e-6);
    // ranksep is 5in between boxes.
    assert!((b.top - (a.top + a.height) - 360.0).abs() < 1e-6);
    assert!(out.edges.is_empty());
    assert_eq!(out.dropped_edges, edges);
    assert!(out.graph.height >= c.top + c.height - 1e-6);
}

#[test]
fn dot_only_routes_edges_in_the_same_run() {
    let out = run(
        Phase::DotOnly,
        LayoutInput::fresh(vec![Edge::new("a", "b")], vec![size("a"), size("b")]),
    )
    .unwrap();
    assert!(out.dropped_edges.is_empty());
    assert_eq!(out.edges.len(), 1);
    let points = &out.edges[0].path_points;
    let (a, b) = (vertex(&out.vertices, "a"), vertex(&out.vertices, "b"));
    // Presentation space: the route runs downwards from a to b.
    assert!((points[0][1] - (a.top + a.height)).abs() < 1e-6);
    assert!((points[points.len() - 1][1] - b.top).abs() < 1e-6);
}

#[test]
fn edges_phase_keeps_vertices_and_routes_the_rest() {
    let edges = vec![Edge::new("a", "b"), Edge::new("a", "c")];
    let positions = run(
        Phase::Positions,
        LayoutInput::fresh(edges.clone(), vec![size("a"), size("b"), size("c")]),
    )
    .unwrap();

    let routed = run(
        Phase::Edges,
        LayoutInput {
            positioned_vertices: positions.vertices.clone(),
            new_vertices: Vec::new(),
            positioned_edges: Vec::new(),
            new_edges: positions.dropped_edges.clone(),
            prev_graph: Some(positions.graph),
        },
    )
    .unwrap();
    assert_eq!(routed.vertices, positions.vertices);
    assert_eq!(routed.graph, positions.graph);
    assert!(routed.dropped_edges.is_empty());
    assert!(routed.warnings.is_empty());
    let mut got: Vec<Edge> = routed.edges.iter().map(|e| e.edge.clone()).collect();
    got.sort();
    assert_eq!(got, edges);
    assert!(routed.edges.iter().all(|e| e.path_points.len() >= 2));
}

#[test]
fn edges_phase_needs_a_previous_graph() {
    let err = run(
        Phase::Edges,
        LayoutInput::fresh(vec![Edge::new("a", "b")], vec![size("a"), size("b")]),
    )
    .unwrap_err();
    assert!(matches!(err, Error::MissingPreviousGraph { .. }));
}

#[test]
fn grafting_downstream_leaves_existing_vertices_in_place() {
    let first = run(
        Phase::DotOnly,
        LayoutInput::fresh(vec![Edge::new("a", "b")], vec![size("a"), size("b")]),
    )
    .unwrap();
    let previous = done(first);

    let edges = vec![Edge::new("a", "b"), Edge::new("b", "c")];
    let vertices = vec![size("a"), size("b"), size("c")];
    let input = LayoutInput::from_previous(&previous, &edges, &vertices);
    assert_eq!(input.positioned_vertices.len(), 2);
    assert_eq!(input.new_vertices, vec![size("c")]);
    assert_eq!(input.new_edges, vec![Edge::new("b", "c")]);

    let out = run(Phase::Positions, input).unwrap();
    for key in ["a", "b"] {
        let before = vertex(&previous.vertices, key);
        let after = vertex(&out.vertices, key);
        assert!((after.left - before.left - out.shift.x).abs() < 1e-6);
        assert!((after.top - before.top - out.shift.y).abs() < 1e-6);
    }
    let (b, c) = (vertex(&out.vertices, "b"), vertex(&out.vertices, "c"));
    assert!(c.top > b.top + b.height);
    assert!((c.left + c.width / 2.0 - (b.left + b.width / 2.0)).abs() < 1e-6);
    assert!(out.moved_vertices.is_empty());
    assert!(out.dropped_edges.is_empty());

    let old_edge = out
        .edges
        .iter()
        .find(|e| e.edge == Edge::new("a", "b"))
        .unwrap();
    let prior = previous.edges.iter().find(|e| e.edge == old_edge.edge).unwrap();
    assert_eq!(old_edge.path_points, prior.path_points);
    let new_edge = out
        .edges
        .iter()
        .find(|e| e.edge == Edge::new("b", "c"))
        .unwrap();
    assert!(new_edge.translate.is_none());
    assert!(!new_edge.path_points.is_empty());
}

#[test]
fn grafting_upstream_clears_room_for_the_cohort() {
    let first = run(
        Phase::DotOnly,
        LayoutInput::fresh(
            vec![Edge::new("r", "a"), Edge::new("r", "b")],
            vec![size("r"), size("a"), size("b")],
        ),
    )
    .unwrap();
    let previous = done(first);

    let edges = vec![
        Edge::new("r", "a"),
        Edge::new("r", "b"),
        Edge::new("u", "a"),
        Edge::new("w", "u"),
    ];
    let vertices = vec![size("r"), size("a"), size("b"), size("u"), size("w")];
    let input = LayoutInput::from_previous(&previous, &edges, &vertices);
    let out = run(Phase::Positions, input).unwrap();

    assert_eq!(out.vertices.len(), 5);
    let (a, u, w) = (
        vertex(&out.vertices, "a"),
        vertex(&out.vertices, "u"),
        vertex(&out.vertices, "w"),
    );
    assert!(u.top + u.height < a.top);
    assert!(w.top + w.height < u.top);
    for (i, x) in out.vertices.iter().enumerate() {
        for y in &out.vertices[i + 1..] {
            assert!(!overlaps(x, y), "{} overlaps {}", x.key, y.key);
        }
    }
    for key in ["r", "a", "b"] {
        if out.moved_vertices.iter().any(|m| &**m == key) {
            continue;
        }
        let before = vertex(&previous.vertices, key);
        let after = vertex(&out.vertices, key);
        assert!((after.left - before.left - out.shift.x).abs() < 1e-6);
        assert!((after.top - before.top - out.shift.y).abs() < 1e-6);
    }
    // Every old edge is either carried over or queued for routing.
    for e in &previous.edges {
        let kept = out.edges.iter().any(|o| o.edge == e.edge);
        let dropped = out.dropped_edges.contains(&e.edge);
        assert!(kept != dropped, "{}", e.edge);
    }
    // The drawing starts at the origin.
    let min_left = out.vertices.iter().map(|v| v.left).fold(f64::INFINITY, f64::min);
    let min_top = out.vertices.iter().map(|v| v.top).fold(f64::INFINITY, f64::min);
    assert!(min_left.abs() < 1e-6);
    assert!(min_top.abs() < 1e-6);
}

#[test]
fn a_new_vertex_without_positioned_neighbor_is_fatal() {
    let previous = done(run(Phase::DotOnly, LayoutInput::fresh(vec![], vec![size("a")])).unwrap());
    let input = LayoutInput::from_previous(&previous, &[], &[size("a"), size("x")]);
    let err = run(Phase::Positions, input).unwrap_err();
    assert!(matches!(err, Error::UnanchoredCohort { .. }));
}

#[test]
fn grafting_is_top_to_bottom_only() {
    let options = LayoutOptions {
        rankdir: RankDir::LR,
        ..Default::default()
    };
    let first = compute(
        Phase::DotOnly,
        &EngineInput {
            request: LayoutInput::fresh(vec![], vec![size("a")]),
            options: options.clone(),
        },
        &Builtin,
    )
    .unwrap();
    let input = LayoutInput::from_previous(
        &done(first),
        &[Edge::new("a", "b")],
        &[size("a"), size("b")],
    );
    let err = compute(Phase::Positions, &EngineInput { request: input, options }, &Builtin)
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedDirection { rankdir: RankDir::LR }));
}

#[test]
fn edges_must_reference_known_vertices() {
    let err = run(
        Phase::Positions,
        LayoutInput::fresh(vec![Edge::new("a", "ghost")], vec![size("a")]),
    )
    .unwrap_err();
    assert!(matches!(err, Error::MissingEdgeEndpoint { .. }));
}

#[test]
fn total_memory_is_enforced() {
    let err = compute(
        Phase::Positions,
        &EngineInput {
            request: LayoutInput::fresh(vec![Edge::new("a", "b")], vec![size("a"), size("b")]),
            options: LayoutOptions {
                total_memory: Some(16),
                ..Default::default()
            },
        },
        &Builtin,
    )
    .unwrap_err();
    assert!(matches!(err, Error::MemoryExceeded { limit: 16, .. }));
}

struct Canned(&'static str);

impl LayoutBackend for Canned {
    fn run(&self, _engine: EngineKind, _dot: &str, _total_memory: Option<usize>) -> ddg_layout::Result<String> {
        Ok(self.0.to_string())
    }
}

#[test]
fn engine_output_is_validated() {
    let request = LayoutInput::fresh(vec![], vec![size("a"), size("b")]);
    let input = EngineInput {
        request,
        options: LayoutOptions::default(),
    };

    let missing = Canned("graph 1 2 2\nnode a 1 1 1 0.5 \"\" solid box black lightgrey\nstop\n");
    let err = compute(Phase::Positions, &input, &missing).unwrap_err();
    assert!(matches!(err, Error::InvalidLayout { .. }));

    let resized = Canned(
        "graph 1 2 2\nnode a 1 1 1 0.5 \"\" solid box black lightgrey\nnode b 1 0.25 2 0.5 \"\" solid box black lightgrey\nstop\n",
    );
    let err = compute(Phase::Positions, &input, &resized).unwrap_err();
    assert!(matches!(err, Error::InvalidLayout { .. }));
}
