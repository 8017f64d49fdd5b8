//! Layout computation: one phase of one request, from presentation-space input to
//! presentation-space output.
//!
//! With no positioned vertices the whole graph goes through the hierarchical engine. Otherwise
//! new vertices are grafted onto the previous drawing ([`graft`]) and the existing geometry is
//! reconciled. The `Edges` phase keeps every vertex pinned and only routes edges.

pub mod graft;
pub mod validity;

use crate::backend::{EngineKind, LayoutBackend};
use crate::conv_coord::{
    DPI, EngineVertex, edge_to_pixels, graph_to_dot, graph_to_pixels, layout_vertex_to_dot,
    size_vertex_to_dot, vertex_to_pixels,
};
use crate::dot::{DotVertex, to_dot};
use crate::error::{Error, Result};
use crate::options::LayoutOptions;
use crate::plain::{PlainOutput, parse_plain};
use crate::types::{Edge, LayoutEdge, LayoutGraph, LayoutInput, LayoutVertex, Point};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Place vertices; edge geometry only where it can be kept or grafted.
    Positions,
    /// Route the edges that still lack geometry; vertices stay where they are.
    Edges,
    /// Place vertices and take edge routes from the same hierarchical run.
    DotOnly,
}

#[derive(Debug, Clone, Default)]
pub struct EngineInput {
    pub request: LayoutInput,
    pub options: LayoutOptions,
}

/// Presentation-space result of one phase.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub graph: LayoutGraph,
    pub vertices: Vec<LayoutVertex>,
    /// Edges with geometry, either fresh or carried over with a `translate`.
    pub edges: Vec<LayoutEdge>,
    /// Edges that need routing.
    pub dropped_edges: Vec<Edge>,
    pub moved_vertices: Vec<Arc<str>>,
    /// Pixel offset every vertex untouched by collision avoidance moved by.
    pub shift: Point,
    pub warnings: Vec<String>,
}

pub fn compute(phase: Phase, input: &EngineInput, backend: &dyn LayoutBackend) -> Result<EngineOutput> {
    let out = match phase {
        Phase::Edges => route_edges(input, backend)?,
        Phase::Positions | Phase::DotOnly if !input.request.positioned_vertices.is_empty() => {
            graft_layout(input, backend)?
        }
        Phase::Positions | Phase::DotOnly => full_layout(phase, input, backend)?,
    };
    tracing::debug!(
        ?phase,
        vertices = out.vertices.len(),
        edges = out.edges.len(),
        dropped = out.dropped_edges.len(),
        "layout phase finished"
    );
    Ok(out)
}

pub(crate) fn layout_plain(
    backend: &dyn LayoutBackend,
    engine: EngineKind,
    edges: &[Edge],
    vertices: &[DotVertex],
    options: &LayoutOptions,
    include_edges: bool,
) -> Result<PlainOutput> {
    let dot = to_dot(edges, vertices, options);
    let plain = backend.run(engine, &dot, options.total_memory)?;
    parse_plain(&plain, include_edges)
}

fn check_endpoints<'a>(edges: impl IntoIterator<Item = &'a Edge>, known: &FxHashSet<&str>) -> Result<()> {
    for e in edges {
        if !known.contains(&*e.from) || !known.contains(&*e.to) {
            return Err(Error::MissingEdgeEndpoint {
                from: e.from.to_string(),
                to: e.to.to_string(),
            });
        }
    }
    Ok(())
}

/// Pairs requested edges with what the engine routed; `graph` is the engine-space frame the
/// routes were drawn in.
fn collect_routes(
    wanted: &[Edge],
    routed: &[LayoutEdge],
    graph: &LayoutGraph,
) -> (Vec<LayoutEdge>, Vec<Edge>) {
    let mut by_edge: FxHashMap<&Edge, &LayoutEdge> = FxHashMap::default();
    for e in routed {
        by_edge.entry(&e.edge).or_insert(e);
    }
    let mut edges = Vec::with_capacity(wanted.len());
    let mut dropped = Vec::new();
    for e in wanted {
        match by_edge.get(e) {
            Some(r) if !r.path_points.is_empty() => edges.push(edge_to_pixels(graph, r)),
            _ => dropped.push(e.clone()),
        }
    }
    (edges, dropped)
}

fn full_layout(phase: Phase, input: &EngineInput, backend: &dyn LayoutBackend) -> Result<EngineOutput> {
    let request = &input.request;
    let sizes: Vec<DotVertex> = request
        .new_vertices
        .iter()
        .map(|v| {
            let s = size_vertex_to_dot(v);
            DotVertex {
                key: s.key,
                width: s.width,
                height: s.height,
                pos: None,
            }
        })
        .collect();
    let edges: Vec<Edge> = request
        .positioned_edges
        .iter()
        .map(|e| e.edge.clone())
        .chain(request.new_edges.iter().cloned())
        .collect();
    let known: FxHashSet<&str> = sizes.iter().map(|v| &*v.key).collect();
    check_endpoints(&edges, &known)?;
    if sizes.is_empty() {
        return Ok(EngineOutput {
            graph: LayoutGraph {
                width: 0.0,
                height: 0.0,
                scale: 1.0,
            },
            vertices: Vec::new(),
            edges: Vec::new(),
            dropped_edges: Vec::new(),
            moved_vertices: Vec::new(),
            shift: Point::default(),
            warnings: Vec::new(),
        });
    }

    let include_edges = phase == Phase::DotOnly;
    let plain = layout_plain(
        backend,
        EngineKind::Dot,
        &edges,
        &sizes,
        &input.options,
        include_edges,
    )?;
    validity::check_vertices(
        sizes.iter().map(|v| (&*v.key, v.width, v.height)),
        &plain.vertices,
    )?;

    let by_key: FxHashMap<&str, &EngineVertex> =
        plain.vertices.iter().map(|v| (&*v.key, v)).collect();
    let vertices = sizes
        .iter()
        .filter_map(|v| by_key.get(&*v.key))
        .map(|v| vertex_to_pixels(&plain.graph, v))
        .collect();
    let (edges, dropped_edges) = if include_edges {
        collect_routes(&edges, &plain.edges, &plain.graph)
    } else {
        (Vec::new(), edges)
    };
    Ok(EngineOutput {
        graph: graph_to_pixels(&plain.graph),
        vertices,
        edges,
        dropped_edges,
        moved_vertices: Vec::new(),
        shift: Point::default(),
        warnings: Vec::new(),
    })
}

fn graft_layout(input: &EngineInput, backend: &dyn LayoutBackend) -> Result<EngineOutput> {
    let request = &input.request;
    let prev_graph = request.prev_graph.ok_or(Error::MissingPreviousGraph {
        action: "graft onto positioned vertices",
    })?;
    let grafted = graft::graft(request, &prev_graph, &input.options, backend)?;

    let vertices: Vec<LayoutVertex> = grafted
        .vertices
        .values()
        .map(|v| vertex_to_pixels(&grafted.graph, v))
        .collect();
    let mut edges: Vec<LayoutEdge> = grafted
        .edges
        .iter()
        .map(|e| edge_to_pixels(&grafted.graph, e))
        .collect();
    let mut dropped_edges = grafted.dropped_edges;

    let before: FxHashMap<&str, &LayoutVertex> = request
        .positioned_vertices
        .iter()
        .map(|v| (&*v.key, v))
        .collect();
    let after: FxHashMap<&str, &LayoutVertex> = vertices.iter().map(|v| (&*v.key, v)).collect();
    let delta = |key: &str| {
        let (b, a) = (before.get(key)?, after.get(key)?);
        Some(Point {
            x: a.left - b.left,
            y: a.top - b.top,
        })
    };
    let tolerance = validity::TOLERANCE * DPI;
    for e in &request.positioned_edges {
        let (Some(from), Some(to)) = (delta(&*e.edge.from), delta(&*e.edge.to)) else {
            dropped_edges.push(e.edge.clone());
            continue;
        };
        if (from.x - to.x).abs() > tolerance || (from.y - to.y).abs() > tolerance {
            tracing::debug!(edge = %e.edge, "endpoints moved apart, edge needs routing");
            dropped_edges.push(e.edge.clone());
            continue;
        }
        if from.x.abs() <= tolerance && from.y.abs() <= tolerance {
            edges.push(e.clone());
            continue;
        }
        let prior = e.translate.unwrap_or_default();
        edges.push(LayoutEdge {
            translate: Some(Point {
                x: prior.x + from.x,
                y: prior.y + from.y,
            }),
            ..e.clone()
        });
    }

    let prev_height = graph_to_dot(&prev_graph).height;
    let shift = Point {
        x: grafted.reframe.x * DPI,
        y: (grafted.graph.height - prev_height - grafted.reframe.y) * DPI,
    };
    Ok(EngineOutput {
        graph: graph_to_pixels(&grafted.graph),
        vertices,
        edges,
        dropped_edges,
        moved_vertices: grafted.moved_vertices,
        shift,
        warnings: Vec::new(),
    })
}

fn route_edges(input: &EngineInput, backend: &dyn LayoutBackend) -> Result<EngineOutput> {
    let request = &input.request;
    let prev_graph = request.prev_graph.ok_or(Error::MissingPreviousGraph {
        action: "route edges",
    })?;
    if !request.new_vertices.is_empty() {
        return Err(Error::InvalidLayout {
            message: format!(
                "{} vertices have no position; edges can only be routed between placed vertices",
                request.new_vertices.len()
            ),
        });
    }

    let pinned: Vec<EngineVertex> = request
        .positioned_vertices
        .iter()
        .map(|v| layout_vertex_to_dot(v, &prev_graph))
        .collect();
    let known: FxHashSet<&str> = pinned.iter().map(|v| &*v.key).collect();
    check_endpoints(
        request
            .positioned_edges
            .iter()
            .map(|e| &e.edge)
            .chain(&request.new_edges),
        &known,
    )?;

    let mut out = EngineOutput {
        graph: prev_graph,
        vertices: request.positioned_vertices.clone(),
        edges: request.positioned_edges.clone(),
        dropped_edges: Vec::new(),
        moved_vertices: Vec::new(),
        shift: Point::default(),
        warnings: Vec::new(),
    };
    if request.new_edges.is_empty() {
        return Ok(out);
    }

    let dot_vertices: Vec<DotVertex> = pinned
        .iter()
        .map(|v| DotVertex {
            key: v.key.clone(),
            width: v.width,
            height: v.height,
            pos: Some(Point { x: v.x, y: v.y }),
        })
        .collect();
    let plain = layout_plain(
        backend,
        EngineKind::Neato,
        &request.new_edges,
        &dot_vertices,
        &input.options,
        true,
    )?;
    validity::check_vertices(
        pinned.iter().map(|v| (&*v.key, v.width, v.height)),
        &plain.vertices,
    )?;
    out.warnings = validity::position_drift(&pinned, &plain.vertices);

    let (routed, dropped) = collect_routes(&request.new_edges, &plain.edges, &graph_to_dot(&prev_graph));
    out.edges.extend(routed);
    out.dropped_edges = dropped;
    Ok(out)
}
