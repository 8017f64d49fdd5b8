//! Conversion between engine space and presentation space.
//!
//! Engine space is Graphviz's: inches, node positions at the box center, `y` growing upwards from
//! the bottom of the drawing. Presentation space is pixels with `left`/`top` at the box corner
//! and `y` growing downwards. Flipping `y` needs the height of the drawing the record belongs to.
//! No rounding happens in either direction, so each pair of functions are inverses.

use crate::types::{LayoutEdge, LayoutGraph, LayoutVertex, Point, SizeVertex};
use std::sync::Arc;

pub const DPI: f64 = 72.0;

/// A vertex in engine space. `x`/`y` are the box center.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineVertex {
    pub key: Arc<str>,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

pub fn size_vertex_to_dot(v: &SizeVertex) -> SizeVertex {
    SizeVertex {
        key: v.key.clone(),
        width: v.width / DPI,
        height: v.height / DPI,
    }
}

/// `prev_graph` is the presentation-space graph `v` was drawn in.
pub fn layout_vertex_to_dot(v: &LayoutVertex, prev_graph: &LayoutGraph) -> EngineVertex {
    let width = v.width / DPI;
    let height = v.height / DPI;
    EngineVertex {
        key: v.key.clone(),
        width,
        height,
        x: v.left / DPI + width / 2.0,
        y: (prev_graph.height - v.top - v.height / 2.0) / DPI,
    }
}

/// `graph` is the engine-space graph `v` belongs to.
pub fn vertex_to_pixels(graph: &LayoutGraph, v: &EngineVertex) -> LayoutVertex {
    LayoutVertex {
        key: v.key.clone(),
        width: v.width * DPI,
        height: v.height * DPI,
        left: (v.x - v.width / 2.0) * DPI,
        top: (graph.height - v.y - v.height / 2.0) * DPI,
    }
}

pub fn graph_to_dot(graph: &LayoutGraph) -> LayoutGraph {
    LayoutGraph {
        width: graph.width / DPI,
        height: graph.height / DPI,
        scale: graph.scale,
    }
}

pub fn graph_to_pixels(graph: &LayoutGraph) -> LayoutGraph {
    LayoutGraph {
        width: graph.width * DPI,
        height: graph.height * DPI,
        scale: graph.scale,
    }
}

/// Only the translation changes scale; path points stay in whatever space they were drawn in.
pub fn edge_to_dot(e: &LayoutEdge) -> LayoutEdge {
    LayoutEdge {
        translate: e.translate.map(|t| Point {
            x: t.x / DPI,
            y: t.y / DPI,
        }),
        ..e.clone()
    }
}

/// Engine-space edges carry points in inches with `y` up; translated edges only carry an offset,
/// already oriented for presentation.
pub fn edge_to_pixels(graph: &LayoutGraph, e: &LayoutEdge) -> LayoutEdge {
    if let Some(t) = e.translate {
        return LayoutEdge {
            translate: Some(Point {
                x: t.x * DPI,
                y: t.y * DPI,
            }),
            ..e.clone()
        };
    }
    LayoutEdge {
        edge: e.edge.clone(),
        path_points: e
            .path_points
            .iter()
            .map(|[x, y]| [x * DPI, (graph.height - y) * DPI])
            .collect(),
        translate: None,
    }
}

/// Inverse of [`edge_to_pixels`] for freshly routed edges.
pub fn edge_points_to_dot(graph_px: &LayoutGraph, points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    points
        .iter()
        .map(|[x, y]| [x / DPI, (graph_px.height - y) / DPI])
        .collect()
}
