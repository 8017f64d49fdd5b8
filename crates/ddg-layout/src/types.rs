//! Layout records in presentation space: pixels, `top`/`left` at the box corner, `y` down.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A directed edge between two vertex keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub from: Arc<str>,
    pub to: Arc<str>,
}

impl Edge {
    pub fn new(from: impl Into<Arc<str>>, to: impl Into<Arc<str>>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl From<&ddg_core::DdgEdge> for Edge {
    fn from(e: &ddg_core::DdgEdge) -> Self {
        Self {
            from: e.from.clone(),
            to: e.to.clone(),
        }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// A vertex whose size is known but which has not been placed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeVertex {
    pub key: Arc<str>,
    pub width: f64,
    pub height: f64,
}

impl SizeVertex {
    pub fn new(key: impl Into<Arc<str>>, width: f64, height: f64) -> Self {
        Self {
            key: key.into(),
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutVertex {
    pub key: Arc<str>,
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

impl LayoutVertex {
    pub fn size(&self) -> SizeVertex {
        SizeVertex {
            key: self.key.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

/// A routed edge. When `translate` is set the edge kept its old `path_points` and the drawing
/// should offset them by `translate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutEdge {
    pub edge: Edge,
    pub path_points: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate: Option<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutGraph {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

/// Positions are known; edges may still be missing geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsDone {
    pub graph: LayoutGraph,
    pub vertices: Vec<LayoutVertex>,
    /// Edges whose geometry is already known (translated or grafted).
    pub edges: Vec<LayoutEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDone {
    pub graph: LayoutGraph,
    pub vertices: Vec<LayoutVertex>,
    pub edges: Vec<LayoutEdge>,
    /// Edges that could not be translated and were not routed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unrouted_edges: Vec<Edge>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// What the caller wants laid out. Vertices already on screen go in `positioned_*` together with
/// the graph they were drawn in; everything else goes in `new_*`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutInput {
    pub positioned_vertices: Vec<LayoutVertex>,
    pub new_vertices: Vec<SizeVertex>,
    pub positioned_edges: Vec<LayoutEdge>,
    pub new_edges: Vec<Edge>,
    pub prev_graph: Option<LayoutGraph>,
}

impl LayoutInput {
    /// A layout from scratch.
    pub fn fresh(edges: Vec<Edge>, vertices: Vec<SizeVertex>) -> Self {
        Self {
            new_vertices: vertices,
            new_edges: edges,
            ..Default::default()
        }
    }

    /// Splits the current graph against a finished layout: whatever the previous layout placed
    /// keeps its geometry, everything else is new.
    pub fn from_previous(previous: &LayoutDone, edges: &[Edge], vertices: &[SizeVertex]) -> Self {
        let placed: rustc_hash::FxHashMap<&str, &LayoutVertex> = previous
            .vertices
            .iter()
            .map(|v| (&*v.key, v))
            .collect();
        let routed: rustc_hash::FxHashMap<&Edge, &LayoutEdge> =
            previous.edges.iter().map(|e| (&e.edge, e)).collect();

        let mut input = Self {
            prev_graph: Some(previous.graph),
            ..Default::default()
        };
        for v in vertices {
            match placed.get(&*v.key) {
                Some(p) if p.width == v.width && p.height == v.height => {
                    input.positioned_vertices.push((*p).clone())
                }
                _ => input.new_vertices.push(v.clone()),
            }
        }
        let positioned: rustc_hash::FxHashSet<&str> = input
            .positioned_vertices
            .iter()
            .map(|v| &*v.key)
            .collect();
        for e in edges {
            match routed.get(e) {
                Some(le) if positioned.contains(&*e.from) && positioned.contains(&*e.to) => {
                    input.positioned_edges.push((*le).clone())
                }
                _ => input.new_edges.push(e.clone()),
            }
        }
        if input.positioned_vertices.is_empty() {
            input.prev_graph = None;
        }
        input
    }
}
