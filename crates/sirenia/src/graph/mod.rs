use crate::error::{Error, Result};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn validate(&self) -> Result<()> {
        let mut seen: FxHashMap<&str, ()> = FxHashMap::default();
        for n in &self.nodes {
            if seen.insert(n.id.as_str(), ()).is_some() {
                return Err(Error::DuplicateNode {
                    node_id: n.id.clone(),
                });
            }
            if !(n.width.is_finite() && n.height.is_finite() && n.width >= 0.0 && n.height >= 0.0)
            {
                return Err(Error::InvalidNodeSize {
                    node_id: n.id.clone(),
                    width: n.width,
                    height: n.height,
                });
            }
        }
        for e in &self.edges {
            if !seen.contains_key(e.source.as_str()) || !seen.contains_key(e.target.as_str()) {
                return Err(Error::MissingEndpoint {
                    edge_id: e.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Maps node ids to their position in `nodes`.
    pub(crate) fn node_index(&self) -> FxHashMap<&str, usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, n)| (n.id.as_str(), idx))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub width: f64,
    pub height: f64,
    /// Fixed center position. Only honored by the force-directed layout; pinned nodes never move.
    pub pinned: Option<Point>,
}

impl Node {
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            pinned: None,
        }
    }

    pub fn pinned_at(mut self, x: f64, y: f64) -> Self {
        self.pinned = Some(Point { x, y });
        self
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct EdgeRoute {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Polyline from the source boundary to the target boundary.
    pub points: Vec<Point>,
}

/// Layout output in a top-down coordinate system.
///
/// `positions` holds node centers. Unless nodes were pinned, the drawing is translated so its
/// bounding box starts at the origin; `width` and `height` are the extents of that box.
#[derive(Debug, Clone)]
pub struct LayoutResult {
    pub width: f64,
    pub height: f64,
    pub positions: std::collections::BTreeMap<String, Point>,
    pub edges: Vec<EdgeRoute>,
}
