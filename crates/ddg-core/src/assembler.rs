//! Incremental vertex/edge assembly.
//!
//! Vertices live in an arena keyed by monotonically allocated [`VertexId`]s, edges in an ordered
//! map keyed by [`EdgeId`]. Vertices refer to their edges by id, never by reference, so there are
//! no cycles to manage. Every revealed path element that has a focal-side neighbor supports
//! exactly one edge; an edge disappears when its support drops to zero or either endpoint dies.

use crate::error::{Error, Result};
use crate::model::{DdgModel, Density, PathElemId};
use crate::visibility;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssemblerOptions {
    pub density: Density,
    /// When false, vertex keys use service names only.
    pub show_op: bool,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            density: Density::default(),
            show_op: true,
        }
    }
}

impl AssemblerOptions {
    pub fn new(density: Density, show_op: bool) -> Self {
        Self { density, show_op }
    }
}

#[derive(Debug)]
struct Vertex {
    key: Arc<str>,
    path_elems: BTreeSet<PathElemId>,
    ingress: FxHashMap<VertexId, EdgeId>,
    egress: FxHashMap<VertexId, EdgeId>,
}

#[derive(Debug)]
struct EdgeEntry {
    from: VertexId,
    to: VertexId,
    support: usize,
}

/// A vertex of the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DdgVertex {
    pub key: Arc<str>,
    pub path_elems: Vec<PathElemId>,
}

/// An edge of the current snapshot, directed upstream to downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DdgEdge {
    pub from: Arc<str>,
    pub to: Arc<str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgesAndVertices {
    pub edges: Vec<DdgEdge>,
    pub vertices: Vec<DdgVertex>,
}

#[derive(Debug)]
pub struct GraphAssembler {
    model: Arc<DdgModel>,
    options: AssemblerOptions,
    next_vertex: u64,
    next_edge: u64,
    vertices: BTreeMap<VertexId, Vertex>,
    vertex_by_key: FxHashMap<Arc<str>, VertexId>,
    edges: BTreeMap<EdgeId, EdgeEntry>,
    edge_by_ends: FxHashMap<(VertexId, VertexId), EdgeId>,
    path_elem_to_vertex: FxHashMap<PathElemId, VertexId>,
    path_elem_to_edge: FxHashMap<PathElemId, EdgeId>,
    last_visibility_key: String,
}

impl GraphAssembler {
    pub fn new(model: Arc<DdgModel>) -> Self {
        Self::with_options(model, AssemblerOptions::default())
    }

    pub fn with_options(model: Arc<DdgModel>, options: AssemblerOptions) -> Self {
        Self {
            model,
            options,
            next_vertex: 0,
            next_edge: 0,
            vertices: BTreeMap::new(),
            vertex_by_key: FxHashMap::default(),
            edges: BTreeMap::new(),
            edge_by_ends: FxHashMap::default(),
            path_elem_to_vertex: FxHashMap::default(),
            path_elem_to_edge: FxHashMap::default(),
            last_visibility_key: String::new(),
        }
    }

    pub fn model(&self) -> &DdgModel {
        &self.model
    }

    pub fn options(&self) -> AssemblerOptions {
        self.options
    }

    pub fn last_visibility_key(&self) -> &str {
        &self.last_visibility_key
    }

    /// Brings the graph in line with `visibility_key` and returns the full current snapshot.
    ///
    /// Revealed indices are added in ascending order (so focal-side neighbors always come first),
    /// hidden ones removed in descending order. The whole change is checked before anything is
    /// applied, so on error neither the graph nor the recorded key changes.
    pub fn get_edges_and_vertices(&mut self, visibility_key: &str) -> Result<EdgesAndVertices> {
        let diff = visibility::compare(&self.last_visibility_key, visibility_key)?;
        let removed: BTreeSet<usize> = diff.removed.iter().copied().collect();
        let overlap: Vec<usize> = diff
            .added
            .iter()
            .copied()
            .filter(|i| removed.contains(i))
            .collect();
        if !overlap.is_empty() {
            return Err(Error::OverlappingVisibilityDiff { indices: overlap });
        }

        if !diff.is_empty() {
            tracing::debug!(
                added = diff.added.len(),
                removed = diff.removed.len(),
                "applying visibility change"
            );
        }

        let mut added = diff.added;
        added.sort_unstable();
        self.check_change(&added, &removed)?;
        for idx in added {
            self.add_path_elem(idx)?;
        }
        for idx in removed.into_iter().rev() {
            self.remove_path_elem(idx)?;
        }

        self.last_visibility_key = visibility_key.to_string();
        Ok(self.snapshot())
    }

    fn path_elem_for(&self, idx: usize) -> Result<PathElemId> {
        self.model
            .path_elem_for_visibility_idx(idx)
            .ok_or(Error::UnknownVisibilityIdx { idx })
    }

    fn key_for(&self, pe: PathElemId) -> String {
        self.model
            .vertex_key(pe, self.options.density, self.options.show_op)
    }

    /// Fails with the error the first offending index would raise mid-change.
    fn check_change(&self, added: &[usize], removed: &BTreeSet<usize>) -> Result<()> {
        let mut revealed: FxHashSet<PathElemId> = FxHashSet::default();
        for &idx in added {
            let pe = self.path_elem_for(idx)?;
            if let Some(neighbor) = self.model.focal_side_neighbor(pe) {
                if !self.path_elem_to_vertex.contains_key(&neighbor)
                    && !revealed.contains(&neighbor)
                {
                    return Err(Error::MissingFocalSideVertex {
                        idx,
                        key: self.key_for(pe),
                    });
                }
            }
            revealed.insert(pe);
        }
        for &idx in removed.iter().rev() {
            let pe = self.path_elem_for(idx)?;
            if !self.path_elem_to_vertex.contains_key(&pe) {
                return Err(Error::UnknownVertex {
                    idx,
                    key: self.key_for(pe),
                });
            }
        }
        Ok(())
    }

    fn add_path_elem(&mut self, idx: usize) -> Result<()> {
        let pe = self.path_elem_for(idx)?;
        let key = self.key_for(pe);
        let neighbor = match self.model.focal_side_neighbor(pe) {
            Some(neighbor) => match self.path_elem_to_vertex.get(&neighbor) {
                Some(&vertex) => Some(vertex),
                None => return Err(Error::MissingFocalSideVertex { idx, key }),
            },
            None => None,
        };

        let vertex_id = match self.vertex_by_key.get(key.as_str()) {
            Some(&id) => id,
            None => {
                let id = VertexId(self.next_vertex);
                self.next_vertex += 1;
                let key: Arc<str> = Arc::from(key.as_str());
                self.vertices.insert(
                    id,
                    Vertex {
                        key: key.clone(),
                        path_elems: BTreeSet::new(),
                        ingress: FxHashMap::default(),
                        egress: FxHashMap::default(),
                    },
                );
                self.vertex_by_key.insert(key, id);
                id
            }
        };
        if let Some(v) = self.vertices.get_mut(&vertex_id) {
            v.path_elems.insert(pe);
        }
        self.path_elem_to_vertex.insert(pe, vertex_id);

        let Some(neighbor_vertex) = neighbor else {
            return Ok(());
        };

        // Downstream elements hang below their neighbor, upstream ones above it.
        let (from, to) = if self.model.path_elem(pe).distance > 0 {
            (neighbor_vertex, vertex_id)
        } else {
            (vertex_id, neighbor_vertex)
        };
        let edge_id = match self.edge_by_ends.get(&(from, to)) {
            Some(&id) => id,
            None => self.insert_edge(from, to),
        };
        if let Some(edge) = self.edges.get_mut(&edge_id) {
            edge.support += 1;
        }
        self.path_elem_to_edge.insert(pe, edge_id);
        Ok(())
    }

    fn insert_edge(&mut self, from: VertexId, to: VertexId) -> EdgeId {
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(
            id,
            EdgeEntry {
                from,
                to,
                support: 0,
            },
        );
        self.edge_by_ends.insert((from, to), id);
        if let Some(v) = self.vertices.get_mut(&from) {
            v.egress.insert(to, id);
        }
        if let Some(v) = self.vertices.get_mut(&to) {
            v.ingress.insert(from, id);
        }
        id
    }

    fn remove_path_elem(&mut self, idx: usize) -> Result<()> {
        let pe = self.path_elem_for(idx)?;
        let Some(vertex_id) = self.path_elem_to_vertex.remove(&pe) else {
            return Err(Error::UnknownVertex {
                idx,
                key: self.key_for(pe),
            });
        };

        if let Some(edge_id) = self.path_elem_to_edge.remove(&pe) {
            let unsupported = match self.edges.get_mut(&edge_id) {
                Some(edge) => {
                    edge.support = edge.support.saturating_sub(1);
                    edge.support == 0
                }
                None => false,
            };
            if unsupported {
                self.remove_edge(edge_id);
            }
        }

        let emptied = match self.vertices.get_mut(&vertex_id) {
            Some(v) => {
                v.path_elems.remove(&pe);
                v.path_elems.is_empty()
            }
            None => false,
        };
        if emptied {
            self.remove_vertex(vertex_id);
        }
        Ok(())
    }

    fn remove_edge(&mut self, id: EdgeId) {
        let Some(edge) = self.edges.remove(&id) else {
            return;
        };
        self.edge_by_ends.remove(&(edge.from, edge.to));
        if let Some(v) = self.vertices.get_mut(&edge.from) {
            v.egress.remove(&edge.to);
        }
        if let Some(v) = self.vertices.get_mut(&edge.to) {
            v.ingress.remove(&edge.from);
        }
    }

    fn remove_vertex(&mut self, id: VertexId) {
        let Some(vertex) = self.vertices.remove(&id) else {
            return;
        };
        self.vertex_by_key.remove(&vertex.key);
        let incident: Vec<EdgeId> = vertex
            .egress
            .values()
            .chain(vertex.ingress.values())
            .copied()
            .collect();
        for edge_id in incident {
            self.remove_edge(edge_id);
        }
    }

    /// The current graph, vertices and edges in creation order.
    pub fn snapshot(&self) -> EdgesAndVertices {
        let key_of = |id: &VertexId| -> Option<Arc<str>> {
            self.vertices.get(id).map(|v| v.key.clone())
        };
        EdgesAndVertices {
            edges: self
                .edges
                .values()
                .filter_map(|e| {
                    Some(DdgEdge {
                        from: key_of(&e.from)?,
                        to: key_of(&e.to)?,
                    })
                })
                .collect(),
            vertices: self
                .vertices
                .values()
                .map(|v| DdgVertex {
                    key: v.key.clone(),
                    path_elems: v.path_elems.iter().copied().collect(),
                })
                .collect(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
