//! Layered (Sugiyama-style) layout.
//!
//! The pipeline runs in a top-to-bottom coordinate system and rotates the result afterwards:
//! break cycles, rank by network simplex, split long edges with dummy nodes, order each rank to
//! reduce crossings, place nodes with Brandes-Köpf, route edges through the dummy chain.

mod acyclic;
mod coordinate_system;
mod order;
mod position;
mod rank;

use super::HierarchicalOptions;
use crate::error::Result;
use crate::graph::{EdgeRoute, Graph, LayoutResult, Point};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub(crate) struct WorkNode {
    pub width: f64,
    pub height: f64,
    pub dummy: bool,
    pub rank: usize,
    pub x: f64,
    pub y: f64,
}

impl WorkNode {
    fn dummy() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            dummy: true,
            rank: 0,
            x: 0.0,
            y: 0.0,
        }
    }
}

/// A directed edge between two work nodes. After `acyclic::run` every edge points downwards.
#[derive(Debug, Clone)]
pub(crate) struct WorkEdge {
    pub source: usize,
    pub target: usize,
    pub reversed: bool,
    /// Index into the input graph's edge list.
    pub original: usize,
}

#[derive(Debug, Default)]
pub(crate) struct WorkGraph {
    pub nodes: Vec<WorkNode>,
    pub edges: Vec<WorkEdge>,
}

impl WorkGraph {
    pub fn successors(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.nodes.len()];
        for e in &self.edges {
            out[e.source].push(e.target);
        }
        out
    }

    pub fn predecessors(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.nodes.len()];
        for e in &self.edges {
            out[e.target].push(e.source);
        }
        out
    }
}

pub fn layout(graph: &Graph, opts: &HierarchicalOptions) -> Result<LayoutResult> {
    graph.validate()?;
    let index = graph.node_index();

    let mut g = WorkGraph {
        nodes: graph
            .nodes
            .iter()
            .map(|n| WorkNode {
                width: n.width,
                height: n.height,
                dummy: false,
                rank: 0,
                x: 0.0,
                y: 0.0,
            })
            .collect(),
        edges: Vec::new(),
    };
    let mut self_loops: Vec<usize> = Vec::new();
    for (ix, e) in graph.edges.iter().enumerate() {
        let (Some(&source), Some(&target)) =
            (index.get(e.source.as_str()), index.get(e.target.as_str()))
        else {
            continue;
        };
        if source == target {
            self_loops.push(ix);
            continue;
        }
        g.edges.push(WorkEdge {
            source,
            target,
            reversed: false,
            original: ix,
        });
    }

    coordinate_system::adjust(&mut g, opts.rankdir);
    acyclic::run(&mut g);
    rank::assign(&mut g);
    let chains = split_long_edges(&mut g);
    let layers = order::run(&g, opts.order_iterations);
    position::run(&mut g, &layers, opts);

    let mut routes: Vec<Vec<Point>> = vec![Vec::new(); graph.edges.len()];
    for (original, chain, reversed) in &chains {
        routes[*original] = route_chain(&g, chain, *reversed);
    }
    for &ix in &self_loops {
        if let Some(&node) = index.get(graph.edges[ix].source.as_str()) {
            routes[ix] = route_self_loop(&g.nodes[node], opts.nodesep);
        }
    }

    coordinate_system::undo(&mut g, &mut routes, opts.rankdir);

    let (width, height) = translate_to_origin(&mut g.nodes[..graph.nodes.len()], &mut routes);

    let positions: BTreeMap<String, Point> = graph
        .nodes
        .iter()
        .zip(&g.nodes)
        .map(|(n, w)| (n.id.clone(), Point { x: w.x, y: w.y }))
        .collect();
    let edges = graph
        .edges
        .iter()
        .zip(routes)
        .map(|(e, points)| EdgeRoute {
            id: e.id.clone(),
            source: e.source.clone(),
            target: e.target.clone(),
            points,
        })
        .collect();

    Ok(LayoutResult {
        width,
        height,
        positions,
        edges,
    })
}

/// Replaces every edge spanning more than one rank with a chain of dummy nodes.
///
/// Returns `(original edge index, node chain from upper to lower rank, reversed)` per input edge.
fn split_long_edges(g: &mut WorkGraph) -> Vec<(usize, Vec<usize>, bool)> {
    let edges = std::mem::take(&mut g.edges);
    let mut chains = Vec::with_capacity(edges.len());
    for e in edges {
        let mut chain = vec![e.source];
        let mut prev = e.source;
        for rank in g.nodes[e.source].rank + 1..g.nodes[e.target].rank {
            let dummy = g.nodes.len();
            g.nodes.push(WorkNode {
                rank,
                ..WorkNode::dummy()
            });
            g.edges.push(WorkEdge {
                source: prev,
                target: dummy,
                ..e
            });
            chain.push(dummy);
            prev = dummy;
        }
        g.edges.push(WorkEdge {
            source: prev,
            target: e.target,
            ..e
        });
        chain.push(e.target);
        chains.push((e.original, chain, e.reversed));
    }
    chains
}

fn route_chain(g: &WorkGraph, chain: &[usize], reversed: bool) -> Vec<Point> {
    let mut points = Vec::with_capacity(chain.len());
    let Some((&first, rest)) = chain.split_first() else {
        return points;
    };
    let src = &g.nodes[first];
    points.push(Point {
        x: src.x,
        y: src.y + src.height / 2.0,
    });
    for (i, &ix) in rest.iter().enumerate() {
        let n = &g.nodes[ix];
        if i + 1 == rest.len() {
            points.push(Point {
                x: n.x,
                y: n.y - n.height / 2.0,
            });
        } else {
            points.push(Point { x: n.x, y: n.y });
        }
    }
    if reversed {
        points.reverse();
    }
    points
}

fn route_self_loop(n: &WorkNode, nodesep: f64) -> Vec<Point> {
    let right = n.x + n.width / 2.0;
    let reach = right + nodesep / 2.0;
    let dy = n.height / 4.0;
    vec![
        Point {
            x: right,
            y: n.y - dy,
        },
        Point {
            x: reach,
            y: n.y - dy,
        },
        Point {
            x: reach,
            y: n.y + dy,
        },
        Point {
            x: right,
            y: n.y + dy,
        },
    ]
}

fn translate_to_origin(nodes: &mut [WorkNode], routes: &mut [Vec<Point>]) -> (f64, f64) {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for n in nodes.iter() {
        min_x = min_x.min(n.x - n.width / 2.0);
        min_y = min_y.min(n.y - n.height / 2.0);
        max_x = max_x.max(n.x + n.width / 2.0);
        max_y = max_y.max(n.y + n.height / 2.0);
    }
    for p in routes.iter().flatten() {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    if !min_x.is_finite() {
        return (0.0, 0.0);
    }

    for n in nodes.iter_mut() {
        n.x -= min_x;
        n.y -= min_y;
    }
    for p in routes.iter_mut().flatten() {
        p.x -= min_x;
        p.y -= min_y;
    }
    (max_x - min_x, max_y - min_y)
}
