#![forbid(unsafe_code)]

//! Headless graph layout algorithms.
//!
//! `sirenia` is the in-process layout engine behind `ddg-layout`'s builtin backend. It offers a
//! layered (hierarchical) layout for the final drawing and a force-directed layout used to route
//! edges once node positions are fixed. Both are deterministic for a given input.

pub mod algo;
pub mod error;
pub mod graph;

pub use algo::{Algorithm, ForceOptions, HierarchicalOptions, RankDir};
pub use error::{Error, Result};
pub use graph::{Edge, EdgeRoute, Graph, LayoutResult, Node, Point};

/// Headless layout entry point.
pub fn layout(graph: &Graph, algorithm: &Algorithm) -> Result<LayoutResult> {
    match algorithm {
        Algorithm::Hierarchical(opts) => algo::hierarchical::layout(graph, opts),
        Algorithm::ForceDirected(opts) => algo::force::layout(graph, opts),
    }
}
