#![forbid(unsafe_code)]

//! Deep dependency graph (DDG) model.
//!
//! A DDG is built from root-to-leaf service/operation paths that all pass through one focal
//! node. [`model::DdgModel`] indexes every path element by its distance from the focal node and
//! gives each a dense visibility index; [`visibility`] encodes sets of those indices as compact
//! keys; [`assembler::GraphAssembler`] turns a key into a deduplicated vertex/edge graph and keeps
//! it up to date as the key changes, doing work proportional to the change.

pub mod assembler;
pub mod error;
pub mod model;
pub mod payload;
pub mod visibility;

pub use assembler::{AssemblerOptions, DdgEdge, DdgVertex, EdgesAndVertices, GraphAssembler};
pub use error::{Error, Result};
pub use model::{DdgModel, Density, FocalNode, PathElemId};
pub use payload::{PayloadHop, PayloadPath, parse_payload};
pub use visibility::VisibilityDiff;
