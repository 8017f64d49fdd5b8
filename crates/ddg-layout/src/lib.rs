#![forbid(unsafe_code)]

//! Incremental layout for deep dependency graphs.
//!
//! [`LayoutManager`] accepts layout requests and hands back futures for the two results of each:
//! vertex positions first, routed edges second. A newer request cancels the one in flight. The
//! work itself happens in [`engine`], which talks to a layout engine through DOT text in and
//! Graphviz `plain` text out ([`backend::LayoutBackend`]); the default backend runs `sirenia`
//! in-process and [`backend::GraphvizCommand`] shells out to Graphviz instead.
//!
//! When a previous drawing exists, new vertices are grafted onto it rather than laid out from
//! scratch, so vertices already on screen keep their place.

pub mod backend;
pub mod conv_coord;
pub mod coordinator;
pub mod dot;
pub mod engine;
pub mod error;
pub mod manager;
pub mod options;
pub mod plain;
pub mod types;

pub use backend::{Builtin, EngineKind, GraphvizCommand, LayoutBackend};
pub use coordinator::Coordinator;
pub use engine::{EngineInput, EngineOutput, Phase, compute};
pub use error::{Error, Result};
pub use manager::{
    Dispatch, LayoutFuture, LayoutHandles, LayoutManager, Outcome, Resolution, Update, UpdateKind,
    UpdateSink,
};
pub use options::LayoutOptions;
pub use types::{
    Edge, LayoutDone, LayoutEdge, LayoutGraph, LayoutInput, LayoutVertex, Point, PositionsDone,
    SizeVertex,
};
