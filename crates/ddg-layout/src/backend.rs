//! Layout engines behind the textual boundary: DOT in, plain out.

use crate::conv_coord::EngineVertex;
use crate::dot::{DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH, DotGraph, parse_dot};
use crate::error::{Error, Result};
use crate::plain::{PlainOutput, write_plain};
use crate::types::{Edge, LayoutEdge, LayoutGraph};
use sirenia::{Algorithm, ForceOptions, HierarchicalOptions, RankDir};
use std::io::Write as _;
use std::process::{Command, Stdio};

/// Graphviz defaults, in inches.
const DEFAULT_NODESEP: f64 = 0.25;
const DEFAULT_RANKSEP: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Layered layout.
    Dot,
    /// Force-directed layout; honors pinned `pos="x,y!"` nodes.
    Neato,
}

impl EngineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Neato => "neato",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns DOT text into Graphviz plain text.
pub trait LayoutBackend: Send + Sync {
    fn run(&self, engine: EngineKind, dot: &str, total_memory: Option<usize>) -> Result<String>;
}

/// In-process engine backed by `sirenia`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Builtin;

impl LayoutBackend for Builtin {
    fn run(&self, engine: EngineKind, dot: &str, total_memory: Option<usize>) -> Result<String> {
        if let Some(limit) = total_memory.filter(|limit| dot.len() > *limit) {
            return Err(Error::MemoryExceeded {
                needed: dot.len(),
                limit,
            });
        }
        let parsed = parse_dot(dot)?;
        let graph = to_sirenia(&parsed);
        let out = match engine {
            EngineKind::Dot => {
                let rankdir = match parsed.attrs.get("rankdir") {
                    Some(raw) => raw.parse().map_err(|_| Error::DotParse {
                        offset: 0,
                        message: format!("unknown rankdir {raw:?}"),
                    })?,
                    None => RankDir::TB,
                };
                let opts = HierarchicalOptions {
                    rankdir,
                    nodesep: parsed.graph_f64("nodesep").unwrap_or(DEFAULT_NODESEP),
                    ranksep: parsed.graph_f64("ranksep").unwrap_or(DEFAULT_RANKSEP),
                    ..Default::default()
                };
                let result = sirenia::layout(&graph, &Algorithm::Hierarchical(opts))?;
                // Top-down output; plain is y-up.
                let height = result.height;
                plain_from(&graph, &result, |y| height - y)
            }
            EngineKind::Neato => {
                let opts = ForceOptions {
                    ideal_edge_length: parsed.graph_f64("ranksep").unwrap_or(1.0).max(0.5),
                    ..Default::default()
                };
                let result = sirenia::layout(&graph, &Algorithm::ForceDirected(opts))?;
                plain_from(&graph, &result, |y| y)
            }
        };
        Ok(write_plain(&out))
    }
}

fn to_sirenia(parsed: &DotGraph) -> sirenia::Graph {
    let nodes = parsed
        .nodes
        .keys()
        .map(|id| {
            let node = sirenia::Node::new(
                id.as_str(),
                parsed.node_f64(id, "width").unwrap_or(DEFAULT_NODE_WIDTH),
                parsed.node_f64(id, "height").unwrap_or(DEFAULT_NODE_HEIGHT),
            );
            match parsed.node_pos(id) {
                Some(p) => node.pinned_at(p.x, p.y),
                None => node,
            }
        })
        .collect();
    let edges = parsed
        .edges
        .iter()
        .enumerate()
        .map(|(i, e)| sirenia::Edge::new(format!("e{i}"), e.from.as_str(), e.to.as_str()))
        .collect();
    sirenia::Graph { nodes, edges }
}

fn plain_from(
    graph: &sirenia::Graph,
    result: &sirenia::LayoutResult,
    flip: impl Fn(f64) -> f64,
) -> PlainOutput {
    let vertices = graph
        .nodes
        .iter()
        .filter_map(|n| {
            let p = result.positions.get(&n.id)?;
            Some(EngineVertex {
                key: n.id.as_str().into(),
                width: n.width,
                height: n.height,
                x: p.x,
                y: flip(p.y),
            })
        })
        .collect();
    let edges = result
        .edges
        .iter()
        .map(|r| LayoutEdge {
            edge: Edge::new(r.source.as_str(), r.target.as_str()),
            path_points: r.points.iter().map(|p| [p.x, flip(p.y)]).collect(),
            translate: None,
        })
        .collect();
    PlainOutput {
        graph: LayoutGraph {
            width: result.width,
            height: result.height,
            scale: 1.0,
        },
        vertices,
        edges,
    }
}

/// Shells out to a Graphviz binary (`dot`, or any program accepting `-K<engine> -Tplain`).
#[derive(Debug, Clone)]
pub struct GraphvizCommand {
    pub program: String,
}

impl GraphvizCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl LayoutBackend for GraphvizCommand {
    fn run(&self, engine: EngineKind, dot: &str, total_memory: Option<usize>) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(format!("-K{engine}")).arg("-Tplain");
        if let Some(limit) = total_memory {
            cmd.arg(format!("-Gtotalmemory={limit}"));
        }
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| Error::Graphviz {
                program: self.program.clone(),
                message: err.to_string(),
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(dot.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(Error::Graphviz {
                program: self.program.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        String::from_utf8(output.stdout).map_err(|err| Error::Graphviz {
            program: self.program.clone(),
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plain::parse_plain;

    const CHAIN: &str = r#"digraph G {
  graph [nodesep=1.5, rankdir=TB, ranksep=5];
  node [shape=box, fixedsize=true, label=""];
  "a" [width=1, height=0.5];
  "b" [width=2, height=0.5];
  "a" -> "b";
}
"#;

    #[test]
    fn hierarchical_output_is_y_up() {
        let plain = Builtin.run(EngineKind::Dot, CHAIN, None).unwrap();
        let out = parse_plain(&plain, true).unwrap();
        let a = out.vertices.iter().find(|v| &*v.key == "a").unwrap();
        let b = out.vertices.iter().find(|v| &*v.key == "b").unwrap();
        assert!(a.y > b.y);
        assert!((a.y - b.y - 5.5).abs() < 1e-9);
        assert!((b.width - 2.0).abs() < 1e-3);
        assert_eq!(out.edges.len(), 1);
    }

    #[test]
    fn pinned_nodes_stay_put_under_neato() {
        let dot = r#"digraph G {
  "a" [width=1, height=0.5, pos="3,4!"];
  "b" [width=1, height=0.5, pos="3,1!"];
  "a" -> "b";
}"#;
        let out = parse_plain(&Builtin.run(EngineKind::Neato, dot, None).unwrap(), true).unwrap();
        assert_eq!(out.vertices[0].x, 3.0);
        assert_eq!(out.vertices[0].y, 4.0);
        assert_eq!(out.vertices[1].y, 1.0);
        assert_eq!(out.edges.len(), 1);
    }

    #[test]
    fn memory_limit_bounds_the_input() {
        let err = Builtin.run(EngineKind::Dot, CHAIN, Some(10)).unwrap_err();
        assert!(matches!(err, Error::MemoryExceeded { limit: 10, .. }));
    }

    #[test]
    fn missing_program_is_a_graphviz_error() {
        let backend = GraphvizCommand::new("ddg-layout-no-such-program");
        let err = backend.run(EngineKind::Dot, CHAIN, None).unwrap_err();
        assert!(matches!(err, Error::Graphviz { .. }));
    }
}
