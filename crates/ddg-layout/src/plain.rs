//! Graphviz `-Tplain` output.
//!
//! ```text
//! graph scale width height
//! node name x y width height label style shape color fillcolor
//! edge tail head n x1 y1 .. xn yn [label xl yl] style color
//! stop
//! ```
//!
//! All values are engine space: inches, node centers, `y` up.

use crate::conv_coord::EngineVertex;
use crate::error::{Error, Result};
use crate::types::{Edge, LayoutEdge, LayoutGraph};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub struct PlainOutput {
    pub graph: LayoutGraph,
    pub vertices: Vec<EngineVertex>,
    pub edges: Vec<LayoutEdge>,
}

pub fn parse_plain(text: &str, include_edges: bool) -> Result<PlainOutput> {
    let mut graph: Option<LayoutGraph> = None;
    let mut vertices = Vec::new();
    let mut edges = Vec::new();

    for (line_idx, raw) in text.lines().enumerate() {
        let line = line_idx + 1;
        let err = |message: String| Error::PlainParse { line, message };
        let tokens = tokenize(raw).map_err(err)?;
        let Some(kind) = tokens.first() else {
            continue;
        };
        let num = |i: usize| -> Result<f64> {
            let tok = tokens
                .get(i)
                .ok_or_else(|| err(format!("missing field {i}")))?;
            tok.parse::<f64>()
                .map_err(|_| err(format!("expected a number, found {tok:?}")))
        };
        match kind.as_str() {
            "graph" => {
                graph = Some(LayoutGraph {
                    scale: num(1)?,
                    width: num(2)?,
                    height: num(3)?,
                });
            }
            "node" => {
                let key = tokens
                    .get(1)
                    .ok_or_else(|| err("missing node name".to_string()))?;
                vertices.push(EngineVertex {
                    key: key.as_str().into(),
                    x: num(2)?,
                    y: num(3)?,
                    width: num(4)?,
                    height: num(5)?,
                });
            }
            "edge" if include_edges => {
                let (Some(from), Some(to)) = (tokens.get(1), tokens.get(2)) else {
                    return Err(err("missing edge endpoints".to_string()));
                };
                let available = tokens.len().saturating_sub(4) / 2;
                let n = tokens
                    .get(3)
                    .and_then(|tok| tok.parse::<usize>().ok())
                    .ok_or_else(|| err("expected a point count".to_string()))?;
                if n > available {
                    return Err(err(format!(
                        "edge declares {n} points but only {available} follow"
                    )));
                }
                let mut path_points = Vec::with_capacity(n);
                for i in 0..n {
                    path_points.push([num(4 + 2 * i)?, num(5 + 2 * i)?]);
                }
                edges.push(LayoutEdge {
                    edge: Edge::new(from.as_str(), to.as_str()),
                    path_points,
                    translate: None,
                });
            }
            "edge" => {}
            "stop" => break,
            other => return Err(err(format!("unknown record {other:?}"))),
        }
    }

    let graph = graph.ok_or(Error::PlainParse {
        line: 0,
        message: "missing graph record".to_string(),
    })?;
    Ok(PlainOutput {
        graph,
        vertices,
        edges,
    })
}

pub fn write_plain(out: &PlainOutput) -> String {
    let mut s = String::new();
    let g = &out.graph;
    let _ = writeln!(s, "graph {} {} {}", g.scale, g.width, g.height);
    for v in &out.vertices {
        let _ = writeln!(
            s,
            "node {} {} {} {} {} \"\" solid box black lightgrey",
            quote(&v.key),
            v.x,
            v.y,
            v.width,
            v.height
        );
    }
    for e in &out.edges {
        let _ = write!(
            s,
            "edge {} {} {}",
            quote(&e.edge.from),
            quote(&e.edge.to),
            e.path_points.len()
        );
        for [x, y] in &e.path_points {
            let _ = write!(s, " {x} {y}");
        }
        s.push_str(" solid black\n");
    }
    s.push_str("stop\n");
    s
}

fn quote(name: &str) -> String {
    let simple = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if simple {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for ch in name.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

fn tokenize(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        if ch == '"' {
            chars.next();
            let mut tok = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(c @ ('"' | '\\')) => tok.push(c),
                        Some(c) => {
                            tok.push('\\');
                            tok.push(c);
                        }
                        None => return Err("unterminated quoted name".to_string()),
                    },
                    Some(c) => tok.push(c),
                    None => return Err("unterminated quoted name".to_string()),
                }
            }
            tokens.push(tok);
        } else {
            let mut tok = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                tok.push(c);
                chars.next();
            }
            tokens.push(tok);
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "graph 1 2.5 3.25
node a 1.25 2.75 0.75 0.5 \"\" solid box black lightgrey
node \"svc::op|x\" 1.25 0.5 1.5 0.5 \"\" solid box black lightgrey
edge a \"svc::op|x\" 4 1.25 2.5 1.25 2 1.25 1.5 1.25 0.75 solid black
stop
";

    #[test]
    fn parses_graphviz_records() {
        let out = parse_plain(SAMPLE, true).unwrap();
        assert_eq!(out.graph.width, 2.5);
        assert_eq!(out.graph.height, 3.25);
        assert_eq!(out.vertices.len(), 2);
        assert_eq!(&*out.vertices[1].key, "svc::op|x");
        assert_eq!(out.vertices[1].width, 1.5);
        assert_eq!(out.edges.len(), 1);
        assert_eq!(out.edges[0].path_points.len(), 4);
        assert_eq!(out.edges[0].path_points[3], [1.25, 0.75]);
    }

    #[test]
    fn edges_are_skipped_on_request() {
        let out = parse_plain(SAMPLE, false).unwrap();
        assert!(out.edges.is_empty());
        assert_eq!(out.vertices.len(), 2);
    }

    #[test]
    fn written_output_parses_back() {
        let out = parse_plain(SAMPLE, true).unwrap();
        assert_eq!(parse_plain(&write_plain(&out), true).unwrap(), out);
    }

    #[test]
    fn bad_numbers_report_the_line() {
        let err = parse_plain("graph 1 2 3\nnode a x 1 1 1\n", true).unwrap_err();
        assert!(matches!(err, Error::PlainParse { line: 2, .. }));
        assert!(parse_plain("node a 1 1 1 1\n", true).is_err());
    }

    #[test]
    fn point_counts_are_bounded_by_the_line() {
        let text = "graph 1 2 3\nedge a b 18446744073709551615 0 0 1 1 solid black\nstop\n";
        let err = parse_plain(text, true).unwrap_err();
        assert!(matches!(err, Error::PlainParse { line: 2, .. }));
        assert!(parse_plain("graph 1 2 3\nedge a b -1 0 0\n", true).is_err());
        assert!(parse_plain("graph 1 2 3\nedge a b 3 0 0 1 1\n", true).is_err());
    }
}
