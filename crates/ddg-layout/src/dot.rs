//! DOT text: what the layout engines consume.
//!
//! [`to_dot`] writes the subset the engines need; [`parse_dot`] reads that subset back (plus
//! comments, `graph`-level `key=value` statements and edge chains) for the in-process backend.

use crate::error::{Error, Result};
use crate::options::LayoutOptions;
use crate::types::{Edge, Point};
use indexmap::IndexMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// Graphviz defaults for nodes without an explicit size, in inches.
pub const DEFAULT_NODE_WIDTH: f64 = 0.75;
pub const DEFAULT_NODE_HEIGHT: f64 = 0.5;

/// A node as written to DOT. Sizes and positions are in inches; `pos` pins the node center.
#[derive(Debug, Clone, PartialEq)]
pub struct DotVertex {
    pub key: Arc<str>,
    pub width: f64,
    pub height: f64,
    pub pos: Option<Point>,
}

pub fn to_dot(edges: &[Edge], vertices: &[DotVertex], options: &LayoutOptions) -> String {
    let mut out = String::new();
    out.push_str("digraph G {\n");
    let _ = writeln!(
        out,
        "  graph [nodesep={}, rankdir={}, ranksep={}, splines={}];",
        options.nodesep,
        options.rankdir,
        options.ranksep,
        quote(&options.splines)
    );
    out.push_str("  node [shape=box, fixedsize=true, label=\"\"];\n");
    for v in vertices {
        let _ = write!(
            out,
            "  {} [width={}, height={}",
            quote(&v.key),
            v.width,
            v.height
        );
        if let Some(p) = v.pos {
            let _ = write!(out, ", pos=\"{},{}!\"", p.x, p.y);
        }
        out.push_str("];\n");
    }
    for e in edges {
        let _ = writeln!(out, "  {} -> {};", quote(&e.from), quote(&e.to));
    }
    out.push_str("}\n");
    out
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

pub type Attrs = IndexMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DotGraph {
    pub directed: bool,
    pub attrs: Attrs,
    /// Nodes in first-mention order with their own attributes merged over `node [...]` defaults.
    pub nodes: IndexMap<String, Attrs>,
    pub edges: Vec<DotEdge>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DotEdge {
    pub from: String,
    pub to: String,
    pub attrs: Attrs,
}

impl DotGraph {
    pub fn node_f64(&self, id: &str, attr: &str) -> Option<f64> {
        self.nodes.get(id)?.get(attr)?.trim().parse().ok()
    }

    pub fn graph_f64(&self, attr: &str) -> Option<f64> {
        self.attrs.get(attr)?.trim().parse().ok()
    }

    /// `pos="x,y"` or `pos="x,y!"`.
    pub fn node_pos(&self, id: &str) -> Option<Point> {
        let raw = self.nodes.get(id)?.get("pos")?;
        let (x, y) = raw.trim().trim_end_matches('!').split_once(',')?;
        Some(Point {
            x: x.trim().parse().ok()?,
            y: y.trim().parse().ok()?,
        })
    }
}

pub fn parse_dot(input: &str) -> Result<DotGraph> {
    DotParser::new(input).parse_graph()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Id(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Equals,
    Semi,
    Comma,
    Arrow,
}

struct DotParser<'a> {
    input: &'a str,
    pos: usize,
    peeked: Option<(usize, Token)>,
}

impl<'a> DotParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            peeked: None,
        }
    }

    fn err(&self, offset: usize, message: impl Into<String>) -> Error {
        Error::DotParse {
            offset,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            if let Some(ch) = rest.chars().next().filter(|c| c.is_whitespace()) {
                self.pos += ch.len_utf8();
            } else if rest.starts_with("//") || rest.starts_with('#') {
                let end = rest.find('\n').unwrap_or(rest.len());
                self.pos += end;
            } else if rest.starts_with("/*") {
                let end = rest[2..].find("*/").map_or(rest.len(), |i| i + 4);
                self.pos += end;
            } else {
                return;
            }
        }
    }

    fn lex(&mut self) -> Result<Option<(usize, Token)>> {
        self.skip_trivia();
        let start = self.pos;
        let Some(ch) = self.bump() else {
            return Ok(None);
        };
        let tok = match ch {
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '=' => Token::Equals,
            ';' => Token::Semi,
            ',' => Token::Comma,
            '-' if matches!(self.peek_char(), Some('>' | '-')) => {
                self.bump();
                Token::Arrow
            }
            '"' => Token::Id(self.lex_quoted(start)?),
            c if c.is_alphanumeric() || c == '_' || c == '.' || c == '-' => {
                let mut id = String::from(c);
                while let Some(c) = self.peek_char() {
                    if c.is_alphanumeric() || c == '_' || c == '.' {
                        id.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                Token::Id(id)
            }
            other => return Err(self.err(start, format!("unexpected character {other:?}"))),
        };
        Ok(Some((start, tok)))
    }

    fn lex_quoted(&mut self, start: usize) -> Result<String> {
        let mut out = String::new();
        while let Some(ch) = self.bump() {
            match ch {
                '"' => return Ok(out),
                '\\' => match self.bump() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    // Line continuation.
                    Some('\n') => {}
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => break,
                },
                c => out.push(c),
            }
        }
        Err(self.err(start, "unterminated quoted string"))
    }

    fn peek(&mut self) -> Result<Option<&Token>> {
        if self.peeked.is_none() {
            self.peeked = self.lex()?;
        }
        Ok(self.peeked.as_ref().map(|(_, t)| t))
    }

    fn next(&mut self) -> Result<Option<(usize, Token)>> {
        match self.peeked.take() {
            Some(t) => Ok(Some(t)),
            None => self.lex(),
        }
    }

    fn expect(&mut self, want: Token) -> Result<()> {
        match self.next()? {
            Some((_, t)) if t == want => Ok(()),
            Some((offset, t)) => Err(self.err(offset, format!("expected {want:?}, found {t:?}"))),
            None => Err(self.err(self.pos, format!("expected {want:?}, found end of input"))),
        }
    }

    fn expect_id(&mut self) -> Result<String> {
        match self.next()? {
            Some((_, Token::Id(id))) => Ok(id),
            Some((offset, t)) => Err(self.err(offset, format!("expected an id, found {t:?}"))),
            None => Err(self.err(self.pos, "expected an id, found end of input")),
        }
    }

    fn parse_graph(mut self) -> Result<DotGraph> {
        let mut graph = DotGraph::default();
        let mut keyword = self.expect_id()?;
        if keyword.eq_ignore_ascii_case("strict") {
            keyword = self.expect_id()?;
        }
        graph.directed = match keyword.to_ascii_lowercase().as_str() {
            "digraph" => true,
            "graph" => false,
            other => return Err(self.err(0, format!("expected graph or digraph, found {other}"))),
        };
        if matches!(self.peek()?, Some(Token::Id(_))) {
            self.expect_id()?;
        }
        self.expect(Token::LBrace)?;

        let mut node_defaults = Attrs::new();
        let mut edge_defaults = Attrs::new();
        loop {
            let Some((offset, tok)) = self.next()? else {
                return Err(self.err(self.pos, "missing closing brace"));
            };
            match tok {
                Token::RBrace => break,
                Token::Semi => continue,
                Token::Id(id) => {
                    let has_attrs = self.peek()? == Some(&Token::LBracket);
                    if has_attrs && id == "graph" {
                        graph.attrs.extend(self.parse_attr_list()?);
                    } else if has_attrs && id == "node" {
                        node_defaults.extend(self.parse_attr_list()?);
                    } else if has_attrs && id == "edge" {
                        edge_defaults.extend(self.parse_attr_list()?);
                    } else if id == "subgraph" {
                        return Err(self.err(offset, "subgraphs are not supported"));
                    } else {
                        self.parse_id_stmt(id, &mut graph, &node_defaults, &edge_defaults)?;
                    }
                }
                other => return Err(self.err(offset, format!("unexpected {other:?}"))),
            }
        }
        Ok(graph)
    }

    fn parse_id_stmt(
        &mut self,
        first: String,
        graph: &mut DotGraph,
        node_defaults: &Attrs,
        edge_defaults: &Attrs,
    ) -> Result<()> {
        match self.peek()?.cloned() {
            Some(Token::Equals) => {
                self.next()?;
                let value = self.expect_id()?;
                graph.attrs.insert(first, value);
                Ok(())
            }
            Some(Token::Arrow) => {
                let mut chain = vec![first];
                while self.peek()? == Some(&Token::Arrow) {
                    self.next()?;
                    chain.push(self.expect_id()?);
                }
                let attrs = if self.peek()? == Some(&Token::LBracket) {
                    self.parse_attr_list()?
                } else {
                    Attrs::new()
                };
                for id in &chain {
                    if !graph.nodes.contains_key(id) {
                        graph.nodes.insert(id.clone(), node_defaults.clone());
                    }
                }
                for pair in chain.windows(2) {
                    let mut merged = edge_defaults.clone();
                    merged.extend(attrs.clone());
                    graph.edges.push(DotEdge {
                        from: pair[0].clone(),
                        to: pair[1].clone(),
                        attrs: merged,
                    });
                }
                Ok(())
            }
            _ => {
                let attrs = if self.peek()? == Some(&Token::LBracket) {
                    self.parse_attr_list()?
                } else {
                    Attrs::new()
                };
                graph
                    .nodes
                    .entry(first)
                    .or_insert_with(|| node_defaults.clone())
                    .extend(attrs);
                Ok(())
            }
        }
    }

    /// One or more `[k=v, ...]` blocks.
    fn parse_attr_list(&mut self) -> Result<Attrs> {
        let mut attrs = Attrs::new();
        while self.peek()? == Some(&Token::LBracket) {
            self.next()?;
            loop {
                match self.next()? {
                    Some((_, Token::RBracket)) => break,
                    Some((_, Token::Comma | Token::Semi)) => continue,
                    Some((_, Token::Id(key))) => {
                        self.expect(Token::Equals)?;
                        let value = self.expect_id()?;
                        attrs.insert(key, value);
                    }
                    Some((offset, t)) => {
                        return Err(self.err(offset, format!("unexpected {t:?} in attribute list")));
                    }
                    None => return Err(self.err(self.pos, "unterminated attribute list")),
                }
            }
        }
        Ok(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_dot_parses_back() {
        let vertices = vec![
            DotVertex {
                key: "svc::op|other \"q\"".into(),
                width: 1.5,
                height: 0.5,
                pos: None,
            },
            DotVertex {
                key: "b".into(),
                width: 2.0,
                height: 1.0,
                pos: Some(Point { x: 3.0, y: 4.25 }),
            },
        ];
        let edges = vec![Edge::new("svc::op|other \"q\"", "b")];
        let text = to_dot(&edges, &vertices, &LayoutOptions::default());
        let g = parse_dot(&text).unwrap();

        assert!(g.directed);
        assert_eq!(g.graph_f64("ranksep"), Some(5.0));
        assert_eq!(g.attrs["rankdir"], "TB");
        assert_eq!(g.nodes.len(), 2);
        assert_eq!(g.node_f64("svc::op|other \"q\"", "width"), Some(1.5));
        assert_eq!(g.nodes["b"]["shape"], "box");
        assert_eq!(g.node_pos("b"), Some(Point { x: 3.0, y: 4.25 }));
        assert_eq!(g.edges.len(), 1);
        assert_eq!(g.edges[0].to, "b");
    }

    #[test]
    fn edge_chains_comments_and_implicit_nodes() {
        let g = parse_dot(
            "strict digraph {\n  // comment\n  rankdir=LR; /* block */ a -> b -> c [weight=2]\n  # hash\n}",
        )
        .unwrap();
        assert_eq!(g.attrs["rankdir"], "LR");
        assert_eq!(g.nodes.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(g.edges.len(), 2);
        assert_eq!(g.edges[1].attrs["weight"], "2");
    }

    #[test]
    fn errors_carry_the_offset() {
        let err = parse_dot("digraph { a -> }").unwrap_err();
        assert!(matches!(err, Error::DotParse { offset: 15, .. }));
        assert!(parse_dot("digraph { subgraph x { a } }").is_err());
        assert!(parse_dot("digraph { a [label=\"x }").is_err());
    }
}
