//! Deterministic spring embedder (Fruchterman-Reingold with box-aware distances).
//!
//! Pinned nodes act as fixed charges: they push and pull the free nodes but never move. When any
//! node is pinned the drawing keeps the caller's coordinate frame; otherwise it is translated to
//! the origin. Edges are straight segments clipped to the node boxes.

use super::ForceOptions;
use crate::error::Result;
use crate::graph::{EdgeRoute, Graph, LayoutResult, Point};
use std::collections::BTreeMap;

const MIN_DISTANCE: f64 = 0.01;

pub fn layout(graph: &Graph, opts: &ForceOptions) -> Result<LayoutResult> {
    graph.validate()?;
    let index = graph.node_index();
    let n = graph.nodes.len();
    let k = opts.ideal_edge_length.max(MIN_DISTANCE);

    let edges: Vec<(usize, usize)> = graph
        .edges
        .iter()
        .filter_map(|e| {
            let s = *index.get(e.source.as_str())?;
            let t = *index.get(e.target.as_str())?;
            (s != t).then_some((s, t))
        })
        .collect();

    let any_pinned = graph.nodes.iter().any(|n| n.pinned.is_some());
    let mut pos = initial_positions(graph, &edges, k, opts.random_seed);
    let radius: Vec<f64> = graph
        .nodes
        .iter()
        .map(|n| n.width.hypot(n.height) / 2.0)
        .collect();
    let free: Vec<bool> = graph.nodes.iter().map(|n| n.pinned.is_none()).collect();

    if free.iter().any(|f| *f) {
        let mut temperature = k * (n as f64).sqrt();
        let cooling = temperature / (opts.iterations.max(1) as f64);
        for _ in 0..opts.iterations {
            let mut disp = vec![Point { x: 0.0, y: 0.0 }; n];
            for u in 0..n {
                for v in (u + 1)..n {
                    let (dx, dy, d) = separation(&pos, &radius, u, v);
                    let force = k * k / d;
                    let (fx, fy) = (dx / d * force, dy / d * force);
                    disp[u].x += fx;
                    disp[u].y += fy;
                    disp[v].x -= fx;
                    disp[v].y -= fy;
                }
            }
            for &(u, v) in &edges {
                let (dx, dy, d) = separation(&pos, &radius, u, v);
                let force = d * d / k;
                let (fx, fy) = (dx / d * force, dy / d * force);
                disp[u].x -= fx;
                disp[u].y -= fy;
                disp[v].x += fx;
                disp[v].y += fy;
            }
            for v in 0..n {
                if !free[v] {
                    continue;
                }
                let len = disp[v].x.hypot(disp[v].y);
                if len > 0.0 {
                    let step = len.min(temperature);
                    pos[v].x += disp[v].x / len * step;
                    pos[v].y += disp[v].y / len * step;
                }
            }
            temperature = (temperature - cooling).max(0.0);
        }
    }

    let mut routes: Vec<Vec<Point>> = graph
        .edges
        .iter()
        .map(|e| {
            let (Some(&s), Some(&t)) = (index.get(e.source.as_str()), index.get(e.target.as_str()))
            else {
                return Vec::new();
            };
            let (sn, tn) = (&graph.nodes[s], &graph.nodes[t]);
            vec![
                clip(pos[s], sn.width, sn.height, pos[t]),
                clip(pos[t], tn.width, tn.height, pos[s]),
            ]
        })
        .collect();

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (
        f64::INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::NEG_INFINITY,
    );
    for (p, node) in pos.iter().zip(&graph.nodes) {
        min_x = min_x.min(p.x - node.width / 2.0);
        min_y = min_y.min(p.y - node.height / 2.0);
        max_x = max_x.max(p.x + node.width / 2.0);
        max_y = max_y.max(p.y + node.height / 2.0);
    }
    let (width, height) = if n == 0 {
        (0.0, 0.0)
    } else if any_pinned {
        (max_x.max(0.0), max_y.max(0.0))
    } else {
        for p in pos.iter_mut().chain(routes.iter_mut().flatten()) {
            p.x -= min_x;
            p.y -= min_y;
        }
        (max_x - min_x, max_y - min_y)
    };

    let positions: BTreeMap<String, Point> = graph
        .nodes
        .iter()
        .zip(&pos)
        .map(|(node, p)| (node.id.clone(), *p))
        .collect();
    let edges = graph
        .edges
        .iter()
        .zip(routes.drain(..))
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

/// Pinned nodes keep their position. Free nodes start near the mean of their pinned neighbors,
/// or on a seeded random scatter when they have none.
fn initial_positions(graph: &Graph, edges: &[(usize, usize)], k: f64, seed: u64) -> Vec<Point> {
    let mut rng = XorShift64Star::new(seed);
    let spread = k * (graph.nodes.len() as f64).sqrt();
    let mut out: Vec<Point> = graph
        .nodes
        .iter()
        .map(|n| n.pinned.unwrap_or(Point { x: 0.0, y: 0.0 }))
        .collect();

    for (v, node) in graph.nodes.iter().enumerate() {
        if node.pinned.is_some() {
            continue;
        }
        let anchors: Vec<Point> = edges
            .iter()
            .filter_map(|&(s, t)| match (s == v, t == v) {
                (true, _) => graph.nodes[t].pinned,
                (_, true) => graph.nodes[s].pinned,
                _ => None,
            })
            .collect();
        let jitter = Point {
            x: rng.next_f64_signed() * k / 2.0,
            y: rng.next_f64_signed() * k / 2.0,
        };
        out[v] = if anchors.is_empty() {
            Point {
                x: rng.next_f64_unit() * spread,
                y: rng.next_f64_unit() * spread,
            }
        } else {
            let cx = anchors.iter().map(|p| p.x).sum::<f64>() / anchors.len() as f64;
            let cy = anchors.iter().map(|p| p.y).sum::<f64>() / anchors.len() as f64;
            Point {
                x: cx + jitter.x,
                y: cy + k + jitter.y,
            }
        };
    }
    out
}

/// Direction from `v` to `u` and the box-aware distance between them.
fn separation(pos: &[Point], radius: &[f64], u: usize, v: usize) -> (f64, f64, f64) {
    let dx = pos[u].x - pos[v].x;
    let dy = pos[u].y - pos[v].y;
    let center = dx.hypot(dy);
    if center < MIN_DISTANCE {
        // Coincident centers: split along a fixed axis so the result stays deterministic.
        return (MIN_DISTANCE, 0.0, MIN_DISTANCE);
    }
    let d = (center - radius[u] - radius[v]).max(MIN_DISTANCE);
    (dx / center * d, dy / center * d, d)
}

/// Point where the segment from `center` towards `toward` leaves the `width x height` box.
fn clip(center: Point, width: f64, height: f64, toward: Point) -> Point {
    let dx = toward.x - center.x;
    let dy = toward.y - center.y;
    if dx == 0.0 && dy == 0.0 {
        return center;
    }
    let (hw, hh) = (width / 2.0, height / 2.0);
    let sx = if dx == 0.0 { f64::INFINITY } else { hw / dx.abs() };
    let sy = if dy == 0.0 { f64::INFINITY } else { hh / dy.abs() };
    let s = sx.min(sy).min(1.0);
    Point {
        x: center.x + dx * s,
        y: center.y + dy * s,
    }
}

#[derive(Debug, Clone)]
struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D_u64)
    }

    /// Uniform in `[0, 1)`.
    fn next_f64_unit(&mut self) -> f64 {
        let u = self.next_u64() >> 11;
        (u as f64) / ((1u64 << 53) as f64)
    }

    /// Uniform in `[-1, 1)`.
    fn next_f64_signed(&mut self) -> f64 {
        self.next_f64_unit() * 2.0 - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_stops_at_the_box_edge() {
        let p = clip(
            Point { x: 0.0, y: 0.0 },
            2.0,
            2.0,
            Point { x: 10.0, y: 0.0 },
        );
        assert_eq!(p, Point { x: 1.0, y: 0.0 });
    }

    #[test]
    fn rng_is_seeded() {
        let mut a = XorShift64Star::new(7);
        let mut b = XorShift64Star::new(7);
        assert_eq!(a.next_u64(), b.next_u64());
        assert!((0.0..1.0).contains(&a.next_f64_unit()));
    }
}
