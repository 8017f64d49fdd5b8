//! Coordinate assignment.
//!
//! `y` stacks ranks with `ranksep` between the tallest nodes of consecutive ranks. `x` follows
//! Brandes and Köpf: nodes are aligned into vertical blocks with their median neighbors four
//! times (up/down, left/right), each alignment is compacted, and the final coordinate is the
//! average of the two middle candidates once the alignments share the narrowest one's extent.

use super::WorkGraph;
use crate::algo::HierarchicalOptions;
use rustc_hash::{FxHashMap, FxHashSet};

type Conflicts = FxHashSet<(usize, usize)>;

pub fn run(g: &mut WorkGraph, layers: &[Vec<usize>], opts: &HierarchicalOptions) {
    assign_y(g, layers, opts.ranksep);
    let xs = position_x(g, layers, opts.nodesep);
    for (node, x) in g.nodes.iter_mut().zip(xs) {
        node.x = x;
    }
}

fn assign_y(g: &mut WorkGraph, layers: &[Vec<usize>], ranksep: f64) {
    let mut y = 0.0;
    let mut prev_half: Option<f64> = None;
    for layer in layers {
        let height = layer
            .iter()
            .map(|&v| g.nodes[v].height)
            .fold(0.0_f64, f64::max);
        let half = height / 2.0;
        if let Some(prev) = prev_half {
            y += prev + ranksep + half;
        } else {
            y = half;
        }
        for &v in layer {
            g.nodes[v].y = y;
        }
        prev_half = Some(half);
    }
}

fn position_x(g: &WorkGraph, layers: &[Vec<usize>], nodesep: f64) -> Vec<f64> {
    let n = g.nodes.len();
    if n == 0 {
        return Vec::new();
    }
    let pred = g.predecessors();
    let succ = g.successors();
    let conflicts = find_type1_conflicts(g, layers, &pred);

    // ul, ur, dl, dr
    let mut xss: Vec<Vec<f64>> = Vec::with_capacity(4);
    for down in [false, true] {
        for right in [false, true] {
            let mut layering: Vec<Vec<usize>> = if down {
                layers.iter().rev().cloned().collect()
            } else {
                layers.to_vec()
            };
            if right {
                for layer in &mut layering {
                    layer.reverse();
                }
            }
            let neighbors = if down { &succ } else { &pred };
            let root = vertical_alignment(n, &layering, &conflicts, neighbors);
            let mut xs = horizontal_compaction(g, &layering, &root, nodesep);
            if right {
                for x in &mut xs {
                    *x = -*x;
                }
            }
            xss.push(xs);
        }
    }

    let smallest = smallest_width_alignment(g, &xss);
    align_coordinates(&mut xss, smallest);
    balance(&xss)
}

fn conflict_key(v: usize, w: usize) -> (usize, usize) {
    if v < w { (v, w) } else { (w, v) }
}

/// Marks edges that cross an inner segment (an edge between two dummy nodes). Inner segments win
/// during alignment so long edges stay straight.
fn find_type1_conflicts(g: &WorkGraph, layers: &[Vec<usize>], pred: &[Vec<usize>]) -> Conflicts {
    let mut order = vec![0usize; g.nodes.len()];
    for layer in layers {
        for (i, &v) in layer.iter().enumerate() {
            order[v] = i;
        }
    }

    let mut conflicts = Conflicts::default();
    for pair in layers.windows(2) {
        let (prev_layer, layer) = (&pair[0], &pair[1]);
        let mut k0 = 0;
        let mut scan_pos = 0;
        for (i, &v) in layer.iter().enumerate() {
            let inner = if g.nodes[v].dummy {
                pred[v].iter().copied().find(|&u| g.nodes[u].dummy)
            } else {
                None
            };
            let k1 = inner.map_or(prev_layer.len(), |u| order[u]);
            if inner.is_none() && i + 1 != layer.len() {
                continue;
            }
            for &scan in &layer[scan_pos..=i] {
                for &u in &pred[scan] {
                    let u_pos = order[u];
                    let crosses = u_pos < k0 || k1 < u_pos;
                    if crosses && !(g.nodes[u].dummy && g.nodes[scan].dummy) {
                        conflicts.insert(conflict_key(u, scan));
                    }
                }
            }
            scan_pos = i + 1;
            k0 = k1;
        }
    }
    conflicts
}

/// Aligns each node with a median neighbor in the previous layer of `layering`. Returns the root
/// of every node's block.
fn vertical_alignment(
    n: usize,
    layering: &[Vec<usize>],
    conflicts: &Conflicts,
    neighbors: &[Vec<usize>],
) -> Vec<usize> {
    let mut root: Vec<usize> = (0..n).collect();
    let mut align: Vec<usize> = (0..n).collect();
    let mut pos = vec![0usize; n];
    for layer in layering {
        for (i, &v) in layer.iter().enumerate() {
            pos[v] = i;
        }
    }

    for layer in layering {
        let mut prev_idx: Option<usize> = None;
        for &v in layer {
            let mut ws = neighbors[v].clone();
            if ws.is_empty() {
                continue;
            }
            ws.sort_by_key(|&w| pos[w]);
            let lo = (ws.len() - 1) / 2;
            let hi = ws.len() / 2;
            for &w in &ws[lo..=hi] {
                let w_pos = pos[w];
                if align[v] == v
                    && prev_idx.is_none_or(|p| p < w_pos)
                    && !conflicts.contains(&conflict_key(v, w))
                {
                    align[w] = v;
                    root[v] = root[w];
                    align[v] = root[v];
                    prev_idx = Some(w_pos);
                }
            }
        }
    }
    root
}

/// Minimum center distance between horizontal neighbors.
fn sep(g: &WorkGraph, left: usize, right: usize, nodesep: f64) -> f64 {
    // Dummy nodes only need half the room of real ones.
    let gap = |v: usize| {
        if g.nodes[v].dummy {
            nodesep / 4.0
        } else {
            nodesep / 2.0
        }
    };
    g.nodes[left].width / 2.0 + gap(left) + gap(right) + g.nodes[right].width / 2.0
}

/// Places every block as far left as separation allows, then pulls blocks with slack right
/// towards their successors.
fn horizontal_compaction(
    g: &WorkGraph,
    layering: &[Vec<usize>],
    root: &[usize],
    nodesep: f64,
) -> Vec<f64> {
    // Block graph over roots, edges left to right weighted by the separation they need.
    let mut block_nodes: Vec<usize> = Vec::new();
    let mut seen: FxHashSet<usize> = FxHashSet::default();
    let mut weight: FxHashMap<(usize, usize), f64> = FxHashMap::default();
    let mut block_edges: Vec<(usize, usize)> = Vec::new();
    for layer in layering {
        let mut prev: Option<usize> = None;
        for &v in layer {
            let v_root = root[v];
            if seen.insert(v_root) {
                block_nodes.push(v_root);
            }
            if let Some(u) = prev {
                let u_root = root[u];
                let s = sep(g, u, v, nodesep);
                match weight.get_mut(&(u_root, v_root)) {
                    Some(w) => *w = w.max(s),
                    None => {
                        weight.insert((u_root, v_root), s);
                        block_edges.push((u_root, v_root));
                    }
                }
            }
            prev = Some(v);
        }
    }

    let n = g.nodes.len();
    let mut block_in: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    let mut block_out: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for &(u, v) in &block_edges {
        let w = weight.get(&(u, v)).copied().unwrap_or(0.0);
        block_out[u].push((v, w));
        block_in[v].push((u, w));
    }

    let topo = topological_order(&block_nodes, &block_in, &block_out);
    let mut xs = vec![0.0_f64; n];
    for &b in &topo {
        xs[b] = block_in[b]
            .iter()
            .map(|&(u, w)| xs[u] + w)
            .fold(0.0_f64, f64::max);
    }
    for &b in topo.iter().rev() {
        let min = block_out[b]
            .iter()
            .map(|&(v, w)| xs[v] - w)
            .fold(f64::INFINITY, f64::min);
        if min.is_finite() {
            xs[b] = xs[b].max(min);
        }
    }

    (0..n).map(|v| xs[root[v]]).collect()
}

fn topological_order(
    nodes: &[usize],
    block_in: &[Vec<(usize, f64)>],
    block_out: &[Vec<(usize, f64)>],
) -> Vec<usize> {
    let mut indegree: FxHashMap<usize, usize> =
        nodes.iter().map(|&b| (b, block_in[b].len())).collect();
    let mut ready: Vec<usize> = nodes
        .iter()
        .rev()
        .copied()
        .filter(|b| block_in[*b].is_empty())
        .collect();
    let mut out = Vec::with_capacity(nodes.len());
    while let Some(b) = ready.pop() {
        out.push(b);
        for &(v, _) in &block_out[b] {
            if let Some(d) = indegree.get_mut(&v) {
                *d -= 1;
                if *d == 0 {
                    ready.push(v);
                }
            }
        }
    }
    if out.len() < nodes.len() {
        let placed: FxHashSet<usize> = out.iter().copied().collect();
        out.extend(nodes.iter().copied().filter(|b| !placed.contains(b)));
    }
    out
}

fn extent(g: &WorkGraph, xs: &[f64]) -> (f64, f64) {
    xs.iter()
        .zip(&g.nodes)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (&x, n)| {
            let half = n.width / 2.0;
            (lo.min(x - half), hi.max(x + half))
        })
}

/// Index of the first narrowest alignment.
fn smallest_width_alignment(g: &WorkGraph, xss: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_width = f64::INFINITY;
    for (i, xs) in xss.iter().enumerate() {
        let (lo, hi) = extent(g, xs);
        let width = hi - lo;
        if width < best_width {
            best = i;
            best_width = width;
        }
    }
    best
}

/// Shifts left alignments to share the narrowest one's minimum and right alignments its maximum.
fn align_coordinates(xss: &mut [Vec<f64>], smallest: usize) {
    let bounds = |xs: &[f64]| {
        xs.iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            })
    };
    let (align_min, align_max) = bounds(&xss[smallest]);
    for (i, xs) in xss.iter_mut().enumerate() {
        if i == smallest {
            continue;
        }
        let (lo, hi) = bounds(xs);
        let right = i % 2 == 1;
        let delta = if right { align_max - hi } else { align_min - lo };
        if delta != 0.0 && delta.is_finite() {
            for x in xs.iter_mut() {
                *x += delta;
            }
        }
    }
}

fn balance(xss: &[Vec<f64>]) -> Vec<f64> {
    let n = xss.first().map_or(0, Vec::len);
    (0..n)
        .map(|v| {
            let mut vals: Vec<f64> = xss.iter().map(|xs| xs[v]).collect();
            vals.sort_by(f64::total_cmp);
            (vals[1] + vals[2]) / 2.0
        })
        .collect()
}
