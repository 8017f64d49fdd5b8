//! Crossing reduction.
//!
//! The initial order comes from a depth-first walk that visits nodes by rank. Barycenter sweeps
//! then alternate downwards (ordering by predecessors) and upwards (ordering by successors); the
//! best ordering seen so far is kept. Nodes without neighbors in the reference layer keep their
//! slot.

use super::WorkGraph;

pub fn run(g: &WorkGraph, max_iterations: usize) -> Vec<Vec<usize>> {
    let succ = g.successors();
    let pred = g.predecessors();
    let mut layers = init_order(g, &succ);

    let mut best = layers.clone();
    let mut best_cc = cross_count(&layers, &succ);
    let mut last_best = 0usize;
    for i in 0..max_iterations {
        if best_cc == 0 || last_best >= 4 {
            break;
        }
        if i % 2 == 0 {
            for r in 1..layers.len() {
                let (fixed, movable) = layers.split_at_mut(r);
                sort_layer(&mut movable[0], &fixed[r - 1], &pred);
            }
        } else {
            for r in (0..layers.len().saturating_sub(1)).rev() {
                let (movable, fixed) = layers.split_at_mut(r + 1);
                sort_layer(&mut movable[r], &fixed[0], &succ);
            }
        }

        let cc = cross_count(&layers, &succ);
        if cc < best_cc {
            best_cc = cc;
            best = layers.clone();
            last_best = 0;
        } else {
            last_best += 1;
        }
    }
    best
}

fn init_order(g: &WorkGraph, succ: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let max_rank = g.nodes.iter().map(|n| n.rank).max().unwrap_or(0);
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); if g.nodes.is_empty() { 0 } else { max_rank + 1 }];

    let mut start: Vec<usize> = (0..g.nodes.len()).collect();
    start.sort_by_key(|&v| g.nodes[v].rank);

    let mut visited = vec![false; g.nodes.len()];
    for root in start {
        if visited[root] {
            continue;
        }
        let mut stack = vec![root];
        while let Some(v) = stack.pop() {
            if visited[v] {
                continue;
            }
            visited[v] = true;
            layers[g.nodes[v].rank].push(v);
            for &w in succ[v].iter().rev() {
                if !visited[w] {
                    stack.push(w);
                }
            }
        }
    }
    layers
}

/// Reorders `layer` by the mean position of each node's neighbors in `reference`.
fn sort_layer(layer: &mut [usize], reference: &[usize], neighbors: &[Vec<usize>]) {
    let mut pos = rustc_hash::FxHashMap::default();
    for (i, &v) in reference.iter().enumerate() {
        pos.insert(v, i as f64);
    }

    let mut sortable: Vec<(f64, usize, usize)> = Vec::new();
    let mut fixed: Vec<Option<usize>> = vec![None; layer.len()];
    for (i, &v) in layer.iter().enumerate() {
        let ps: Vec<f64> = neighbors[v]
            .iter()
            .filter_map(|w| pos.get(w).copied())
            .collect();
        if ps.is_empty() {
            fixed[i] = Some(v);
        } else {
            let bc = ps.iter().sum::<f64>() / ps.len() as f64;
            sortable.push((bc, i, v));
        }
    }
    sortable.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut sorted = sortable.into_iter().map(|(_, _, v)| v);
    for (slot, keep) in layer.iter_mut().zip(fixed) {
        if let Some(v) = keep {
            *slot = v;
        } else if let Some(v) = sorted.next() {
            *slot = v;
        }
    }
}

/// Counts edge crossings between every pair of adjacent layers.
pub fn cross_count(layers: &[Vec<usize>], succ: &[Vec<usize>]) -> usize {
    let mut total = 0;
    for pair in layers.windows(2) {
        let (north, south) = (&pair[0], &pair[1]);
        let mut south_pos = rustc_hash::FxHashMap::default();
        for (i, &v) in south.iter().enumerate() {
            south_pos.insert(v, i);
        }
        let mut entries: Vec<(usize, usize)> = Vec::new();
        for (i, &v) in north.iter().enumerate() {
            for w in &succ[v] {
                if let Some(&j) = south_pos.get(w) {
                    entries.push((i, j));
                }
            }
        }
        entries.sort_unstable();

        // Fenwick tree over south positions, counting earlier entries with a larger south index.
        let mut tree = vec![0usize; south.len() + 1];
        for (seen, &(_, j)) in entries.iter().enumerate() {
            let mut not_greater = 0;
            let mut k = j + 1;
            while k > 0 {
                not_greater += tree[k];
                k &= k - 1;
            }
            total += seen - not_greater;
            let mut k = j + 1;
            while k < tree.len() {
                tree[k] += 1;
                k += k & k.wrapping_neg();
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_a_single_crossing() {
        let layers = vec![vec![0, 1], vec![2, 3]];
        let succ = vec![vec![3], vec![2], vec![], vec![]];
        assert_eq!(cross_count(&layers, &succ), 1);
    }

    #[test]
    fn parallel_edges_do_not_cross() {
        let layers = vec![vec![0, 1], vec![2, 3]];
        let succ = vec![vec![2], vec![3], vec![], vec![]];
        assert_eq!(cross_count(&layers, &succ), 0);
    }

    #[test]
    fn barycenter_untangles_a_crossing() {
        let mut layer = vec![2, 3];
        let reference = vec![0, 1];
        let pred = vec![vec![], vec![], vec![1], vec![0]];
        sort_layer(&mut layer, &reference, &pred);
        assert_eq!(layer, vec![3, 2]);
    }
}
