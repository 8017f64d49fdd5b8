//! Break cycles by reversing the back edges found by a depth-first search.
//!
//! Roots are visited in node insertion order so the result is deterministic.

use super::WorkGraph;

pub fn run(g: &mut WorkGraph) {
    let succ: Vec<Vec<usize>> = {
        let mut out = vec![Vec::new(); g.nodes.len()];
        for (ix, e) in g.edges.iter().enumerate() {
            out[e.source].push(ix);
        }
        out
    };

    let mut visited = vec![false; g.nodes.len()];
    let mut on_stack = vec![false; g.nodes.len()];
    let mut back_edges: Vec<usize> = Vec::new();

    for root in 0..g.nodes.len() {
        if visited[root] {
            continue;
        }
        // Iterative DFS; the frame keeps the next outgoing edge to look at.
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        visited[root] = true;
        on_stack[root] = true;
        while let Some(frame) = stack.last_mut() {
            let (v, next) = *frame;
            let Some(&edge_ix) = succ[v].get(next) else {
                on_stack[v] = false;
                stack.pop();
                continue;
            };
            frame.1 += 1;
            let w = g.edges[edge_ix].target;
            if on_stack[w] {
                back_edges.push(edge_ix);
            } else if !visited[w] {
                visited[w] = true;
                on_stack[w] = true;
                stack.push((w, 0));
            }
        }
    }

    for ix in back_edges {
        let e = &mut g.edges[ix];
        (e.source, e.target) = (e.target, e.source);
        e.reversed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::hierarchical::{WorkEdge, WorkNode};

    fn graph(n: usize, edges: &[(usize, usize)]) -> WorkGraph {
        WorkGraph {
            nodes: (0..n)
                .map(|_| WorkNode {
                    width: 1.0,
                    height: 1.0,
                    dummy: false,
                    rank: 0,
                    x: 0.0,
                    y: 0.0,
                })
                .collect(),
            edges: edges
                .iter()
                .enumerate()
                .map(|(original, &(source, target))| WorkEdge {
                    source,
                    target,
                    reversed: false,
                    original,
                })
                .collect(),
        }
    }

    #[test]
    fn reverses_one_edge_of_a_triangle() {
        let mut g = graph(3, &[(0, 1), (1, 2), (2, 0)]);
        run(&mut g);
        let reversed: Vec<usize> = g
            .edges
            .iter()
            .filter(|e| e.reversed)
            .map(|e| e.original)
            .collect();
        assert_eq!(reversed, vec![2]);
        assert_eq!((g.edges[2].source, g.edges[2].target), (0, 2));
    }

    #[test]
    fn leaves_dags_alone() {
        let mut g = graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        run(&mut g);
        assert!(g.edges.iter().all(|e| !e.reversed));
    }
}
