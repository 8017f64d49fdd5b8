//! Rank assignment by network simplex.
//!
//! Longest-path ranking gives a feasible start. A tight spanning tree is grown over it, then tree
//! edges with a negative cut value are exchanged for the tightest non-tree edge crossing the same
//! cut until no cut value is negative. Each weakly connected component is ranked on its own and
//! shifted so its top rank is 0.

use super::WorkGraph;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy)]
struct RankEdge {
    v: usize,
    w: usize,
    weight: f64,
    minlen: i32,
}

impl RankEdge {
    fn other(&self, x: usize) -> usize {
        if self.v == x { self.w } else { self.v }
    }
}

#[derive(Debug, Default)]
struct Component {
    /// Work graph node per local index.
    nodes: Vec<usize>,
    /// Parallel edges merged: weights add up, `minlen` is the largest.
    edges: Vec<RankEdge>,
}

pub fn assign(g: &mut WorkGraph) {
    for component in components(g) {
        let ranks = network_simplex(component.nodes.len(), &component.edges);
        let min = ranks.iter().copied().min().unwrap_or(0);
        for (&v, r) in component.nodes.iter().zip(ranks) {
            g.nodes[v].rank = (r - min) as usize;
        }
    }
}

fn components(g: &WorkGraph) -> Vec<Component> {
    let n = g.nodes.len();
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    for e in &g.edges {
        adj[e.source].push(e.target);
        adj[e.target].push(e.source);
    }

    let mut component_of = vec![usize::MAX; n];
    let mut local = vec![0usize; n];
    let mut out: Vec<Component> = Vec::new();
    for start in 0..n {
        if component_of[start] != usize::MAX {
            continue;
        }
        let id = out.len();
        let mut nodes = Vec::new();
        let mut stack = vec![start];
        component_of[start] = id;
        while let Some(v) = stack.pop() {
            local[v] = nodes.len();
            nodes.push(v);
            for &w in &adj[v] {
                if component_of[w] == usize::MAX {
                    component_of[w] = id;
                    stack.push(w);
                }
            }
        }
        out.push(Component {
            nodes,
            edges: Vec::new(),
        });
    }

    let mut merged: FxHashMap<(usize, usize), usize> = FxHashMap::default();
    for e in &g.edges {
        let component = &mut out[component_of[e.source]];
        match merged.get(&(e.source, e.target)) {
            Some(&ix) => component.edges[ix].weight += 1.0,
            None => {
                merged.insert((e.source, e.target), component.edges.len());
                component.edges.push(RankEdge {
                    v: local[e.source],
                    w: local[e.target],
                    weight: 1.0,
                    minlen: 1,
                });
            }
        }
    }
    out
}

/// Ranks one connected acyclic component; ranks may be negative.
fn network_simplex(n: usize, edges: &[RankEdge]) -> Vec<i32> {
    if n == 0 {
        return Vec::new();
    }
    let mut s = Simplex::new(n, edges);
    s.longest_path();
    s.feasible_tree();
    s.init_low_lim();
    s.init_cut_values();
    while let Some(leave) = s.leave_edge() {
        let Some(enter) = s.enter_edge(leave) else {
            break;
        };
        s.exchange(leave, enter);
    }
    s.rank
}

struct Simplex<'a> {
    edges: &'a [RankEdge],
    out_edges: Vec<Vec<usize>>,
    in_edges: Vec<Vec<usize>>,
    rank: Vec<i32>,
    /// Tree edges (indices into `edges`) in insertion order.
    tree: Vec<usize>,
    in_tree: Vec<bool>,
    tree_adj: Vec<Vec<usize>>,
    cut: Vec<f64>,
    low: Vec<i32>,
    lim: Vec<i32>,
    parent_edge: Vec<Option<usize>>,
}

impl<'a> Simplex<'a> {
    fn new(n: usize, edges: &'a [RankEdge]) -> Self {
        let mut out_edges = vec![Vec::new(); n];
        let mut in_edges = vec![Vec::new(); n];
        for (ix, e) in edges.iter().enumerate() {
            out_edges[e.v].push(ix);
            in_edges[e.w].push(ix);
        }
        Self {
            edges,
            out_edges,
            in_edges,
            rank: vec![0; n],
            tree: Vec::with_capacity(n.saturating_sub(1)),
            in_tree: vec![false; edges.len()],
            tree_adj: vec![Vec::new(); n],
            cut: vec![0.0; edges.len()],
            low: vec![0; n],
            lim: vec![0; n],
            parent_edge: vec![None; n],
        }
    }

    fn slack(&self, ix: usize) -> i32 {
        let e = &self.edges[ix];
        self.rank[e.w] - self.rank[e.v] - e.minlen
    }

    /// Sinks at rank 0, every other node as low as its successors allow.
    fn longest_path(&mut self) {
        let n = self.rank.len();
        let mut indegree: Vec<usize> = self.in_edges.iter().map(Vec::len).collect();
        let mut ready: Vec<usize> = (0..n).filter(|&v| indegree[v] == 0).rev().collect();
        let mut topo = Vec::with_capacity(n);
        while let Some(v) = ready.pop() {
            topo.push(v);
            for &ix in &self.out_edges[v] {
                let w = self.edges[ix].w;
                indegree[w] -= 1;
                if indegree[w] == 0 {
                    ready.push(w);
                }
            }
        }
        for &v in topo.iter().rev() {
            self.rank[v] = self.out_edges[v]
                .iter()
                .map(|&ix| self.rank[self.edges[ix].w] - self.edges[ix].minlen)
                .min()
                .unwrap_or(0);
        }
    }

    fn add_tree_edge(&mut self, ix: usize) {
        let e = self.edges[ix];
        self.in_tree[ix] = true;
        self.tree.push(ix);
        self.tree_adj[e.v].push(ix);
        self.tree_adj[e.w].push(ix);
    }

    fn remove_tree_edge(&mut self, ix: usize) {
        let e = self.edges[ix];
        self.in_tree[ix] = false;
        self.tree.retain(|&t| t != ix);
        self.tree_adj[e.v].retain(|&t| t != ix);
        self.tree_adj[e.w].retain(|&t| t != ix);
    }

    fn feasible_tree(&mut self) {
        let n = self.rank.len();
        let mut in_node = vec![false; n];
        let mut members = vec![0usize];
        in_node[0] = true;

        loop {
            let mut stack = members.clone();
            while let Some(v) = stack.pop() {
                let incident: Vec<usize> = self.out_edges[v]
                    .iter()
                    .chain(&self.in_edges[v])
                    .copied()
                    .collect();
                for ix in incident {
                    let w = self.edges[ix].other(v);
                    if in_node[w] || self.slack(ix) != 0 {
                        continue;
                    }
                    in_node[w] = true;
                    members.push(w);
                    stack.push(w);
                    self.add_tree_edge(ix);
                }
            }
            if members.len() >= n {
                return;
            }

            let mut best: Option<(i32, usize)> = None;
            for (ix, e) in self.edges.iter().enumerate() {
                if in_node[e.v] == in_node[e.w] {
                    continue;
                }
                let slack = self.slack(ix);
                if best.is_none_or(|(s, _)| slack < s) {
                    best = Some((slack, ix));
                }
            }
            let Some((slack, ix)) = best else {
                return;
            };
            let delta = if in_node[self.edges[ix].v] {
                slack
            } else {
                -slack
            };
            for &v in &members {
                self.rank[v] += delta;
            }
        }
    }

    /// Post-order numbering of the tree from node 0: `lim` is the visit number, `low` the
    /// smallest `lim` in the subtree.
    fn init_low_lim(&mut self) {
        let n = self.rank.len();
        self.parent_edge.fill(None);
        let mut visited = vec![false; n];
        let mut next_lim = 1;
        // (node, next tree edge to look at, low)
        let mut stack: Vec<(usize, usize, i32)> = vec![(0, 0, next_lim)];
        visited[0] = true;
        while let Some(&(v, i, low)) = stack.last() {
            if let Some(&ix) = self.tree_adj[v].get(i) {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                let w = self.edges[ix].other(v);
                if !visited[w] {
                    visited[w] = true;
                    self.parent_edge[w] = Some(ix);
                    stack.push((w, 0, next_lim));
                }
                continue;
            }
            stack.pop();
            self.low[v] = low;
            self.lim[v] = next_lim;
            next_lim += 1;
        }
    }

    fn init_cut_values(&mut self) {
        let mut postorder: Vec<usize> = (0..self.rank.len()).collect();
        postorder.sort_by_key(|&v| self.lim[v]);
        for v in postorder {
            if let Some(ix) = self.parent_edge[v] {
                self.cut[ix] = self.cut_value(v);
            }
        }
    }

    /// Cut value of the tree edge between `child` and its parent. Cut values of the child's own
    /// subtree edges must already be known.
    fn cut_value(&self, child: usize) -> f64 {
        let Some(parent_ix) = self.parent_edge[child] else {
            return 0.0;
        };
        let parent_edge = &self.edges[parent_ix];
        let parent = parent_edge.other(child);
        let child_is_tail = parent_edge.v == child;
        let mut cut = parent_edge.weight;

        let outgoing = self.out_edges[child].iter().map(|&ix| (ix, true));
        let incoming = self.in_edges[child].iter().map(|&ix| (ix, false));
        for (ix, is_out) in outgoing.chain(incoming) {
            let e = &self.edges[ix];
            if e.other(child) == parent {
                continue;
            }
            let points_to_head = is_out == child_is_tail;
            cut += if points_to_head { e.weight } else { -e.weight };
            if self.in_tree[ix] {
                cut += if points_to_head {
                    -self.cut[ix]
                } else {
                    self.cut[ix]
                };
            }
        }
        cut
    }

    fn leave_edge(&self) -> Option<usize> {
        self.tree.iter().copied().find(|&ix| self.cut[ix] < 0.0)
    }

    fn enter_edge(&self, leave: usize) -> Option<usize> {
        let e = &self.edges[leave];
        let (tail_low, tail_lim, flip) = if self.lim[e.v] > self.lim[e.w] {
            (self.low[e.w], self.lim[e.w], true)
        } else {
            (self.low[e.v], self.lim[e.v], false)
        };
        let in_tail = |x: usize| tail_low <= self.lim[x] && self.lim[x] <= tail_lim;

        let mut best: Option<(i32, usize)> = None;
        for (ix, f) in self.edges.iter().enumerate() {
            if flip != in_tail(f.v) || flip == in_tail(f.w) {
                continue;
            }
            let slack = self.slack(ix);
            if best.is_none_or(|(s, _)| slack < s) {
                best = Some((slack, ix));
            }
        }
        best.map(|(_, ix)| ix)
    }

    fn exchange(&mut self, leave: usize, enter: usize) {
        self.remove_tree_edge(leave);
        self.add_tree_edge(enter);
        self.init_low_lim();
        self.init_cut_values();
        self.update_ranks();
    }

    /// Re-derives ranks from node 0 so every tree edge is tight.
    fn update_ranks(&mut self) {
        let mut preorder: Vec<usize> = (0..self.rank.len()).collect();
        preorder.sort_by_key(|&v| std::cmp::Reverse(self.lim[v]));
        for v in preorder {
            let Some(ix) = self.parent_edge[v] else {
                continue;
            };
            let e = self.edges[ix];
            let parent = e.other(v);
            self.rank[v] = if e.v == v {
                self.rank[parent] - e.minlen
            } else {
                self.rank[parent] + e.minlen
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::hierarchical::{WorkEdge, WorkNode};

    fn ranks(n: usize, edges: &[(usize, usize)]) -> Vec<usize> {
        let mut g = WorkGraph {
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
        };
        assign(&mut g);
        g.nodes.iter().map(|n| n.rank).collect()
    }

    fn total_length(ranks: &[usize], edges: &[(usize, usize)]) -> usize {
        edges.iter().map(|&(v, w)| ranks[w] - ranks[v]).sum()
    }

    #[test]
    fn chain_is_one_rank_per_hop() {
        assert_eq!(ranks(3, &[(0, 1), (1, 2)]), vec![0, 1, 2]);
    }

    #[test]
    fn short_branch_stays_next_to_its_parent() {
        // 0 -> 1 -> 2 -> 3 and 0 -> 4: node 4 must not sink to the bottom rank.
        assert_eq!(
            ranks(5, &[(0, 1), (1, 2), (2, 3), (0, 4)]),
            vec![0, 1, 2, 3, 1]
        );
    }

    #[test]
    fn short_upstream_branch_stays_next_to_its_child() {
        // 0 -> 1 -> 2 and 3 -> 2: source 3 sits right above 2.
        assert_eq!(ranks(4, &[(0, 1), (1, 2), (3, 2)]), vec![0, 1, 2, 1]);
    }

    #[test]
    fn exchanges_tree_edges_to_shorten_the_drawing() {
        // a=0 b=1 c=2 d=3 h=4 e=5 f=6 g=7. Longest path leaves g right above h, which costs one
        // rank more than pulling e, f and g up next to a.
        let edges = [
            (0, 1),
            (1, 2),
            (2, 3),
            (3, 4),
            (0, 5),
            (5, 7),
            (0, 6),
            (6, 7),
            (7, 4),
        ];
        let r = ranks(8, &edges);
        assert_eq!(r, vec![0, 1, 2, 3, 4, 1, 1, 2]);
        assert_eq!(total_length(&r, &edges), 10);
    }

    #[test]
    fn components_are_ranked_from_zero() {
        assert_eq!(ranks(4, &[(0, 1), (2, 3)]), vec![0, 1, 0, 1]);
        assert_eq!(ranks(2, &[]), vec![0, 0]);
    }

    #[test]
    fn parallel_edges_are_merged() {
        assert_eq!(ranks(2, &[(0, 1), (0, 1)]), vec![0, 1]);
    }
}
