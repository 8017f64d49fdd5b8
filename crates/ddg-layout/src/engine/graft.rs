//! Incremental placement: lay out each group of new vertices on its own and attach it to the
//! positioned vertex it hangs from, pushing aside whatever is in the way.
//!
//! Everything here is engine space (inches, centers, `y` up).

use super::{layout_plain, validity};
use crate::backend::{EngineKind, LayoutBackend};
use crate::conv_coord::{EngineVertex, layout_vertex_to_dot, size_vertex_to_dot};
use crate::dot::DotVertex;
use crate::error::{Error, Result};
use crate::options::LayoutOptions;
use crate::types::{Edge, LayoutEdge, LayoutGraph, LayoutInput, Point, SizeVertex};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use sirenia::RankDir;
use std::collections::VecDeque;
use std::sync::Arc;

/// Fraction of `ranksep`/`nodesep` kept clear around a grafted cohort.
const SLIDE_SEP: f64 = 0.8;

/// Where a cohort's anchor sits relative to the cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorDirection {
    /// The anchor is upstream: edges run anchor -> cohort.
    From,
    /// The anchor is downstream: edges run cohort -> anchor.
    To,
}

/// New vertices connected to each other, plus the single positioned vertex they attach to.
#[derive(Debug, Clone, PartialEq)]
pub struct Cohort {
    pub anchor: Arc<str>,
    pub direction: AnchorDirection,
    pub vertices: Vec<Arc<str>>,
    pub edges: Vec<Edge>,
}

/// Groups `new_vertices` by connectivity over `edges`. Returns the cohorts and the edges no
/// cohort claimed (between positioned vertices, or to a second positioned neighbor).
pub fn find_cohorts(new_vertices: &[SizeVertex], edges: &[Edge]) -> Result<(Vec<Cohort>, Vec<Edge>)> {
    let is_new: FxHashSet<&str> = new_vertices.iter().map(|v| &*v.key).collect();
    let mut by_from: FxHashMap<&str, Vec<usize>> = FxHashMap::default();
    let mut by_to: FxHashMap<&str, Vec<usize>> = FxHashMap::default();
    for (i, e) in edges.iter().enumerate() {
        by_from.entry(&*e.from).or_default().push(i);
        by_to.entry(&*e.to).or_default().push(i);
    }

    let mut claimed = vec![false; edges.len()];
    let mut cohort_of: FxHashMap<&str, usize> = FxHashMap::default();
    let mut cohorts = Vec::new();

    for seed in new_vertices {
        if cohort_of.contains_key(&*seed.key) {
            continue;
        }
        let id = cohorts.len();
        cohort_of.insert(&seed.key, id);
        let mut vertices: Vec<Arc<str>> = Vec::new();
        let mut cohort_edges = Vec::new();
        let mut anchor: Option<(&str, AnchorDirection)> = None;
        let mut queue: VecDeque<&str> = VecDeque::from([&*seed.key]);

        while let Some(key) = queue.pop_front() {
            let at_anchor = anchor.is_some_and(|(a, _)| a == key);
            if !at_anchor {
                vertices.push(key.into());
            }
            // From the anchor only walk back into the cohort.
            let walk_in = !at_anchor || matches!(anchor, Some((_, AnchorDirection::To)));
            let walk_out = !at_anchor || matches!(anchor, Some((_, AnchorDirection::From)));
            let sides = [
                (walk_in, by_to.get(key), AnchorDirection::From),
                (walk_out, by_from.get(key), AnchorDirection::To),
            ];
            for (walk, list, direction) in sides {
                if !walk {
                    continue;
                }
                for &i in list.into_iter().flatten() {
                    if claimed[i] {
                        continue;
                    }
                    let e = &edges[i];
                    let other: &str = match direction {
                        AnchorDirection::From => &*e.from,
                        AnchorDirection::To => &*e.to,
                    };
                    if is_new.contains(other) {
                        match cohort_of.get(other) {
                            Some(&c) if c != id => continue,
                            Some(_) => {}
                            None => {
                                cohort_of.insert(other, id);
                                queue.push_back(other);
                            }
                        }
                    } else {
                        match anchor {
                            None => {
                                anchor = Some((other, direction));
                                queue.push_back(other);
                            }
                            Some((a, _)) if a == other => {}
                            Some(_) => continue,
                        }
                    }
                    claimed[i] = true;
                    cohort_edges.push(e.clone());
                }
            }
        }

        let Some((anchor, direction)) = anchor else {
            return Err(Error::UnanchoredCohort {
                vertices: vertices.iter().map(|k| k.to_string()).collect(),
            });
        };
        cohorts.push(Cohort {
            anchor: anchor.into(),
            direction,
            vertices,
            edges: cohort_edges,
        });
    }

    let leftover = edges
        .iter()
        .zip(&claimed)
        .filter(|(_, c)| !**c)
        .map(|(e, _)| e.clone())
        .collect();
    Ok((cohorts, leftover))
}

/// Result of grafting every cohort onto the previous drawing, already reframed to the origin.
#[derive(Debug, Clone)]
pub struct Graft {
    pub graph: LayoutGraph,
    /// Positioned vertices first (input order), then new vertices in cohort order.
    pub vertices: IndexMap<Arc<str>, EngineVertex>,
    /// Edges laid out together with their cohort.
    pub edges: Vec<LayoutEdge>,
    /// Edges that still need routing.
    pub dropped_edges: Vec<Edge>,
    /// Vertices pushed aside by collision avoidance.
    pub moved_vertices: Vec<Arc<str>>,
    /// Offset applied by [`reframe`].
    pub reframe: Point,
}

pub fn graft(
    input: &LayoutInput,
    prev_graph: &LayoutGraph,
    options: &LayoutOptions,
    backend: &dyn LayoutBackend,
) -> Result<Graft> {
    let mut placed: IndexMap<Arc<str>, EngineVertex> = input
        .positioned_vertices
        .iter()
        .map(|v| (v.key.clone(), layout_vertex_to_dot(v, prev_graph)))
        .collect();
    let mut origin: FxHashMap<Arc<str>, Point> = placed
        .values()
        .map(|v| (v.key.clone(), Point { x: v.x, y: v.y }))
        .collect();
    let sizes: FxHashMap<&str, SizeVertex> = input
        .new_vertices
        .iter()
        .map(|v| (&*v.key, size_vertex_to_dot(v)))
        .collect();

    for e in input.positioned_edges.iter().map(|le| &le.edge).chain(&input.new_edges) {
        let known = |k: &str| placed.contains_key(k) || sizes.contains_key(k);
        if !known(&e.from) || !known(&e.to) {
            return Err(Error::MissingEdgeEndpoint {
                from: e.from.to_string(),
                to: e.to.to_string(),
            });
        }
    }

    let (cohorts, mut dropped_edges) = find_cohorts(&input.new_vertices, &input.new_edges)?;
    if !cohorts.is_empty() && options.rankdir != RankDir::TB {
        return Err(Error::UnsupportedDirection {
            rankdir: options.rankdir,
        });
    }

    let mut moved_vertices: Vec<Arc<str>> = Vec::new();
    let mut graft_edges = Vec::new();

    for cohort in &cohorts {
        let anchor = placed
            .get(&cohort.anchor)
            .cloned()
            .ok_or_else(|| Error::LostAnchor {
                key: cohort.anchor.to_string(),
            })?;
        let mut dot_vertices: Vec<DotVertex> = cohort
            .vertices
            .iter()
            .filter_map(|k| sizes.get(&**k))
            .map(|s| DotVertex {
                key: s.key.clone(),
                width: s.width,
                height: s.height,
                pos: None,
            })
            .collect();
        dot_vertices.push(DotVertex {
            key: anchor.key.clone(),
            width: anchor.width,
            height: anchor.height,
            pos: None,
        });

        let plain = layout_plain(
            backend,
            EngineKind::Dot,
            &cohort.edges,
            &dot_vertices,
            options,
            true,
        )?;
        validity::check_vertices(
            dot_vertices.iter().map(|v| (&*v.key, v.width, v.height)),
            &plain.vertices,
        )?;
        let graft_anchor = plain
            .vertices
            .iter()
            .find(|v| v.key == anchor.key)
            .ok_or_else(|| Error::LostAnchor {
                key: anchor.key.to_string(),
            })?;

        for key in slide(&mut placed, &anchor, cohort.direction, graft_anchor, &plain.graph, options) {
            if !moved_vertices.contains(&key) {
                moved_vertices.push(key);
            }
        }

        let (dx, dy) = (anchor.x - graft_anchor.x, anchor.y - graft_anchor.y);
        for v in plain.vertices.iter().filter(|v| v.key != anchor.key) {
            let v = EngineVertex {
                x: v.x + dx,
                y: v.y + dy,
                ..v.clone()
            };
            origin.insert(v.key.clone(), Point { x: v.x, y: v.y });
            placed.insert(v.key.clone(), v);
        }

        let mut routed: FxHashSet<&Edge> = FxHashSet::default();
        for e in &plain.edges {
            let Some(wanted) = cohort.edges.iter().find(|c| **c == e.edge) else {
                continue;
            };
            if routed.insert(wanted) {
                graft_edges.push(LayoutEdge {
                    edge: e.edge.clone(),
                    path_points: e.path_points.iter().map(|[x, y]| [x + dx, y + dy]).collect(),
                    translate: None,
                });
            }
        }
        dropped_edges.extend(cohort.edges.iter().filter(|e| !routed.contains(e)).cloned());
    }

    // Later cohorts may have pushed earlier grafted vertices aside.
    let mut edges = Vec::with_capacity(graft_edges.len());
    for e in graft_edges {
        match endpoint_delta(&e.edge, &placed, &origin) {
            Some((dx, dy)) => edges.push(LayoutEdge {
                path_points: e.path_points.iter().map(|[x, y]| [x + dx, y + dy]).collect(),
                ..e
            }),
            None => {
                tracing::debug!(edge = %e.edge, "grafted edge endpoints moved apart");
                dropped_edges.push(e.edge);
            }
        }
    }

    let (graph, shift) = reframe(&mut placed, &mut edges, prev_graph.scale);
    Ok(Graft {
        graph,
        vertices: placed,
        edges,
        dropped_edges,
        moved_vertices,
        reframe: shift,
    })
}

/// Common displacement of both endpoints since the edge was laid out, if they agree.
fn endpoint_delta(
    edge: &Edge,
    placed: &IndexMap<Arc<str>, EngineVertex>,
    origin: &FxHashMap<Arc<str>, Point>,
) -> Option<(f64, f64)> {
    let delta = |key: &Arc<str>| {
        let now = placed.get(key)?;
        let then = origin.get(key)?;
        Some((now.x - then.x, now.y - then.y))
    };
    let (fx, fy) = delta(&edge.from)?;
    let (tx, ty) = delta(&edge.to)?;
    let close = (fx - tx).abs() <= validity::TOLERANCE && (fy - ty).abs() <= validity::TOLERANCE;
    close.then_some((fx, fy))
}

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Collision avoidance for a cohort about to be attached to `anchor`.
///
/// Vertices past the anchor on the cohort's side are split by which side of the anchor they sit
/// on; each group moves outwards by the largest overlap any of its members has with the band the
/// cohort will occupy. Top-to-bottom flow only.
pub fn slide(
    placed: &mut IndexMap<Arc<str>, EngineVertex>,
    anchor: &EngineVertex,
    direction: AnchorDirection,
    graft_anchor: &EngineVertex,
    graft_graph: &LayoutGraph,
    options: &LayoutOptions,
) -> Vec<Arc<str>> {
    let dir_sign: i8 = match direction {
        AnchorDirection::From => -1,
        AnchorDirection::To => 1,
    };
    let dir = f64::from(dir_sign);
    let rank_gap = SLIDE_SEP * options.ranksep;
    let node_gap = SLIDE_SEP * options.nodesep;

    let threshold = anchor.y + dir * (anchor.height / 2.0 + rank_gap);
    let limit = threshold + dir * (graft_graph.height - graft_anchor.height + rank_gap);
    let lower_bound = anchor.x - graft_anchor.x - node_gap;
    let upper_bound = lower_bound + graft_graph.width + 2.0 * node_gap;

    let mut lower = Vec::new();
    let mut upper = Vec::new();
    let mut lower_shift = 0.0_f64;
    let mut upper_shift = 0.0_f64;
    for (key, v) in placed.iter() {
        if *key == anchor.key || sign(v.y + dir * v.height / 2.0 - threshold) != dir_sign {
            continue;
        }
        let colliding = sign(v.y - dir * v.height / 2.0 - limit) != dir_sign;
        if v.x <= anchor.x {
            lower.push(key.clone());
            if colliding {
                lower_shift = lower_shift.max(v.x + v.width / 2.0 - lower_bound);
            }
        } else {
            upper.push(key.clone());
            if colliding {
                upper_shift = upper_shift.max(upper_bound - (v.x - v.width / 2.0));
            }
        }
    }

    let mut moved = Vec::new();
    for (group, shift) in [(lower, -lower_shift), (upper, upper_shift)] {
        if shift == 0.0 {
            continue;
        }
        for key in group {
            if let Some(v) = placed.get_mut(&key) {
                v.x += shift;
                moved.push(key);
            }
        }
    }
    moved
}

/// Moves the drawing so its bounding box starts at the origin; returns the new graph and the
/// offset applied.
pub fn reframe(
    vertices: &mut IndexMap<Arc<str>, EngineVertex>,
    edges: &mut [LayoutEdge],
    scale: f64,
) -> (LayoutGraph, Point) {
    if vertices.is_empty() {
        let empty = LayoutGraph {
            width: 0.0,
            height: 0.0,
            scale,
        };
        return (empty, Point::default());
    }
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for v in vertices.values() {
        min_x = min_x.min(v.x - v.width / 2.0);
        min_y = min_y.min(v.y - v.height / 2.0);
        max_x = max_x.max(v.x + v.width / 2.0);
        max_y = max_y.max(v.y + v.height / 2.0);
    }
    for v in vertices.values_mut() {
        v.x -= min_x;
        v.y -= min_y;
    }
    for e in edges.iter_mut() {
        for p in &mut e.path_points {
            p[0] -= min_x;
            p[1] -= min_y;
        }
    }
    let graph = LayoutGraph {
        width: max_x - min_x,
        height: max_y - min_y,
        scale,
    };
    (graph, Point { x: -min_x, y: -min_y })
}
