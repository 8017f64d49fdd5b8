//! The layered pipeline always lays out top-to-bottom. Left-to-right and right-to-left drawings
//! swap axes before ranking and restore them afterwards; bottom-to-top drawings flip `y`.

use super::WorkGraph;
use crate::algo::RankDir;
use crate::graph::Point;

pub fn adjust(g: &mut WorkGraph, rankdir: RankDir) {
    match rankdir {
        RankDir::LR | RankDir::RL => swap_width_height(g),
        RankDir::TB | RankDir::BT => {}
    }
}

pub fn undo(g: &mut WorkGraph, routes: &mut [Vec<Point>], rankdir: RankDir) {
    match rankdir {
        RankDir::BT | RankDir::RL => reverse_y(g, routes),
        RankDir::TB | RankDir::LR => {}
    }

    match rankdir {
        RankDir::LR | RankDir::RL => {
            swap_xy(g, routes);
            swap_width_height(g);
        }
        RankDir::TB | RankDir::BT => {}
    }
}

fn swap_width_height(g: &mut WorkGraph) {
    for n in &mut g.nodes {
        (n.width, n.height) = (n.height, n.width);
    }
}

fn reverse_y(g: &mut WorkGraph, routes: &mut [Vec<Point>]) {
    for n in &mut g.nodes {
        n.y = -n.y;
    }
    for p in routes.iter_mut().flatten() {
        p.y = -p.y;
    }
}

fn swap_xy(g: &mut WorkGraph, routes: &mut [Vec<Point>]) {
    for n in &mut g.nodes {
        (n.x, n.y) = (n.y, n.x);
    }
    for p in routes.iter_mut().flatten() {
        (p.x, p.y) = (p.y, p.x);
    }
}
