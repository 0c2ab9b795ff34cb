use super::safety::safe_moves;
use super::space::reachable_count;
use super::utility::UtilityAgent;
use super::Agent;
use crate::config::{SearchConfig, UtilityWeights};
use crate::game::Observation;
use crate::grid::{Cell, Direction, GridWorld, Occupancy};
use ahash::AHashSet;
use std::collections::VecDeque;
use tracing::debug;

/// First move of a shortest path from `start` to `goal`, or `None` when the
/// goal is unreachable within `max_depth` steps.
///
/// The first step may enter the vacating tail; every later step treats the
/// whole body as static. Neighbours are expanded in [`Direction::ALL`] order,
/// so ties resolve the same way on every call.
pub fn find_first_step(
    start: Cell,
    goal: Cell,
    body: &[Cell],
    grid: &GridWorld,
    max_depth: usize,
) -> Option<Direction> {
    search(start, goal, &Direction::ALL, body, grid, max_depth).map(|(dir, _)| dir)
}

/// Length of the path [`find_first_step`] would follow.
pub fn shortest_path_len(start: Cell, goal: Cell, body: &[Cell], grid: &GridWorld, max_depth: usize) -> Option<usize> {
    search(start, goal, &Direction::ALL, body, grid, max_depth).map(|(_, len)| len)
}

fn search(
    start: Cell,
    goal: Cell,
    first_moves: &[Direction],
    body: &[Cell],
    grid: &GridWorld,
    max_depth: usize,
) -> Option<(Direction, usize)> {
    if start == goal || max_depth == 0 {
        return None;
    }
    let first_blocked = Occupancy::from_body(body, true);
    let blocked = Occupancy::from_body(body, false);

    let mut visited = AHashSet::new();
    visited.insert(start);
    let mut queue = VecDeque::new();
    for &d in first_moves {
        let next = grid.step(start, d);
        if grid.in_bounds(next) && !first_blocked.contains(next) && visited.insert(next) {
            queue.push_back((next, d, 1usize));
        }
    }

    while let Some((cell, first, depth)) = queue.pop_front() {
        if cell == goal {
            return Some((first, depth));
        }
        if depth >= max_depth {
            continue;
        }
        for d in Direction::ALL {
            let next = grid.step(cell, d);
            if grid.in_bounds(next) && !blocked.contains(next) && visited.insert(next) {
                queue.push_back((next, first, depth + 1));
            }
        }
    }
    None
}

/// Follows the BFS path to the goal. Falls back to utility scoring when the
/// goal is unreachable or when the path's first move would shut the snake in
/// a pocket smaller than itself while another move keeps more room.
pub struct PathfindingAgent {
    max_depth: usize,
    flood_cap: usize,
    fallback: UtilityAgent,
}

impl PathfindingAgent {
    pub fn new(search: &SearchConfig, weights: &UtilityWeights) -> Self {
        Self {
            max_depth: search.max_depth,
            flood_cap: search.flood_cap,
            fallback: UtilityAgent::new(weights.clone(), search.flood_cap),
        }
    }

    fn traps(&self, dir: Direction, safe: &[Direction], obs: &Observation<'_>) -> bool {
        let head = obs.snake.head();
        let room = |d: Direction| reachable_count(obs.grid.step(head, d), obs.snake.body(), obs.grid, self.flood_cap);
        let chosen = room(dir);
        chosen < obs.snake.len().min(self.flood_cap) && safe.iter().any(|&d| d != dir && room(d) > chosen)
    }
}

impl Agent for PathfindingAgent {
    fn name(&self) -> &'static str {
        "pathfinding"
    }

    fn choose(&mut self, obs: &Observation<'_>) -> Direction {
        let snake = obs.snake;
        let safe = safe_moves(snake, obs.grid);
        if safe.is_empty() {
            return snake.direction();
        }
        match search(snake.head(), obs.goal, &safe, snake.body(), obs.grid, self.max_depth) {
            Some((dir, _)) if !self.traps(dir, &safe, obs) => dir,
            Some((dir, len)) => {
                debug!(?dir, len, "path enters a dead end, scoring moves instead");
                self.fallback.choose(obs)
            }
            None => {
                debug!(goal = ?obs.goal, "no path to goal, scoring moves instead");
                self.fallback.choose(obs)
            }
        }
    }
}
