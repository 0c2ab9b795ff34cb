use super::safety::escape_routes;
use super::space::reachable_count;
use super::Agent;
use crate::config::UtilityWeights;
use crate::game::Observation;
use crate::grid::{Cell, Direction, GridWorld};
use std::iter;

/// Scores every non-lethal, non-reversing move and takes the best one.
///
/// `score = -w_goal * dist(next, goal) + w_wall * wall_clearance(next)
///          + w_body * body_clearance(next) + w_space * reachable_count(next)`
///
/// When the head has at most `trap_threshold` escape routes the body and
/// space terms are multiplied by `trap_multiplier`, so survival outweighs
/// the goal. Ties go to the current heading, then to canonical order.
pub struct UtilityAgent {
    weights: UtilityWeights,
    flood_cap: usize,
}

impl UtilityAgent {
    pub fn new(weights: UtilityWeights, flood_cap: usize) -> Self {
        Self { weights, flood_cap }
    }

    pub fn near_trap(&self, obs: &Observation<'_>) -> bool {
        escape_routes(obs.snake.head(), obs.snake.body(), obs.grid) <= self.weights.trap_threshold
    }

    /// Utility of stepping the head in `dir`, `None` if that move is lethal.
    pub fn score(&self, dir: Direction, obs: &Observation<'_>) -> Option<f32> {
        self.score_with(dir, obs, self.near_trap(obs))
    }

    fn score_with(&self, dir: Direction, obs: &Observation<'_>, trapped: bool) -> Option<f32> {
        let body = obs.snake.body();
        let next = obs.grid.step(obs.snake.head(), dir);
        if obs.grid.is_lethal(next, body) {
            return None;
        }
        let w = &self.weights;
        let boost = if trapped { w.trap_multiplier } else { 1.0 };
        let goal = -(next.manhattan(obs.goal) as f32) * w.goal_distance;
        let wall = obs.grid.wall_clearance(next) as f32 * w.wall_clearance;
        let clearance = body_clearance(next, body, obs.grid) as f32 * w.body_clearance * boost;
        let space = reachable_count(next, body, obs.grid, self.flood_cap) as f32 * w.space * boost;
        Some(goal + wall + clearance + space)
    }
}

/// Manhattan distance to the nearest segment behind the head.
fn body_clearance(cell: Cell, body: &[Cell], grid: &GridWorld) -> i32 {
    body.iter().skip(1).map(|&seg| cell.manhattan(seg)).min().unwrap_or(grid.width + grid.height)
}

impl Agent for UtilityAgent {
    fn name(&self) -> &'static str {
        "utility"
    }

    fn choose(&mut self, obs: &Observation<'_>) -> Direction {
        let heading = obs.snake.direction();
        let trapped = self.near_trap(obs);
        let candidates = iter::once(heading)
            .chain(Direction::ALL.into_iter().filter(|&d| d != heading && !d.is_reverse_of(heading)));

        let mut best: Option<(Direction, f32)> = None;
        for dir in candidates {
            let Some(score) = self.score_with(dir, obs, trapped) else { continue };
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((dir, score));
            }
        }
        best.map_or(heading, |(dir, _)| dir)
    }
}
