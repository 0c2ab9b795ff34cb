use super::safety::{escape_routes, safe_moves};
use super::Agent;
use crate::game::Observation;
use crate::grid::Direction;

/// Stateless one-step lookahead: closer to the goal, more exits, keep going straight.
#[derive(Debug, Default)]
pub struct ReflexAgent;

impl ReflexAgent {
    pub fn new() -> Self {
        Self
    }
}

impl Agent for ReflexAgent {
    fn name(&self) -> &'static str {
        "reflex"
    }

    fn choose(&mut self, obs: &Observation<'_>) -> Direction {
        let snake = obs.snake;
        let heading = snake.direction();
        let mut best: Option<(Direction, i32)> = None;
        for dir in safe_moves(snake, obs.grid) {
            let next = obs.grid.step(snake.head(), dir);
            let mut score = -next.manhattan(obs.goal) + 2 * escape_routes(next, snake.body(), obs.grid) as i32;
            if dir == heading {
                score += 1;
            }
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((dir, score));
            }
        }
        best.map_or(heading, |(dir, _)| dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, GridWorld};
    use crate::snake::SnakeState;

    #[test]
    fn test_heads_for_goal() {
        let grid = GridWorld::new(10, 10);
        let snake = SnakeState::new(Cell::new(5, 5), Direction::Up);
        let obs = Observation { snake: &snake, goal: Cell::new(2, 5), grid: &grid };
        assert_eq!(ReflexAgent::new().choose(&obs), Direction::Left);
    }

    #[test]
    fn test_avoids_wall() {
        let grid = GridWorld::new(10, 10);
        let snake = SnakeState::new(Cell::new(9, 0), Direction::Right);
        let obs = Observation { snake: &snake, goal: Cell::new(9, 9), grid: &grid };
        assert_eq!(ReflexAgent::new().choose(&obs), Direction::Down);
    }
}
