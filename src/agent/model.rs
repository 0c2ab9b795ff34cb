use super::Agent;
use crate::game::Observation;
use crate::grid::{Cell, Direction};
use ahash::AHashSet;
use std::collections::VecDeque;

const HISTORY: usize = 10;

/// Reflex scoring on top of a small internal model: the cells the head
/// visited recently and the ring of cells hugging the body.
#[derive(Debug, Default)]
pub struct ModelBasedAgent {
    history: VecDeque<Cell>,
    danger: AHashSet<Cell>,
}

impl ModelBasedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    fn update_model(&mut self, obs: &Observation<'_>) {
        let body = obs.snake.body();
        self.danger.clear();
        for &seg in body.iter().skip(1) {
            for d in Direction::ALL {
                let n = seg.step(d);
                if !body.contains(&n) {
                    self.danger.insert(n);
                }
            }
        }
    }

    fn score(&self, dir: Direction, obs: &Observation<'_>) -> i32 {
        let next = obs.grid.step(obs.snake.head(), dir);
        if obs.grid.is_lethal(next, obs.snake.body()) {
            return -1000;
        }
        let mut score = -5 * next.manhattan(obs.goal);
        if self.danger.contains(&next) {
            score -= 20;
        }
        if self.history.contains(&next) {
            score -= 10;
        }
        if dir == obs.snake.direction() {
            score += 10;
        }
        if next.x == obs.goal.x || next.y == obs.goal.y {
            score += 15;
        }
        score
    }
}

impl Agent for ModelBasedAgent {
    fn name(&self) -> &'static str {
        "model-based"
    }

    fn choose(&mut self, obs: &Observation<'_>) -> Direction {
        self.update_model(obs);
        let heading = obs.snake.direction();
        let mut best: Option<(Direction, i32)> = None;
        for dir in Direction::ALL.into_iter().filter(|d| !d.is_reverse_of(heading)) {
            let score = self.score(dir, obs);
            if score > -1000 && best.is_none_or(|(_, s)| score > s) {
                best = Some((dir, score));
            }
        }

        if self.history.len() == HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(obs.snake.head());
        best.map_or(heading, |(dir, _)| dir)
    }

    fn end_episode(&mut self) {
        self.history.clear();
        self.danger.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridWorld;
    use crate::snake::SnakeState;

    #[test]
    fn test_history_is_bounded() {
        let grid = GridWorld::new(30, 30);
        let mut snake = SnakeState::new(Cell::new(0, 15), Direction::Right);
        let mut agent = ModelBasedAgent::new();
        for _ in 0..25 {
            let obs = Observation { snake: &snake, goal: Cell::new(29, 15), grid: &grid };
            let dir = agent.choose(&obs);
            snake.turn(dir);
            snake.walk();
        }
        assert_eq!(agent.history.len(), HISTORY);
        assert_eq!(snake.head(), Cell::new(25, 15));
    }

    #[test]
    fn test_never_picks_lethal_when_alternatives_exist() {
        let grid = GridWorld::new(5, 5);
        let snake = SnakeState::new(Cell::new(4, 0), Direction::Right);
        let obs = Observation { snake: &snake, goal: Cell::new(4, 4), grid: &grid };
        assert_eq!(ModelBasedAgent::new().choose(&obs), Direction::Down);
    }
}
