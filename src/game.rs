use crate::config::GameConfig;
use crate::grid::{Cell, Direction, GridWorld};
use crate::snake::SnakeState;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    Wall,
    SelfBody,
}

/// Result of one tick, consumed by the loop and fed back to learning agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continuing,
    AteGoal,
    CollidedWall,
    CollidedSelf,
}

impl TickOutcome {
    pub fn is_terminal(self) -> bool {
        self.collision().is_some()
    }

    pub fn collision(self) -> Option<Collision> {
        match self {
            TickOutcome::CollidedWall => Some(Collision::Wall),
            TickOutcome::CollidedSelf => Some(Collision::SelfBody),
            _ => None,
        }
    }
}

/// Read-only view handed to agents each tick.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub snake: &'a SnakeState,
    pub goal: Cell,
    pub grid: &'a GridWorld,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeSummary {
    pub cause: Collision,
    pub score: u32,
    pub length: usize,
    pub ticks: u64,
    /// Tick on which the last goal was eaten.
    pub last_goal_tick: Option<u64>,
}

pub struct Game {
    pub grid: GridWorld,
    snake: SnakeState,
    goal: Cell,
    /// False once the body covers every cell and no goal could be placed.
    goal_live: bool,
    score: u32,
    ticks: u64,
    last_goal_tick: Option<u64>,
    over: Option<Collision>,
    rng: SmallRng,
}

impl Game {
    pub fn new(config: &GameConfig, rng: SmallRng) -> Self {
        let grid = GridWorld::new(config.width, config.height);
        let start = Cell::new(config.width / 2, config.height / 2);
        let snake = SnakeState::with_length(start, Direction::Right, config.initial_length);
        let mut g = Self::with_state(grid, snake, start, rng);
        g.place_goal();
        g
    }

    pub fn with_seed(config: &GameConfig, seed: u64) -> Self {
        Self::new(config, SmallRng::seed_from_u64(seed))
    }

    /// Explicit setup; the goal is taken as given.
    pub fn with_state(grid: GridWorld, snake: SnakeState, goal: Cell, rng: SmallRng) -> Self {
        Self { grid, snake, goal, goal_live: true, score: 0, ticks: 0, last_goal_tick: None, over: None, rng }
    }

    pub fn snake(&self) -> &SnakeState {
        &self.snake
    }

    pub fn goal(&self) -> Cell {
        self.goal
    }

    pub fn set_goal(&mut self, goal: Cell) {
        self.goal = goal;
        self.goal_live = true;
    }

    /// Whether the goal cell can still be eaten.
    pub fn has_goal(&self) -> bool {
        self.goal_live
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_over(&self) -> bool {
        self.over.is_some()
    }

    pub fn observation(&self) -> Observation<'_> {
        Observation { snake: &self.snake, goal: self.goal, grid: &self.grid }
    }

    pub fn summary(&self) -> Option<EpisodeSummary> {
        self.over.map(|cause| EpisodeSummary {
            cause,
            score: self.score,
            length: self.snake.len(),
            ticks: self.ticks,
            last_goal_tick: self.last_goal_tick,
        })
    }

    /// Forwards a turn request to the snake; reversals are ignored there.
    pub fn change_dir(&mut self, dir: Direction) {
        self.snake.turn(dir);
    }

    /// Moves the goal to a random free cell. Returns false, and retires the
    /// goal, when the body covers every cell.
    pub fn place_goal(&mut self) -> bool {
        // rejection sampling is cheap while the board is mostly empty
        for _ in 0..64 {
            let p = Cell::new(self.rng.gen_range(0..self.grid.width), self.rng.gen_range(0..self.grid.height));
            if !self.snake.contains(p) {
                self.goal = p;
                self.goal_live = true;
                return true;
            }
        }
        let free: Vec<Cell> = self.grid.cells().filter(|c| !self.snake.contains(*c)).collect();
        if free.is_empty() {
            self.goal_live = false;
            return false;
        }
        self.goal = free[self.rng.gen_range(0..free.len())];
        self.goal_live = true;
        true
    }

    /// One tick: optional turn, collision test against the next head, walk, eat.
    /// A collided snake is left in place and later ticks repeat the collision.
    pub fn tick(&mut self, dir: Option<Direction>) -> TickOutcome {
        if let Some(cause) = self.over {
            return match cause {
                Collision::Wall => TickOutcome::CollidedWall,
                Collision::SelfBody => TickOutcome::CollidedSelf,
            };
        }
        if let Some(d) = dir {
            self.snake.turn(d);
        }
        self.ticks += 1;

        let next = self.grid.step(self.snake.head(), self.snake.direction());
        if !self.grid.in_bounds(next) {
            self.over = Some(Collision::Wall);
            return TickOutcome::CollidedWall;
        }
        if self.grid.occupied(next, self.snake.body(), true) {
            self.over = Some(Collision::SelfBody);
            return TickOutcome::CollidedSelf;
        }

        self.snake.walk();
        if self.goal_live && self.snake.head() == self.goal {
            self.score += 1;
            self.last_goal_tick = Some(self.ticks);
            self.snake.grow();
            self.place_goal();
            return TickOutcome::AteGoal;
        }
        TickOutcome::Continuing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_at(body: Vec<Cell>, dir: Direction, goal: Cell) -> Game {
        Game::with_state(GridWorld::new(10, 10), SnakeState::from_body(body, dir), goal, SmallRng::seed_from_u64(7))
    }

    #[test]
    fn test_new_game_goal_is_free() {
        for seed in 0..20 {
            let g = Game::with_seed(&GameConfig::default(), seed);
            assert!(!g.snake().contains(g.goal()));
            assert!(g.grid.in_bounds(g.goal()));
        }
    }

    #[test]
    fn test_wall_collision_is_terminal() {
        let mut g = game_at(vec![Cell::new(9, 0)], Direction::Right, Cell::new(0, 9));
        assert_eq!(g.tick(None), TickOutcome::CollidedWall);
        assert!(g.is_over());
        assert_eq!(g.snake().head(), Cell::new(9, 0));
        assert_eq!(g.summary().map(|s| s.cause), Some(Collision::Wall));
    }

    #[test]
    fn test_self_collision_is_terminal() {
        // head turning down into its own body
        let body = vec![Cell::new(2, 1), Cell::new(3, 1), Cell::new(3, 2), Cell::new(2, 2), Cell::new(1, 2)];
        let mut g = game_at(body, Direction::Left, Cell::new(9, 9));
        assert_eq!(g.tick(Some(Direction::Down)), TickOutcome::CollidedSelf);
    }

    #[test]
    fn test_moving_into_vacating_tail_is_safe() {
        let body = vec![Cell::new(2, 1), Cell::new(3, 1), Cell::new(3, 2), Cell::new(2, 2)];
        let mut g = game_at(body, Direction::Left, Cell::new(9, 9));
        assert_eq!(g.tick(Some(Direction::Down)), TickOutcome::Continuing);
        assert_eq!(g.snake().head(), Cell::new(2, 2));
    }

    #[test]
    fn test_eating_grows_and_relocates_goal() {
        let mut g = game_at(vec![Cell::new(2, 2)], Direction::Right, Cell::new(3, 2));
        assert_eq!(g.tick(None), TickOutcome::AteGoal);
        assert_eq!(g.score(), 1);
        assert_eq!(g.snake().len(), 2);
        assert_ne!(g.goal(), Cell::new(3, 2));
        assert!(!g.snake().contains(g.goal()));
        g.set_goal(Cell::new(9, 9));
        assert_eq!(g.tick(None), TickOutcome::Continuing);
        assert_eq!(g.snake().body(), &[Cell::new(4, 2), Cell::new(3, 2)]);
    }

    #[test]
    fn test_place_goal_fails_on_full_grid() {
        let grid = GridWorld::new(2, 1);
        let snake = SnakeState::from_body(vec![Cell::new(0, 0), Cell::new(1, 0)], Direction::Left);
        let mut g = Game::with_state(grid, snake, Cell::new(0, 0), SmallRng::seed_from_u64(1));
        assert!(!g.place_goal());
        assert!(!g.has_goal());
    }

    #[test]
    fn test_goal_moves_to_last_free_cell_after_growth() {
        let grid = GridWorld::new(2, 2);
        let body = vec![Cell::new(1, 0), Cell::new(0, 0), Cell::new(0, 1)];
        let snake = SnakeState::from_body(body, Direction::Down);
        let mut g = Game::with_state(grid, snake, Cell::new(1, 1), SmallRng::seed_from_u64(3));
        assert_eq!(g.tick(None), TickOutcome::AteGoal);
        // grown body still holds a duplicated tail, so (0, 1) is the one free cell
        assert_eq!(g.snake().len(), 4);
        assert!(g.has_goal());
        assert_eq!(g.goal(), Cell::new(0, 1));
        assert!(!g.snake().contains(g.goal()));
    }

    #[test]
    fn test_retired_goal_is_never_eaten() {
        // a ring filling the 2x2 board keeps chasing its tail
        let grid = GridWorld::new(2, 2);
        let body = vec![Cell::new(0, 1), Cell::new(1, 1), Cell::new(1, 0), Cell::new(0, 0)];
        let snake = SnakeState::from_body(body, Direction::Up);
        let mut g = Game::with_state(grid, snake, Cell::new(1, 1), SmallRng::seed_from_u64(3));
        assert!(!g.place_goal());
        for _ in 0..2 {
            for dir in [Direction::Up, Direction::Right, Direction::Down, Direction::Left] {
                assert_eq!(g.tick(Some(dir)), TickOutcome::Continuing);
            }
        }
        assert_eq!(g.snake().len(), 4);
        assert_eq!(g.score(), 0);
    }
}
