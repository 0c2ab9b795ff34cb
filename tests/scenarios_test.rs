//! Integration test: reference scenarios
//!
//! Straight run to the goal, a goal sealed off behind the body, a rejected
//! reversal and the terminal rewards seen by the learning agent.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use snake_agents::agent::{
    Agent, Feedback, PathfindingAgent, QLearningAgent, QTable, UtilityAgent, find_first_step, reachable_count,
};
use snake_agents::config::{Config, SearchConfig, UtilityWeights};
use snake_agents::game::{Game, Observation, TickOutcome};
use snake_agents::grid::{Cell, Direction, GridWorld};
use snake_agents::snake::SnakeState;

fn game(grid: GridWorld, snake: SnakeState, goal: Cell) -> Game {
    Game::with_state(grid, snake, goal, SmallRng::seed_from_u64(11))
}

/// 6x6 board; the body walls the head off from the goal at (5,5) and leaves
/// a 6-cell pocket on the right of the head.
fn sealed_goal() -> (GridWorld, SnakeState, Cell) {
    let body = vec![
        Cell::new(3, 0),
        Cell::new(3, 1),
        Cell::new(3, 2),
        Cell::new(3, 3),
        Cell::new(4, 3),
        Cell::new(5, 3),
        Cell::new(5, 4),
        Cell::new(4, 4),
        Cell::new(4, 5),
    ];
    (GridWorld::new(6, 6), SnakeState::from_body(body, Direction::Up), Cell::new(5, 5))
}

#[test]
fn test_scenario_a_bfs_walks_straight_to_goal() {
    let mut g = game(GridWorld::new(10, 10), SnakeState::new(Cell::new(0, 0), Direction::Right), Cell::new(3, 0));
    for step in 1..=3 {
        let snake = g.snake();
        let dir = find_first_step(snake.head(), g.goal(), snake.body(), &g.grid, 30);
        assert_eq!(dir, Some(Direction::Right));
        let outcome = g.tick(dir);
        let expected = if step < 3 { TickOutcome::Continuing } else { TickOutcome::AteGoal };
        assert_eq!(outcome, expected);
    }
    assert_eq!(g.score(), 1);
    assert_eq!(g.snake().head(), Cell::new(3, 0));
}

#[test]
fn test_scenario_a_pathfinding_agent_matches() {
    let mut g = game(GridWorld::new(10, 10), SnakeState::new(Cell::new(0, 0), Direction::Right), Cell::new(3, 0));
    let mut agent = PathfindingAgent::new(&SearchConfig::default(), &UtilityWeights::default());
    for _ in 0..3 {
        let dir = agent.choose(&g.observation());
        assert_eq!(dir, Direction::Right);
        g.tick(Some(dir));
    }
    assert_eq!(g.score(), 1);
}

#[test]
fn test_scenario_b_unreachable_goal_prefers_space() {
    let (grid, snake, goal) = sealed_goal();
    assert_eq!(find_first_step(snake.head(), goal, snake.body(), &grid, 30), None);

    let left = reachable_count(Cell::new(2, 0), snake.body(), &grid, 100);
    let right = reachable_count(Cell::new(4, 0), snake.body(), &grid, 100);
    assert_eq!(right, 6);
    assert!(left > right);

    let obs = Observation { snake: &snake, goal, grid: &grid };
    let mut utility = UtilityAgent::new(UtilityWeights::default(), 100);
    assert_eq!(utility.choose(&obs), Direction::Left);

    let mut pathfinding = PathfindingAgent::new(&SearchConfig::default(), &UtilityWeights::default());
    assert_eq!(pathfinding.choose(&obs), Direction::Left);
}

#[test]
fn test_scenario_c_reversal_is_ignored() {
    let mut snake = SnakeState::new(Cell::new(5, 5), Direction::Up);
    assert!(!snake.turn(Direction::Down));
    assert_eq!(snake.direction(), Direction::Up);

    let mut g = game(GridWorld::new(10, 10), snake, Cell::new(0, 0));
    g.change_dir(Direction::Down);
    assert_eq!(g.tick(None), TickOutcome::Continuing);
    assert_eq!(g.snake().head(), Cell::new(5, 4));
}

#[test]
fn test_scenario_d_goal_transition_reward() {
    let config = Config::default();
    let mut agent = QLearningAgent::new(QTable::pretrained(config.rewards.collision), &config, 1);
    agent.set_training(false);
    let mut g = game(GridWorld::new(10, 10), SnakeState::new(Cell::new(0, 5), Direction::Right), Cell::new(1, 5));

    let dir = agent.choose(&g.observation());
    assert_eq!(dir, Direction::Right);
    let outcome = g.tick(Some(dir));
    assert_eq!(outcome, TickOutcome::AteGoal);
    agent.observe(&Feedback { outcome, observation: g.observation() });
    assert!(agent.episode_reward().is_some_and(|r| r >= 100.0));
}

#[test]
fn test_scenario_d_collision_transition_reward() {
    let config = Config::default();
    let mut agent = QLearningAgent::new(QTable::default(), &config, 1);
    // 2x1 corridor: every non-reversing move leaves the board
    let snake = SnakeState::from_body(vec![Cell::new(1, 0), Cell::new(0, 0)], Direction::Right);
    let mut g = game(GridWorld::new(2, 1), snake, Cell::new(0, 0));

    let dir = agent.choose(&g.observation());
    let outcome = g.tick(Some(dir));
    assert_eq!(outcome, TickOutcome::CollidedWall);
    agent.observe(&Feedback { outcome, observation: g.observation() });
    assert!(agent.episode_reward().is_some_and(|r| r <= -100.0));
}
