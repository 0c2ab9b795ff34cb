//! Integration test: movement invariants under every agent
//!
//! Plays seeded games with each agent and checks the walk, reversal and
//! goal-placement rules after every tick.

use snake_agents::agent::{self, AgentKind, Feedback, safe_moves};
use snake_agents::config::Config;
use snake_agents::game::{Game, TickOutcome};
use snake_agents::grid::{Cell, Direction};
use snake_agents::snake::SnakeState;

fn config() -> Config {
    let mut config = Config::default();
    config.game.width = 12;
    config.game.height = 10;
    config
}

#[test]
fn test_reversal_never_changes_direction() {
    for start in Direction::ALL {
        let mut snake = SnakeState::with_length(Cell::new(5, 5), start, 3);
        for turn in Direction::ALL {
            let before = snake.direction();
            let accepted = snake.turn(turn);
            if turn.is_reverse_of(before) {
                assert!(!accepted);
                assert_eq!(snake.direction(), before);
            }
            snake.walk();
        }
    }
}

#[test]
fn test_walk_and_goal_invariants_hold_for_every_agent() {
    let config = config();
    for kind in AgentKind::ALL {
        for seed in 0..6u64 {
            let mut game = Game::with_seed(&config.game, seed);
            let mut agent = agent::build(kind, &config, seed);
            for _ in 0..400 {
                let before: Vec<Cell> = game.snake().body().to_vec();
                let heading = game.snake().direction();
                let had_safe_move = !safe_moves(game.snake(), &game.grid).is_empty();
                let grew_last_tick = game.snake().growth_pending();

                let dir = agent.choose(&game.observation());
                let outcome = game.tick(Some(dir));
                agent.observe(&Feedback { outcome, observation: game.observation() });
                if outcome.is_terminal() {
                    // heuristic agents only crash when nothing was safe
                    if kind != AgentKind::QLearning {
                        assert!(!had_safe_move, "{kind:?} seed {seed} crashed with a safe move available");
                    }
                    assert_eq!(game.snake().body(), &before[..]);
                    break;
                }

                let snake = game.snake();
                assert!(!snake.direction().is_reverse_of(heading));
                assert_eq!(snake.head(), before[0].step(snake.direction()));
                for i in 1..before.len() {
                    assert_eq!(snake.body()[i], before[i - 1]);
                }
                let expected_len = before.len() + usize::from(outcome == TickOutcome::AteGoal);
                assert_eq!(snake.len(), expected_len);
                if grew_last_tick {
                    assert!(!snake.growth_pending() || outcome == TickOutcome::AteGoal);
                }
                if game.has_goal() {
                    assert!(!snake.contains(game.goal()));
                } else {
                    assert!(game.grid.cells().all(|c| snake.contains(c)));
                }
            }
            agent.end_episode();
        }
    }
}
