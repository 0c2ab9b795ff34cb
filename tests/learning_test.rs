//! Integration test: tabular Q-learning
//!
//! TD updates on a toy MDP, exploration decay and table persistence.

use snake_agents::agent::{QLearningAgent, QTable, StateKey};
use snake_agents::config::Config;
use snake_agents::grid::Direction;
use snake_agents::persist::{FileStore, PersistError, TableStore};
use snake_agents::train;

const ALPHA: f32 = 0.5;
const GAMMA: f32 = 0.9;

/// Heading up with danger on the right leaves exactly two legal actions: Up and Left.
fn toy_state(goal_dx: i8) -> StateKey {
    StateKey { goal_dx, goal_dy: 0, danger: 1 << Direction::Right.index(), heading: Direction::Up }
}

#[test]
fn test_toy_mdp_converges_to_analytic_values() {
    // S0 --Up--> S1 (r 0), S0 --Left--> end (r 1)
    // S1 --Up--> S0 (r 0), S1 --Left--> end (r 2)
    let (s0, s1) = (toy_state(1), toy_state(-1));
    assert_eq!(s0.legal_actions(), vec![Direction::Up, Direction::Left]);

    let mut table = QTable::default();
    for _ in 0..200 {
        table.update(s0, Direction::Up, 0.0, Some(s1), ALPHA, GAMMA);
        table.update(s0, Direction::Left, 1.0, None, ALPHA, GAMMA);
        table.update(s1, Direction::Up, 0.0, Some(s0), ALPHA, GAMMA);
        table.update(s1, Direction::Left, 2.0, None, ALPHA, GAMMA);
    }

    // V(S1) = 2, Q(S0,Up) = 0.9 * 2, V(S0) = 1.8, Q(S1,Up) = 0.9 * 1.8
    let expected = [
        (s0, Direction::Up, 1.8),
        (s0, Direction::Left, 1.0),
        (s1, Direction::Up, 1.62),
        (s1, Direction::Left, 2.0),
    ];
    for (s, a, v) in expected {
        assert!((table.get(s, a) - v).abs() < 1e-3, "Q({s:?}, {a:?}) = {} expected {v}", table.get(s, a));
    }
    assert_eq!(table.best_action(s0, &s0.legal_actions()), Some(Direction::Up));
    assert_eq!(table.best_action(s1, &s1.legal_actions()), Some(Direction::Left));
}

#[test]
fn test_epsilon_never_drops_below_floor() {
    let mut config = Config::default();
    config.learning.epsilon_decay = 0.5;
    config.learning.epsilon_min = 0.05;
    let mut agent = QLearningAgent::new(QTable::default(), &config, 0);
    for _ in 0..10_000 {
        agent.decay_epsilon();
        assert!(agent.epsilon() >= config.learning.epsilon_min);
    }
    assert_eq!(agent.epsilon(), config.learning.epsilon_min);
}

#[test]
fn test_table_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("q_table.bin"));
    let mut config = Config::default();
    config.game.width = 8;
    config.game.height = 8;
    config.training.max_steps_per_episode = 300;
    config.training.checkpoint_every = 10;

    let mut agent = QLearningAgent::new(QTable::default(), &config, 4);
    train::train(&mut agent, &config, 25, 4, Some(&store));

    let loaded = store.load().unwrap().expect("checkpoint written");
    assert_eq!(loaded.len(), agent.table().len());
    for key in StateKey::all() {
        for a in Direction::ALL {
            assert_eq!(loaded.get(key, a), agent.table().get(key, a));
        }
    }

    let resumed = QLearningAgent::load_or_new(&store, &config, 5);
    assert_eq!(resumed.table().len(), agent.table().len());
}

#[test]
fn test_corrupt_table_falls_back_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("q_table.bin");
    std::fs::write(&path, b"definitely not a q-table").unwrap();
    let store = FileStore::new(&path);

    assert!(matches!(store.load(), Err(PersistError::Decode(_))));

    let config = Config::default();
    let agent = QLearningAgent::load_or_new(&store, &config, 1);
    assert!(agent.table().is_empty());

    let mut seeded = config.clone();
    seeded.learning.pretrain = true;
    let agent = QLearningAgent::load_or_new(&store, &seeded, 1);
    assert_eq!(agent.table().len(), 3 * 3 * 16 * 4);
}

#[test]
fn test_missing_table_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("never_written.bin"));
    let agent = QLearningAgent::load_or_new(&store, &Config::default(), 1);
    assert!(agent.table().is_empty());
    assert_eq!(agent.epsilon(), Config::default().learning.epsilon);
}
