use super::{Agent, Feedback};
use crate::config::{Config, LearningConfig, RewardConfig};
use crate::game::{Observation, TickOutcome};
use crate::grid::Direction;
use crate::persist::{PersistError, TableStore};
use ahash::AHashMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Compact state: goal direction as signs, one danger bit per direction (in
/// [`Direction::ALL`] order, vacating tail not dangerous) and the heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub goal_dx: i8,
    pub goal_dy: i8,
    pub danger: u8,
    pub heading: Direction,
}

impl StateKey {
    pub fn observe(obs: &Observation<'_>) -> Self {
        let head = obs.snake.head();
        let mut danger = 0u8;
        for d in Direction::ALL {
            if obs.grid.is_lethal(obs.grid.step(head, d), obs.snake.body()) {
                danger |= 1 << d.index();
            }
        }
        Self {
            goal_dx: (obs.goal.x - head.x).signum() as i8,
            goal_dy: (obs.goal.y - head.y).signum() as i8,
            danger,
            heading: obs.snake.direction(),
        }
    }

    pub fn is_dangerous(self, dir: Direction) -> bool {
        self.danger & (1 << dir.index()) != 0
    }

    /// Non-reversing, non-dangerous actions in canonical order. May be empty.
    pub fn legal_actions(self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|&d| !d.is_reverse_of(self.heading) && !self.is_dangerous(d))
            .collect()
    }

    fn points_to_goal(self, dir: Direction) -> bool {
        match dir {
            Direction::Up => self.goal_dy < 0,
            Direction::Down => self.goal_dy > 0,
            Direction::Left => self.goal_dx < 0,
            Direction::Right => self.goal_dx > 0,
        }
    }

    /// Every representable key (3 * 3 * 16 * 4).
    pub fn all() -> impl Iterator<Item = StateKey> {
        (-1i8..=1).flat_map(|goal_dx| {
            (-1i8..=1).flat_map(move |goal_dy| {
                (0u8..16).flat_map(move |danger| {
                    Direction::ALL.into_iter().map(move |heading| StateKey { goal_dx, goal_dy, danger, heading })
                })
            })
        })
    }
}

/// Action values per state, one column per direction. Unseen entries read as 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QTable {
    values: AHashMap<StateKey, [f32; 4]>,
}

impl QTable {
    /// Dangerous actions start at `collision`, actions toward the goal at +10.
    pub fn pretrained(collision: f32) -> Self {
        let mut table = Self::default();
        for key in StateKey::all() {
            let mut row = [0.0; 4];
            for d in Direction::ALL {
                row[d.index()] = if key.is_dangerous(d) {
                    collision
                } else if key.points_to_goal(d) {
                    10.0
                } else {
                    0.0
                };
            }
            table.values.insert(key, row);
        }
        table
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, state: StateKey, action: Direction) -> f32 {
        self.values.get(&state).map_or(0.0, |row| row[action.index()])
    }

    pub fn set(&mut self, state: StateKey, action: Direction, value: f32) {
        self.values.entry(state).or_insert([0.0; 4])[action.index()] = value;
    }

    /// Greedy pick among `actions`; the first one in the slice wins ties.
    pub fn best_action(&self, state: StateKey, actions: &[Direction]) -> Option<Direction> {
        let mut best: Option<(Direction, f32)> = None;
        for &a in actions {
            let q = self.get(state, a);
            if best.is_none_or(|(_, v)| q > v) {
                best = Some((a, q));
            }
        }
        best.map(|(a, _)| a)
    }

    /// Max Q over the legal actions of `state`, 0 when there are none.
    pub fn max_value(&self, state: StateKey) -> f32 {
        state.legal_actions().into_iter().map(|a| self.get(state, a)).reduce(f32::max).unwrap_or(0.0)
    }

    /// One TD(0) step: `Q += alpha * (r + gamma * max Q(next) - Q)`. A terminal
    /// transition (`next == None`) targets `r` alone. Returns the new value.
    pub fn update(
        &mut self,
        state: StateKey,
        action: Direction,
        reward: f32,
        next: Option<StateKey>,
        alpha: f32,
        gamma: f32,
    ) -> f32 {
        let future = next.map_or(0.0, |n| self.max_value(n));
        let q = &mut self.values.entry(state).or_insert([0.0; 4])[action.index()];
        *q += alpha * (reward + gamma * future - *q);
        *q
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    state: StateKey,
    action: Direction,
    distance: i32,
}

/// Epsilon-greedy tabular learner. In training mode every tick's feedback
/// updates the table; otherwise it plays greedily and leaves the table alone.
pub struct QLearningAgent {
    table: QTable,
    params: LearningConfig,
    rewards: RewardConfig,
    epsilon: f32,
    rng: SmallRng,
    training: bool,
    pending: Option<Pending>,
    episode_reward: f32,
    episodes: u64,
}

impl QLearningAgent {
    pub fn new(table: QTable, config: &Config, seed: u64) -> Self {
        Self {
            table,
            params: config.learning.clone(),
            rewards: config.rewards.clone(),
            epsilon: config.learning.epsilon,
            rng: SmallRng::seed_from_u64(seed),
            training: true,
            pending: None,
            episode_reward: 0.0,
            episodes: 0,
        }
    }

    /// Resumes from `store`. A missing or unreadable table is logged and
    /// replaced by an empty one (or a pre-seeded one if configured).
    pub fn load_or_new(store: &dyn TableStore, config: &Config, seed: u64) -> Self {
        let fresh = || {
            if config.learning.pretrain {
                QTable::pretrained(config.rewards.collision)
            } else {
                QTable::default()
            }
        };
        let table = match store.load() {
            Ok(Some(table)) => {
                info!(states = table.len(), "loaded q-table");
                table
            }
            Ok(None) => {
                info!("no saved q-table, starting fresh");
                fresh()
            }
            Err(err) => {
                warn!(%err, "could not load q-table, starting fresh");
                fresh()
            }
        };
        Self::new(table, config, seed)
    }

    pub fn checkpoint(&self, store: &dyn TableStore) -> Result<(), PersistError> {
        store.save(&self.table)?;
        info!(states = self.table.len(), episodes = self.episodes, "saved q-table");
        Ok(())
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn set_training(&mut self, training: bool) {
        self.training = training;
        self.pending = None;
    }

    pub fn select_action(&mut self, state: StateKey) -> Direction {
        let mut actions = state.legal_actions();
        if actions.is_empty() {
            actions = Direction::ALL.into_iter().filter(|d| !d.is_reverse_of(state.heading)).collect();
        }
        if self.training && self.rng.r#gen::<f32>() < self.epsilon {
            return actions[self.rng.gen_range(0..actions.len())];
        }
        self.table.best_action(state, &actions).unwrap_or(state.heading)
    }

    /// Terminal rewards are exact; otherwise a step cost plus distance shaping.
    pub fn reward(&self, outcome: TickOutcome, before: i32, after: i32) -> f32 {
        let r = &self.rewards;
        match outcome {
            TickOutcome::AteGoal => r.goal,
            TickOutcome::CollidedWall | TickOutcome::CollidedSelf => r.collision,
            TickOutcome::Continuing if after < before => r.step + r.closer,
            TickOutcome::Continuing if after > before => r.step + r.farther,
            TickOutcome::Continuing => r.step,
        }
    }

    pub fn decay_epsilon(&mut self) {
        self.epsilon = (self.epsilon * self.params.epsilon_decay).max(self.params.epsilon_min);
    }
}

impl Agent for QLearningAgent {
    fn name(&self) -> &'static str {
        "q-learning"
    }

    fn choose(&mut self, obs: &Observation<'_>) -> Direction {
        let state = StateKey::observe(obs);
        let action = self.select_action(state);
        self.pending = Some(Pending { state, action, distance: obs.snake.head().manhattan(obs.goal) });
        action
    }

    fn observe(&mut self, feedback: &Feedback<'_>) {
        let Some(p) = self.pending.take() else { return };
        let obs = &feedback.observation;
        let after = obs.snake.head().manhattan(obs.goal);
        let reward = self.reward(feedback.outcome, p.distance, after);
        self.episode_reward += reward;
        if self.training {
            let next = (!feedback.outcome.is_terminal()).then(|| StateKey::observe(obs));
            self.table.update(p.state, p.action, reward, next, self.params.alpha, self.params.gamma);
        }
    }

    fn end_episode(&mut self) {
        self.pending = None;
        self.episode_reward = 0.0;
        self.episodes += 1;
        if self.training {
            self.decay_epsilon();
        }
    }

    fn episode_reward(&self) -> Option<f32> {
        Some(self.episode_reward)
    }
}
