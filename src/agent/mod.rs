//! Direction producers. Every agent reads the live state by reference and
//! returns one of the four moves; none of them mutates the snake or the grid.

pub mod model;
pub mod pathfinding;
pub mod qlearning;
pub mod reflex;
pub mod safety;
pub mod space;
pub mod utility;

use crate::config::Config;
use crate::game::{Observation, TickOutcome};
use crate::grid::Direction;
use serde::{Deserialize, Serialize};

pub use model::ModelBasedAgent;
pub use pathfinding::{PathfindingAgent, find_first_step, shortest_path_len};
pub use qlearning::{QLearningAgent, QTable, StateKey};
pub use reflex::ReflexAgent;
pub use safety::{escape_routes, safe_moves};
pub use space::reachable_count;
pub use utility::UtilityAgent;

/// What happened after the agent's last choice, reported once per tick.
#[derive(Debug, Clone, Copy)]
pub struct Feedback<'a> {
    pub outcome: TickOutcome,
    pub observation: Observation<'a>,
}

pub trait Agent {
    fn name(&self) -> &'static str;

    fn choose(&mut self, obs: &Observation<'_>) -> Direction;

    fn observe(&mut self, _feedback: &Feedback<'_>) {}

    /// Called once the episode ended (collision or truncation).
    fn end_episode(&mut self) {}

    /// Reward collected so far in the running episode, for agents that track one.
    fn episode_reward(&self) -> Option<f32> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    Reflex,
    ModelBased,
    Pathfinding,
    Utility,
    QLearning,
}

impl AgentKind {
    pub const ALL: [AgentKind; 5] =
        [AgentKind::Reflex, AgentKind::ModelBased, AgentKind::Pathfinding, AgentKind::Utility, AgentKind::QLearning];

    pub fn label(self) -> &'static str {
        match self {
            AgentKind::Reflex => "REFLEX",
            AgentKind::ModelBased => "MODEL",
            AgentKind::Pathfinding => "SEARCH",
            AgentKind::Utility => "UTILITY",
            AgentKind::QLearning => "Q-LEARN",
        }
    }
}

/// Builds a fresh agent. A learning agent starts from an empty table; use
/// [`QLearningAgent::load_or_new`] to resume from a store.
pub fn build(kind: AgentKind, config: &Config, seed: u64) -> Box<dyn Agent> {
    match kind {
        AgentKind::Reflex => Box::new(ReflexAgent::new()),
        AgentKind::ModelBased => Box::new(ModelBasedAgent::new()),
        AgentKind::Pathfinding => Box::new(PathfindingAgent::new(&config.search, &config.utility)),
        AgentKind::Utility => Box::new(UtilityAgent::new(config.utility.clone(), config.search.flood_cap)),
        AgentKind::QLearning => Box::new(QLearningAgent::new(QTable::default(), config, seed)),
    }
}
