use crate::agent::{self, Agent, AgentKind, Feedback, QLearningAgent};
use crate::config::Config;
use crate::game::{EpisodeSummary, Game, TickOutcome};
use crate::grid::Direction;
use crate::persist::{FileStore, TableStore};
use crate::train::{self, TrainReport};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::{info, warn};

/// Everything an input source can ask of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Turn(Direction),
    Restart,
    Quit,
    /// `None` hands control back to the keyboard.
    SwitchAgent(Option<AgentKind>),
    Train(u32),
    TogglePause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

enum Controller {
    Manual,
    Scripted { kind: AgentKind, agent: Box<dyn Agent> },
    Learner(Box<QLearningAgent>),
}

/// Owns the running game and the single active direction producer.
pub struct Session {
    config: Config,
    game: Game,
    controller: Controller,
    store: Option<FileStore>,
    paused: bool,
    rng: SmallRng,
    best_score: u32,
    scores: Vec<u32>,
    last_summary: Option<EpisodeSummary>,
    last_training: Option<TrainReport>,
}

impl Session {
    pub fn new(config: Config, store: Option<FileStore>, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let game = Game::new(&config.game, SmallRng::seed_from_u64(rng.r#gen()));
        Self {
            config,
            game,
            controller: Controller::Manual,
            store,
            paused: false,
            rng,
            best_score: 0,
            scores: Vec::new(),
            last_summary: None,
            last_training: None,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    /// Final score of every finished round, oldest first.
    pub fn scores(&self) -> &[u32] {
        &self.scores
    }

    pub fn last_summary(&self) -> Option<EpisodeSummary> {
        self.last_summary
    }

    pub fn last_training(&self) -> Option<&TrainReport> {
        self.last_training.as_ref()
    }

    pub fn agent_kind(&self) -> Option<AgentKind> {
        match &self.controller {
            Controller::Manual => None,
            Controller::Scripted { kind, .. } => Some(*kind),
            Controller::Learner(_) => Some(AgentKind::QLearning),
        }
    }

    pub fn controller_label(&self) -> &'static str {
        self.agent_kind().map_or("MANUAL", AgentKind::label)
    }

    pub fn epsilon(&self) -> Option<f32> {
        match &self.controller {
            Controller::Learner(learner) => Some(learner.epsilon()),
            _ => None,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.config.game.tick_interval(self.game.snake().len())
    }

    pub fn handle(&mut self, intent: Intent) -> Control {
        match intent {
            Intent::Turn(dir) => {
                if matches!(self.controller, Controller::Manual) && !self.paused {
                    self.game.change_dir(dir);
                }
            }
            Intent::Restart => self.restart(),
            Intent::TogglePause => self.paused = !self.paused,
            Intent::SwitchAgent(kind) => self.switch(kind),
            Intent::Train(episodes) => self.train(episodes),
            Intent::Quit => {
                self.shutdown();
                return Control::Quit;
            }
        }
        Control::Continue
    }

    /// Advances one tick. Returns `None` while paused or while a manual game
    /// sits on its game-over screen; agent-driven rounds restart on their own.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if self.paused {
            return None;
        }
        if self.game.is_over() {
            if matches!(self.controller, Controller::Manual) {
                return None;
            }
            self.new_round();
        }

        let outcome = match &mut self.controller {
            Controller::Manual => self.game.tick(None),
            Controller::Scripted { agent, .. } => step(&mut self.game, agent.as_mut()),
            Controller::Learner(learner) => step(&mut self.game, learner.as_mut()),
        };
        if outcome.is_terminal() {
            self.finish_round();
        }
        Some(outcome)
    }

    fn active_agent(&mut self) -> Option<&mut dyn Agent> {
        match &mut self.controller {
            Controller::Manual => None,
            Controller::Scripted { agent, .. } => Some(agent.as_mut()),
            Controller::Learner(learner) => Some(learner.as_mut() as &mut dyn Agent),
        }
    }

    fn finish_round(&mut self) {
        let agent_name = self.active_agent().map(|agent| {
            agent.end_episode();
            agent.name()
        });
        if let Some(summary) = self.game.summary() {
            self.best_score = self.best_score.max(summary.score);
            self.scores.push(summary.score);
            info!(
                agent = agent_name.unwrap_or("manual"),
                score = summary.score,
                length = summary.length,
                ticks = summary.ticks,
                cause = ?summary.cause,
                "round over"
            );
            self.last_summary = Some(summary);
        }
        if self.checkpoint_due() {
            self.checkpoint();
        }
    }

    /// Online learning in the window saves on the same cadence as headless training.
    fn checkpoint_due(&self) -> bool {
        let every = u64::from(self.config.training.checkpoint_every);
        match &self.controller {
            Controller::Learner(learner) => every > 0 && learner.episodes() % every == 0,
            _ => false,
        }
    }

    fn new_round(&mut self) {
        self.game = Game::new(&self.config.game, SmallRng::seed_from_u64(self.rng.r#gen()));
    }

    fn restart(&mut self) {
        if !self.game.is_over() {
            if let Some(agent) = self.active_agent() {
                agent.end_episode();
            }
        }
        self.new_round();
        self.paused = false;
    }

    fn switch(&mut self, kind: Option<AgentKind>) {
        if kind == self.agent_kind() {
            return;
        }
        self.checkpoint();
        let seed = self.rng.r#gen();
        self.controller = match kind {
            None => Controller::Manual,
            Some(AgentKind::QLearning) => Controller::Learner(Box::new(self.load_learner(seed))),
            Some(kind) => Controller::Scripted { kind, agent: agent::build(kind, &self.config, seed) },
        };
        info!(agent = self.controller_label(), "switched controller");
        self.new_round();
    }

    fn load_learner(&self, seed: u64) -> QLearningAgent {
        match &self.store {
            Some(store) => QLearningAgent::load_or_new(store, &self.config, seed),
            None => QLearningAgent::new(Default::default(), &self.config, seed),
        }
    }

    /// Trains the learning agent headlessly, switching to it first if needed.
    fn train(&mut self, episodes: u32) {
        self.switch(Some(AgentKind::QLearning));
        let seed = self.rng.r#gen();
        let store = self.store.as_ref().map(|s| s as &dyn TableStore);
        if let Controller::Learner(learner) = &mut self.controller {
            let report = train::train(learner, &self.config, episodes, seed, store);
            info!(episodes, mean_score = report.mean_score, best = report.best_score, "training batch done");
            self.last_training = Some(report);
        }
        self.new_round();
    }

    fn checkpoint(&self) {
        if let (Controller::Learner(learner), Some(store)) = (&self.controller, &self.store) {
            if let Err(err) = learner.checkpoint(store) {
                warn!(%err, "could not save q-table");
            }
        }
    }

    /// Saves the learned table, if any. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.checkpoint();
    }
}

fn step(game: &mut Game, agent: &mut dyn Agent) -> TickOutcome {
    let dir = agent.choose(&game.observation());
    let outcome = game.tick(Some(dir));
    agent.observe(&Feedback { outcome, observation: game.observation() });
    outcome
}
