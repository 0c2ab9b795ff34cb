use crate::agent::{self, Agent, AgentKind, Feedback, QLearningAgent, QTable};
use crate::config::Config;
use crate::game::{Collision, Game, TickOutcome};
use crate::persist::TableStore;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeReport {
    pub score: u32,
    pub length: usize,
    pub ticks: u64,
    /// `None` when the episode hit the step cap.
    pub cause: Option<Collision>,
    pub reward: Option<f32>,
}

/// Plays one episode to a collision or `max_steps` ticks, feeding every
/// outcome back to the agent.
pub fn run_episode(game: &mut Game, agent: &mut dyn Agent, max_steps: u64) -> EpisodeReport {
    let mut outcome = TickOutcome::Continuing;
    while game.ticks() < max_steps {
        let dir = agent.choose(&game.observation());
        outcome = game.tick(Some(dir));
        agent.observe(&Feedback { outcome, observation: game.observation() });
        if outcome.is_terminal() {
            break;
        }
    }
    let reward = agent.episode_reward();
    agent.end_episode();
    EpisodeReport {
        score: game.score(),
        length: game.snake().len(),
        ticks: game.ticks(),
        cause: outcome.collision(),
        reward,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub episodes: u32,
    pub mean_reward: f32,
    pub mean_score: f32,
    pub best_score: u32,
    pub epsilon: f32,
    pub states: usize,
}

/// Headless training. Every episode gets its own goal sequence drawn from
/// `seed`; the table is checkpointed every `checkpoint_every` episodes and
/// once more at the end.
pub fn train(
    agent: &mut QLearningAgent,
    config: &Config,
    episodes: u32,
    seed: u64,
    store: Option<&dyn TableStore>,
) -> TrainReport {
    let t = &config.training;
    agent.set_training(true);
    let mut rng = SmallRng::seed_from_u64(seed);

    let (mut total_reward, mut total_score, mut best_score) = (0.0f32, 0u64, 0u32);
    let (mut window_reward, mut window_len, mut window_n) = (0.0f32, 0usize, 0u32);
    let mut saved_at = 0;

    for episode in 1..=episodes {
        let mut game = Game::new(&config.game, SmallRng::seed_from_u64(rng.r#gen()));
        let report = run_episode(&mut game, agent, t.max_steps_per_episode);
        let reward = report.reward.unwrap_or(0.0);
        total_reward += reward;
        total_score += u64::from(report.score);
        best_score = best_score.max(report.score);
        window_reward += reward;
        window_len += report.length;
        window_n += 1;

        if t.log_every > 0 && episode % t.log_every == 0 {
            info!(
                episode,
                mean_reward = window_reward / window_n as f32,
                mean_length = window_len as f32 / window_n as f32,
                epsilon = agent.epsilon(),
                states = agent.table().len(),
                "training progress"
            );
            (window_reward, window_len, window_n) = (0.0, 0, 0);
        }
        if let Some(store) = store {
            if t.checkpoint_every > 0 && episode % t.checkpoint_every == 0 {
                save(agent, store);
                saved_at = episode;
            }
        }
    }
    if let Some(store) = store {
        if saved_at != episodes {
            save(agent, store);
        }
    }

    let n = episodes.max(1) as f32;
    TrainReport {
        episodes,
        mean_reward: total_reward / n,
        mean_score: total_score as f32 / n,
        best_score,
        epsilon: agent.epsilon(),
        states: agent.table().len(),
    }
}

fn save(agent: &QLearningAgent, store: &dyn TableStore) {
    if let Err(err) = agent.checkpoint(store) {
        warn!(%err, "checkpoint failed, training continues");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalReport {
    pub kind: AgentKind,
    pub episodes: u32,
    pub mean_score: f32,
    pub best_score: u32,
    pub mean_length: f32,
    pub walls: u32,
    pub self_hits: u32,
    pub truncated: u32,
}

/// Runs `episodes` independent seeded games of `kind` across the rayon pool.
/// A learning agent plays greedily from `table` (or an empty one) and does
/// not update it.
pub fn evaluate(kind: AgentKind, config: &Config, table: Option<&QTable>, episodes: u32, seed: u64) -> EvalReport {
    let max_steps = config.training.max_steps_per_episode;
    let reports: Vec<EpisodeReport> = (0..episodes)
        .into_par_iter()
        .map(|i| {
            let episode_seed = seed.wrapping_add(u64::from(i));
            let mut agent: Box<dyn Agent> = match kind {
                AgentKind::QLearning => {
                    let mut learner = QLearningAgent::new(table.cloned().unwrap_or_default(), config, episode_seed);
                    learner.set_training(false);
                    Box::new(learner)
                }
                _ => agent::build(kind, config, episode_seed),
            };
            let mut game = Game::with_seed(&config.game, episode_seed);
            run_episode(&mut game, agent.as_mut(), max_steps)
        })
        .collect();

    let n = reports.len().max(1) as f32;
    let count = |cause: Option<Collision>| reports.iter().filter(|r| r.cause == cause).count() as u32;
    EvalReport {
        kind,
        episodes,
        mean_score: reports.iter().map(|r| r.score as f32).sum::<f32>() / n,
        best_score: reports.iter().map(|r| r.score).max().unwrap_or(0),
        mean_length: reports.iter().map(|r| r.length as f32).sum::<f32>() / n,
        walls: count(Some(Collision::Wall)),
        self_hits: count(Some(Collision::SelfBody)),
        truncated: count(None),
    }
}
