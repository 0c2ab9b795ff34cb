use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config {path:?}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full runtime configuration. Every section has defaults, so a partial JSON file is enough.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub game: GameConfig,
    pub search: SearchConfig,
    pub utility: UtilityWeights,
    pub learning: LearningConfig,
    pub rewards: RewardConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub width: i32,
    pub height: i32,
    pub initial_length: usize,
    /// Tick interval at the start of a round.
    pub base_tick_ms: u64,
    pub min_tick_ms: u64,
    /// The interval shrinks by `speedup_ms` every `speedup_every` segments.
    pub speedup_every: usize,
    pub speedup_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 25,
            height: 20,
            initial_length: 1,
            base_tick_ms: 300,
            min_tick_ms: 50,
            speedup_every: 5,
            speedup_ms: 40,
        }
    }
}

impl GameConfig {
    pub fn tick_interval(&self, length: usize) -> Duration {
        let steps = if self.speedup_every == 0 { 0 } else { length / self.speedup_every };
        let ms = self.base_tick_ms.saturating_sub(steps as u64 * self.speedup_ms);
        Duration::from_millis(ms.max(self.min_tick_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// BFS gives up beyond this many steps from the head.
    pub max_depth: usize,
    /// Flood fill stops counting after this many cells.
    pub flood_cap: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_depth: 30, flood_cap: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilityWeights {
    pub goal_distance: f32,
    pub wall_clearance: f32,
    pub body_clearance: f32,
    pub space: f32,
    /// At or below this many escape routes from the head the survival terms are boosted.
    pub trap_threshold: usize,
    pub trap_multiplier: f32,
}

impl Default for UtilityWeights {
    fn default() -> Self {
        Self {
            goal_distance: 5.0,
            wall_clearance: 2.0,
            body_clearance: 3.0,
            space: 1.0,
            trap_threshold: 2,
            trap_multiplier: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub alpha: f32,
    pub gamma: f32,
    pub epsilon: f32,
    pub epsilon_decay: f32,
    pub epsilon_min: f32,
    /// Seed a missing table with goal-seeking, danger-avoiding values.
    pub pretrain: bool,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self { alpha: 0.1, gamma: 0.9, epsilon: 1.0, epsilon_decay: 0.999, epsilon_min: 0.01, pretrain: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub goal: f32,
    pub collision: f32,
    pub step: f32,
    pub closer: f32,
    pub farther: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self { goal: 100.0, collision: -100.0, step: -1.0, closer: 0.5, farther: -0.5 }
    }
}

impl RewardConfig {
    /// Largest reward a non-terminal step can produce, in magnitude.
    pub fn max_shaping(&self) -> f32 {
        self.step.abs() + self.closer.abs().max(self.farther.abs())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: u32,
    /// Episodes longer than this are truncated (not treated as terminal).
    pub max_steps_per_episode: u64,
    pub checkpoint_every: u32,
    pub log_every: u32,
    pub q_table_path: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 1000,
            max_steps_per_episode: 2000,
            checkpoint_every: 100,
            log_every: 100,
            q_table_path: PathBuf::from("q_table.bin"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        let g = &self.game;
        if g.width < 2 || g.height < 2 {
            return invalid("grid must be at least 2x2");
        }
        if g.initial_length == 0 || g.initial_length as i32 > g.width / 2 {
            return invalid("initial_length must be in 1..=width/2");
        }
        if self.search.max_depth == 0 || self.search.flood_cap == 0 {
            return invalid("search caps must be positive");
        }
        let l = &self.learning;
        if !(l.alpha > 0.0 && l.alpha <= 1.0) {
            return invalid("alpha must be in (0, 1]");
        }
        if !(0.0..=1.0).contains(&l.gamma) {
            return invalid("gamma must be in [0, 1]");
        }
        if !(l.epsilon_min > 0.0 && l.epsilon_min <= l.epsilon && l.epsilon <= 1.0) {
            return invalid("need 0 < epsilon_min <= epsilon <= 1");
        }
        if !(l.epsilon_decay > 0.0 && l.epsilon_decay <= 1.0) {
            return invalid("epsilon_decay must be in (0, 1]");
        }
        let r = &self.rewards;
        if r.goal <= 0.0 || r.collision >= 0.0 {
            return invalid("goal reward must be positive and collision reward negative");
        }
        if r.goal.min(r.collision.abs()) < 10.0 * r.max_shaping() {
            return invalid("terminal rewards must be at least 10x the per-step shaping");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "game": { "width": 10 }, "learning": { "alpha": 0.5 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.game.width, 10);
        assert_eq!(config.game.height, GameConfig::default().height);
        assert_eq!(config.learning.alpha, 0.5);
        assert_eq!(config.rewards, RewardConfig::default());
    }

    #[test]
    fn test_rejects_weak_terminal_rewards() {
        let mut config = Config::default();
        config.rewards.goal = 5.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_epsilon_floor() {
        let mut config = Config::default();
        config.learning.epsilon_min = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_interval_speeds_up_and_floors() {
        let game = GameConfig::default();
        assert_eq!(game.tick_interval(1), Duration::from_millis(300));
        assert_eq!(game.tick_interval(5), Duration::from_millis(260));
        assert_eq!(game.tick_interval(500), Duration::from_millis(50));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }
}
