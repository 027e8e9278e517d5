use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::road::ObstaclePattern;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Hyperparameters for the tabular learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub safe_reward: f32,             // reward when learning after a survival streak
    pub crash_reward: f32,            // reward when learning from a crash
    pub learning_interval: u64,       // periodic learning cadence and update window
    pub base_discount: f32,           // discount base, raised to the step distance
    pub step_size: f32,               // Bellman blend rate
    pub random_move_probability: f32, // exploration rate
    pub lookahead_rows: usize,        // rows encoded into the state
    pub seed: Option<u64>,            // RNG seed for exploration
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            safe_reward: 1.0,
            crash_reward: -1000.0,
            learning_interval: 8,
            base_discount: 0.9,
            step_size: 0.5,
            random_move_probability: 0.01,
            lookahead_rows: 5,
            seed: None,
        }
    }
}

/// Curriculum, road and replay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub starting_width: usize,              // first road width, walls included
    pub ending_width: usize,                // exclusive upper bound
    pub num_advances_level_complete: u64,   // survival needed to finish a stage
    pub max_history: usize,                 // snapshots kept for replay
    pub max_snapshot_length: usize,         // transitions per snapshot
    pub random_obstacle_probability: f32,   // chance each candidate spot holds an obstacle
    pub display_rows: usize,                // visible window length
    pub max_history_rows: usize,            // transitions retained per episode
    pub obstacle_pattern: ObstaclePattern,  // random or fixed debug layout
    pub display_every: u64,                 // in fast mode, show every n-th episode
    pub fast_mode: bool,
    pub seed: Option<u64>,                  // RNG seed for road generation
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            starting_width: 5,
            ending_width: 8,
            num_advances_level_complete: 2000,
            max_history: 10,
            max_snapshot_length: 8,
            random_obstacle_probability: 0.2,
            display_rows: 5,
            max_history_rows: 50,
            obstacle_pattern: ObstaclePattern::Random,
            display_every: 500,
            fast_mode: true,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub agent: AgentConfig,
    pub sim: SimConfig,
}

impl Config {
    /// Read a JSON config; missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: shown.clone(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path: shown, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sim.validate()?;
        self.agent.validate()
    }
}

impl SimConfig {
    /// Checks everything [`crate::Simulator::new`] relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.starting_width < 3 {
            return Err(invalid("sim.starting_width", "must leave at least one lane (>= 3)"));
        }
        if self.ending_width <= self.starting_width {
            return Err(invalid("sim.ending_width", "must be greater than sim.starting_width"));
        }
        positive("sim.num_advances_level_complete", self.num_advances_level_complete)?;
        positive("sim.max_history", self.max_history as u64)?;
        positive("sim.max_snapshot_length", self.max_snapshot_length as u64)?;
        positive("sim.display_rows", self.display_rows as u64)?;
        positive("sim.max_history_rows", self.max_history_rows as u64)?;
        positive("sim.display_every", self.display_every)?;
        probability("sim.random_obstacle_probability", self.random_obstacle_probability)
    }
}

impl AgentConfig {
    /// Checks everything [`crate::TabularQLearner::new`] relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("agent.learning_interval", self.learning_interval)?;
        positive("agent.lookahead_rows", self.lookahead_rows as u64)?;
        probability("agent.random_move_probability", self.random_move_probability)?;
        if !(self.step_size > 0.0 && self.step_size <= 1.0) {
            return Err(invalid("agent.step_size", "must be in (0, 1]"));
        }
        if !(self.base_discount > 0.0 && self.base_discount <= 1.0) {
            return Err(invalid("agent.base_discount", "must be in (0, 1]"));
        }
        if !self.safe_reward.is_finite() {
            return Err(invalid("agent.safe_reward", "must be finite"));
        }
        if !self.crash_reward.is_finite() {
            return Err(invalid("agent.crash_reward", "must be finite"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(field, "must be positive"));
    }
    Ok(())
}

fn probability(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(field, "must be in [0, 1]"));
    }
    Ok(())
}
