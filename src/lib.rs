//! Tabular Q-learning driver on a procedurally generated obstacle road.
//!
//! A [`Simulator`] runs a curriculum of widening roads and asks an [`Agent`]
//! for a move on every step. [`TabularQLearner`] is the built-in agent;
//! crashes are kept in a [`ReplayBuffer`] so later episodes restart from the
//! road that caused them.

pub mod agent;
pub mod car;
pub mod config;
pub mod db;
pub mod encoder;
pub mod log;
pub mod render;
pub mod replay_buffer;
pub mod ring;
pub mod road;
pub mod simulator;
pub mod tabular;
pub mod utils;

pub use agent::{Agent, CrashReport};
pub use car::Action;
pub use config::{AgentConfig, Config, ConfigError, SimConfig};
pub use encoder::{FeatureBits, StateActionKey, StateEncoder};
pub use replay_buffer::{EpisodeHistory, ReplayBuffer, Transition};
pub use road::{Cell, ObstaclePattern, RoadGenerator, RoadRow, TrackWindow};
pub use simulator::{RunSummary, Simulator, StageSummary};
pub use tabular::{QEntry, TabularQLearner};
