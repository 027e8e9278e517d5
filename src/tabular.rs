//! tabular Q-learning agent: value table, epsilon-greedy moves, windowed Bellman updates

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::agent::{Agent, CrashReport};
use crate::car::Action;
use crate::config::AgentConfig;
use crate::encoder::{StateActionKey, StateEncoder};
use crate::log;
use crate::replay_buffer::{EpisodeHistory, Transition};
use crate::road::{RoadRow, TrackWindow};

/// Learned value for one state-action key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QEntry {
    pub last_value: f32,
    pub max_value_seen: f32, // never below last_value
}

pub struct TabularQLearner {
    cfg: AgentConfig,
    encoder: StateEncoder,
    table: HashMap<StateActionKey, QEntry>,
    rng: StdRng,
    pub updates_done: u64,
}

impl TabularQLearner {
    /// `cfg` is expected to pass [`AgentConfig::validate`]; a zero
    /// `learning_interval` panics on the first move.
    pub fn new(cfg: AgentConfig) -> Self {
        let seed = cfg.seed.unwrap_or_else(rand::random);
        let encoder = StateEncoder::new(0, cfg.lookahead_rows);
        Self {
            cfg,
            encoder,
            table: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
            updates_done: 0,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.cfg
    }

    pub fn encoder(&self) -> &StateEncoder {
        &self.encoder
    }

    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    pub fn entry(&self, key: &StateActionKey) -> Option<&QEntry> {
        self.table.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&StateActionKey, &QEntry)> {
        self.table.iter()
    }

    pub fn bellman(&self, last_value: f32, reward: f32, discount: f32, max_value: f32) -> f32 {
        bellman(self.cfg.step_size, last_value, reward, discount, max_value)
    }

    /// Current estimate for taking `action` from this state; unseen keys are worth 0.
    pub fn lookup_value(&self, action: Action, car_lane: usize, window: &TrackWindow) -> f32 {
        let key = self.encoder.encode_state_action(action, car_lane, window);
        match self.table.get(&key) {
            Some(e) => self.bellman(e.last_value, 0.0, self.cfg.base_discount, e.max_value_seen),
            None => 0.0,
        }
    }

    /// Push `reward` into the last `learning_interval` transitions.
    ///
    /// Older transitions get a higher discount exponent, so their bootstrapped
    /// max term shrinks faster; the reward itself is applied undiscounted.
    pub fn update(&mut self, reward: f32, history: &EpisodeHistory) {
        let window: Vec<&Transition> = history.tail(self.cfg.learning_interval as usize).collect();
        let step_size = self.cfg.step_size;
        let mut power = window.len() as i32;

        for t in window {
            let discount = self.cfg.base_discount.powi(power);
            let key = self.encoder.encode_state_action(t.action, t.car_lane, &t.window);
            match self.table.entry(key) {
                Entry::Occupied(mut slot) => {
                    let e = slot.get_mut();
                    let value = bellman(step_size, e.last_value, reward, discount, e.max_value_seen);
                    e.last_value = value;
                    if value > e.max_value_seen {
                        e.max_value_seen = value;
                    }
                    assert!(e.max_value_seen >= e.last_value, "max value fell below last value");
                }
                Entry::Vacant(slot) => {
                    let value = bellman(step_size, 0.0, reward, discount, 0.0);
                    slot.insert(QEntry { last_value: value, max_value_seen: value });
                }
            }
            power -= 1;
        }

        self.updates_done += 1;
        log::scalar(self.updates_done, "reward", reward);
        log::scalar(self.updates_done, "table_size", self.table.len() as f32);
    }

    fn random_action(&mut self) -> Action {
        let u = self.rng.r#gen::<f32>();
        if u < 1.0 / 3.0 {
            Action::Left
        } else if u > 2.0 / 3.0 {
            Action::Right
        } else {
            Action::Stay
        }
    }
}

impl Agent for TabularQLearner {
    fn on_series(&mut self, num_lanes: usize) {
        self.encoder = StateEncoder::new(num_lanes, self.cfg.lookahead_rows);
        self.table.clear();
    }

    fn on_before_move(&mut self, car_lane: usize, _front_row: &RoadRow, window: &TrackWindow) -> Action {
        if self.rng.r#gen::<f32>() < self.cfg.random_move_probability {
            return self.random_action();
        }
        let left = self.lookup_value(Action::Left, car_lane, window);
        let stay = self.lookup_value(Action::Stay, car_lane, window);
        let right = self.lookup_value(Action::Right, car_lane, window);
        choose_greedy(left, stay, right)
    }

    fn on_after_move(&mut self, _action: Action, crashed: bool, step_index: u64, history: &EpisodeHistory) {
        let interval = self.cfg.learning_interval;
        if crashed || step_index % interval == interval - 1 {
            let reward = if crashed { self.cfg.crash_reward } else { self.cfg.safe_reward };
            self.update(reward, history);
        }
    }

    fn on_crash(&mut self, report: &CrashReport) {
        if report.is_displayed() {
            log::info(&format!(
                "crashed: road width {}, episode {}, advances {}, best advances {}, table size {}",
                report.road_width,
                report.episode_index,
                report.step_index,
                report.best_step_index_for_width,
                self.table.len()
            ));
        }
    }
}

/// Blend the previous estimate with reward plus discounted best-known value.
pub fn bellman(step_size: f32, last_value: f32, reward: f32, discount: f32, max_value: f32) -> f32 {
    (1.0 - step_size) * last_value + step_size * (reward + discount * max_value)
}

/// Pick the best of three values; ties go Left, then Right, then Stay.
pub fn choose_greedy(left: f32, stay: f32, right: f32) -> Action {
    let best = left.max(stay).max(right);
    if left == best {
        Action::Left
    } else if right == best {
        Action::Right
    } else {
        Action::Stay
    }
}
