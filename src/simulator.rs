//! Curriculum, episode and step loops.
//!
//! The simulator owns the road generator, the replay buffer and the current
//! episode. It never learns anything itself; every decision and every update
//! goes through the injected [`Agent`].

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::agent::{Agent, CrashReport};
use crate::car::{Action, starting_lane};
use crate::config::SimConfig;
use crate::log;
use crate::render::{Frame, FrameSink, NoopSink};
use crate::replay_buffer::{EpisodeHistory, ReplayBuffer, Transition};
use crate::road::{RoadGenerator, RoadRow, TrackWindow};
use crate::utils::{Stats, count_stats};

/// Empty rows laid down before a fresh episode.
pub const NUMBER_SECTIONS_IN_ENTRANCE: usize = 2;

/// Result of one curriculum stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    pub road_width: usize,
    pub episodes: u64,
    pub best_advances: u64,
    pub advances: Stats,
    pub total_steps: u64,
}

/// Result of a whole curriculum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub started_at: String,
    pub stages: Vec<StageSummary>,
}

/// State of the episode in progress.
#[derive(Debug, Clone)]
pub struct Episode {
    pub car_lane: usize,             // 1..=width-2 while on the road
    pub action: Action,              // last move taken
    pub advances: u64,               // rows survived so far
    pub window: TrackWindow,         // visible rows, the car's row first
    pub history: EpisodeHistory,
    pub crashed: bool,
    playlist: VecDeque<RoadRow>,     // replayed rows, served before generated ones
    previous_obstacles: usize,       // obstacle count of the newest row, feeds the generator cap
}

impl Episode {
    fn fresh(road_width: usize, cfg: &SimConfig) -> Self {
        Self {
            car_lane: starting_lane(road_width),
            action: Action::Stay,
            advances: 0,
            window: TrackWindow::new(cfg.display_rows),
            history: EpisodeHistory::new(cfg.max_history_rows),
            crashed: false,
            playlist: VecDeque::new(),
            previous_obstacles: 0,
        }
    }

    /// Replayed rows still waiting to scroll in.
    pub fn pending_rows(&self) -> usize {
        self.playlist.len()
    }
}

pub struct Simulator {
    cfg: SimConfig,
    seed: u64,                  // road RNG seed, reported in the summary
    road: RoadGenerator,
    replay: ReplayBuffer,       // crash tails for the current width only
    sink: Box<dyn FrameSink>,
    road_width: usize,          // current stage, walls included
    episode_index: u64,         // episodes finished at this width
    best_advances: u64,         // longest episode at this width
    episode: Episode,
}

impl Simulator {
    /// `cfg` is expected to pass [`SimConfig::validate`].
    ///
    /// # Panics
    /// On a zero `display_rows` or `max_history_rows`.
    pub fn new(cfg: SimConfig) -> Self {
        let seed = cfg.seed.unwrap_or_else(rand::random);
        let road = RoadGenerator::new(cfg.random_obstacle_probability, cfg.obstacle_pattern, seed);
        let replay = ReplayBuffer::new(cfg.max_history, cfg.max_snapshot_length);
        let road_width = cfg.starting_width;
        let episode = Episode::fresh(road_width, &cfg);
        Self {
            cfg,
            seed,
            road,
            replay,
            sink: Box::new(NoopSink),
            road_width,
            episode_index: 0,
            best_advances: 0,
            episode,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn road_width(&self) -> usize {
        self.road_width
    }

    pub fn episode(&self) -> &Episode {
        &self.episode
    }

    pub fn episode_index(&self) -> u64 {
        self.episode_index
    }

    /// Longest episode seen at the current width.
    pub fn best_advances(&self) -> u64 {
        self.best_advances
    }

    pub fn replay(&self) -> &ReplayBuffer {
        &self.replay
    }

    /// Train through every road width of the curriculum.
    pub fn run(&mut self, agent: &mut dyn Agent) -> RunSummary {
        let started_at = chrono::Utc::now().to_rfc3339();
        let mut stages = Vec::new();
        for width in self.cfg.starting_width..self.cfg.ending_width {
            stages.push(self.play_stage(width, agent));
        }
        RunSummary {
            seed: self.seed,
            started_at,
            stages,
        }
    }

    /// Reset the agent and replay for a new road width.
    ///
    /// # Panics
    /// If `road_width` leaves no lane between the walls.
    pub fn begin_stage(&mut self, road_width: usize, agent: &mut dyn Agent) {
        assert!(road_width >= 3, "road width {road_width} leaves no lane");
        self.road_width = road_width;
        self.episode_index = 0;
        self.best_advances = 0;
        self.replay.clear();
        self.episode = Episode::fresh(road_width, &self.cfg);
        agent.on_series(road_width - 2);
        log::info(&format!("stage start: road width {road_width}, {} lanes", road_width - 2));
    }

    /// Play episodes until one survives `num_advances_level_complete` steps.
    pub fn play_stage(&mut self, road_width: usize, agent: &mut dyn Agent) -> StageSummary {
        self.begin_stage(road_width, agent);
        let threshold = self.cfg.num_advances_level_complete;
        let mut advances = Vec::new();
        loop {
            let survived = self.play_episode(agent);
            advances.push(survived);
            if survived >= threshold {
                break;
            }
        }

        let summary = StageSummary {
            road_width,
            episodes: advances.len() as u64,
            best_advances: self.best_advances,
            advances: count_stats(&advances),
            total_steps: advances.iter().sum(),
        };
        log::info(&format!(
            "stage complete: road width {}, episodes {}, best advances {}, mean advances {:.1}",
            summary.road_width, summary.episodes, summary.best_advances, summary.advances.mean
        ));
        summary
    }

    /// Run one episode to its crash and return how far it got.
    pub fn play_episode(&mut self, agent: &mut dyn Agent) -> u64 {
        self.begin_episode();
        while !self.step(agent) {}
        let advances = self.episode.advances;
        self.episode_index += 1;
        advances
    }

    /// Place the car and lay the entrance: a replayed crash if one is stored,
    /// otherwise a couple of empty rows.
    pub fn begin_episode(&mut self) {
        let mut episode = Episode::fresh(self.road_width, &self.cfg);
        match self.replay.pop() {
            Some(entrance) => {
                episode.car_lane = entrance.car_lane;
                for row in entrance.window.iter() {
                    episode.window.push(row.clone());
                }
                episode.playlist.extend(entrance.playlist);
            }
            None => {
                for _ in 0..NUMBER_SECTIONS_IN_ENTRANCE {
                    episode.window.push(RoadRow::empty(self.road_width));
                }
            }
        }
        self.episode = episode;
        self.draw();
    }

    /// Append rows that will scroll in before any generated ones.
    pub fn queue_rows(&mut self, rows: impl IntoIterator<Item = RoadRow>) {
        self.episode.playlist.extend(rows);
    }

    /// Advance one row. Returns true when the car crashed.
    pub fn step(&mut self, agent: &mut dyn Agent) -> bool {
        let ep = &mut self.episode;

        let row = match ep.playlist.pop_front() {
            Some(row) => {
                ep.previous_obstacles = row.obstacle_count();
                row
            }
            None => {
                let (row, obstacles) = self.road.next_row(self.road_width, ep.previous_obstacles, ep.advances);
                ep.previous_obstacles = obstacles;
                row
            }
        };
        ep.window.push(row);

        ep.advances += 1;
        self.best_advances = self.best_advances.max(ep.advances);

        let action = match ep.window.front() {
            Some(front) => agent.on_before_move(ep.car_lane, front, &ep.window),
            None => Action::Stay,
        };
        ep.action = action;
        ep.history.push(Transition {
            window: ep.window.clone(),
            car_lane: ep.car_lane,
            action,
        });

        ep.car_lane = action.apply(ep.car_lane);
        let lane = ep.car_lane;
        let crashed = ep.window.front().is_none_or(|front| front.is_blocked(lane));
        ep.crashed = crashed;

        agent.on_after_move(action, crashed, ep.advances, &ep.history);

        if crashed {
            self.replay.push(&ep.history);
            let report = CrashReport {
                fast_mode: self.cfg.fast_mode,
                episode_index: self.episode_index,
                display_frequency: self.cfg.display_every,
                road_width: self.road_width,
                step_index: ep.advances,
                best_step_index_for_width: self.best_advances,
            };
            agent.on_crash(&report);
        }

        self.draw();
        crashed
    }

    fn draw(&mut self) {
        let frame = Frame {
            window: &self.episode.window,
            car_lane: self.episode.car_lane,
            crashed: self.episode.crashed,
            episode_index: self.episode_index,
        };
        self.sink.draw(&frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Steady;

    impl Agent for Steady {
        fn on_series(&mut self, _num_lanes: usize) {}
        fn on_before_move(&mut self, _lane: usize, _front: &RoadRow, _window: &TrackWindow) -> Action {
            Action::Stay
        }
        fn on_after_move(&mut self, _a: Action, _c: bool, _s: u64, _h: &EpisodeHistory) {}
        fn on_crash(&mut self, _r: &CrashReport) {}
    }

    fn sim() -> Simulator {
        Simulator::new(SimConfig {
            random_obstacle_probability: 0.0,
            display_rows: 3,
            seed: Some(1),
            ..SimConfig::default()
        })
    }

    #[test]
    fn entrance_is_two_empty_rows() {
        let mut s = sim();
        s.begin_stage(5, &mut Steady);
        s.begin_episode();
        assert_eq!(s.episode().window.len(), NUMBER_SECTIONS_IN_ENTRANCE);
        assert!(s.episode().window.iter().all(|r| *r == RoadRow::empty(5)));
        assert_eq!(s.episode().car_lane, 2);
    }

    #[test]
    fn window_is_capped() {
        let mut s = sim();
        s.begin_stage(6, &mut Steady);
        s.begin_episode();
        for _ in 0..10 {
            assert!(!s.step(&mut Steady));
        }
        assert_eq!(s.episode().window.len(), s.episode().window.capacity());
        assert_eq!(s.episode().window.capacity(), 3);
        assert_eq!(s.episode().advances, 10);
        assert_eq!(s.best_advances(), 10);
    }

    #[test]
    #[should_panic(expected = "leaves no lane")]
    fn wall_only_road_is_refused() {
        sim().begin_stage(2, &mut Steady);
    }

    #[test]
    fn queued_rows_come_before_generated_ones() {
        let mut s = sim();
        s.begin_stage(5, &mut Steady);
        s.begin_episode();
        s.queue_rows([RoadRow::with_obstacles(5, &[1])]);
        s.step(&mut Steady);
        assert_eq!(s.episode().window.back(), Some(&RoadRow::with_obstacles(5, &[1])));
        assert_eq!(s.episode().pending_rows(), 0);
    }
}
