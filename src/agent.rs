use crate::car::Action;
use crate::replay_buffer::EpisodeHistory;
use crate::road::{RoadRow, TrackWindow};

/// What the simulator knows when the car crashes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrashReport {
    pub fast_mode: bool,
    pub episode_index: u64,
    pub display_frequency: u64,
    pub road_width: usize,
    pub step_index: u64,
    pub best_step_index_for_width: u64,
}

impl CrashReport {
    /// Whether this crash falls on a displayed episode.
    pub fn is_displayed(&self) -> bool {
        !self.fast_mode || self.episode_index % self.display_frequency.max(1) == 0
    }
}

/// A driver the simulator can train.
pub trait Agent {
    /// A new curriculum stage begins; drop anything sized for the old road.
    fn on_series(&mut self, num_lanes: usize);

    fn on_before_move(&mut self, car_lane: usize, front_row: &RoadRow, window: &TrackWindow) -> Action;

    /// Outcome of the move just applied. `history` already holds this step.
    fn on_after_move(&mut self, action: Action, crashed: bool, step_index: u64, history: &EpisodeHistory);

    fn on_crash(&mut self, report: &CrashReport);
}
