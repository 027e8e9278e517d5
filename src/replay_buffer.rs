use std::collections::VecDeque;

use crate::car::Action;
use crate::road::{RoadRow, TrackWindow};
use crate::ring::Ring;

/// One recorded step: what the agent saw, where the car was, what it chose.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub window: TrackWindow, // rows seen when deciding
    pub car_lane: usize,     // lane before the move
    pub action: Action,
}

/// Bounded history of the current episode, oldest first.
pub type EpisodeHistory = Ring<Transition>;

/// Tail of an episode captured at crash time.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub transitions: Vec<Transition>,
}

/// Everything an episode needs to restart from a stored snapshot.
#[derive(Clone, Debug)]
pub struct Entrance {
    pub car_lane: usize,
    pub window: TrackWindow,
    /// Rows to feed verbatim before the generator takes over.
    pub playlist: Vec<RoadRow>,
}

/// FIFO of crash tails used to replay the road that caused a crash.
pub struct ReplayBuffer {
    snapshots: VecDeque<Snapshot>, // oldest at the front
    max_history: usize,            // snapshots kept
    max_snapshot_length: usize,    // transitions per snapshot
}

impl ReplayBuffer {
    pub fn new(max_history: usize, max_snapshot_length: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(max_history + 1),
            max_history,
            max_snapshot_length,
        }
    }

    ///store the tail of an episode; evicts the oldest snapshot when over capacity
    pub fn push(&mut self, history: &EpisodeHistory) {
        let transitions: Vec<Transition> = history.tail(self.max_snapshot_length).cloned().collect();
        if transitions.is_empty() {
            return;
        }
        self.snapshots.push_back(Snapshot { transitions });
        if self.snapshots.len() > self.max_history {
            self.snapshots.pop_front();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Oldest snapshot, without removing it.
    pub fn peek(&self) -> Option<&Snapshot> {
        self.snapshots.front()
    }

    /// Dequeue the oldest snapshot as an episode entrance.
    ///
    /// The car and visible road come from the first transition; each later
    /// transition contributes its newest row to the playlist, so the episode
    /// meets the same obstacle sequence again.
    pub fn pop(&mut self) -> Option<Entrance> {
        let snapshot = self.snapshots.pop_front()?;
        let mut transitions = snapshot.transitions.into_iter();
        let first = transitions.next()?;
        let playlist = transitions.filter_map(|t| t.window.back().cloned()).collect();
        Some(Entrance {
            car_lane: first.car_lane,
            window: first.window,
            playlist,
        })
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(lane: usize, obstacle: usize) -> Transition {
        let mut window = TrackWindow::new(2);
        window.push(RoadRow::empty(5));
        window.push(RoadRow::with_obstacles(5, &[obstacle]));
        Transition { window, car_lane: lane, action: Action::Stay }
    }

    fn history(lanes: &[usize]) -> EpisodeHistory {
        let mut h = EpisodeHistory::new(16);
        for (i, lane) in lanes.iter().enumerate() {
            h.push(transition(*lane, i % 3 + 1));
        }
        h
    }

    #[test]
    fn push_keeps_last_transitions_in_order() {
        let mut replay = ReplayBuffer::new(4, 2);
        replay.push(&history(&[1, 2, 3]));
        let lanes: Vec<_> = replay.peek().unwrap().transitions.iter().map(|t| t.car_lane).collect();
        assert_eq!(lanes, vec![2, 3]);
    }

    #[test]
    fn pop_is_fifo() {
        let mut replay = ReplayBuffer::new(3, 4);
        replay.push(&history(&[1]));
        replay.push(&history(&[2]));
        replay.push(&history(&[3]));
        assert_eq!(replay.pop().unwrap().car_lane, 1);
        assert_eq!(replay.pop().unwrap().car_lane, 2);
        assert_eq!(replay.pop().unwrap().car_lane, 3);
        assert!(replay.pop().is_none());
        assert!(replay.is_empty());
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut replay = ReplayBuffer::new(2, 4);
        replay.push(&history(&[1]));
        replay.push(&history(&[2]));
        replay.push(&history(&[3]));
        assert_eq!(replay.len(), 2);
        assert_eq!(replay.pop().unwrap().car_lane, 2);
        assert_eq!(replay.pop().unwrap().car_lane, 3);
    }

    #[test]
    fn pop_builds_playlist_from_newest_rows() {
        let mut replay = ReplayBuffer::new(1, 3);
        replay.push(&history(&[1, 2, 3]));
        let entrance = replay.pop().unwrap();
        assert_eq!(entrance.car_lane, 1);
        assert_eq!(entrance.window.back(), Some(&RoadRow::with_obstacles(5, &[1])));
        assert_eq!(
            entrance.playlist,
            vec![RoadRow::with_obstacles(5, &[2]), RoadRow::with_obstacles(5, &[3])]
        );
    }

    #[test]
    fn empty_history_is_ignored() {
        let mut replay = ReplayBuffer::new(2, 2);
        replay.push(&EpisodeHistory::new(4));
        assert!(replay.is_empty());
    }
}
