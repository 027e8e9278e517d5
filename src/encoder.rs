//! Binary state encoding shared by every agent.
//!
//! Layout of an encoded state-action key for `n` lanes and `k` lookahead rows:
//!
//! ```text
//! | car lane (n) | row 0 (n) | row 1 (n) | ... | row k-1 (n) | action (3) |
//! ```
//!
//! The car block one-hots the lane, each row block marks non-empty interior
//! cells, and the trailing block one-hots Left / Stay / Right.

use crate::car::{Action, NUM_ACTIONS};
use crate::road::TrackWindow;

const WORD_BITS: usize = 64;

/// Fixed-length bit vector packed into words.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct FeatureBits {
    len: usize,
    words: Vec<u64>,
}

impl FeatureBits {
    pub fn zeros(len: usize) -> Self {
        Self {
            len,
            words: vec![0; len.div_ceil(WORD_BITS)],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn set(&mut self, index: usize) {
        assert!(index < self.len, "bit {index} out of range {}", self.len);
        self.words[index / WORD_BITS] |= 1 << (index % WORD_BITS);
    }

    pub fn get(&self, index: usize) -> bool {
        index < self.len && self.words[index / WORD_BITS] & (1 << (index % WORD_BITS)) != 0
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Dense 0.0 / 1.0 view for function-approximating agents.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        (0..self.len).map(|i| if self.get(i) { 1.0 } else { 0.0 }).collect()
    }

    /// Copy into a longer vector, leaving the extra bits clear.
    fn widened(&self, len: usize) -> Self {
        let mut out = Self::zeros(len);
        out.words[..self.words.len()].copy_from_slice(&self.words);
        out
    }
}

/// Hash key for the value table: an encoded state plus the action block.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct StateActionKey(FeatureBits);

impl StateActionKey {
    pub fn bits(&self) -> &FeatureBits {
        &self.0
    }
}

#[derive(Copy, Clone, Debug)]
pub struct StateEncoder {
    num_lanes: usize,
    lookahead_rows: usize,
}

impl StateEncoder {
    pub fn new(num_lanes: usize, lookahead_rows: usize) -> Self {
        Self { num_lanes, lookahead_rows }
    }

    pub fn num_lanes(&self) -> usize {
        self.num_lanes
    }

    /// Length of a state vector without the action block.
    pub fn state_len(&self) -> usize {
        self.num_lanes + self.num_lanes * self.lookahead_rows
    }

    pub fn key_len(&self) -> usize {
        self.state_len() + NUM_ACTIONS
    }

    pub fn encode_state(&self, car_lane: usize, window: &TrackWindow) -> FeatureBits {
        let mut bits = FeatureBits::zeros(self.state_len());
        if (1..=self.num_lanes).contains(&car_lane) {
            bits.set(car_lane - 1);
        }
        for (row_index, row) in window.iter().take(self.lookahead_rows).enumerate() {
            let base = self.num_lanes + self.num_lanes * row_index;
            for (offset, cell) in row.interior().iter().take(self.num_lanes).enumerate() {
                if cell.is_blocked() {
                    bits.set(base + offset);
                }
            }
        }
        bits
    }

    pub fn encode_state_action(&self, action: Action, car_lane: usize, window: &TrackWindow) -> StateActionKey {
        let state = self.encode_state(car_lane, window);
        let mut bits = state.widened(self.key_len());
        bits.set(self.state_len() + action.index());
        StateActionKey(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::road::RoadRow;
    use std::collections::HashSet;

    fn window(rows: &[RoadRow]) -> TrackWindow {
        let mut w = TrackWindow::new(rows.len().max(1));
        for row in rows {
            w.push(row.clone());
        }
        w
    }

    #[test]
    fn layout_matches_blocks() {
        let enc = StateEncoder::new(3, 2);
        let w = window(&[RoadRow::with_obstacles(5, &[3]), RoadRow::with_obstacles(5, &[1, 2])]);
        let bits = enc.encode_state(3, &w);
        let expected = [0, 0, 1, 0, 0, 1, 1, 1, 0];
        assert_eq!(bits.len(), 9);
        for (i, want) in expected.iter().enumerate() {
            assert_eq!(bits.get(i), *want == 1, "bit {i}");
        }
    }

    #[test]
    fn action_block_is_one_hot() {
        let enc = StateEncoder::new(3, 1);
        let w = window(&[RoadRow::empty(5)]);
        for action in Action::ALL {
            let key = enc.encode_state_action(action, 2, &w);
            assert_eq!(key.bits().len(), 9);
            assert!(key.bits().get(6 + action.index()));
            assert_eq!(key.bits().count_ones(), 2);
        }
    }

    #[test]
    fn missing_rows_encode_as_clear() {
        let enc = StateEncoder::new(3, 4);
        let w = window(&[RoadRow::with_obstacles(5, &[1])]);
        let bits = enc.encode_state(1, &w);
        assert_eq!(bits.count_ones(), 2);
    }

    #[test]
    fn wide_keys_span_words() {
        let enc = StateEncoder::new(20, 5);
        let rows: Vec<_> = (0..5).map(|i| RoadRow::with_obstacles(22, &[i + 15])).collect();
        let w = window(&rows);
        let key = enc.encode_state_action(Action::Right, 20, &w);
        assert_eq!(key.bits().len(), 123);
        assert!(key.bits().get(122));
        assert!(key.bits().get(20 + 4 * 20 + 18));
        assert_eq!(key.bits().count_ones(), 7);
    }

    #[test]
    fn same_view_same_bits() {
        let enc = StateEncoder::new(3, 2);
        let w = window(&[RoadRow::with_obstacles(5, &[2]), RoadRow::with_obstacles(5, &[1, 3])]);
        assert_eq!(enc.encode_state(2, &w), enc.encode_state(2, &w.clone()));
        assert_eq!(
            enc.encode_state_action(Action::Left, 2, &w),
            enc.encode_state_action(Action::Left, 2, &w)
        );
    }

    #[test]
    fn every_obstacle_layout_gets_its_own_key() {
        let enc = StateEncoder::new(3, 2);
        let lanes_of = |mask: u32| -> Vec<usize> { (1..=3).filter(|lane| mask & (1 << (lane - 1)) != 0).collect() };

        let mut keys = HashSet::new();
        for mask in 0..64u32 {
            let near = RoadRow::with_obstacles(5, &lanes_of(mask & 0b111));
            let far = RoadRow::with_obstacles(5, &lanes_of(mask >> 3));
            keys.insert(enc.encode_state_action(Action::Stay, 2, &window(&[near, far])));
        }
        assert_eq!(keys.len(), 64);

        let one_row = StateEncoder::new(3, 1);
        let keys: HashSet<_> = (0..8u32)
            .map(|mask| one_row.encode_state_action(Action::Stay, 1, &window(&[RoadRow::with_obstacles(5, &lanes_of(mask))])))
            .collect();
        assert_eq!(keys.len(), 8);
    }

    #[test]
    fn dense_view_matches_bits() {
        let enc = StateEncoder::new(2, 1);
        let w = window(&[RoadRow::with_obstacles(4, &[2])]);
        assert_eq!(enc.encode_state(1, &w).to_f32_vec(), vec![1.0, 0.0, 0.0, 1.0]);
    }
}
