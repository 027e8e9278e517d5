/// Steering choice for one step.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Action {
    Left,
    #[default]
    Stay,
    Right,
}

pub const NUM_ACTIONS: usize = 3;

impl Action {
    pub const ALL: [Action; NUM_ACTIONS] = [Action::Left, Action::Stay, Action::Right];

    /// Lane offset: Left = -1, Stay = 0, Right = 1.
    pub fn delta(&self) -> isize {
        match self {
            Action::Left => -1,
            Action::Stay => 0,
            Action::Right => 1,
        }
    }

    /// Position inside the action one-hot block.
    pub fn index(&self) -> usize {
        match self {
            Action::Left => 0,
            Action::Stay => 1,
            Action::Right => 2,
        }
    }

    // Lane after steering. Lanes start at 1, so a left move lands on the wall at 0 at worst.
    pub fn apply(&self, lane: usize) -> usize {
        lane.saturating_add_signed(self.delta())
    }
}

/// Starting lane for a road: the middle of the interior, rounded left.
pub fn starting_lane(road_width: usize) -> usize {
    (road_width - 2) / 2 + 1
}
