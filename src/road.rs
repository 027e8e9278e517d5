use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ring::Ring;

/// One position in a track row.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Cell {
    Wall,
    Empty,
    Obstacle,
}

impl Cell {
    pub fn is_blocked(&self) -> bool {
        !matches!(self, Cell::Empty)
    }

    pub fn glyph(&self) -> char {
        match self {
            Cell::Wall => '|',
            Cell::Empty => ' ',
            Cell::Obstacle => 'O',
        }
    }
}

/// One row of track, walls at both edges.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct RoadRow {
    cells: Vec<Cell>,
}

/// Rows visible to the agent, oldest (the row the car is on) first.
pub type TrackWindow = Ring<RoadRow>;

impl RoadRow {
    /// Walled row with an empty interior.
    pub fn empty(width: usize) -> Self {
        let mut cells = vec![Cell::Empty; width];
        if let Some(first) = cells.first_mut() {
            *first = Cell::Wall;
        }
        if let Some(last) = cells.last_mut() {
            *last = Cell::Wall;
        }
        Self { cells }
    }

    /// Walled row with obstacles at the given lanes (1-based, interior only).
    pub fn with_obstacles(width: usize, lanes: &[usize]) -> Self {
        let mut row = Self::empty(width);
        for &lane in lanes {
            row.set_obstacle(lane);
        }
        row
    }

    pub fn width(&self) -> usize {
        self.cells.len()
    }

    /// Cell at `lane`; anything past the edges reads as wall.
    pub fn cell(&self, lane: usize) -> Cell {
        self.cells.get(lane).copied().unwrap_or(Cell::Wall)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Interior cells, lanes `1..=width-2`.
    pub fn interior(&self) -> &[Cell] {
        if self.cells.len() < 2 {
            return &[];
        }
        &self.cells[1..self.cells.len() - 1]
    }

    pub fn set_obstacle(&mut self, lane: usize) {
        if lane >= 1 && lane + 1 < self.cells.len() {
            self.cells[lane] = Cell::Obstacle;
        }
    }

    pub fn obstacle_count(&self) -> usize {
        self.cells.iter().filter(|c| **c == Cell::Obstacle).count()
    }

    pub fn is_blocked(&self, lane: usize) -> bool {
        self.cell(lane).is_blocked()
    }
}

impl fmt::Display for RoadRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cell in &self.cells {
            write!(f, "{}", cell.glyph())?;
        }
        Ok(())
    }
}

/// How obstacles are laid out in generated rows.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstaclePattern {
    #[default]
    Random,
    /// Fixed, reproducible layout keyed on the step index.
    Alternating,
}

/// Produces new rows of track.
pub struct RoadGenerator {
    rng: StdRng,
    obstacle_probability: f32,
    pattern: ObstaclePattern,
}

impl RoadGenerator {
    pub fn new(obstacle_probability: f32, pattern: ObstaclePattern, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            obstacle_probability,
            pattern,
        }
    }

    /// Build the next row and return it with its obstacle count.
    ///
    /// A row following one with more than one obstacle is capped one lower,
    /// so two consecutive rows can never seal every lane between them.
    pub fn next_row(&mut self, road_width: usize, previous_obstacles: usize, step_index: u64) -> (RoadRow, usize) {
        let interior = road_width.saturating_sub(2);
        let mut row = RoadRow::empty(road_width);

        let spots: Vec<usize> = match self.pattern {
            ObstaclePattern::Alternating => alternating_spots(step_index),
            ObstaclePattern::Random => {
                let cap = if previous_obstacles > 1 {
                    interior.saturating_sub(2)
                } else {
                    interior.saturating_sub(1)
                };
                sample(&mut self.rng, interior, cap)
                    .into_iter()
                    .filter(|_| self.rng.r#gen::<f32>() < self.obstacle_probability)
                    .collect()
            }
        };

        for spot in spots.into_iter().filter(|s| *s < interior) {
            row.set_obstacle(spot + 1);
        }
        let count = row.obstacle_count();
        (row, count)
    }
}

// Interior offsets (0-based) for the alternating debug layout.
fn alternating_spots(step_index: u64) -> Vec<usize> {
    if step_index % 4 == 0 {
        vec![1]
    } else if step_index % 2 == 0 {
        vec![0, 2]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_row_is_walled() {
        let row = RoadRow::empty(5);
        assert_eq!(row.to_string(), "|   |");
        assert!(row.is_blocked(0));
        assert!(row.is_blocked(4));
        assert!(!row.is_blocked(2));
        assert!(row.is_blocked(99));
    }

    #[test]
    fn obstacles_stay_inside_walls() {
        let row = RoadRow::with_obstacles(5, &[0, 2, 4]);
        assert_eq!(row.to_string(), "| O |");
        assert_eq!(row.obstacle_count(), 1);
    }

    #[test]
    fn random_rows_respect_cap() {
        let mut road = RoadGenerator::new(1.0, ObstaclePattern::Random, 7);
        for _ in 0..50 {
            let (row, count) = road.next_row(7, 0, 0);
            assert_eq!(count, 4);
            assert_eq!(row.cell(0), Cell::Wall);
            assert_eq!(row.cell(6), Cell::Wall);

            let (_, count) = road.next_row(7, 2, 0);
            assert_eq!(count, 3);
        }
    }

    #[test]
    fn zero_probability_leaves_road_clear() {
        let mut road = RoadGenerator::new(0.0, ObstaclePattern::Random, 1);
        let (row, count) = road.next_row(6, 0, 3);
        assert_eq!(count, 0);
        assert_eq!(row, RoadRow::empty(6));
    }

    #[test]
    fn single_lane_road_never_blocks() {
        let mut road = RoadGenerator::new(1.0, ObstaclePattern::Random, 3);
        let (_, count) = road.next_row(3, 0, 0);
        assert_eq!(count, 0);
    }

    #[test]
    fn alternating_pattern_cycles() {
        let mut road = RoadGenerator::new(0.0, ObstaclePattern::Alternating, 0);
        assert_eq!(road.next_row(5, 0, 0).0.to_string(), "| O |");
        assert_eq!(road.next_row(5, 0, 1).0.to_string(), "|   |");
        assert_eq!(road.next_row(5, 0, 2).0.to_string(), "|O O|");
        assert_eq!(road.next_row(5, 0, 4).0.to_string(), "| O |");
    }

    #[test]
    fn same_seed_same_road() {
        let mut a = RoadGenerator::new(0.5, ObstaclePattern::Random, 42);
        let mut b = RoadGenerator::new(0.5, ObstaclePattern::Random, 42);
        for step in 0..20 {
            assert_eq!(a.next_row(8, 0, step), b.next_row(8, 0, step));
        }
    }
}
