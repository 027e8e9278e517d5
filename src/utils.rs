use serde::{Deserialize, Serialize};

/// Simple summary of a series of counts: min / max / mean.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
}

/// Summarize a slice of counts. An empty slice gives all zeros.
pub fn count_stats(xs: &[u64]) -> Stats {
    let (Some(&min), Some(&max)) = (xs.iter().min(), xs.iter().max()) else {
        return Stats::default();
    };
    let sum: u64 = xs.iter().sum();
    Stats {
        min,
        max,
        mean: sum as f64 / xs.len() as f64,
    }
}
