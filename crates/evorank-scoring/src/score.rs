//! Behavioral scores and scalar aggregation.

use std::fmt;

/// Row-aligned vector of per-example rewards for one candidate program.
///
/// Entry `i` is the reward earned on row `i` of the working table, in the
/// table's stable row-iteration order. The outer search loop relies on this
/// alignment to index accumulators against rows across repeated calls.
pub type BehavioralScore = Vec<f64>;

/// Reduces a behavioral score to a single scalar.
pub trait ScoreAggregator: fmt::Debug + Send + Sync {
    /// Computes the scalar aggregate of `score`.
    fn aggregate(&self, score: &BehavioralScore) -> f64;
}

/// The default aggregator: plain summation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleAggregator;

impl SimpleAggregator {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ScoreAggregator for SimpleAggregator {
    fn aggregate(&self, score: &BehavioralScore) -> f64 {
        score.iter().sum()
    }
}
