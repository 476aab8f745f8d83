//! Scoring: population statistics, composite index, percentile ranking and
//! breeding-tier segmentation
//!
//! All stages are synchronous functions over an immutable record slice.
//! [`epoch::ScoringEpoch`] runs them in order for one population.

pub mod epoch;
pub mod index;
pub mod percentile;
pub mod segmentation;
pub mod statistics;

pub use epoch::{EpochOutcome, ScoreResult, ScoringEpoch};
pub use index::{CompositeScorer, ScoringMode};
pub use percentile::{rank_percentiles, RankedScore};
pub use segmentation::{Rationale, SegmentDecision, SegmentGroup, SegmentationRules};
pub use statistics::{compute_statistics, PopulationStatistics, TraitStats};

use thiserror::Error;

/// Scoring failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    /// Statistics were computed over a different record collection
    #[error("statistics are stale (computed for {expected}, population is {actual}); recompute before scoring")]
    StaleStatistics { expected: String, actual: String },

    /// Nothing to score
    #[error("cannot score an empty population")]
    EmptyPopulation,
}
