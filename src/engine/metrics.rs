//! Dispatch metrics.
//!
//! Timings collected by `Dispatcher::dispatch_verbose_with`. The plain
//! `dispatch` path does not report them.
//!
//! - `RankMetrics::ranking` covers binding and ranking every trigger (wall
//!   time, so with `Options::parallel` it is shorter than the sum of the
//!   per-trigger durations).
//! - `RankMetrics::patch` is the time spent applying the winner's patch.

use crate::Score;
use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct RankMetrics {
    /// Total elapsed time for the dispatch.
    pub total: Duration,
    /// Time spent ranking triggers.
    pub ranking: Duration,
    /// Time spent patching the winner.
    pub patch: Duration,
}

/// What a single trigger said about the request.
#[derive(Debug, Clone, PartialEq)]
pub enum RankOutcome {
    Scored(Score),
    NoOpinion,
    /// Not bound: the request carries none of the layers the trigger looks at.
    Skipped,
    /// The trigger failed; treated as no opinion.
    Fault(String),
}

impl RankOutcome {
    pub fn score(&self) -> Option<Score> {
        match self {
            RankOutcome::Scored(score) => Some(*score),
            _ => None,
        }
    }
}
