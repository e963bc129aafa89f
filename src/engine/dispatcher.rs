//! Trigger ranking dispatcher.
//!
//! The dispatcher owns the registered triggers and, for each inbound request,
//! decides which one the request is about:
//!
//! ```text
//! for each registered trigger (registration order):
//!     request lacks every layer the trigger looks at?  ──▶ Skipped
//!     bind to &request, rank()
//!         Ok(Some(score)) ──▶ candidate
//!         Ok(None)        ──▶ NoOpinion
//!         Err(fault)      ──▶ logged, NoOpinion
//!         panic           ──▶ caught, logged, NoOpinion
//! winner = highest score; equal scores go to the earliest registered
//! apply winner's patch to the request's register (exactly once)
//! ```
//!
//! Ranking only borrows the request immutably, so it can run on the rayon
//! pool (`Options::parallel`). Results are collected back into registration
//! order before selection, so the winner never depends on which thread
//! finished first. The patch is applied after every `rank()` has returned.
//!
//! If no trigger has an opinion, dispatch fails with
//! [`MatchError::NoTriggerMatched`] rather than picking a default.

use super::metrics::{RankMetrics, RankOutcome};
use crate::api::{DispatchDetails, DispatchVerbose, Options, Selection, TriggerReport};
use crate::error::{MatchError, Result};
use crate::request::Request;
use crate::triggers::{Patch, Trigger, TriggerSpec};
use crate::Score;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    spec: TriggerSpec,
}

/// Ordered registry of triggers.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    entries: Vec<Entry>,
}

/// Ranking result of one trigger, still bound to the request.
struct Evaluation<'r> {
    outcome: RankOutcome,
    trigger: Option<Trigger<'r>>,
    duration: Duration,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `spec` under `name`. Registration order is the tie-break order.
    pub fn register(&mut self, name: impl Into<String>, spec: TriggerSpec) -> Result<&mut Self> {
        let name = name.into();
        if self.entries.iter().any(|e| e.name == name) {
            return Err(MatchError::DuplicateTrigger { name });
        }
        self.entries.push(Entry { name, spec });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn dispatch(&self, request: &mut Request) -> Result<Selection> {
        self.dispatch_with(request, &Options::default())
    }

    /// Rank every trigger, pick the winner and apply its patch.
    pub fn dispatch_with(&self, request: &mut Request, options: &Options) -> Result<Selection> {
        let (winner, _) = {
            let evaluations = self.evaluate(request, options);
            select(evaluations)
        };
        let (index, score, patch) = winner.ok_or(MatchError::NoTriggerMatched)?;
        self.commit(request, index, score, patch)
    }

    /// Same as [`dispatch_with`](Self::dispatch_with), also reporting what
    /// every trigger said and how long it took.
    pub fn dispatch_verbose_with(&self, request: &mut Request, options: &Options) -> DispatchVerbose {
        let start = Instant::now();

        let (winner, reports) = {
            let evaluations = self.evaluate(request, options);
            select(evaluations)
        };
        let ranking = start.elapsed();

        let triggers = self
            .entries
            .iter()
            .zip(reports)
            .map(|(entry, (outcome, duration))| TriggerReport {
                name: entry.name.clone(),
                variant: entry.spec.variant_name(),
                outcome,
                duration,
            })
            .collect();

        let patch_start = Instant::now();
        let result = match winner {
            Some((index, score, patch)) => self.commit(request, index, score, patch),
            None => Err(MatchError::NoTriggerMatched),
        };
        let patch = patch_start.elapsed();

        let metrics = RankMetrics { total: start.elapsed(), ranking, patch };
        DispatchVerbose { result, details: DispatchDetails { metrics, triggers } }
    }

    fn evaluate<'r>(&'r self, request: &'r Request, options: &Options) -> Vec<Evaluation<'r>> {
        if options.parallel {
            self.entries.par_iter().map(|entry| evaluate_one(entry, request)).collect()
        } else {
            self.entries.iter().map(|entry| evaluate_one(entry, request)).collect()
        }
    }

    fn commit(&self, request: &mut Request, index: usize, score: Score, patch: Patch) -> Result<Selection> {
        let entry = &self.entries[index];
        patch.apply(request.register_mut())?;

        info!(trigger = entry.name.as_str(), score = score.value(), "trigger selected");

        Ok(Selection {
            trigger: entry.name.clone(),
            index,
            score,
            chosen: match patch {
                Patch::CommitChoice(choice) => Some(choice),
                Patch::Nothing => None,
            },
        })
    }
}

fn evaluate_one<'r>(entry: &'r Entry, request: &'r Request) -> Evaluation<'r> {
    let start = Instant::now();

    if let Some(required) = entry.spec.required_tags() {
        if !required.intersects(request.stack().tags()) {
            debug!(trigger = entry.name.as_str(), "skipped: no layer of interest");
            return Evaluation { outcome: RankOutcome::Skipped, trigger: None, duration: start.elapsed() };
        }
    }

    let mut trigger = entry.spec.bind(request);
    // Rankers call host code (renderers); a panic there must not take the
    // other triggers down with it.
    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| trigger.rank())) {
        Ok(Ok(Some(score))) => RankOutcome::Scored(score),
        Ok(Ok(None)) => RankOutcome::NoOpinion,
        Ok(Err(err)) => {
            warn!(trigger = entry.name.as_str(), error = %err, "trigger failed, ignoring it");
            RankOutcome::Fault(err.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(trigger = entry.name.as_str(), panic = message.as_str(), "trigger panicked, ignoring it");
            RankOutcome::Fault(format!("panicked: {message}"))
        }
    };
    debug!(trigger = entry.name.as_str(), outcome = ?outcome, "ranked");

    let trigger = matches!(outcome, RankOutcome::Scored(_)).then_some(trigger);
    Evaluation { outcome, trigger, duration: start.elapsed() }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

type Winner = (usize, Score, Patch);

/// Pick the highest score, earliest registration first on ties, and turn
/// the winner into its patch. Also returns every outcome in order.
fn select(evaluations: Vec<Evaluation<'_>>) -> (Option<Winner>, Vec<(RankOutcome, Duration)>) {
    let mut best: Option<(usize, Score)> = None;
    for (index, evaluation) in evaluations.iter().enumerate() {
        if let Some(score) = evaluation.outcome.score() {
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((index, score));
            }
        }
    }

    let mut winner = None;
    let mut reports = Vec::with_capacity(evaluations.len());
    for (index, evaluation) in evaluations.into_iter().enumerate() {
        if let (Some((best_index, score)), Some(trigger)) = (best, evaluation.trigger) {
            if best_index == index {
                winner = Some((index, score, trigger.into_patch()));
            }
        }
        reports.push((evaluation.outcome, evaluation.duration));
    }

    (winner, reports)
}
