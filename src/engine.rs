//! Matching engine.
//!
//! This module groups the two matchers of the crate and the bookkeeping they
//! share. Public paths stay flat (`crate::engine::Dispatcher`,
//! `crate::engine::PatternSet`, ...); the implementation is split into focused
//! submodules under `src/engine/`.
//!
//! ## How the parts work together
//!
//! Inbound, deciding what the user meant:
//!
//! ```text
//! registered TriggerSpecs ──┐
//!                           │  Dispatcher::dispatch           (dispatcher.rs)
//! Request ──────────────────┼─ gate on layer kinds present
//!                           │  bind + rank every trigger (optionally in parallel)
//!                           │  pick max score, earliest registration on ties
//!                           v
//!                  winner's Patch ──▶ TransitionRegister
//!                           │
//!                           v
//!                       Selection
//! ```
//!
//! Outbound, deciding how to send a composed stack:
//!
//! ```text
//! "name" => "(Text|RawText)+ QuickRepliesList?"
//!        │  Pattern::compile                            (pattern.rs)
//!        v
//!   PatternSet (registration order)                     (pattern_set.rs)
//!        │  accept(&mut Stack): first pattern whose
//!        │  backtracking walk consumes the whole stack
//!        v
//!   stack.annotation = Some("name")
//! ```
//!
//! ## Responsibilities by module
//!
//! - `pattern.rs`: grammar, compiler (all syntax errors surface here) and the
//!   backtracking matcher.
//! - `pattern_set.rs`: named, ordered pattern registry and stack acceptance.
//! - `dispatcher.rs`: trigger registry, ranking, tie-breaking, fault isolation
//!   and patching.
//! - `metrics.rs`: per-trigger outcomes and timings for verbose dispatches.
//!
//! ## Debugging
//!
//! Everything logs through `tracing`: `debug` shows each trigger's outcome and
//! each accept decision, `trace` adds per-candidate scores and every pattern
//! attempt.

#[path = "engine/dispatcher.rs"]
mod dispatcher;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/pattern.rs"]
mod pattern;
#[path = "engine/pattern_set.rs"]
mod pattern_set;
#[cfg(test)]
#[path = "engine/tests.rs"]
mod tests;

pub use dispatcher::Dispatcher;
pub use metrics::{RankMetrics, RankOutcome};
pub use pattern::{Atom, Pattern, Quantifier};
pub use pattern_set::PatternSet;
