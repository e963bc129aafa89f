//! Intent and stack matching for conversational bots.
//!
//! Two questions are answered here, both deterministically:
//!
//! - *Which registered trigger best explains an inbound message?* Triggers
//!   rank the request in `[0, 1]` (trigram similarity against intent
//!   phrasings, explicit quick-reply choices, or a catch-all) and the
//!   [`Dispatcher`] keeps the best one.
//! - *Which outgoing shape is this response stack?* A [`PatternSet`] of small
//!   token grammars (`"(Text|RawText)+ QuickRepliesList?"`) names the stack so
//!   a platform can pick the right send routine.
//!
//! Transport, wire formats, translation and the conversation state machine
//! are the host's business; they hand decoded [`Request`]s and [`Stack`]s in
//! and read names and scores out.

use std::fmt;

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
mod intents;
mod layers;
mod platform;
mod register;
mod request;
mod triggers;
pub mod trigram;

pub use api::{DEFAULT_PATTERNS, DispatchDetails, DispatchVerbose, Options, Selection, TriggerReport, accept};
pub use engine::{Atom, Dispatcher, Pattern, PatternSet, Quantifier, RankMetrics, RankOutcome};
pub use error::{MatchError, Result, TriggerError};
pub use intents::{Intent, IntentsDb, PlainRenderer, Renderer};
pub use layers::{Layer, LayerKind, QuickReplyOption, Stack, TagSet};
pub use platform::Platform;
pub use register::{CHOICES_KEY, CHOSEN_KEY, Choice, Choices, ChoicesBuilder, TransitionRegister};
pub use request::Request;
pub use triggers::{Patch, Trigger, TriggerSpec};

/// Confidence of a trigger in `[0.0, 1.0]`.
///
/// "No opinion" is not a score: it is the absence of one (`Option<Score>`),
/// so a trigger that declines never competes with one that scored a real zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Score(f64);

impl Score {
    pub const ZERO: Score = Score(0.0);
    pub const PERFECT: Score = Score(1.0);

    /// Clamp `value` into `[0, 1]`; NaN becomes zero.
    pub fn new(value: f64) -> Self {
        if value.is_nan() { Score::ZERO } else { Score(value.clamp(0.0, 1.0)) }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Score;

    #[test]
    fn score_is_clamped() {
        assert_eq!(Score::new(1.5), Score::PERFECT);
        assert_eq!(Score::new(-0.2), Score::ZERO);
        assert_eq!(Score::new(f64::NAN), Score::ZERO);
        assert_eq!(Score::new(0.25).value(), 0.25);
        assert_eq!(Score::new(2.0 / 3.0).to_string(), "0.667");
    }
}
