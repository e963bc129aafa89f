use crate::engine::{PatternSet, RankMetrics, RankOutcome};
use crate::error::Result;
use crate::layers::Stack;
use crate::register::Choice;
use crate::Score;
use once_cell::sync::Lazy;
use std::time::Duration;

/// Patterns every text-capable platform understands: one or more text
/// bubbles, optionally followed by quick replies.
pub static DEFAULT_PATTERNS: Lazy<PatternSet> = Lazy::new(|| {
    patterns! {
        "text" => "(Text|RawText)+ QuickRepliesList?",
    }
    .expect("default patterns compile")
});

/// Options that affect dispatch.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Rank triggers on the rayon thread pool instead of one after the other.
    /// The winner is the same either way.
    pub parallel: bool,
}

/// The trigger that won a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Registered name of the trigger.
    pub trigger: String,
    /// Registration index of the trigger.
    pub index: usize,
    pub score: Score,
    /// Choice committed by the winner's patch, if it was a `Choice` trigger.
    pub chosen: Option<Choice>,
}

/// Per-trigger line of a verbose dispatch.
#[derive(Debug, Clone)]
pub struct TriggerReport {
    pub name: String,
    pub variant: &'static str,
    pub outcome: RankOutcome,
    pub duration: Duration,
}

/// Additional details returned by `Dispatcher::dispatch_verbose_with`.
#[derive(Debug, Clone, Default)]
pub struct DispatchDetails {
    pub metrics: RankMetrics,
    /// One entry per registered trigger, in registration order.
    pub triggers: Vec<TriggerReport>,
}

/// Result of a verbose dispatch. Details are kept even when nothing matched.
#[derive(Debug)]
pub struct DispatchVerbose {
    pub result: Result<Selection>,
    pub details: DispatchDetails,
}

/// Name `stack` with [`DEFAULT_PATTERNS`].
///
/// # Example
/// ```
/// use parley::{Layer, Stack, accept};
///
/// let mut stack = Stack::new(vec![Layer::text("Hello"), Layer::raw_text("there")]);
/// assert_eq!(accept(&mut stack).unwrap(), "text");
/// ```
pub fn accept(stack: &mut Stack) -> Result<&'static str> {
    DEFAULT_PATTERNS.accept(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatchError;
    use crate::layers::Layer;

    #[test]
    fn default_patterns_accept_text_stacks() {
        let mut stack = Stack::new(vec![
            Layer::raw_text("a"),
            Layer::text("b"),
            Layer::QuickRepliesList { options: vec![] },
        ]);
        assert_eq!(accept(&mut stack).unwrap(), "text");

        let mut qr_only = Stack::new(vec![Layer::QuickRepliesList { options: vec![] }]);
        assert!(matches!(accept(&mut qr_only), Err(MatchError::NoPatternMatched { .. })));
    }
}
