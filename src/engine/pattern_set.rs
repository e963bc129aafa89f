//! Named pattern sets.
//!
//! A [`PatternSet`] maps names to compiled [`Pattern`]s and answers "which
//! shape is this stack?". Patterns are tried in registration order and the
//! first one that matches names the stack, so when two patterns overlap the
//! one registered first wins.
//!
//! Expressions are compiled on registration; a set that was built without an
//! error can only ever answer with a name or "no pattern matched".

use super::pattern::Pattern;
use crate::error::{MatchError, Result};
use crate::layers::{LayerKind, Stack};
use tracing::{debug, trace};

#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<(String, Pattern)>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `expression` and register it under `name`.
    pub fn register(&mut self, name: impl Into<String>, expression: &str) -> Result<&mut Self> {
        let pattern = Pattern::compile(expression)?;
        self.insert(name, pattern)
    }

    /// Register an already compiled pattern.
    pub fn insert(&mut self, name: impl Into<String>, pattern: Pattern) -> Result<&mut Self> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(MatchError::DuplicatePattern { name });
        }
        self.patterns.push((name, pattern));
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Name of the first pattern matching `kinds`.
    pub fn find(&self, kinds: &[LayerKind]) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(name, pattern)| {
                let hit = pattern.matches(kinds);
                trace!(pattern = name.as_str(), hit, "pattern attempt");
                hit
            })
            .map(|(name, _)| name.as_str())
    }

    /// Name `stack` after the first matching pattern and record it in
    /// `stack.annotation`.
    pub fn accept(&self, stack: &mut Stack) -> Result<&str> {
        match self.find(&stack.kinds()) {
            Some(name) => {
                debug!(pattern = name, stack = %stack, "stack accepted");
                stack.annotation = Some(name.to_string());
                Ok(name)
            }
            None => {
                debug!(stack = %stack, "no pattern matched");
                Err(MatchError::NoPatternMatched { stack: stack.to_string() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Layer;

    #[test]
    fn first_registered_wins() {
        let set = patterns! {
            "single" => "RawText",
            "texts" => "RawText+",
        }
        .unwrap();
        assert_eq!(set.find(&[LayerKind::RawText]), Some("single"));
        assert_eq!(set.find(&[LayerKind::RawText, LayerKind::RawText]), Some("texts"));

        let reversed = patterns! {
            "texts" => "RawText+",
            "single" => "RawText",
        }
        .unwrap();
        assert_eq!(reversed.find(&[LayerKind::RawText]), Some("texts"));
    }

    #[test]
    fn accept_annotates_stack() {
        let set = patterns! { "text" => "(Text|RawText)+ QuickRepliesList?" }.unwrap();

        let mut stack = Stack::new(vec![
            Layer::raw_text("a"),
            Layer::raw_text("b"),
            Layer::QuickRepliesList { options: vec![] },
        ]);
        assert_eq!(set.accept(&mut stack).unwrap(), "text");
        assert_eq!(stack.annotation.as_deref(), Some("text"));

        let mut postback = Stack::new(vec![Layer::Postback { payload: serde_json::json!({"action": "go"}) }]);
        let err = set.accept(&mut postback).unwrap_err();
        assert!(matches!(err, MatchError::NoPatternMatched { stack } if stack == "Postback"));
        assert_eq!(postback.annotation, None);
    }

    #[test]
    fn registration_errors_surface_immediately() {
        let mut set = PatternSet::new();
        assert!(matches!(set.register("broken", "(Text|"), Err(MatchError::MalformedPattern { .. })));
        assert!(set.is_empty());

        set.register("text", "Text+").unwrap();
        assert!(matches!(set.register("text", "RawText"), Err(MatchError::DuplicatePattern { .. })));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("text").map(|p| p.to_string()), Some("Text+".to_string()));
    }
}
