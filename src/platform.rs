//! Outgoing side of a messaging platform.
//!
//! A platform declares the stack shapes it can send as a [`PatternSet`] and
//! one send routine per shape. Sending a stack is two steps:
//!
//! ```text
//! accept(&mut stack)   first matching pattern ──▶ stack.annotation
//! send(&req, &mut stack)
//!     annotation (accepting first if needed) ──▶ handler(&req, &stack)
//! ```
//!
//! Handlers return whatever the host needs (`O`): a wire payload, a future,
//! a list of calls to make. The platform never performs I/O itself.

use crate::engine::PatternSet;
use crate::error::{MatchError, Result};
use crate::layers::Stack;
use crate::request::Request;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

type Handler<O> = Box<dyn Fn(&Request, &Stack) -> O + Send + Sync>;

pub struct Platform<O> {
    patterns: PatternSet,
    handlers: HashMap<String, Handler<O>>,
}

impl<O> Platform<O> {
    pub fn new(patterns: PatternSet) -> Self {
        Self { patterns, handlers: HashMap::new() }
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Register the send routine for the pattern called `name`.
    ///
    /// Registering twice replaces the previous routine.
    pub fn on<F>(&mut self, name: &str, handler: F) -> Result<&mut Self>
    where
        F: Fn(&Request, &Stack) -> O + Send + Sync + 'static,
    {
        if self.patterns.get(name).is_none() {
            return Err(MatchError::UnknownPattern { name: name.to_string() });
        }
        self.handlers.insert(name.to_string(), Box::new(handler));
        Ok(self)
    }

    /// Fail on the first pattern without a send routine. Meant for startup.
    pub fn check_handlers(&self) -> Result<()> {
        match self.patterns.names().find(|name| !self.handlers.contains_key(*name)) {
            Some(name) => Err(MatchError::MissingHandler { pattern: name.to_string() }),
            None => Ok(()),
        }
    }

    /// Whether this platform can send `stack`. Annotates it when it can.
    pub fn accept(&self, stack: &mut Stack) -> bool {
        self.patterns.accept(stack).is_ok()
    }

    /// Hand `stack` to the routine registered for its shape.
    ///
    /// A stack that was already annotated by [`accept`](Self::accept) is not
    /// matched again.
    pub fn send(&self, request: &Request, stack: &mut Stack) -> Result<O> {
        let name = match stack.annotation.clone() {
            Some(name) if self.patterns.get(&name).is_some() => name,
            _ => match self.patterns.accept(stack) {
                Ok(name) => name.to_string(),
                Err(_) => return Err(MatchError::UnacceptableStack { stack: stack.to_string() }),
            },
        };

        let handler = self.handlers.get(&name).ok_or_else(|| MatchError::MissingHandler { pattern: name.clone() })?;
        debug!(pattern = name.as_str(), stack = %stack, "sending stack");
        Ok(handler(request, stack))
    }
}

impl<O> fmt::Debug for Platform<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        handlers.sort_unstable();
        f.debug_struct("Platform").field("patterns", &self.patterns).field("handlers", &handlers).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{Layer, QuickReplyOption};
    use crate::register::TransitionRegister;

    fn platform() -> Platform<String> {
        let patterns = patterns! {
            "text" => "(Text|RawText)+ QuickRepliesList?",
            "postback" => "Postback",
        }
        .unwrap();

        let mut platform = Platform::new(patterns);
        platform
            .on("text", |_, stack| format!("text x{}", stack.len()))
            .unwrap()
            .on("postback", |_, _| "postback".to_string())
            .unwrap();
        platform
    }

    fn request() -> Request {
        Request::new(Stack::default(), TransitionRegister::new())
    }

    #[test]
    fn send_dispatches_on_shape() {
        let platform = platform();
        platform.check_handlers().unwrap();

        let mut stack = Stack::new(vec![
            Layer::text("Pick one"),
            Layer::QuickRepliesList {
                options: vec![QuickReplyOption::Text { slug: "a".into(), text: "A".into(), intent: None }],
            },
        ]);
        assert!(platform.accept(&mut stack));
        assert_eq!(platform.send(&request(), &mut stack).unwrap(), "text x2");
        assert_eq!(stack.annotation.as_deref(), Some("text"));
    }

    #[test]
    fn send_accepts_unannotated_stacks() {
        let platform = platform();
        let mut stack = Stack::new(vec![Layer::Postback { payload: serde_json::json!({"go": true}) }]);
        assert_eq!(platform.send(&request(), &mut stack).unwrap(), "postback");
    }

    #[test]
    fn unacceptable_stack_is_an_error() {
        let platform = platform();
        let mut stack = Stack::new(vec![Layer::quick_reply("yes")]);
        assert!(!platform.accept(&mut stack));
        assert!(matches!(platform.send(&request(), &mut stack), Err(MatchError::UnacceptableStack { .. })));
    }

    #[test]
    fn handlers_are_checked_against_patterns() {
        let patterns = patterns! { "text" => "RawText+", "card" => "Postback" }.unwrap();
        let mut platform: Platform<()> = Platform::new(patterns);

        assert!(matches!(platform.on("video", |_, _| ()), Err(MatchError::UnknownPattern { .. })));

        platform.on("text", |_, _| ()).unwrap();
        assert!(matches!(platform.check_handlers(), Err(MatchError::MissingHandler { pattern }) if pattern == "card"));

        let mut stack = Stack::new(vec![Layer::Postback { payload: serde_json::Value::Null }]);
        assert!(matches!(platform.send(&request(), &mut stack), Err(MatchError::MissingHandler { .. })));
    }
}
