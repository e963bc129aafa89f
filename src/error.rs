use thiserror::Error;

/// Errors surfaced by the matching engine to its callers.
///
/// Dispatch and pattern failures are routine outcomes the caller branches on;
/// compile and registration failures are meant to be hit at startup.
#[derive(Error, Debug)]
pub enum MatchError {
    /// Every registered trigger declined to rank the request (or none were registered).
    #[error("no trigger matched the request")]
    NoTriggerMatched,

    /// The stack satisfies none of the registered patterns.
    #[error("no pattern matched stack [{stack}]")]
    NoPatternMatched { stack: String },

    /// A pattern expression could not be compiled.
    #[error("malformed pattern {expression:?} at offset {position}: {reason}")]
    MalformedPattern { expression: String, position: usize, reason: String },

    #[error("pattern {name:?} is already registered")]
    DuplicatePattern { name: String },

    #[error("trigger {name:?} is already registered")]
    DuplicateTrigger { name: String },

    #[error("unknown intent {key:?}")]
    UnknownIntent { key: String },

    #[error("invalid intents database: {0}")]
    InvalidIntents(#[source] serde_json::Error),

    #[error("choice {slug:?} is offered twice")]
    DuplicateChoice { slug: String },

    /// A platform was asked to send a stack none of its patterns accept.
    #[error("cannot accept stack [{stack}]")]
    UnacceptableStack { stack: String },

    /// A send handler was registered for a pattern the platform does not know.
    #[error("unknown pattern {name:?}")]
    UnknownPattern { name: String },

    /// The stack was accepted but nothing is registered to send it.
    #[error("no send handler registered for pattern {pattern:?}")]
    MissingHandler { pattern: String },

    /// A transition register entry could not be (de)serialised.
    #[error("transition register key {key:?}: {source}")]
    Register { key: String, source: serde_json::Error },
}

/// A fault raised by a single trigger while ranking.
///
/// The dispatcher isolates these: the faulty trigger is treated as having no
/// opinion and ranking carries on with the others.
#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("unknown intent {key:?}")]
    UnknownIntent { key: String },

    #[error("transition register key {key:?} is malformed: {source}")]
    Register { key: String, source: serde_json::Error },

    #[error("rendering failed: {0}")]
    Render(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, MatchError>;
