//! Trigram index and similarity scoring.
//!
//! Fuzzy text matching in the engine is built on character trigrams
//! ("shingles"). A string is normalized, split into words, each word is padded
//! at its boundaries and then cut into overlapping 3-character windows:
//!
//! ```text
//! "Yess!" ── normalize ──▶ ["yess"] ── pad ──▶ "  yess " ──▶ "  y" " ye" "yes" "ess" "ss "
//! ```
//!
//! Shingles are kept as a multiset: a trigram that occurs twice weighs twice.
//! Two shingle sets are compared with the Dice coefficient
//!
//! ```text
//! similarity(a, b) = 2 * |a ∩ b| / (|a| + |b|)
//! ```
//!
//! where `∩` keeps the minimum count of every trigram.
//!
//! ## Invariants
//!
//! - `Trigram::new` is total: an input that normalizes to nothing still yields
//!   a single boundary shingle, so sizes are never zero.
//! - A trigram built from an empty (after normalization) input scores 0.0
//!   against everything, itself included.
//! - Scores are symmetric and bounded in `[0.0, 1.0]`; 1.0 only for equal
//!   multisets.
//!
//! Everything here is pure, so trigrams can be shared between threads freely.

use std::collections::HashMap;

type Shingle = [char; 3];

const BOUNDARY: Shingle = [' ', ' ', ' '];

/// Multiset of character trigrams derived from a normalized string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigram {
    normalized: String,
    counts: HashMap<Shingle, u32>,
    total: u32,
}

impl Trigram {
    /// Build the shingle multiset of `text`.
    pub fn new(text: &str) -> Self {
        let normalized = normalize(text);
        let mut counts: HashMap<Shingle, u32> = HashMap::new();
        let mut total = 0;

        for word in normalized.split(' ').filter(|w| !w.is_empty()) {
            let padded: Vec<char> = "  ".chars().chain(word.chars()).chain(std::iter::once(' ')).collect();
            for window in padded.windows(3) {
                *counts.entry([window[0], window[1], window[2]]).or_insert(0) += 1;
                total += 1;
            }
        }

        if total == 0 {
            counts.insert(BOUNDARY, 1);
            total = 1;
        }

        Trigram { normalized, counts, total }
    }

    /// The normalized form the shingles were cut from.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// True when the input normalized to nothing (only the boundary shingle is present).
    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    /// Number of shingles, counting repetitions.
    pub fn len(&self) -> usize {
        self.total as usize
    }

    /// How many times `shingle` occurs. Shingles shorter or longer than three
    /// characters never occur.
    pub fn count(&self, shingle: &str) -> u32 {
        let chars: Vec<char> = shingle.chars().collect();
        match chars.as_slice() {
            [a, b, c] => self.counts.get(&[*a, *b, *c]).copied().unwrap_or(0),
            _ => 0,
        }
    }

    /// Dice similarity with `other`, in `[0.0, 1.0]`.
    pub fn similarity(&self, other: &Trigram) -> f64 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }

        // Iterate the smaller map; the intersection is symmetric anyway.
        let (small, large) = if self.counts.len() <= other.counts.len() { (self, other) } else { (other, self) };
        let shared: u32 =
            small.counts.iter().map(|(shingle, &n)| n.min(large.counts.get(shingle).copied().unwrap_or(0))).sum();

        (2.0 * f64::from(shared)) / f64::from(self.total + other.total)
    }
}

/// Shorthand for [`Trigram::new`].
pub fn shingles(text: &str) -> Trigram {
    Trigram::new(text)
}

/// Shorthand for [`Trigram::similarity`].
pub fn similarity(a: &Trigram, b: &Trigram) -> f64 {
    a.similarity(b)
}

/// Lowercase, drop punctuation and collapse whitespace.
///
/// `\w` is Unicode-aware, so accented letters survive as themselves; they are
/// only case-folded.
fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    regex!(r"[^\w]+").split(&lower).filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" ")
}

// --- Candidate matching -------------------------------------------------------

/// A set of candidate trigrams scored against a query.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    candidates: Vec<Trigram>,
}

impl Matcher {
    pub fn new(candidates: Vec<Trigram>) -> Self {
        Matcher { candidates }
    }

    /// Build a matcher by computing the trigrams of every candidate string.
    pub fn from_strings<I, S>(strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Matcher { candidates: strings.into_iter().map(|s| Trigram::new(s.as_ref())).collect() }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Best similarity of `query` across all candidates; 0.0 when there are none.
    pub fn best(&self, query: &Trigram) -> f64 {
        self.candidates.iter().map(|c| c.similarity(query)).fold(0.0, f64::max)
    }
}

/// Score `query` against every candidate and keep the maximum.
///
/// The query's shingles are computed once.
pub fn best_match<S: AsRef<str>>(query: &str, candidates: &[S]) -> f64 {
    if candidates.is_empty() {
        return 0.0;
    }
    let query = Trigram::new(query);
    candidates.iter().map(|c| Trigram::new(c.as_ref()).similarity(&query)).fold(0.0, f64::max)
}
