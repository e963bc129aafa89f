//! Stack pattern grammar.
//!
//! A pattern describes the *shape* of a stack as a sequence of atoms over
//! layer kinds:
//!
//! ```text
//! pattern := atom (whitespace atom)*
//! atom    := (Kind | "(" Kind ("|" Kind)* ")") quantifier?
//! quantifier := "+"   one or more
//!             | "?"   zero or one
//!                     (none: exactly one)
//! ```
//!
//! For example `(Text|RawText)+ QuickRepliesList?` accepts one or more text
//! bubbles optionally followed by a list of quick replies.
//!
//! Kind names are the ones from [`LayerKind::name`]. Anything else (unknown
//! kind, unbalanced parenthesis, stray quantifier) is rejected by
//! [`Pattern::compile`], so a bad pattern fails where it is registered.
//!
//! ## Matching
//!
//! Matching is a regular expression over the kind alphabet. Each atom is
//! tried greedily (longest run first) and gives tokens back when the rest of
//! the pattern fails:
//!
//! ```text
//! pattern: RawText+ RawText          stack: RawText RawText RawText
//!          └─ greedy takes 3, rest fails; backs off to 2, rest matches
//! ```
//!
//! A pattern matches only if the whole stack is consumed.
//!
//! Every `(atom, position)` pair that failed once is remembered, so
//! overlapping runs (`(Text|RawText)+ (Text|RawText)+ ...`) cost at most
//! `atoms × n` states, each trying at most `n` run lengths.

use crate::error::{MatchError, Result};
use crate::layers::{LayerKind, Stack, TagSet};
use std::fmt;
use std::str::FromStr;

/// Repetition of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    One,
    OneOrMore,
    Optional,
}

impl Quantifier {
    /// `(min, max)` repetitions; `None` is unbounded.
    fn bounds(self) -> (usize, Option<usize>) {
        match self {
            Quantifier::One => (1, Some(1)),
            Quantifier::OneOrMore => (1, None),
            Quantifier::Optional => (0, Some(1)),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Quantifier::One => "",
            Quantifier::OneOrMore => "+",
            Quantifier::Optional => "?",
        }
    }
}

/// One position of a pattern: a set of accepted kinds and a repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Atom {
    pub tags: TagSet,
    pub quantifier: Quantifier,
}

/// A compiled stack pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    atoms: Vec<Atom>,
}

impl Pattern {
    pub fn compile(expression: &str) -> Result<Pattern> {
        Compiler::new(expression).run()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// True when `kinds`, as a whole, fits the pattern.
    pub fn matches(&self, kinds: &[LayerKind]) -> bool {
        Walk::new(&self.atoms, kinds).matches_from(0, 0)
    }

    pub fn matches_stack(&self, stack: &Stack) -> bool {
        self.matches(&stack.kinds())
    }
}

impl FromStr for Pattern {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        Pattern::compile(s)
    }
}

/// Canonical expression: single kinds bare, alternations parenthesized.
impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, atom) in self.atoms.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let names: Vec<&str> = atom.tags.kinds().map(LayerKind::name).collect();
            if names.len() == 1 {
                f.write_str(names[0])?;
            } else {
                write!(f, "({})", names.join("|"))?;
            }
            f.write_str(atom.quantifier.suffix())?;
        }
        Ok(())
    }
}

/// Backtracking walk over `(atom index, stack position)` states.
struct Walk<'a> {
    atoms: &'a [Atom],
    kinds: &'a [LayerKind],
    /// `failed[atom * (n + 1) + pos]`: no match from this state.
    failed: Vec<bool>,
    #[cfg(test)]
    steps: usize,
}

impl<'a> Walk<'a> {
    fn new(atoms: &'a [Atom], kinds: &'a [LayerKind]) -> Self {
        Walk {
            atoms,
            kinds,
            failed: vec![false; atoms.len() * (kinds.len() + 1)],
            #[cfg(test)]
            steps: 0,
        }
    }

    fn matches_from(&mut self, atom: usize, pos: usize) -> bool {
        let atoms = self.atoms;
        let Some(current) = atoms.get(atom) else {
            return pos == self.kinds.len();
        };
        let slot = atom * (self.kinds.len() + 1) + pos;
        if self.failed[slot] {
            return false;
        }
        #[cfg(test)]
        {
            self.steps += 1;
        }

        let (min, max) = current.quantifier.bounds();
        let run = self.kinds[pos..].iter().take_while(|k| current.tags.has(**k)).count();
        let longest = max.map_or(run, |m| run.min(m));

        if longest >= min && (min..=longest).rev().any(|taken| self.matches_from(atom + 1, pos + taken)) {
            return true;
        }
        self.failed[slot] = true;
        false
    }
}

// --- Compilation ---------------------------------------------------------------

struct Compiler<'a> {
    expression: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Compiler<'a> {
    fn new(expression: &'a str) -> Self {
        Compiler { expression, chars: expression.char_indices().collect(), pos: 0 }
    }

    fn run(mut self) -> Result<Pattern> {
        let mut atoms = Vec::new();

        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                break;
            }
            atoms.push(self.atom()?);

            // Atoms are whitespace separated.
            match self.peek() {
                None => break,
                Some(c) if c.is_whitespace() => {}
                Some(c) => return Err(self.error(format!("unexpected `{c}` after atom"))),
            }
        }

        if atoms.is_empty() {
            return Err(self.error("empty pattern"));
        }

        Ok(Pattern { atoms })
    }

    fn atom(&mut self) -> Result<Atom> {
        let tags = match self.peek() {
            Some('(') => self.alternation()?,
            Some(c) if is_name_char(c) => {
                let kind = self.kind()?;
                if self.peek() == Some('|') {
                    return Err(self.error("alternation must be parenthesized"));
                }
                kind.tag()
            }
            Some(c) => return Err(self.error(format!("unexpected `{c}`"))),
            None => return Err(self.error("expected a layer kind")),
        };

        let quantifier = match self.peek() {
            Some('+') => {
                self.pos += 1;
                Quantifier::OneOrMore
            }
            Some('?') => {
                self.pos += 1;
                Quantifier::Optional
            }
            _ => Quantifier::One,
        };

        Ok(Atom { tags, quantifier })
    }

    fn alternation(&mut self) -> Result<TagSet> {
        let open = self.offset();
        self.pos += 1;
        let mut tags = TagSet::empty();
        let expression = self.expression;
        let unbalanced = || MatchError::MalformedPattern {
            expression: expression.to_string(),
            position: open,
            reason: "unbalanced `(`".to_string(),
        };

        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                return Err(unbalanced());
            }
            tags |= self.kind()?.tag();
            self.skip_whitespace();

            match self.peek() {
                Some('|') => self.pos += 1,
                Some(')') => {
                    self.pos += 1;
                    return Ok(tags);
                }
                Some(c) => return Err(self.error(format!("unexpected `{c}` in alternation"))),
                None => return Err(unbalanced()),
            }
        }
    }

    fn kind(&mut self) -> Result<LayerKind> {
        let start = self.offset();
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        let name = &self.expression[start..self.offset()];

        if name.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.error(format!("expected a layer kind, found `{c}`")),
                None => self.error("expected a layer kind"),
            });
        }

        LayerKind::from_name(name).ok_or_else(|| MatchError::MalformedPattern {
            expression: self.expression.to_string(),
            position: start,
            reason: format!("unknown layer kind `{name}`"),
        })
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    /// Byte offset of the current position.
    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.expression.len(), |&(i, _)| i)
    }

    fn error(&self, reason: impl Into<String>) -> MatchError {
        MatchError::MalformedPattern {
            expression: self.expression.to_string(),
            position: self.offset(),
            reason: reason.into(),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use LayerKind::*;

    fn reason(expression: &str) -> (usize, String) {
        match Pattern::compile(expression) {
            Err(MatchError::MalformedPattern { position, reason, .. }) => (position, reason),
            other => panic!("expected MalformedPattern for {expression:?}, got {other:?}"),
        }
    }

    #[test]
    fn compiles_atoms_and_quantifiers() {
        let p = Pattern::compile("(Text|RawText)+ QuickRepliesList?").unwrap();
        assert_eq!(
            p.atoms(),
            [
                Atom { tags: TagSet::TEXT | TagSet::RAW_TEXT, quantifier: Quantifier::OneOrMore },
                Atom { tags: TagSet::QUICK_REPLIES_LIST, quantifier: Quantifier::Optional },
            ]
        );
        assert_eq!(p.to_string(), "(Text|RawText)+ QuickRepliesList?");
    }

    #[test]
    fn display_is_canonical() {
        let p: Pattern = "  ( RawText | Text )   (Postback)? ".parse().unwrap();
        assert_eq!(p.to_string(), "(Text|RawText) Postback?");
    }

    #[test]
    fn malformed_patterns() {
        assert_eq!(reason("(Text|"), (0, "unbalanced `(`".to_string()));
        assert_eq!(reason("Text Image").1, "unknown layer kind `Image`");
        assert_eq!(reason("Text Image").0, 5);
        assert_eq!(reason("Text|RawText").1, "alternation must be parenthesized");
        assert_eq!(reason("Text+?").1, "unexpected `?` after atom");
        assert_eq!(reason("+Text").1, "unexpected `+`");
        assert_eq!(reason("()").1, "expected a layer kind, found `)`");
        assert_eq!(reason("(Text)(RawText)").1, "unexpected `(` after atom");
        assert_eq!(reason("Text)").1, "unexpected `)` after atom");
        assert_eq!(reason("   ").1, "empty pattern");
        assert_eq!(reason("(Text RawText)").1, "unexpected `R` in alternation");
    }

    #[test]
    fn text_pattern_matches() {
        let p = Pattern::compile("(Text|RawText)+ QuickRepliesList?").unwrap();
        assert!(p.matches(&[RawText, RawText, QuickRepliesList]));
        assert!(p.matches(&[Text]));
        assert!(p.matches(&[Text, RawText, Text]));
        assert!(!p.matches(&[Postback]));
        assert!(!p.matches(&[QuickRepliesList]));
        assert!(!p.matches(&[Text, QuickRepliesList, QuickRepliesList]));
        assert!(!p.matches(&[Text, QuickRepliesList, Text]));
        assert!(!p.matches(&[]));
    }

    #[test]
    fn whole_stack_must_be_consumed() {
        let p = Pattern::compile("Text").unwrap();
        assert!(p.matches(&[Text]));
        assert!(!p.matches(&[Text, Text]));
        assert!(!p.matches(&[]));
    }

    #[test]
    fn optional_only_pattern_matches_empty() {
        let p = Pattern::compile("Text? Postback?").unwrap();
        assert!(p.matches(&[]));
        assert!(p.matches(&[Postback]));
        assert!(p.matches(&[Text, Postback]));
        assert!(!p.matches(&[Postback, Text]));
    }

    #[test]
    fn greedy_runs_back_off() {
        let p = Pattern::compile("RawText+ RawText").unwrap();
        assert!(p.matches(&[RawText, RawText, RawText]));
        assert!(p.matches(&[RawText, RawText]));
        assert!(!p.matches(&[RawText]));

        let overlapping = Pattern::compile("(Text|RawText)+ RawText? Text").unwrap();
        assert!(overlapping.matches(&[RawText, Text, RawText, Text]));
        assert!(overlapping.matches(&[Text, Text]));
        assert!(!overlapping.matches(&[Text, RawText]));
    }

    #[test]
    fn ambiguous_runs_stay_polynomial() {
        let expression = format!("{} Postback", vec!["(Text|RawText)+"; 8].join(" "));
        let p = Pattern::compile(&expression).unwrap();
        let kinds = vec![Text; 40];

        let mut walk = Walk::new(p.atoms(), &kinds);
        assert!(!walk.matches_from(0, 0));
        // One visit per (atom, position) state at most.
        assert!(walk.steps <= p.atoms().len() * (kinds.len() + 1), "took {} steps", walk.steps);

        let mut with_tail = kinds.clone();
        with_tail.push(Postback);
        assert!(p.matches(&with_tail));
        assert!(!p.matches(&kinds[..7]));
    }

    #[test]
    fn matches_stack_kinds() {
        use crate::layers::Layer;
        let p = Pattern::compile("RawText QuickReply?").unwrap();
        let stack = Stack::new(vec![Layer::raw_text("hi"), Layer::quick_reply("yes")]);
        assert!(p.matches_stack(&stack));
    }
}
