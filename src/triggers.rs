//! Trigger variants.
//!
//! A trigger expresses one conversational expectation ("the user says
//! hello", "the user picks one of the offered choices", "anything at all")
//! and ranks how well a request fulfils it.
//!
//! The variants form a closed set, [`TriggerSpec`]. A spec is registered once
//! and bound to each inbound request, which yields a short-lived [`Trigger`]:
//!
//! ```text
//! TriggerSpec ── bind(&request) ──▶ Trigger ── rank() ──▶ Option<Score>
//!                                      │
//!                                      └── into_patch() ──▶ Patch ── apply(&mut register)
//! ```
//!
//! Ranking never writes anything shared. Whatever a trigger learns while
//! ranking (the choice the user made) stays on the `Trigger` and only reaches
//! the register through its [`Patch`], which the dispatcher applies for the
//! winner alone.
//!
//! | Variant    | Looks at                    | Rank                                      |
//! |------------|-----------------------------|-------------------------------------------|
//! | `Anything` | nothing                     | always 1.0                                |
//! | `Text`     | `RawText`                   | best similarity against intent phrasings  |
//! | `Choice`   | `QuickReply`, `RawText`     | 1.0 for a tapped choice, else similarity  |

use crate::error::{Result, TriggerError};
use crate::intents::{Intent, IntentsDb};
use crate::layers::{LayerKind, TagSet};
use crate::register::{CHOICES_KEY, CHOSEN_KEY, Choice, Choices, TransitionRegister};
use crate::request::Request;
use crate::trigram::Matcher;
use crate::Score;
use tracing::trace;

/// A registered trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerSpec {
    /// Catch-all.
    Anything,
    /// Raw text resembling one of the intent's phrasings.
    Text(Intent),
    /// A pick among the choices offered last turn, optionally restricted to one slug.
    Choice { when: Option<String> },
}

impl TriggerSpec {
    pub fn anything() -> Self {
        TriggerSpec::Anything
    }

    /// Text trigger for intent `key`; fails if the intent is unknown.
    pub fn text(db: &IntentsDb, key: &str) -> Result<Self> {
        Ok(TriggerSpec::Text(db.get(key)?))
    }

    pub fn choice(when: Option<&str>) -> Self {
        TriggerSpec::Choice { when: when.map(str::to_string) }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            TriggerSpec::Anything => "Anything",
            TriggerSpec::Text(_) => "Text",
            TriggerSpec::Choice { .. } => "Choice",
        }
    }

    /// Layer kinds the variant can possibly look at. A request carrying none
    /// of them cannot get an opinion out of it. `None` means unconditional.
    pub fn required_tags(&self) -> Option<TagSet> {
        match self {
            TriggerSpec::Anything => None,
            TriggerSpec::Text(_) => Some(TagSet::RAW_TEXT),
            TriggerSpec::Choice { .. } => Some(TagSet::RAW_TEXT | TagSet::QUICK_REPLY),
        }
    }

    pub fn bind<'r>(&'r self, request: &'r Request) -> Trigger<'r> {
        Trigger { spec: self, request, chosen: None }
    }
}

/// A trigger bound to one request.
#[derive(Debug)]
pub struct Trigger<'r> {
    spec: &'r TriggerSpec,
    request: &'r Request,
    chosen: Option<Choice>,
}

impl<'r> Trigger<'r> {
    pub fn spec(&self) -> &'r TriggerSpec {
        self.spec
    }

    /// Choice staged by the last `rank` call, if any.
    pub fn chosen(&self) -> Option<&Choice> {
        self.chosen.as_ref()
    }

    /// Rank the request; `Ok(None)` means no opinion.
    pub fn rank(&mut self) -> std::result::Result<Option<Score>, TriggerError> {
        self.chosen = None;

        let spec = self.spec;
        match spec {
            TriggerSpec::Anything => Ok(Some(Score::PERFECT)),
            TriggerSpec::Text(intent) => Ok(self.rank_text(intent)),
            TriggerSpec::Choice { when } => self.rank_choice(when.as_deref()),
        }
    }

    /// What to commit if this trigger wins.
    pub fn into_patch(self) -> Patch {
        match (self.spec, self.chosen) {
            (TriggerSpec::Choice { .. }, Some(choice)) => Patch::CommitChoice(choice),
            _ => Patch::Nothing,
        }
    }

    fn rank_text(&self, intent: &Intent) -> Option<Score> {
        let query = self.request.text_trigram()?;
        let matcher = Matcher::from_strings(intent.strings(self.request.locale()));
        let score = matcher.best(query);
        trace!(intent = intent.key(), score, "text rank");
        Some(Score::new(score))
    }

    fn rank_choice(&mut self, when: Option<&str>) -> std::result::Result<Option<Score>, TriggerError> {
        let request = self.request;
        let choices = match request.register().choices()? {
            Some(choices) if !choices.is_empty() => choices,
            _ => return Ok(None),
        };

        if let Some(slug) = request.stack().quick_reply() {
            if let Some(choice) = choices.get(slug) {
                if !allows(when, slug) {
                    return Ok(None);
                }
                trace!(slug, "choice picked by quick reply");
                self.chosen = Some(choice.clone());
                return Ok(Some(Score::PERFECT));
            }
        }

        if request.has_layer(LayerKind::RawText) {
            return self.rank_choice_text(&choices, when);
        }

        Ok(None)
    }

    /// Compare the typed answer with every choice and keep the best one.
    /// On equal scores the choice offered first stays.
    fn rank_choice_text(
        &mut self,
        choices: &Choices,
        when: Option<&str>,
    ) -> std::result::Result<Option<Score>, TriggerError> {
        let request = self.request;
        let Some(query) = request.rendered_text_trigram()? else {
            return Ok(None);
        };

        let mut best: Option<(&Choice, f64)> = None;
        for choice in choices {
            let candidates = choice.candidates(request.intents(), request.renderer(), request.locale())?;
            let score = Matcher::from_strings(candidates).best(query);
            trace!(slug = choice.slug.as_str(), score, "choice text rank");

            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((choice, score));
            }
        }

        match best {
            Some((choice, score)) if allows(when, &choice.slug) => {
                self.chosen = Some(choice.clone());
                Ok(Some(Score::new(score)))
            }
            Some(_) => Ok(None),
            // Nothing resembled any choice: a genuine zero, unless the trigger
            // waits for one specific slug.
            None if when.is_none() => Ok(Some(Score::ZERO)),
            None => Ok(None),
        }
    }
}

fn allows(when: Option<&str>, slug: &str) -> bool {
    when.is_none_or(|w| w == slug)
}

/// Register update produced by a winning trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Nothing,
    /// Record the choice the user made and consume the offered choices.
    CommitChoice(Choice),
}

impl Patch {
    pub fn apply(&self, register: &mut TransitionRegister) -> Result<()> {
        match self {
            Patch::Nothing => Ok(()),
            Patch::CommitChoice(choice) => {
                register.set_as(CHOSEN_KEY, choice)?;
                register.remove(CHOICES_KEY);
                Ok(())
            }
        }
    }

    pub fn chosen(&self) -> Option<&Choice> {
        match self {
            Patch::CommitChoice(choice) => Some(choice),
            Patch::Nothing => None,
        }
    }
}
