//! Per-conversation transition register.
//!
//! The register is a small key/value store that lives as long as the
//! conversation and is carried from one turn to the next by the host. The
//! engine reads it while ranking and writes to it only when the winning
//! trigger is patched; nothing here is global.
//!
//! Two keys are owned by the engine:
//!
//! - [`CHOICES_KEY`]: choices offered by the last bot message, read by the
//!   `Choice` trigger on the next inbound message.
//! - [`CHOSEN_KEY`]: the choice the user made, committed by `Choice` when it
//!   wins. The offered choices are consumed at the same time.

use crate::error::{MatchError, Result, TriggerError};
use crate::intents::{IntentsDb, Renderer};
use crate::layers::QuickReplyOption;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

pub const CHOICES_KEY: &str = "choices";
pub const CHOSEN_KEY: &str = "choice";

/// Key/value state scoped to one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionRegister {
    entries: BTreeMap<String, Value>,
}

impl TransitionRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deserialize the entry under `key`, if any.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> std::result::Result<Option<T>, TriggerError> {
        self.entries
            .get(key)
            .map(|v| T::deserialize(v).map_err(|source| TriggerError::Register { key: key.to_string(), source }))
            .transpose()
    }

    pub fn set_as<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value =
            serde_json::to_value(value).map_err(|source| MatchError::Register { key: key.to_string(), source })?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    /// Pending choices, `None` when nothing was offered.
    pub fn choices(&self) -> std::result::Result<Option<Choices>, TriggerError> {
        self.get_as(CHOICES_KEY)
    }

    /// The last committed choice.
    pub fn chosen(&self) -> std::result::Result<Option<Choice>, TriggerError> {
        self.get_as(CHOSEN_KEY)
    }
}

// --- Choices -----------------------------------------------------------------

/// One offered choice: a slug plus what the user may type to pick it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Choice {
    /// Strings a typed answer is compared against: the intent's phrasings,
    /// then the rendered literal text.
    pub fn candidates(
        &self,
        db: &IntentsDb,
        renderer: &dyn Renderer,
        locale: Option<&str>,
    ) -> std::result::Result<Vec<String>, TriggerError> {
        let mut out = Vec::new();

        if let Some(intent) = &self.intent {
            out.extend(db.strings(intent, locale)?.iter().cloned());
        }

        if let Some(text) = &self.text {
            out.push(renderer.render(text, locale)?);
        }

        Ok(out)
    }
}

/// Choices offered together, in the order they were offered. Slugs are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Choices(Vec<Choice>);

/// Entries written by the host skip the builder, so uniqueness is checked here too.
impl<'de> Deserialize<'de> for Choices {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let choices = Vec::<Choice>::deserialize(deserializer)?;
        let mut slugs = HashSet::new();
        if let Some(dup) = choices.iter().find(|c| !slugs.insert(c.slug.as_str())) {
            return Err(de::Error::custom(format!("choice {:?} is offered twice", dup.slug)));
        }
        Ok(Choices(choices))
    }
}

impl Choices {
    pub fn builder(db: &IntentsDb) -> ChoicesBuilder<'_> {
        ChoicesBuilder { db, choices: Vec::new(), slugs: HashSet::new() }
    }

    /// Collect the text options of a quick replies list.
    pub fn from_quick_replies(db: &IntentsDb, options: &[QuickReplyOption]) -> Result<Self> {
        let mut builder = Choices::builder(db);
        for option in options {
            if let QuickReplyOption::Text { slug, text, intent } = option {
                builder.add(slug, intent.as_deref(), Some(text))?;
            }
        }
        Ok(builder.build())
    }

    pub fn get(&self, slug: &str) -> Option<&Choice> {
        self.0.iter().find(|c| c.slug == slug)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Choice> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Offer these choices for the next turn.
    pub fn store(&self, register: &mut TransitionRegister) -> Result<()> {
        register.set_as(CHOICES_KEY, self)
    }
}

impl<'a> IntoIterator for &'a Choices {
    type Item = &'a Choice;
    type IntoIter = std::slice::Iter<'a, Choice>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Validating builder for [`Choices`].
pub struct ChoicesBuilder<'a> {
    db: &'a IntentsDb,
    choices: Vec<Choice>,
    slugs: HashSet<String>,
}

impl ChoicesBuilder<'_> {
    /// Offer a choice. Fails on a repeated slug or an unknown intent.
    pub fn add(&mut self, slug: &str, intent: Option<&str>, text: Option<&str>) -> Result<&mut Self> {
        if !self.slugs.insert(slug.to_string()) {
            return Err(MatchError::DuplicateChoice { slug: slug.to_string() });
        }
        if let Some(key) = intent {
            if !self.db.contains(key) {
                return Err(MatchError::UnknownIntent { key: key.to_string() });
            }
        }

        self.choices.push(Choice {
            slug: slug.to_string(),
            intent: intent.map(str::to_string),
            text: text.map(str::to_string),
        });
        Ok(self)
    }

    pub fn build(self) -> Choices {
        Choices(self.choices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intents::PlainRenderer;
    use serde_json::json;

    fn db() -> IntentsDb {
        let mut db = IntentsDb::new("en");
        db.insert("YES", "en", ["yes", "sure"]);
        db
    }

    #[test]
    fn builder_rejects_duplicates_and_unknown_intents() {
        let db = db();
        let mut builder = Choices::builder(&db);
        builder.add("yes", Some("YES"), None).unwrap();

        assert!(matches!(builder.add("yes", None, Some("Yes")), Err(MatchError::DuplicateChoice { .. })));
        assert!(matches!(builder.add("no", Some("NO"), None), Err(MatchError::UnknownIntent { .. })));
        assert_eq!(builder.build().len(), 1);
    }

    #[test]
    fn choices_round_trip_through_the_register() {
        let db = db();
        let mut builder = Choices::builder(&db);
        builder.add("yes", Some("YES"), Some("Yes")).unwrap().add("no", None, Some("No")).unwrap();
        let choices = builder.build();

        let mut register = TransitionRegister::new();
        assert_eq!(register.choices().unwrap(), None);

        choices.store(&mut register).unwrap();
        let back = register.choices().unwrap().unwrap();
        assert_eq!(back, choices);
        assert_eq!(back.iter().map(|c| c.slug.as_str()).collect::<Vec<_>>(), ["yes", "no"]);
    }

    #[test]
    fn malformed_choices_are_a_register_error() {
        let mut register = TransitionRegister::new();
        register.set(CHOICES_KEY, json!({"yes": 1}));
        assert!(matches!(register.choices(), Err(TriggerError::Register { key, .. }) if key == CHOICES_KEY));
    }

    #[test]
    fn repeated_slugs_in_the_register_are_rejected() {
        let mut register = TransitionRegister::new();
        register.set(CHOICES_KEY, json!([{"slug": "yes", "text": "Yes"}, {"slug": "yes", "text": "Yep"}]));
        match register.choices() {
            Err(TriggerError::Register { key, source }) => {
                assert_eq!(key, CHOICES_KEY);
                assert!(source.to_string().contains("offered twice"));
            }
            other => panic!("expected a register error, got {other:?}"),
        }
    }

    #[test]
    fn candidates_list_intent_strings_then_text() {
        let db = db();
        let choice = Choice { slug: "yes".into(), intent: Some("YES".into()), text: Some("Yes!".into()) };
        let out = choice.candidates(&db, &PlainRenderer, None).unwrap();
        assert_eq!(out, ["yes", "sure", "Yes!"]);

        let dangling = Choice { slug: "x".into(), intent: Some("GONE".into()), text: None };
        assert!(matches!(dangling.candidates(&db, &PlainRenderer, None), Err(TriggerError::UnknownIntent { .. })));
    }

    #[test]
    fn quick_reply_options_become_choices() {
        let db = db();
        let options = vec![
            QuickReplyOption::Text { slug: "yes".into(), text: "Yes".into(), intent: Some("YES".into()) },
            QuickReplyOption::Location,
            QuickReplyOption::Text { slug: "no".into(), text: "No".into(), intent: None },
        ];
        let choices = Choices::from_quick_replies(&db, &options).unwrap();
        assert_eq!(choices.len(), 2);
        assert_eq!(choices.get("no").and_then(|c| c.text.as_deref()), Some("No"));
    }
}
