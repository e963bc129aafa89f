//! Intents and rendering.
//!
//! An intent is a named group of phrasings per locale ("yes", "yep", "sure"
//! for `YES` in `en`). Triggers never look intents up by name while ranking:
//! the name is resolved against the [`IntentsDb`] when the trigger (or the
//! offered choice) is registered, so a typo fails at startup instead of on
//! live traffic.
//!
//! Loading intents from files and translating templates belong to the host
//! application. The engine only needs the resolved strings, and a
//! [`Renderer`] hook to turn a message text into its final form before it is
//! compared.

use crate::error::{MatchError, Result, TriggerError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

fn default_locale() -> String {
    "en".to_string()
}

/// Phrasings of every known intent, keyed by intent then locale.
///
/// JSON form:
///
/// ```json
/// { "default_locale": "en", "intents": { "YES": { "en": ["yes", "yep"], "fr": ["oui"] } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentsDb {
    #[serde(default = "default_locale")]
    default_locale: String,
    #[serde(default)]
    intents: HashMap<String, BTreeMap<String, Vec<String>>>,
}

impl IntentsDb {
    pub fn new(default_locale: impl Into<String>) -> Self {
        IntentsDb { default_locale: default_locale.into(), intents: HashMap::new() }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(MatchError::InvalidIntents)
    }

    /// Add phrasings of `key` for `locale` (appending to any existing ones).
    pub fn insert<I, S>(&mut self, key: impl Into<String>, locale: impl Into<String>, strings: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.intents
            .entry(key.into())
            .or_default()
            .entry(locale.into())
            .or_default()
            .extend(strings.into_iter().map(Into::into));
        self
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn contains(&self, key: &str) -> bool {
        self.intents.contains_key(key)
    }

    /// Resolve `key` into an [`Intent`].
    pub fn get(&self, key: &str) -> Result<Intent> {
        let strings = self.intents.get(key).ok_or_else(|| MatchError::UnknownIntent { key: key.to_string() })?;
        Ok(Intent { key: key.to_string(), default_locale: self.default_locale.clone(), strings: strings.clone() })
    }

    /// Strings of `key` for `locale`, without building an [`Intent`].
    pub(crate) fn strings(&self, key: &str, locale: Option<&str>) -> std::result::Result<&[String], TriggerError> {
        let strings = self.intents.get(key).ok_or_else(|| TriggerError::UnknownIntent { key: key.to_string() })?;
        Ok(pick_locale(strings, locale, &self.default_locale))
    }
}

/// A resolved intent.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    key: String,
    default_locale: String,
    strings: BTreeMap<String, Vec<String>>,
}

impl Intent {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Phrasings for `locale`, falling back to the default locale. Empty when
    /// neither is known.
    pub fn strings(&self, locale: Option<&str>) -> &[String] {
        pick_locale(&self.strings, locale, &self.default_locale)
    }
}

fn pick_locale<'a>(strings: &'a BTreeMap<String, Vec<String>>, locale: Option<&str>, default: &str) -> &'a [String] {
    locale
        .and_then(|l| strings.get(l))
        .or_else(|| strings.get(default))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Turns a message text into the string actually shown to (or typed by) the user.
///
/// Implementations typically look translation keys up; they may need their own
/// synchronisation, which is why they must be `Send + Sync`.
pub trait Renderer: Send + Sync {
    fn render(&self, text: &str, locale: Option<&str>) -> std::result::Result<String, TriggerError>;
}

/// Renders every text as itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl Renderer for PlainRenderer {
    fn render(&self, text: &str, _locale: Option<&str>) -> std::result::Result<String, TriggerError> {
        Ok(text.to_string())
    }
}
