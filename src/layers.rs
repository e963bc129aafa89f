//! Message layers and stacks.
//!
//! Every inbound message and every composed response is decoded into a
//! [`Stack`]: an ordered list of [`Layer`]s. A layer is one piece of the
//! message (a text bubble, a tapped quick reply, a list of offered quick
//! replies, ...), tagged by its [`LayerKind`].
//!
//! The engine only ever looks at:
//!
//! - the *sequence of kinds* (pattern matching, see `engine/pattern.rs`), and
//! - the payload of a few kinds (`RawText` and `QuickReply`, used by triggers).
//!
//! ## Adding a layer kind
//!
//! 1. Add a `LayerKind` variant and its name in `LayerKind::ALL`.
//! 2. Add a `TagSet` bit.
//! 3. Add the `Layer` variant carrying its payload and map it in `Layer::kind`.
//!
//! Pattern expressions refer to kinds by their name, so the new kind is usable
//! in patterns straight away.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LayerKind {
    /// Bot-authored text, possibly a translation key.
    Text,
    /// Verbatim text, typed by the user or forced by the bot.
    RawText,
    /// A quick reply the user tapped.
    QuickReply,
    /// Quick replies offered along with a message.
    QuickRepliesList,
    /// A postback payload (button press).
    Postback,
}

impl LayerKind {
    pub const ALL: [LayerKind; 5] =
        [LayerKind::Text, LayerKind::RawText, LayerKind::QuickReply, LayerKind::QuickRepliesList, LayerKind::Postback];

    /// Name used in pattern expressions.
    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Text => "Text",
            LayerKind::RawText => "RawText",
            LayerKind::QuickReply => "QuickReply",
            LayerKind::QuickRepliesList => "QuickRepliesList",
            LayerKind::Postback => "Postback",
        }
    }

    /// Case-sensitive lookup by pattern name.
    pub fn from_name(name: &str) -> Option<LayerKind> {
        LayerKind::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn tag(self) -> TagSet {
        match self {
            LayerKind::Text => TagSet::TEXT,
            LayerKind::RawText => TagSet::RAW_TEXT,
            LayerKind::QuickReply => TagSet::QUICK_REPLY,
            LayerKind::QuickRepliesList => TagSet::QUICK_REPLIES_LIST,
            LayerKind::Postback => TagSet::POSTBACK,
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags::bitflags! {
    /// A set of layer kinds.
    ///
    /// Used for pattern alternations and for cheap "which kinds does this
    /// request carry" checks before binding triggers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TagSet: u16 {
        const TEXT               = 1 << 0;
        const RAW_TEXT           = 1 << 1;
        const QUICK_REPLY        = 1 << 2;
        const QUICK_REPLIES_LIST = 1 << 3;
        const POSTBACK           = 1 << 4;
    }
}

impl TagSet {
    pub fn has(self, kind: LayerKind) -> bool {
        self.contains(kind.tag())
    }

    /// Kinds in the set, in `LayerKind::ALL` order.
    pub fn kinds(self) -> impl Iterator<Item = LayerKind> {
        LayerKind::ALL.into_iter().filter(move |k| self.has(*k))
    }
}

impl From<LayerKind> for TagSet {
    fn from(kind: LayerKind) -> Self {
        kind.tag()
    }
}

/// One offered quick reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuickReplyOption {
    Text {
        slug: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intent: Option<String>,
    },
    Location,
}

/// One layer of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Layer {
    Text { text: String },
    RawText { text: String },
    QuickReply { slug: String },
    QuickRepliesList { options: Vec<QuickReplyOption> },
    Postback { payload: serde_json::Value },
}

impl Layer {
    pub fn text(text: impl Into<String>) -> Self {
        Layer::Text { text: text.into() }
    }

    pub fn raw_text(text: impl Into<String>) -> Self {
        Layer::RawText { text: text.into() }
    }

    pub fn quick_reply(slug: impl Into<String>) -> Self {
        Layer::QuickReply { slug: slug.into() }
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Text { .. } => LayerKind::Text,
            Layer::RawText { .. } => LayerKind::RawText,
            Layer::QuickReply { .. } => LayerKind::QuickReply,
            Layer::QuickRepliesList { .. } => LayerKind::QuickRepliesList,
            Layer::Postback { .. } => LayerKind::Postback,
        }
    }
}

/// Ordered layers of one message, plus the name of the pattern it was
/// accepted under (if any).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub layers: Vec<Layer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl Stack {
    pub fn new(layers: Vec<Layer>) -> Self {
        Stack { layers, annotation: None }
    }

    /// Append a layer. Any previous annotation no longer describes the
    /// stack, so it is cleared.
    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
        self.annotation = None;
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Layer kinds in order.
    pub fn kinds(&self) -> Vec<LayerKind> {
        self.layers.iter().map(Layer::kind).collect()
    }

    /// Set of kinds present anywhere in the stack.
    pub fn tags(&self) -> TagSet {
        self.layers.iter().fold(TagSet::empty(), |acc, l| acc | l.kind().tag())
    }

    pub fn has_layer(&self, kind: LayerKind) -> bool {
        self.layers.iter().any(|l| l.kind() == kind)
    }

    /// First layer of the given kind.
    pub fn get_layer(&self, kind: LayerKind) -> Option<&Layer> {
        self.layers.iter().find(|l| l.kind() == kind)
    }

    /// Text of the first `RawText` layer.
    pub fn raw_text(&self) -> Option<&str> {
        self.layers.iter().find_map(|l| match l {
            Layer::RawText { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Slug of the first `QuickReply` layer.
    pub fn quick_reply(&self) -> Option<&str> {
        self.layers.iter().find_map(|l| match l {
            Layer::QuickReply { slug } => Some(slug.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, layer) in self.layers.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(layer.kind().name())?;
        }
        Ok(())
    }
}

impl FromIterator<Layer> for Stack {
    fn from_iter<T: IntoIterator<Item = Layer>>(iter: T) -> Self {
        Stack::new(iter.into_iter().collect())
    }
}
