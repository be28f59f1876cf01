use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snowflake-style channel identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

/// Snowflake-style message identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// Snowflake-style user identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One named field of a structured record card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordField {
    pub name: String,
    pub value: String,
}

impl RecordField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Structured message payload: a titled card with ordered named fields,
/// the platform-neutral analog of a rich embed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCard {
    pub title: String,
    pub fields: Vec<RecordField>,
}

impl RecordCard {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(RecordField::new(name, value));
        self
    }

    /// Value of the first field with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

/// A message as returned by a history scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub id: MessageId,
    pub author: UserId,
    pub text: String,
    /// Structured payload, when the message carries one.
    pub card: Option<RecordCard>,
    pub created_at: DateTime<Utc>,
}

/// A reaction selection observed on a message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub message: MessageId,
    pub user: UserId,
    pub glyph: String,
}

/// Which reaction resolves a single-shot wait.
///
/// Platform adapters must additionally ignore reactions from automated
/// accounts; `from` names the one principal whose selection counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactionFilter {
    pub message: MessageId,
    pub glyphs: Vec<String>,
    pub from: UserId,
}

impl ReactionFilter {
    pub fn new(message: MessageId, glyphs: &[&str], from: UserId) -> Self {
        Self {
            message,
            glyphs: glyphs.iter().map(|g| g.to_string()).collect(),
            from,
        }
    }

    /// Returns true when `event` satisfies this filter.
    pub fn accepts(&self, event: &ReactionEvent) -> bool {
        event.message == self.message
            && event.user == self.from
            && self.glyphs.iter().any(|g| g == &event.glyph)
    }
}

/// Accept glyph of the two-choice confirmation menu.
pub const CONFIRM: &str = "\u{2705}";
/// Decline glyph of the two-choice confirmation menu.
pub const DECLINE: &str = "\u{274c}";

/// Digit glyphs of the numbered multi-choice menu, in menu order.
/// Menu capacity is `DIGITS.len()`.
pub const DIGITS: [&str; 10] = [
    "1\u{fe0f}\u{20e3}",
    "2\u{fe0f}\u{20e3}",
    "3\u{fe0f}\u{20e3}",
    "4\u{fe0f}\u{20e3}",
    "5\u{fe0f}\u{20e3}",
    "6\u{fe0f}\u{20e3}",
    "7\u{fe0f}\u{20e3}",
    "8\u{fe0f}\u{20e3}",
    "9\u{fe0f}\u{20e3}",
    "\u{1f51f}",
];
