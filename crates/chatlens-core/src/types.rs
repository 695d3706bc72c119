use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChatlensError;

// =============================================================================
// Identifiers
// =============================================================================

/// Opaque, stable identifier for one end-user's conversation thread.
///
/// Transports with numeric chat ids convert through `From<i64>`; the
/// record store only ever sees the string form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationKey(String);

impl ConversationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for ConversationKey {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ConversationKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Coarse classification of a turn's inbound text tone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    /// Assigned by the pipeline when scoring faulted. Never produced by
    /// the classifier itself.
    Error,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 4] = [
        SentimentLabel::Positive,
        SentimentLabel::Negative,
        SentimentLabel::Neutral,
        SentimentLabel::Error,
    ];

    /// Canonical stored form of the label.
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Negative => "Negative",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Error => "Error",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = ChatlensError;

    /// Parses stored labels case-insensitively. Surrounding whitespace is
    /// ignored so legacy rows written as `"Positive "` still parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "negative" => Ok(SentimentLabel::Negative),
            "neutral" => Ok(SentimentLabel::Neutral),
            "error" => Ok(SentimentLabel::Error),
            _ => Err(ChatlensError::InvalidLabel(s.to_string())),
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A registered end-user. At most one per conversation key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub conversation_key: ConversationKey,
    pub display_name: Option<String>,
    pub handle: Option<String>,
    /// Populated once, when the user shares contact info.
    pub phone_number: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl User {
    /// A user first seen now, with no phone number yet.
    pub fn new(
        conversation_key: ConversationKey,
        display_name: Option<String>,
        handle: Option<String>,
    ) -> Self {
        Self {
            conversation_key,
            display_name,
            handle,
            phone_number: None,
            registered_at: Utc::now(),
        }
    }
}

/// One request/response exchange in a conversation. Immutable once stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub conversation_key: ConversationKey,
    /// Raw inbound text as received; may be empty.
    pub inbound_text: String,
    pub reply_text: String,
    pub sentiment: SentimentLabel,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Build a turn stamped with the current time.
    pub fn new(
        conversation_key: ConversationKey,
        inbound_text: impl Into<String>,
        reply_text: impl Into<String>,
        sentiment: SentimentLabel,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_key,
            inbound_text: inbound_text.into(),
            reply_text: reply_text.into(),
            sentiment,
            timestamp: Utc::now(),
        }
    }
}

/// A received media item and its generated description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub conversation_key: ConversationKey,
    /// Opaque file id from the transport layer.
    pub file_ref: String,
    pub media_type: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl Attachment {
    pub fn new(
        conversation_key: ConversationKey,
        file_ref: impl Into<String>,
        media_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_key,
            file_ref: file_ref.into(),
            media_type: media_type.into(),
            description: description.into(),
            timestamp: Utc::now(),
        }
    }
}
