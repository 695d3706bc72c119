//! Inbound events delivered by a transport and the replies sent back.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::ConversationKey;

/// Who sent an event, as far as the transport knows.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SenderProfile {
    pub display_name: Option<String>,
    pub handle: Option<String>,
}

/// A downloadable media item referenced by a media event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Opaque transport file id.
    pub file_ref: String,
    /// Declared MIME type, e.g. `image/jpeg`.
    pub media_type: String,
}

/// One event handed to the ingestion pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    Text {
        key: ConversationKey,
        text: String,
        #[serde(default)]
        sender: SenderProfile,
    },
    Contact {
        key: ConversationKey,
        phone: String,
        #[serde(default)]
        sender: SenderProfile,
    },
    /// `media` is `None` when the message carried nothing processable.
    Media {
        key: ConversationKey,
        media: Option<MediaRef>,
        #[serde(default)]
        sender: SenderProfile,
    },
    /// A slash command such as `/start` or `/dashboard`, without the slash.
    Command {
        key: ConversationKey,
        name: String,
        #[serde(default)]
        sender: SenderProfile,
    },
}

impl InboundEvent {
    pub fn key(&self) -> &ConversationKey {
        match self {
            InboundEvent::Text { key, .. }
            | InboundEvent::Contact { key, .. }
            | InboundEvent::Media { key, .. }
            | InboundEvent::Command { key, .. } => key,
        }
    }

    pub fn sender(&self) -> &SenderProfile {
        match self {
            InboundEvent::Text { sender, .. }
            | InboundEvent::Contact { sender, .. }
            | InboundEvent::Media { sender, .. }
            | InboundEvent::Command { sender, .. } => sender,
        }
    }

    /// Short name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Text { .. } => "text",
            InboundEvent::Contact { .. } => "contact",
            InboundEvent::Media { .. } => "media",
            InboundEvent::Command { .. } => "command",
        }
    }
}

/// What the transport should deliver back to the conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyPayload {
    Text { text: String },
    /// An image file on local disk with a caption.
    Photo { path: PathBuf, caption: String },
    /// Ask the user to share their contact card.
    RequestContact { prompt: String, button_label: String },
    /// Several payloads delivered in order.
    Sequence { items: Vec<ReplyPayload> },
    /// Nothing to send (e.g. a media event without processable media).
    Nothing,
}

impl ReplyPayload {
    pub fn text(text: impl Into<String>) -> Self {
        ReplyPayload::Text { text: text.into() }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, ReplyPayload::Nothing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_key_and_kind() {
        let event = InboundEvent::Media {
            key: ConversationKey::from(5_i64),
            media: None,
            sender: SenderProfile::default(),
        };
        assert_eq!(event.key().as_str(), "5");
        assert_eq!(event.kind(), "media");
    }

    #[test]
    fn test_event_json_shape() {
        let event = InboundEvent::Text {
            key: ConversationKey::new("9"),
            text: "hello".into(),
            sender: SenderProfile::default(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["key"], "9");
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn test_event_sender_defaults_when_missing() {
        let event: InboundEvent =
            serde_json::from_str(r#"{"kind":"contact","key":"3","phone":"+100"}"#).unwrap();
        assert_eq!(event.sender(), &SenderProfile::default());
    }

    #[test]
    fn test_reply_text_helper() {
        assert_eq!(
            ReplyPayload::text("ok"),
            ReplyPayload::Text { text: "ok".into() }
        );
        assert!(ReplyPayload::Nothing.is_nothing());
        assert!(!ReplyPayload::text("x").is_nothing());
    }
}
