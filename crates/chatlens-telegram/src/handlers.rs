//! Mapping from Telegram messages to pipeline events.

use teloxide::types::{MediaKind, Message, MessageKind};

use chatlens_core::events::{InboundEvent, MediaRef, SenderProfile};
use chatlens_core::types::ConversationKey;

/// Telegram re-encodes every photo as JPEG.
const PHOTO_MEDIA_TYPE: &str = "image/jpeg";
const FALLBACK_DOCUMENT_TYPE: &str = "application/octet-stream";

/// Convert a message into an inbound event.
///
/// Returns `None` for service messages (joins, pins, etc.) that carry no
/// user content. Media the pipeline cannot analyze still produces a
/// `Media` event with no payload.
pub fn to_inbound_event(msg: &Message) -> Option<InboundEvent> {
    let MessageKind::Common(common) = &msg.kind else {
        return None;
    };

    let key = ConversationKey::from(msg.chat.id.0);
    let sender = sender_profile(msg);

    let event = match &common.media_kind {
        MediaKind::Text(t) => match command_name(&t.text) {
            Some(name) => InboundEvent::Command { key, name, sender },
            None => InboundEvent::Text {
                key,
                text: t.text.clone(),
                sender,
            },
        },
        MediaKind::Contact(c) => InboundEvent::Contact {
            key,
            phone: c.contact.phone_number.clone(),
            sender,
        },
        other => InboundEvent::Media {
            key,
            media: media_ref(other),
            sender,
        },
    };
    Some(event)
}

/// Name of a slash command, without the slash and any arguments.
fn command_name(text: &str) -> Option<String> {
    let rest = text.trim_start().strip_prefix('/')?;
    let name = rest.split_whitespace().next().unwrap_or("");
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

fn media_ref(kind: &MediaKind) -> Option<MediaRef> {
    match kind {
        // Largest size is last.
        MediaKind::Photo(p) => p.photo.last().map(|ps| MediaRef {
            file_ref: ps.file.id.clone(),
            media_type: PHOTO_MEDIA_TYPE.to_string(),
        }),
        MediaKind::Document(d) => Some(MediaRef {
            file_ref: d.document.file.id.clone(),
            media_type: d
                .document
                .mime_type
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| FALLBACK_DOCUMENT_TYPE.to_string()),
        }),
        _ => None,
    }
}

fn sender_profile(msg: &Message) -> SenderProfile {
    match msg.from.as_ref() {
        Some(user) => SenderProfile {
            display_name: Some(user.full_name()),
            handle: user.username.clone(),
        },
        None => SenderProfile::default(),
    }
}
