//! Fixed reply texts and reply composition.

use chatlens_core::events::ReplyPayload;

pub const DASHBOARD_CAPTION: &str = "Your Analytics Dashboard";
pub const ALREADY_REGISTERED: &str = "You are already registered!";
pub const CONTACT_PROMPT: &str = "Click the button below to share your name and phone number:";
pub const CONTACT_BUTTON: &str = "Share Name and Phone Number";
pub const CONTACT_SAVED: &str = "Thanks! Your name and phone number have been saved.";
pub const CONTACT_ALREADY_SAVED: &str = "We already have a phone number on file for you.";

/// Command overview appended to registration replies and sent for `/help`.
pub fn command_overview() -> String {
    [
        "You're all set!",
        "",
        "/analytics - usage summary",
        "/dashboard - detailed dashboard image",
        "/help - show this message",
        "",
        "Send any text to chat, or a photo or document to have it described.",
    ]
    .join("\n")
}

/// Reply to `/start` for a newly registered user.
pub fn registration_reply() -> ReplyPayload {
    ReplyPayload::Sequence {
        items: vec![
            ReplyPayload::RequestContact {
                prompt: CONTACT_PROMPT.to_string(),
                button_label: CONTACT_BUTTON.to_string(),
            },
            ReplyPayload::text(command_overview()),
        ],
    }
}

/// Reply to `/start` for a user who already exists.
pub fn already_registered_reply() -> ReplyPayload {
    ReplyPayload::Sequence {
        items: vec![
            ReplyPayload::text(ALREADY_REGISTERED),
            ReplyPayload::text(command_overview()),
        ],
    }
}

pub fn contact_reply(saved: bool) -> ReplyPayload {
    if saved {
        ReplyPayload::text(CONTACT_SAVED)
    } else {
        ReplyPayload::text(CONTACT_ALREADY_SAVED)
    }
}
