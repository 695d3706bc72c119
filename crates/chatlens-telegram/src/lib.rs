//! Telegram transport for chatlens.
//!
//! Long-polls the Bot API with teloxide, maps each message to an
//! `InboundEvent` for the dispatcher, downloads media for the pipeline and
//! renders `ReplyPayload`s back into Telegram messages.

pub mod bot;
pub mod error;
pub mod handlers;
pub mod media;
pub mod outbound;

pub use bot::TelegramTransport;
pub use error::TelegramError;
pub use media::TelegramMediaSource;
pub use outbound::TelegramOutbound;
