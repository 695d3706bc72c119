pub mod config;
pub mod error;
pub mod events;
pub mod transport;
pub mod types;

pub use config::ChatlensConfig;
pub use error::{ChatlensError, Result};
pub use events::{InboundEvent, MediaRef, ReplyPayload, SenderProfile};
pub use transport::{MediaSource, ReplySink};
pub use types::*;
