//! Capabilities the core consumes from a chat transport.

use async_trait::async_trait;

use crate::error::Result;
use crate::events::{MediaRef, ReplyPayload};
use crate::types::ConversationKey;

/// "Download binary by reference" capability used by the media path.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>>;
}

/// Delivers pipeline output back to a conversation.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Deliver a successful (possibly degraded) reply.
    async fn deliver(&self, key: &ConversationKey, reply: ReplyPayload) -> Result<()>;

    /// Report that an event could not be processed at all.
    async fn deliver_failure(&self, key: &ConversationKey, reason: &str) -> Result<()>;
}
