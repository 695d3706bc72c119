//! Rendering `ReplyPayload`s as Telegram messages.

use async_trait::async_trait;
use teloxide::payloads::{SendMessageSetters, SendPhotoSetters};
use teloxide::prelude::*;
use teloxide::types::{ButtonRequest, InputFile, KeyboardButton, KeyboardMarkup};
use tracing::debug;

use chatlens_core::error::Result as CoreResult;
use chatlens_core::events::ReplyPayload;
use chatlens_core::transport::ReplySink;
use chatlens_core::types::ConversationKey;

use crate::error::{Result, TelegramError};

/// Bot API limit for one text message.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

/// Outbound message sender for Telegram.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn send(&self, chat_id: ChatId, reply: ReplyPayload) -> Result<()> {
        // Sequences are flattened iteratively so nesting depth is unbounded.
        let mut queue = vec![reply];
        while let Some(item) = queue.pop() {
            match item {
                ReplyPayload::Text { text } => {
                    for chunk in chunk_message(&text, TELEGRAM_MAX_MESSAGE_LEN) {
                        self.bot.send_message(chat_id, chunk).await?;
                    }
                }
                ReplyPayload::Photo { path, caption } => {
                    debug!(chat_id = chat_id.0, path = %path.display(), "Sending photo");
                    self.bot
                        .send_photo(chat_id, InputFile::file(path))
                        .caption(caption)
                        .await?;
                }
                ReplyPayload::RequestContact {
                    prompt,
                    button_label,
                } => {
                    let keyboard = KeyboardMarkup::new(vec![vec![
                        KeyboardButton::new(button_label).request(ButtonRequest::Contact),
                    ]]);
                    self.bot
                        .send_message(chat_id, prompt)
                        .reply_markup(keyboard)
                        .await?;
                }
                ReplyPayload::Sequence { items } => queue.extend(items.into_iter().rev()),
                ReplyPayload::Nothing => {}
            }
        }
        Ok(())
    }
}

/// Largest char boundary in `text` that is `<= max`.
fn floor_char_boundary(text: &str, max: usize) -> usize {
    if max >= text.len() {
        return text.len();
    }
    (0..=max).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0)
}

/// Split text into chunks of at most `max_len` bytes, preferring to break
/// at a newline, then a space, and never inside a character. Empty text
/// yields no chunks.
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    if max_len == 0 {
        return chunks;
    }

    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut window = floor_char_boundary(remaining, max_len);
        if window == 0 {
            window = remaining.chars().next().map_or(remaining.len(), char::len_utf8);
        }

        let slice = &remaining[..window];
        let split_at = match slice.rfind('\n').or_else(|| slice.rfind(' ')) {
            Some(0) | None => window,
            Some(i) => i,
        };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start_matches('\n');
        remaining = remaining.strip_prefix(' ').unwrap_or(remaining);
    }
    chunks
}

fn chat_id(key: &ConversationKey) -> Result<ChatId> {
    key.as_str()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| TelegramError::InvalidChatId(key.as_str().to_string()))
}

#[async_trait]
impl ReplySink for TelegramOutbound {
    async fn deliver(&self, key: &ConversationKey, reply: ReplyPayload) -> CoreResult<()> {
        let chat_id = chat_id(key)?;
        Ok(self.send(chat_id, reply).await?)
    }

    async fn deliver_failure(&self, key: &ConversationKey, reason: &str) -> CoreResult<()> {
        let chat_id = chat_id(key)?;
        Ok(self.send(chat_id, ReplyPayload::text(reason)).await?)
    }
}
