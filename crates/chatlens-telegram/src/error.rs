use chatlens_core::error::ChatlensError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error(transparent)]
    Api(#[from] teloxide::RequestError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("file download failed: HTTP {status}")]
    Download { status: u16 },

    #[error("conversation key {0:?} is not a Telegram chat id")]
    InvalidChatId(String),
}

impl From<TelegramError> for ChatlensError {
    fn from(err: TelegramError) -> Self {
        ChatlensError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TelegramError>;
