//! Media download through the Bot API file endpoint.

use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::debug;

use chatlens_core::error::Result as CoreResult;
use chatlens_core::events::MediaRef;
use chatlens_core::transport::MediaSource;

use crate::error::{Result, TelegramError};

/// Resolves a Telegram file id to bytes: `getFile`, then a GET on
/// `<api>/file/bot<token>/<file_path>`.
#[derive(Clone)]
pub struct TelegramMediaSource {
    bot: Bot,
    client: reqwest::Client,
}

impl TelegramMediaSource {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            client: reqwest::Client::new(),
        }
    }

    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self.bot.get_file(file_id).await?;

        let mut url = self.bot.api_url();
        url.set_path(&format!("file/bot{}/{}", self.bot.token(), file.path));

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(TelegramError::Download {
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().await?.to_vec();
        debug!(file_id, size = bytes.len(), "Downloaded telegram file");
        Ok(bytes)
    }
}

#[async_trait]
impl MediaSource for TelegramMediaSource {
    async fn download(&self, media: &MediaRef) -> CoreResult<Vec<u8>> {
        Ok(self.fetch(&media.file_ref).await?)
    }
}
