//! Bot setup and the long-polling loop.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, Secret};
use teloxide::payloads::GetUpdatesSetters;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, BotCommand, UpdateKind};
use teloxide::{ApiError, RequestError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use chatlens_core::config::TelegramConfig;
use chatlens_pipeline::ConversationDispatcher;

use crate::error::Result;
use crate::handlers;
use crate::media::TelegramMediaSource;
use crate::outbound::TelegramOutbound;

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// A connected bot: media source, reply sink and update loop share one
/// client.
pub struct TelegramTransport {
    bot: Bot,
    poll_timeout_secs: u32,
}

impl TelegramTransport {
    /// Verify the token, clear any webhook and register the command list.
    pub async fn connect(token: Secret<String>, config: &TelegramConfig) -> Result<Self> {
        // The HTTP timeout must outlast the long-poll timeout.
        let client = teloxide::net::default_reqwest_settings()
            .timeout(Duration::from_secs(u64::from(config.poll_timeout_secs) + 15))
            .build()?;
        let bot = Bot::with_client(token.expose_secret(), client);

        let me = bot.get_me().await?;
        bot.delete_webhook().send().await?;

        let commands = vec![
            BotCommand::new("start", "Register and share your contact"),
            BotCommand::new("analytics", "Usage summary"),
            BotCommand::new("dashboard", "Detailed dashboard image"),
            BotCommand::new("help", "Show available commands"),
        ];
        if let Err(e) = bot.set_my_commands(commands).await {
            warn!(error = %e, "Failed to register bot commands");
        }

        info!(username = ?me.username, "Telegram bot connected");
        Ok(Self {
            bot,
            poll_timeout_secs: config.poll_timeout_secs,
        })
    }

    pub fn media_source(&self) -> TelegramMediaSource {
        TelegramMediaSource::new(self.bot.clone())
    }

    pub fn outbound(&self) -> TelegramOutbound {
        TelegramOutbound::new(self.bot.clone())
    }

    /// Spawn the update loop. It runs until the returned token is cancelled
    /// or another instance takes over the token.
    pub fn start_polling(
        &self,
        dispatcher: Arc<ConversationDispatcher>,
    ) -> (CancellationToken, JoinHandle<()>) {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_updates(
            self.bot.clone(),
            self.poll_timeout_secs,
            dispatcher,
            cancel.clone(),
        ));
        (cancel, handle)
    }
}

async fn poll_updates(
    bot: Bot,
    poll_timeout_secs: u32,
    dispatcher: Arc<ConversationDispatcher>,
    cancel: CancellationToken,
) {
    info!("Starting telegram polling loop");
    let mut offset: i32 = 0;

    loop {
        let request = bot
            .get_updates()
            .offset(offset)
            .timeout(poll_timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message]);

        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = request.send() => result,
        };

        match result {
            Ok(updates) => {
                for update in updates {
                    offset = update.id.as_offset();
                    let UpdateKind::Message(msg) = update.kind else {
                        debug!("Ignoring non-message update");
                        continue;
                    };
                    let Some(event) = handlers::to_inbound_event(&msg) else {
                        debug!(chat_id = msg.chat.id.0, "Ignoring service message");
                        continue;
                    };
                    if let Err(e) = dispatcher.dispatch(event) {
                        error!(chat_id = msg.chat.id.0, error = %e, "Failed to dispatch event");
                    }
                }
            }
            Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                warn!("Another bot instance is polling with this token, stopping");
                cancel.cancel();
                break;
            }
            Err(e) => {
                warn!(error = %e, "getUpdates failed");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => {}
                }
            }
        }
    }
    info!("Telegram polling stopped");
}
