//! Ingestion pipeline: the per-event state machine.
//!
//! Text events move through `Received -> Classified -> Generated ->
//! Persisted -> Replied`; media events skip classification. Classification
//! and generation failures are absorbed into degraded data. A store
//! failure ends the event with `PipelineError::Store`.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use chatlens_core::events::{InboundEvent, MediaRef, ReplyPayload, SenderProfile};
use chatlens_core::transport::MediaSource;
use chatlens_core::types::{Attachment, ConversationKey, ConversationTurn, SentimentLabel, User};
use chatlens_generation::GenerationRequest;

use crate::commands::Command;
use crate::context::AppContext;
use crate::error::PipelineError;
use crate::response;

/// Processing stages of one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Classified,
    Generated,
    Persisted,
    Replied,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Received => "received",
            Stage::Classified => "classified",
            Stage::Generated => "generated",
            Stage::Persisted => "persisted",
            Stage::Replied => "replied",
        })
    }
}

/// Handles one inbound event at a time; safe to share across tasks.
pub struct IngestionPipeline {
    ctx: Arc<AppContext>,
    media: Arc<dyn MediaSource>,
}

impl IngestionPipeline {
    pub fn new(ctx: Arc<AppContext>, media: Arc<dyn MediaSource>) -> Self {
        Self { ctx, media }
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    /// Process one event to completion and return what to send back.
    pub async fn handle(&self, event: InboundEvent) -> Result<ReplyPayload, PipelineError> {
        let kind = event.kind();
        let key = event.key().clone();
        debug!(key = %key, kind, stage = %Stage::Received, "Event received");

        let result = match event {
            InboundEvent::Text { key, text, sender } => self.handle_text(&key, &text, &sender).await,
            InboundEvent::Media { key, media, sender } => {
                self.handle_media(&key, media, &sender).await
            }
            InboundEvent::Contact { key, phone, sender } => {
                self.handle_contact(&key, &phone, &sender).await
            }
            InboundEvent::Command { key, name, sender } => {
                self.handle_command(&key, &name, &sender).await
            }
        };

        match &result {
            Ok(_) => debug!(key = %key, kind, stage = %Stage::Replied, "Event handled"),
            Err(PipelineError::Store(e)) => error!(key = %key, kind, error = %e, "Store fault"),
            Err(e) => warn!(key = %key, kind, error = %e, "Event failed"),
        }
        result
    }

    async fn handle_text(
        &self,
        key: &ConversationKey,
        text: &str,
        sender: &SenderProfile,
    ) -> Result<ReplyPayload, PipelineError> {
        let sentiment = match self.ctx.classifier.classify(text) {
            Ok(label) => label,
            Err(fault) => {
                warn!(key = %key, error = %fault, "Classification fault, recording Error label");
                SentimentLabel::Error
            }
        };
        debug!(key = %key, stage = %Stage::Classified, sentiment = %sentiment, "Text classified");

        let reply = match self
            .ctx
            .generator
            .generate(GenerationRequest::text(text))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(key = %key, kind = %e.kind(), error = %e, "Generation failed, using fallback reply");
                self.ctx.config.pipeline.fallback_reply.clone()
            }
        };
        debug!(key = %key, stage = %Stage::Generated, "Generation finished");

        self.ensure_user(key, sender).await?;
        let turn = ConversationTurn::new(key.clone(), text, reply.clone(), sentiment);
        self.ctx.store.insert_turn(&turn).await?;
        debug!(key = %key, stage = %Stage::Persisted, turn_id = %turn.id, "Turn stored");

        Ok(ReplyPayload::text(reply))
    }

    async fn handle_media(
        &self,
        key: &ConversationKey,
        media: Option<MediaRef>,
        sender: &SenderProfile,
    ) -> Result<ReplyPayload, PipelineError> {
        let Some(media) = media else {
            debug!(key = %key, "No processable media, nothing to do");
            return Ok(ReplyPayload::Nothing);
        };

        let notice = &self.ctx.config.pipeline.media_failure_notice;
        let description = match self.media.download(&media).await {
            Ok(bytes) => {
                let request = GenerationRequest::multimodal(
                    self.ctx.config.generation.media_prompt.clone(),
                    bytes,
                    media.media_type.clone(),
                );
                match self.ctx.generator.generate(request).await {
                    Ok(description) => description,
                    Err(e) => {
                        warn!(key = %key, kind = %e.kind(), error = %e, "Media analysis failed");
                        notice.clone()
                    }
                }
            }
            Err(e) => {
                warn!(key = %key, file_ref = %media.file_ref, error = %e, "Media download failed");
                notice.clone()
            }
        };
        debug!(key = %key, stage = %Stage::Generated, "Generation finished");

        self.ensure_user(key, sender).await?;
        let attachment = Attachment::new(
            key.clone(),
            media.file_ref,
            media.media_type,
            description.clone(),
        );
        self.ctx.store.insert_attachment(&attachment).await?;
        debug!(key = %key, stage = %Stage::Persisted, attachment_id = %attachment.id, "Attachment stored");

        Ok(ReplyPayload::text(description))
    }

    async fn handle_contact(
        &self,
        key: &ConversationKey,
        phone: &str,
        sender: &SenderProfile,
    ) -> Result<ReplyPayload, PipelineError> {
        self.ensure_user(key, sender).await?;
        let saved = self.ctx.store.update_user_phone(key, phone).await?;
        if saved {
            info!(key = %key, "Phone number saved");
        } else {
            debug!(key = %key, "Phone number already on file");
        }
        Ok(response::contact_reply(saved))
    }

    async fn handle_command(
        &self,
        key: &ConversationKey,
        name: &str,
        sender: &SenderProfile,
    ) -> Result<ReplyPayload, PipelineError> {
        let command = Command::parse(name);
        debug!(key = %key, command = %command, "Routing command");

        match command {
            Command::Start => {
                if self.ensure_user(key, sender).await? {
                    Ok(response::registration_reply())
                } else {
                    Ok(response::already_registered_reply())
                }
            }
            Command::Analytics => {
                let summary = self.ctx.analytics.summarize().await?;
                Ok(ReplyPayload::text(summary.to_text()))
            }
            Command::Dashboard => {
                let artifact = self.ctx.analytics.render_dashboard().await?;
                Ok(ReplyPayload::Photo {
                    path: artifact.path,
                    caption: response::DASHBOARD_CAPTION.to_string(),
                })
            }
            Command::Help | Command::Unknown(_) => Ok(ReplyPayload::text(response::command_overview())),
        }
    }

    /// Create the user for `key` unless one exists. Returns `true` when a
    /// new user was registered.
    async fn ensure_user(
        &self,
        key: &ConversationKey,
        sender: &SenderProfile,
    ) -> Result<bool, PipelineError> {
        if self.ctx.store.find_user_by_key(key).await?.is_some() {
            return Ok(false);
        }
        let user = User::new(key.clone(), sender.display_name.clone(), sender.handle.clone());
        let created = self.ctx.store.insert_user(&user).await?;
        if created {
            info!(key = %key, "Registered user");
        }
        Ok(created)
    }
}
