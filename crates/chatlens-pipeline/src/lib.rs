//! Ingestion pipeline for chatlens.
//!
//! Turns inbound transport events into persisted records and replies,
//! degrading gracefully when classification or generation fail, and
//! dispatches events so each conversation is processed strictly in order.

pub mod commands;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod orchestrator;
pub mod response;

pub use commands::Command;
pub use context::AppContext;
pub use dispatcher::ConversationDispatcher;
pub use error::PipelineError;
pub use orchestrator::{IngestionPipeline, Stage};
