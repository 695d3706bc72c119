//! Error types for the ingestion pipeline.

use chatlens_core::error::ChatlensError;
use chatlens_insight::InsightError;

/// Failures the pipeline cannot absorb.
///
/// Classification and generation failures never appear here; they are
/// converted into degraded data before persistence.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("store error: {0}")]
    Store(String),
    #[error("aggregation error: {0}")]
    Aggregation(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("config error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Text shown to the end user when this error ends an event.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::Store(_) => {
                "Sorry, your message could not be saved. Please try again later."
            }
            PipelineError::Aggregation(_) => {
                "Sorry, analytics are unavailable right now. Please try again later."
            }
            PipelineError::Transport(_) | PipelineError::Config(_) => {
                "Sorry, something went wrong while handling your message."
            }
        }
    }
}

impl From<ChatlensError> for PipelineError {
    fn from(err: ChatlensError) -> Self {
        match err {
            ChatlensError::Transport(msg) => PipelineError::Transport(msg),
            ChatlensError::Config(msg) => PipelineError::Config(msg),
            other => PipelineError::Store(other.to_string()),
        }
    }
}

impl From<InsightError> for PipelineError {
    fn from(err: InsightError) -> Self {
        PipelineError::Aggregation(err.to_string())
    }
}
