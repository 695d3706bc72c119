use thiserror::Error;

/// Errors raised while aggregating or rendering analytics.
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("render error: {0}")]
    Render(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chatlens_core::ChatlensError> for InsightError {
    fn from(e: chatlens_core::ChatlensError) -> Self {
        InsightError::Storage(e.to_string())
    }
}

impl From<image::ImageError> for InsightError {
    fn from(e: image::ImageError) -> Self {
        InsightError::Render(e.to_string())
    }
}

/// The classifier could not score its input.
///
/// Callers substitute `SentimentLabel::Error`; the fault itself is never
/// shown to end users.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationFault {
    #[error("input contains undecodable characters")]
    InvalidEncoding,
    #[error("input too long: {len} chars (max {max})")]
    InputTooLong { len: usize, max: usize },
    #[error("score is not a finite number")]
    NonFinite,
}
