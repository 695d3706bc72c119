use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// A failed generation call. Always recoverable by the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("generation service failure: {0}")]
    ServiceFailure(String),
    #[error("invalid generation response: {0}")]
    InvalidResponse(String),
}

/// Coarse failure category, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    Timeout,
    ServiceFailure,
    InvalidResponse,
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GenerationErrorKind::Timeout => "timeout",
            GenerationErrorKind::ServiceFailure => "service_failure",
            GenerationErrorKind::InvalidResponse => "invalid_response",
        })
    }
}

impl GenerationError {
    pub fn kind(&self) -> GenerationErrorKind {
        match self {
            GenerationError::Timeout(_) => GenerationErrorKind::Timeout,
            GenerationError::ServiceFailure(_) => GenerationErrorKind::ServiceFailure,
            GenerationError::InvalidResponse(_) => GenerationErrorKind::InvalidResponse,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GenerationError::InvalidResponse(e.to_string())
        } else {
            GenerationError::ServiceFailure(e.to_string())
        }
    }
}
