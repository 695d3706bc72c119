//! Timeout-bounded access to a generation service.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::request::GenerationRequest;

/// An external text or multimodal reasoning service.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Wraps a `GenerationService` with an upper bound on call latency.
///
/// A single attempt is made per call. When the bound expires the in-flight
/// request future is dropped and `GenerationError::Timeout` is returned.
#[derive(Clone)]
pub struct GenerationAdapter {
    service: Arc<dyn GenerationService>,
    timeout: Duration,
}

impl GenerationAdapter {
    pub fn new(service: Arc<dyn GenerationService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.service.generate(&request)).await;

        match outcome {
            Ok(Ok(text)) => {
                debug!(
                    service = self.service.name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    reply_chars = text.chars().count(),
                    "Generation succeeded"
                );
                Ok(text)
            }
            Ok(Err(e)) => {
                warn!(service = self.service.name(), kind = %e.kind(), error = %e, "Generation failed");
                Err(e)
            }
            Err(_) => {
                warn!(
                    service = self.service.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Generation timed out"
                );
                Err(GenerationError::Timeout(self.timeout))
            }
        }
    }
}

impl std::fmt::Debug for GenerationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationAdapter")
            .field("service", &self.service.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}
