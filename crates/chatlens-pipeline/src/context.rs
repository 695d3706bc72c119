//! Explicitly constructed application context.
//!
//! Owns the record store handle, the generation adapter, the classifier and
//! the analytics engine. Built once at startup and passed down; released
//! with `shutdown`.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use chatlens_core::config::ChatlensConfig;
use chatlens_generation::{GenerationAdapter, GenerationService};
use chatlens_insight::{AnalyticsEngine, SentimentClassifier};
use chatlens_storage::RecordStore;

use crate::error::PipelineError;

pub struct AppContext {
    pub config: ChatlensConfig,
    pub store: Arc<dyn RecordStore>,
    pub generator: GenerationAdapter,
    pub classifier: SentimentClassifier,
    pub analytics: AnalyticsEngine,
}

impl AppContext {
    pub fn new(
        config: ChatlensConfig,
        store: Arc<dyn RecordStore>,
        service: Arc<dyn GenerationService>,
    ) -> Result<Self, PipelineError> {
        config
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let classifier = SentimentClassifier::new(config.sentiment.clone())
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        let generator = GenerationAdapter::new(
            service,
            Duration::from_secs(config.generation.timeout_secs),
        );
        let analytics = AnalyticsEngine::new(
            Arc::clone(&store),
            config.analytics.clone(),
            config.dashboard_path(),
        );

        Ok(Self {
            config,
            store,
            generator,
            classifier,
            analytics,
        })
    }

    /// Release the store. Further store calls fail.
    pub async fn shutdown(&self) {
        self.store.close().await;
        info!("Application context shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatlens_generation::{GenerationError, GenerationRequest};
    use chatlens_storage::SqliteRecordStore;

    struct Echo;

    #[async_trait]
    impl GenerationService for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            Ok(request.prompt().to_string())
        }
    }

    #[test]
    fn test_context_uses_configured_timeout() {
        let mut config = ChatlensConfig::default();
        config.generation.timeout_secs = 7;
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());
        let ctx = AppContext::new(config, store, Arc::new(Echo)).unwrap();
        assert_eq!(ctx.generator.timeout(), Duration::from_secs(7));
    }

    #[test]
    fn test_context_rejects_invalid_config() {
        let mut config = ChatlensConfig::default();
        config.generation.timeout_secs = 0;
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());
        let result = AppContext::new(config, store, Arc::new(Echo));
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[tokio::test]
    async fn test_shutdown_closes_store() {
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());
        let ctx = AppContext::new(ChatlensConfig::default(), store.clone(), Arc::new(Echo)).unwrap();
        ctx.shutdown().await;
        assert!(store.database().is_closed());
    }
}
