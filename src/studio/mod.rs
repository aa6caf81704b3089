pub mod backoff;
pub mod controller;
pub mod executor;
pub mod http;

use crate::{
    config::StudioConfig,
    error::Result,
    preparation::ImagePreparer,
    storage::HistoryStore,
    workspace::Workspace,
};
use std::sync::Arc;

pub use backoff::{backoff_delay, cancellable_sleep, RetryPolicy};
pub use controller::GenerationController;
pub use executor::{AttemptError, AttemptExecutor, SimulatedExecutor};
pub use http::HttpExecutor;

/// Wires preparation, the single shared controller and the history store
/// together from one configuration.
#[derive(Clone)]
pub struct StudioClient {
    config: StudioConfig,
    preparer: ImagePreparer,
    controller: Arc<GenerationController>,
    history: HistoryStore,
}

impl StudioClient {
    pub async fn new(config: StudioConfig) -> Result<Self> {
        config.validate()?;
        let executor: Arc<dyn AttemptExecutor> = match &config.generation.endpoint {
            Some(endpoint) => Arc::new(HttpExecutor::new(endpoint.clone())?),
            None => Arc::new(SimulatedExecutor::from_config(&config.generation)),
        };
        Self::with_executor(config, executor).await
    }

    /// Same as `new` but with a caller-supplied executor.
    pub async fn with_executor(
        config: StudioConfig,
        executor: Arc<dyn AttemptExecutor>,
    ) -> Result<Self> {
        config.validate()?;
        let policy = RetryPolicy::new(
            config.generation.max_retries,
            config.generation.backoff_base(),
        );
        let controller = Arc::new(GenerationController::new(executor, policy));
        let history = HistoryStore::from_config(&config.history).await?;

        log::info!(
            "Studio ready ({} executor, {} history backend)",
            controller.executor_name(),
            history.backend().name()
        );

        Ok(Self {
            preparer: ImagePreparer::new(config.preparation.clone()),
            controller,
            history,
            config,
        })
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn preparer(&self) -> &ImagePreparer {
        &self.preparer
    }

    pub fn controller(&self) -> &Arc<GenerationController> {
        &self.controller
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub async fn workspace(&self) -> Workspace {
        Workspace::load(
            self.controller.clone(),
            self.history.clone(),
            self.preparer.clone(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationConfig, HistoryConfig};

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config =
            StudioConfig::new().with_generation(GenerationConfig::new().with_failure_rate(-0.1));
        assert!(StudioClient::new(config).await.is_err());
    }

    #[tokio::test]
    async fn test_picks_executor_from_config() {
        let simulated = StudioClient::new(StudioConfig::new()).await.unwrap();
        assert_eq!(simulated.controller().executor_name(), "simulated");
        assert_eq!(simulated.history().backend().name(), "memory");

        let dir = tempfile::tempdir().unwrap();
        let remote = StudioClient::new(
            StudioConfig::new()
                .with_generation(GenerationConfig::new().with_endpoint("http://127.0.0.1:9"))
                .with_history(HistoryConfig::new().with_storage_dir(dir.path())),
        )
        .await
        .unwrap();
        assert_eq!(remote.controller().executor_name(), "http");
        assert_eq!(remote.history().backend().name(), "file");
    }
}
