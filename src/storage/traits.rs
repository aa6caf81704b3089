use crate::error::Result;
use async_trait::async_trait;

/// Key-value persistence behind the generation history.
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>>;

    async fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn health_check(&self) -> Result<bool>;

    fn name(&self) -> &'static str;
}
