pub mod file;
pub mod memory;
pub mod traits;

use crate::{config::HistoryConfig, error::Result, models::GenerationResult};
use std::sync::Arc;
use tokio::sync::Mutex;

pub use file::FileHistoryBackend;
pub use memory::MemoryHistoryBackend;
pub use traits::HistoryBackend;

/// Bounded, newest-first list of past generations.
///
/// Reads never fail: missing or corrupt data is an empty history. Write
/// failures are logged and the returned list is the intended new state.
#[derive(Clone)]
pub struct HistoryStore {
    backend: Arc<dyn HistoryBackend>,
    namespace: String,
    capacity: usize,
    write_lock: Arc<Mutex<()>>,
}

impl HistoryStore {
    pub fn new(backend: Arc<dyn HistoryBackend>, config: &HistoryConfig) -> Self {
        Self {
            backend,
            namespace: config.namespace.clone(),
            capacity: config.capacity.max(1),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_memory(config: &HistoryConfig) -> Self {
        Self::new(Arc::new(MemoryHistoryBackend::new()), config)
    }

    /// File backed when the config names a directory, in-memory otherwise.
    pub async fn from_config(config: &HistoryConfig) -> Result<Self> {
        let backend: Arc<dyn HistoryBackend> = match &config.storage_dir {
            Some(dir) => Arc::new(FileHistoryBackend::new(dir).await?),
            None => Arc::new(MemoryHistoryBackend::new()),
        };
        log::debug!(
            "History store '{}' using {} backend",
            config.namespace,
            backend.name()
        );
        let store = Self::new(backend, config);
        store.health_check().await;
        Ok(store)
    }

    /// Probes the backend. An unhealthy backend is logged, not fatal: reads
    /// degrade to an empty history and writes are logged.
    pub async fn health_check(&self) -> bool {
        match self.backend.health_check().await {
            Ok(true) => true,
            Ok(false) => {
                log::warn!(
                    "⚠️  {} history backend is not healthy, history may not persist",
                    self.backend.name()
                );
                false
            }
            Err(e) => {
                log::warn!(
                    "⚠️  {} history backend health check failed: {}",
                    self.backend.name(),
                    e
                );
                false
            }
        }
    }

    pub fn backend(&self) -> &Arc<dyn HistoryBackend> {
        &self.backend
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn list(&self) -> Vec<GenerationResult> {
        let stored = match self.backend.read(&self.namespace).await {
            Ok(Some(stored)) => stored,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::error!("Failed to read generation history: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<GenerationResult>>(&stored) {
            Ok(mut entries) => {
                entries.truncate(self.capacity);
                entries
            }
            Err(e) => {
                log::warn!("Discarding unreadable generation history: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn get(&self, id: &str) -> Option<GenerationResult> {
        self.list().await.into_iter().find(|entry| entry.id == id)
    }

    pub async fn append(&self, result: GenerationResult) -> Vec<GenerationResult> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.list().await;
        entries.retain(|entry| entry.id != result.id);
        entries.insert(0, result);
        entries.truncate(self.capacity);
        self.persist(&entries).await;
        entries
    }

    pub async fn remove(&self, id: &str) -> Vec<GenerationResult> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.list().await;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() != before {
            self.persist(&entries).await;
        }
        entries
    }

    pub async fn clear(&self) -> Vec<GenerationResult> {
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self.backend.delete(&self.namespace).await {
            log::error!("Failed to clear generation history: {}", e);
        }
        Vec::new()
    }

    async fn persist(&self, entries: &[GenerationResult]) {
        let serialized = match serde_json::to_string(entries) {
            Ok(serialized) => serialized,
            Err(e) => {
                log::error!("Failed to serialize generation history: {}", e);
                return;
            }
        };
        if let Err(e) = self.backend.write(&self.namespace, &serialized).await {
            log::error!("Failed to save generation history: {}", e);
        }
    }
}
