use crate::{error::Result, storage::traits::HistoryBackend};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
pub struct MemoryHistoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryHistoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> T {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut entries)
    }
}

#[async_trait]
impl HistoryBackend for MemoryHistoryBackend {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.with_entries(|entries| entries.get(key).cloned()))
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.with_entries(|entries| entries.insert(key.to_string(), value.to_string()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.with_entries(|entries| entries.remove(key));
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
