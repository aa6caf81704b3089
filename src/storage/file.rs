use crate::{
    error::{Result, StudioError},
    storage::traits::HistoryBackend,
};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores each key as `<dir>/<key>.json`.
pub struct FileHistoryBackend {
    dir: PathBuf,
}

impl FileHistoryBackend {
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StudioError::StorageError(format!(
                "cannot create history directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StudioError::StorageError(format!(
                "invalid history key '{}'",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl HistoryBackend for FileHistoryBackend {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)?).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StudioError::StorageError(format!(
                "failed to read '{}': {}",
                key, e
            ))),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, value)
            .await
            .map_err(|e| StudioError::StorageError(format!("failed to write '{}': {}", key, e)))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| StudioError::StorageError(format!("failed to commit '{}': {}", key, e)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StudioError::StorageError(format!(
                "failed to delete '{}': {}",
                key, e
            ))),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(tokio::fs::metadata(&self.dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false))
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
