use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use roadwatch_application::RecordCache;
use roadwatch_core::{AppError, AppResult};
use tracing::debug;

/// File-backed cache storing each collection as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileRecordCache {
    directory: PathBuf,
}

impl JsonFileRecordCache {
    /// Creates a cache rooted at `directory`; the directory is created on first
    /// write.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.directory.as_path()
    }

    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        let is_safe = !key.is_empty()
            && key
                .chars()
                .all(|character| character.is_ascii_alphanumeric() || matches!(character, '-' | '_'));
        if !is_safe {
            return Err(AppError::Validation(format!(
                "cache key '{key}' may only contain ASCII letters, digits, '-' and '_'"
            )));
        }

        Ok(self.directory.join(format!("{key}.json")))
    }
}

#[async_trait]
impl RecordCache for JsonFileRecordCache {
    async fn load(&self, key: &str) -> AppResult<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(encoded) => Ok(Some(encoded)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(AppError::Internal(format!(
                "failed to read cache file '{}': {error}",
                path.display()
            ))),
        }
    }

    async fn store(&self, key: &str, encoded: String) -> AppResult<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to create cache directory '{}': {error}",
                    self.directory.display()
                ))
            })?;

        // Write beside the target, then rename over it.
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, encoded.as_bytes())
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to write cache file '{}': {error}",
                    staging.display()
                ))
            })?;
        tokio::fs::rename(&staging, &path).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to replace cache file '{}': {error}",
                path.display()
            ))
        })?;

        debug!(cache_key = key, bytes = encoded.len(), "record cache written");
        Ok(())
    }
}
