use std::collections::HashMap;

use async_trait::async_trait;
use roadwatch_application::RecordCache;
use roadwatch_core::AppResult;
use tokio::sync::RwLock;

/// Process-local record cache. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryRecordCache {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryRecordCache {
    /// Creates an empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordCache for InMemoryRecordCache {
    async fn load(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn store(&self, key: &str, encoded: String) -> AppResult<()> {
        self.entries.write().await.insert(key.to_owned(), encoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use roadwatch_application::RecordCache;

    use super::InMemoryRecordCache;

    #[tokio::test]
    async fn keys_are_independent() {
        let cache = InMemoryRecordCache::new();
        assert!(cache.store("users", "[1]".to_owned()).await.is_ok());
        assert!(cache.store("assets", "[2]".to_owned()).await.is_ok());
        assert!(cache.store("users", "[3]".to_owned()).await.is_ok());

        assert_eq!(cache.load("users").await.ok().flatten().as_deref(), Some("[3]"));
        assert_eq!(cache.load("assets").await.ok().flatten().as_deref(), Some("[2]"));
        assert_eq!(cache.load("roads").await.ok(), Some(None));
    }
}
