use super::{CacheError, MovieCache};
use crate::ai::MovieResult;
use crate::query_key::QueryKey;
use async_trait::async_trait;
use moka::future::Cache;

/// In-process store for running without a database file.
///
/// Built without capacity or TTL bounds so entries are kept for the life of
/// the process. Values are held serialized, the same way the SQLite store
/// keeps them.
#[derive(Clone)]
pub struct MemoryMovieCache {
    entries: Cache<String, String>,
}

impl MemoryMovieCache {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().build(),
        }
    }
}

impl Default for MemoryMovieCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MovieCache for MemoryMovieCache {
    async fn get(&self, key: &QueryKey) -> Result<Option<MovieResult>, CacheError> {
        match self.entries.get(&key.as_cache_key()).await {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &QueryKey, movie: &MovieResult) -> Result<(), CacheError> {
        let raw = serde_json::to_string(movie)?;
        self.entries.insert(key.as_cache_key(), raw).await;
        Ok(())
    }
}
