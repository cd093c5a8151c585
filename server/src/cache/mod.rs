pub mod memory;
pub mod sqlite;

use crate::ai::MovieResult;
use crate::query_key::QueryKey;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Database operation failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Stored entry is not a movie result: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable mapping from a birth month to its movie result.
///
/// Entries never expire. A second `put` for the same key overwrites the
/// first one.
#[async_trait]
pub trait MovieCache: Send + Sync {
    async fn get(&self, key: &QueryKey) -> Result<Option<MovieResult>, CacheError>;

    async fn put(&self, key: &QueryKey, movie: &MovieResult) -> Result<(), CacheError>;
}
