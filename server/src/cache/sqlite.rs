use super::{CacheError, MovieCache};
use crate::ai::MovieResult;
use crate::query_key::QueryKey;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

pub struct SqliteMovieCache {
    pool: SqlitePool,
}

impl SqliteMovieCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_tables(&self) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS movie_cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count(&self) -> Result<i64, CacheError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movie_cache")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl MovieCache for SqliteMovieCache {
    async fn get(&self, key: &QueryKey) -> Result<Option<MovieResult>, CacheError> {
        let row = sqlx::query("SELECT value FROM movie_cache WHERE key = $1")
            .bind(key.as_cache_key())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("value")?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &QueryKey, movie: &MovieResult) -> Result<(), CacheError> {
        let raw = serde_json::to_string(movie)?;

        sqlx::query(
            r#"
            INSERT INTO movie_cache (key, value, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                created_at = excluded.created_at
            "#,
        )
        .bind(key.as_cache_key())
        .bind(raw)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
