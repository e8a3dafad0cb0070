//! LLM response cache repository implementation.
//!
//! Rows are matched at read time by embedding similarity, never deduplicated
//! at write time. Ranking runs in SQL; threshold decisions stay with the
//! semantic cache component.

use async_trait::async_trait;
use chrono::Utc;
use pgvector::Vector;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use trellis_core::{CacheMatch, Error, LlmCacheEntry, ResponseCacheRepository, Result};

/// PostgreSQL implementation of ResponseCacheRepository.
pub struct PgResponseCacheRepository {
    pool: Pool<Postgres>,
}

impl PgResponseCacheRepository {
    /// Create a new PgResponseCacheRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn entry_from_row(row: &PgRow) -> LlmCacheEntry {
    LlmCacheEntry {
        id: row.get("id"),
        query_embedding: row.get("query_embedding"),
        provider: row.get("provider"),
        model: row.get("model"),
        response: row.get("response"),
        created_at: row.get("created_at"),
        last_used_at: row.get("last_used_at"),
    }
}

#[async_trait]
impl ResponseCacheRepository for PgResponseCacheRepository {
    async fn best_match(
        &self,
        provider: &str,
        model: &str,
        query: &Vector,
    ) -> Result<Option<CacheMatch>> {
        let row = sqlx::query(
            "SELECT id, query_embedding, provider, model, response, created_at, last_used_at,
                    1.0 - (query_embedding <=> $3::vector) AS similarity
             FROM llm_response_cache
             WHERE provider = $1 AND model = $2
             ORDER BY query_embedding <=> $3::vector
             LIMIT 1",
        )
        .bind(provider)
        .bind(model)
        .bind(query)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| CacheMatch {
            similarity: r.get::<f64, _>("similarity") as f32,
            entry: entry_from_row(&r),
        }))
    }

    async fn insert(
        &self,
        query_embedding: &Vector,
        provider: &str,
        model: &str,
        response: &serde_json::Value,
    ) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO llm_response_cache
                 (id, query_embedding, provider, model, response, created_at, last_used_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)",
        )
        .bind(id)
        .bind(query_embedding)
        .bind(provider)
        .bind(model)
        .bind(response)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn touch(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE llm_response_cache SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn clear(&self, provider: Option<&str>, model: Option<&str>) -> Result<i64> {
        let result = match (provider, model) {
            (Some(p), Some(m)) => {
                sqlx::query("DELETE FROM llm_response_cache WHERE provider = $1 AND model = $2")
                    .bind(p)
                    .bind(m)
                    .execute(&self.pool)
                    .await
            }
            (Some(p), None) => {
                sqlx::query("DELETE FROM llm_response_cache WHERE provider = $1")
                    .bind(p)
                    .execute(&self.pool)
                    .await
            }
            (None, None) => {
                sqlx::query("DELETE FROM llm_response_cache")
                    .execute(&self.pool)
                    .await
            }
            (None, Some(_)) => {
                return Err(Error::InvalidInput(
                    "cache clear by model requires a provider".to_string(),
                ))
            }
        }
        .map_err(Error::Database)?;

        Ok(result.rows_affected() as i64)
    }

    async fn count(&self, provider: Option<&str>) -> Result<i64> {
        let row = match provider {
            Some(p) => {
                sqlx::query("SELECT COUNT(*) AS count FROM llm_response_cache WHERE provider = $1")
                    .bind(p)
                    .fetch_one(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT COUNT(*) AS count FROM llm_response_cache")
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(Error::Database)?;

        Ok(row.get("count"))
    }
}
