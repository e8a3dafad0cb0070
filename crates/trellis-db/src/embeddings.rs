//! Concept embedding repository implementation.
//!
//! Rows are written only by the embedding orchestrator; everything else
//! reads. The UNIQUE (concept_id, model) constraint backs the upsert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use trellis_core::{ConceptEmbedding, ConceptEmbeddingRepository, Error, Result};

/// PostgreSQL implementation of ConceptEmbeddingRepository.
pub struct PgConceptEmbeddingRepository {
    pool: Pool<Postgres>,
}

impl PgConceptEmbeddingRepository {
    /// Create a new PgConceptEmbeddingRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn embedding_from_row(row: &PgRow) -> ConceptEmbedding {
    ConceptEmbedding {
        id: row.get("id"),
        concept_id: row.get("concept_id"),
        model: row.get("model"),
        vector: row.get("embedding"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl ConceptEmbeddingRepository for PgConceptEmbeddingRepository {
    async fn get(&self, concept_id: Uuid, model: &str) -> Result<Option<ConceptEmbedding>> {
        let row = sqlx::query(
            "SELECT id, concept_id, model, embedding, created_at, updated_at
             FROM concept_embedding
             WHERE concept_id = $1 AND model = $2",
        )
        .bind(concept_id)
        .bind(model)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| embedding_from_row(&r)))
    }

    async fn upsert(&self, concept_id: Uuid, vector: &Vector, model: &str) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO concept_embedding (id, concept_id, model, embedding, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             ON CONFLICT (concept_id, model)
             DO UPDATE SET embedding = EXCLUDED.embedding, updated_at = EXCLUDED.updated_at",
        )
        .bind(Uuid::now_v7())
        .bind(concept_id)
        .bind(model)
        .bind(vector)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn remove(&self, concept_id: Uuid, model: &str) -> Result<()> {
        sqlx::query("DELETE FROM concept_embedding WHERE concept_id = $1 AND model = $2")
            .bind(concept_id)
            .bind(model)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn list_for_model(&self, model: &str) -> Result<Vec<ConceptEmbedding>> {
        let rows = sqlx::query(
            "SELECT id, concept_id, model, embedding, created_at, updated_at
             FROM concept_embedding
             WHERE model = $1
             ORDER BY concept_id",
        )
        .bind(model)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(embedding_from_row).collect())
    }

    async fn count_for_model(&self, model: &str) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count
             FROM concept_embedding e
             JOIN concept c ON c.id = e.concept_id
             WHERE e.model = $1 AND c.status = 'active'",
        )
        .bind(model)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("count"))
    }

    async fn last_updated(&self, model: &str) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            "SELECT MAX(updated_at) AS last_updated
             FROM concept_embedding
             WHERE model = $1",
        )
        .bind(model)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("last_updated"))
    }
}
