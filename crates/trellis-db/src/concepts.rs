//! Concept repository implementation.
//!
//! Concept CRUD is owned by the route layer; the discovery subsystem reads
//! concepts and scans coverage. The inherent `insert`/`set_status` helpers
//! exist for seeding and tests.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use trellis_core::{Concept, ConceptRepository, ConceptStatus, Error, Result};

/// PostgreSQL implementation of ConceptRepository.
pub struct PgConceptRepository {
    pool: Pool<Postgres>,
}

impl PgConceptRepository {
    /// Create a new PgConceptRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a concept. Seeding/test helper; route-layer CRUD owns the
    /// user-facing path.
    pub async fn insert(&self, title: &str, content: &str) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO concept (id, title, content, status, created_at, updated_at)
             VALUES ($1, $2, $3, 'active', $4, $4)",
        )
        .bind(id)
        .bind(title)
        .bind(content)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    /// Flip a concept's status. Seeding/test helper.
    pub async fn set_status(&self, id: Uuid, status: ConceptStatus) -> Result<()> {
        sqlx::query("UPDATE concept SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status.to_string())
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

fn concept_from_row(row: &PgRow) -> Concept {
    let status: String = row.get("status");
    Concept {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        // CHECK constraint keeps this parseable; fall back to active on
        // anything unexpected rather than failing a read.
        status: status.parse().unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl ConceptRepository for PgConceptRepository {
    async fn get(&self, id: Uuid) -> Result<Option<Concept>> {
        let row = sqlx::query(
            "SELECT id, title, content, status, created_at, updated_at
             FROM concept
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| concept_from_row(&r)))
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Concept>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, title, content, status, created_at, updated_at
             FROM concept
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(concept_from_row).collect())
    }

    async fn list_active(&self) -> Result<Vec<Concept>> {
        let rows = sqlx::query(
            "SELECT id, title, content, status, created_at, updated_at
             FROM concept
             WHERE status = 'active'
             ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(concept_from_row).collect())
    }

    async fn count_active(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM concept WHERE status = 'active'")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.get("count"))
    }

    async fn missing_embeddings(&self, model: &str, limit: i64) -> Result<Vec<Concept>> {
        let rows = sqlx::query(
            "SELECT c.id, c.title, c.content, c.status, c.created_at, c.updated_at
             FROM concept c
             WHERE c.status = 'active'
               AND NOT EXISTS (
                   SELECT 1 FROM concept_embedding e
                   WHERE e.concept_id = c.id AND e.model = $1
               )
             ORDER BY c.created_at
             LIMIT $2",
        )
        .bind(model)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(concept_from_row).collect())
    }
}
