//! Link and link-name repository implementations.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use trellis_core::{Error, Link, LinkName, LinkNameRepository, LinkRepository, Result};

/// PostgreSQL implementation of LinkRepository.
pub struct PgLinkRepository {
    pool: Pool<Postgres>,
}

impl PgLinkRepository {
    /// Create a new PgLinkRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn link_from_row(row: &PgRow) -> Link {
    Link {
        id: row.get("id"),
        source_id: row.get("source_id"),
        target_id: row.get("target_id"),
        link_name_id: row.get("link_name_id"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(
        &self,
        source_id: Uuid,
        target_id: Uuid,
        link_name_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Uuid> {
        let now = Utc::now();

        // The ordered pair is unique; a repeat create updates in place and
        // RETURNING hands back the surviving row's id.
        let row = sqlx::query(
            "INSERT INTO link (id, source_id, target_id, link_name_id, notes, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             ON CONFLICT (source_id, target_id)
             DO UPDATE SET link_name_id = EXCLUDED.link_name_id,
                           notes = EXCLUDED.notes,
                           updated_at = EXCLUDED.updated_at
             RETURNING id",
        )
        .bind(Uuid::now_v7())
        .bind(source_id)
        .bind(target_id)
        .bind(link_name_id)
        .bind(notes)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("id"))
    }

    async fn get_for_concept(&self, concept_id: Uuid) -> Result<Vec<Link>> {
        let rows = sqlx::query(
            "SELECT id, source_id, target_id, link_name_id, notes, created_at, updated_at
             FROM link
             WHERE source_id = $1 OR target_id = $1
             ORDER BY created_at",
        )
        .bind(concept_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(link_from_row).collect())
    }

    async fn linked_concept_ids(&self, concept_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT DISTINCT
                 CASE WHEN source_id = $1 THEN target_id ELSE source_id END AS concept_id
             FROM link
             WHERE source_id = $1 OR target_id = $1",
        )
        .bind(concept_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(|r| r.get("concept_id")).collect())
    }
}

/// PostgreSQL implementation of LinkNameRepository.
pub struct PgLinkNameRepository {
    pool: Pool<Postgres>,
}

impl PgLinkNameRepository {
    /// Create a new PgLinkNameRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a link name. Seeding/test helper.
    pub async fn insert(
        &self,
        forward_name: &str,
        reverse_name: &str,
        is_symmetric: bool,
        is_default: bool,
    ) -> Result<Uuid> {
        let id = Uuid::now_v7();

        sqlx::query(
            "INSERT INTO link_name (id, forward_name, reverse_name, is_symmetric, is_default, is_deleted, created_at)
             VALUES ($1, $2, $3, $4, $5, FALSE, $6)",
        )
        .bind(id)
        .bind(forward_name)
        .bind(reverse_name)
        .bind(is_symmetric)
        .bind(is_default)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }
}

fn link_name_from_row(row: &PgRow) -> LinkName {
    LinkName {
        id: row.get("id"),
        forward_name: row.get("forward_name"),
        reverse_name: row.get("reverse_name"),
        is_symmetric: row.get("is_symmetric"),
        is_default: row.get("is_default"),
        is_deleted: row.get("is_deleted"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl LinkNameRepository for PgLinkNameRepository {
    async fn get_default(&self) -> Result<LinkName> {
        let row = sqlx::query(
            "SELECT id, forward_name, reverse_name, is_symmetric, is_default, is_deleted, created_at
             FROM link_name
             WHERE is_default = TRUE AND is_deleted = FALSE
             ORDER BY created_at
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(|r| link_name_from_row(&r))
            .ok_or_else(|| Error::NotFound("default link name".to_string()))
    }

    async fn get_by_forward_name(&self, forward_name: &str) -> Result<Option<LinkName>> {
        let row = sqlx::query(
            "SELECT id, forward_name, reverse_name, is_symmetric, is_default, is_deleted, created_at
             FROM link_name
             WHERE forward_name = $1",
        )
        .bind(forward_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| link_name_from_row(&r)))
    }

    async fn list_active(&self) -> Result<Vec<LinkName>> {
        let rows = sqlx::query(
            "SELECT id, forward_name, reverse_name, is_symmetric, is_default, is_deleted, created_at
             FROM link_name
             WHERE is_deleted = FALSE
             ORDER BY forward_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(link_name_from_row).collect())
    }

    async fn soft_delete(&self, id: Uuid, replacement: Option<Uuid>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let name = sqlx::query(
            "SELECT id, forward_name, reverse_name, is_symmetric, is_default, is_deleted, created_at
             FROM link_name
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .map(|r| link_name_from_row(&r))
        .ok_or_else(|| Error::NotFound(format!("link name {}", id)))?;

        let in_use = sqlx::query("SELECT COUNT(*) AS count FROM link WHERE link_name_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?
            .get::<i64, _>("count")
            > 0;

        if name.is_default && in_use {
            let replacement_id = replacement.ok_or_else(|| {
                Error::InvalidInput(
                    "default link name is in use; supply a replacement".to_string(),
                )
            })?;

            let replacement_ok = sqlx::query(
                "SELECT 1 AS present FROM link_name WHERE id = $1 AND is_deleted = FALSE",
            )
            .bind(replacement_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?
            .is_some();

            if !replacement_ok {
                return Err(Error::InvalidInput(format!(
                    "replacement link name {} does not exist or is deleted",
                    replacement_id
                )));
            }

            sqlx::query("UPDATE link SET link_name_id = $2, updated_at = $3 WHERE link_name_id = $1")
                .bind(id)
                .bind(replacement_id)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }

        sqlx::query("UPDATE link_name SET is_deleted = TRUE WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
