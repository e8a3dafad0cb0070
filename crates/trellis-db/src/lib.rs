//! # trellis-db
//!
//! PostgreSQL database layer for trellis.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for concepts, links, and link names
//! - Vector storage for concept embeddings with pgvector
//! - Similarity-keyed LLM response cache
//!
//! ## Example
//!
//! ```rust,ignore
//! use trellis_db::Database;
//! use trellis_core::ConceptRepository;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/trellis").await?;
//!
//!     let active = db.concepts.count_active().await?;
//!     println!("Active concepts: {}", active);
//!     Ok(())
//! }
//! ```
pub mod concepts;
pub mod embeddings;
pub mod links;
pub mod pool;
pub mod response_cache;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use trellis_core::*;

// Re-export repository implementations
pub use concepts::PgConceptRepository;
pub use embeddings::PgConceptEmbeddingRepository;
pub use links::{PgLinkNameRepository, PgLinkRepository};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use response_cache::PgResponseCacheRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Concept repository for reads and status filtering.
    pub concepts: PgConceptRepository,
    /// Embedding repository for per-model vector storage.
    pub embeddings: PgConceptEmbeddingRepository,
    /// Link repository for typed concept relationships.
    pub links: PgLinkRepository,
    /// Link name vocabulary repository.
    pub link_names: PgLinkNameRepository,
    /// Similarity-keyed LLM response cache repository.
    pub response_cache: PgResponseCacheRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            concepts: PgConceptRepository::new(pool.clone()),
            embeddings: PgConceptEmbeddingRepository::new(pool.clone()),
            links: PgLinkRepository::new(pool.clone()),
            link_names: PgLinkNameRepository::new(pool.clone()),
            response_cache: PgResponseCacheRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
