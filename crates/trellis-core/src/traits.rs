//! Core traits for trellis abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// CONCEPT REPOSITORY
// =============================================================================

/// Read-side repository for concepts.
///
/// Concept CRUD belongs to the route layer; link discovery only reads.
#[async_trait]
pub trait ConceptRepository: Send + Sync {
    /// Fetch a concept by id. `None` when absent.
    async fn get(&self, id: Uuid) -> Result<Option<Concept>>;

    /// Fetch several concepts by id. Missing ids are skipped, order is
    /// not guaranteed.
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Concept>>;

    /// All active concepts.
    async fn list_active(&self) -> Result<Vec<Concept>>;

    /// Count of active concepts.
    async fn count_active(&self) -> Result<i64>;

    /// Active concepts lacking an embedding under `model`, up to `limit`.
    /// Rows embedded under a different model count as missing.
    async fn missing_embeddings(&self, model: &str, limit: i64) -> Result<Vec<Concept>>;
}

// =============================================================================
// CONCEPT EMBEDDING REPOSITORY
// =============================================================================

/// Repository for persisted concept embeddings.
#[async_trait]
pub trait ConceptEmbeddingRepository: Send + Sync {
    /// Fetch the embedding row for (concept, model). `None` when absent.
    async fn get(&self, concept_id: Uuid, model: &str) -> Result<Option<ConceptEmbedding>>;

    /// Insert or replace the row for (concept, model). At most one row
    /// per pair exists afterwards.
    async fn upsert(&self, concept_id: Uuid, vector: &Vector, model: &str) -> Result<()>;

    /// Delete the row for (concept, model). No error if absent.
    async fn remove(&self, concept_id: Uuid, model: &str) -> Result<()>;

    /// Every embedding row for `model` (vector index initialization).
    async fn list_for_model(&self, model: &str) -> Result<Vec<ConceptEmbedding>>;

    /// Count of embedding rows for `model` over active concepts.
    async fn count_for_model(&self, model: &str) -> Result<i64>;

    /// Most recent `updated_at` for `model`, if any rows exist.
    async fn last_updated(&self, model: &str) -> Result<Option<DateTime<Utc>>>;
}

// =============================================================================
// LINK REPOSITORIES
// =============================================================================

/// Repository for typed links between concepts.
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Create a link, or update the existing row when the ordered pair
    /// (source, target) already exists. Returns the row id either way.
    async fn create(
        &self,
        source_id: Uuid,
        target_id: Uuid,
        link_name_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Uuid>;

    /// All links touching a concept, either direction.
    async fn get_for_concept(&self, concept_id: Uuid) -> Result<Vec<Link>>;

    /// Ids of every concept linked to `concept_id` in either direction,
    /// deduplicated. Used to exclude already-linked concepts from
    /// proposal candidates.
    async fn linked_concept_ids(&self, concept_id: Uuid) -> Result<Vec<Uuid>>;
}

/// Repository for the link-name vocabulary.
#[async_trait]
pub trait LinkNameRepository: Send + Sync {
    /// The default link name. Errors with `NotFound` if none is seeded.
    async fn get_default(&self) -> Result<LinkName>;

    /// Lookup by forward name, including logically deleted rows.
    async fn get_by_forward_name(&self, forward_name: &str) -> Result<Option<LinkName>>;

    /// All names not logically deleted.
    async fn list_active(&self) -> Result<Vec<LinkName>>;

    /// Logically delete a name. Deleting a default name that links still
    /// reference requires `replacement`; those links are retargeted first.
    async fn soft_delete(&self, id: Uuid, replacement: Option<Uuid>) -> Result<()>;
}

// =============================================================================
// RESPONSE CACHE REPOSITORY
// =============================================================================

/// Repository for the similarity-keyed LLM response cache.
#[async_trait]
pub trait ResponseCacheRepository: Send + Sync {
    /// Highest-similarity entry among rows matching (provider, model)
    /// exactly. `None` when no rows match the filters at all. Threshold
    /// decisions belong to the caller.
    async fn best_match(
        &self,
        provider: &str,
        model: &str,
        query: &Vector,
    ) -> Result<Option<CacheMatch>>;

    /// Insert a new row unconditionally; no write-time dedup against
    /// near-duplicate entries.
    async fn insert(
        &self,
        query_embedding: &Vector,
        provider: &str,
        model: &str,
        response: &serde_json::Value,
    ) -> Result<Uuid>;

    /// Bump `last_used_at` on a hit.
    async fn touch(&self, id: Uuid) -> Result<()>;

    /// Delete entries matching the filters: provider alone, provider and
    /// model, or everything when both are `None`. Returns the deleted
    /// count.
    async fn clear(&self, provider: Option<&str>, model: Option<&str>) -> Result<i64>;

    /// Count entries, optionally for one provider.
    async fn count(&self, provider: Option<&str>) -> Result<i64>;
}

// =============================================================================
// INFERENCE BACKEND TRAITS
// =============================================================================

/// Backend capable of producing text embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for a batch of texts, one vector per text,
    /// in input order.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Embedding dimension this backend produces.
    fn dimension(&self) -> usize;

    /// Model identifier used for embedding.
    fn model_name(&self) -> &str;
}

/// Backend capable of text generation.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion for a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with an explicit system prompt.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate constrained to JSON output. Returns the raw JSON text;
    /// callers parse and validate.
    async fn generate_json(&self, prompt: &str) -> Result<String>;

    /// JSON-constrained generation with an explicit system prompt.
    async fn generate_json_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Model identifier used for generation.
    fn model_name(&self) -> &str;

    /// Sampling temperature applied to generation calls.
    fn temperature(&self) -> f32;
}

/// Combined inference backend: embeddings plus generation plus liveness.
#[async_trait]
pub trait InferenceBackend: EmbeddingBackend + GenerationBackend {
    /// Provider identifier ("ollama", "mock", ...). Semantic cache rows
    /// are keyed on this together with the generation model.
    fn provider(&self) -> &str;

    /// Check whether the backend is reachable.
    async fn health_check(&self) -> Result<bool>;
}
