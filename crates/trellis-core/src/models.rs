//! Core data models for trellis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// CONCEPT TYPES
// =============================================================================

/// Lifecycle status of a concept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConceptStatus {
    /// Visible and eligible for discovery
    #[default]
    Active,
    /// Soft-deleted; excluded from discovery
    Trash,
}

impl std::fmt::Display for ConceptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Trash => write!(f, "trash"),
        }
    }
}

impl std::str::FromStr for ConceptStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "trash" => Ok(Self::Trash),
            _ => Err(format!("Invalid concept status: {}", s)),
        }
    }
}

/// An atomic knowledge unit: a titled piece of content.
///
/// Concept CRUD is owned by the route layer; the discovery subsystem reads
/// id, title, and content, and filters on status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub status: ConceptStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Concept {
    /// Text handed to the embedding model for this concept.
    ///
    /// Title and content are embedded together so lookups phrased like a
    /// title still land near the full concept.
    pub fn embedding_text(&self) -> String {
        if self.content.is_empty() {
            self.title.clone()
        } else {
            format!("{}\n\n{}", self.title, self.content)
        }
    }
}

// =============================================================================
// EMBEDDING TYPES
// =============================================================================

/// Embedding vector type (re-exported from pgvector).
pub use pgvector::Vector;

/// A persisted embedding for one concept under one model.
///
/// At most one row exists per (concept_id, model); a model change
/// regenerates rows rather than reinterpreting stored vectors.
#[derive(Debug, Clone)]
pub struct ConceptEmbedding {
    pub id: Uuid,
    pub concept_id: Uuid,
    pub model: String,
    pub vector: Vector,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Embedding coverage for the active model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingStatusReport {
    /// Active concepts in the store.
    pub total: i64,
    /// Active concepts with an embedding under the active model.
    pub with_embeddings: i64,
    /// Active concepts still missing one.
    pub without_embeddings: i64,
    /// Whether a backfill batch is currently running.
    pub is_indexing: bool,
    /// Most recent embedding write for the active model.
    pub last_indexed_at: Option<DateTime<Utc>>,
}

/// Outcome of one backfill batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillOutcome {
    /// Concepts the batch attempted.
    pub scanned: usize,
    /// Embeddings generated and persisted.
    pub embedded: usize,
    /// Per-concept failures (logged, not propagated).
    pub failed: usize,
}

/// A nearest-neighbor match from the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub concept_id: Uuid,
    /// Cosine similarity in [-1, 1]; 0.0 for zero-norm inputs.
    pub score: f32,
}

// =============================================================================
// LINK TYPES
// =============================================================================

/// A typed, directed link between two concepts.
///
/// The ordered pair (source_id, target_id) is unique; creating the same
/// pair again updates the existing row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub link_name_id: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named link type ("related to" / "part of" / ...).
///
/// Logical delete only: `is_deleted` flips, rows never disappear while
/// links reference them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkName {
    pub id: Uuid,
    pub forward_name: String,
    pub reverse_name: String,
    pub is_symmetric: bool,
    pub is_default: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// A ranked link suggestion. Lives only for the duration of one proposal
/// call; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkProposal {
    pub target_concept_id: Uuid,
    pub target_title: String,
    pub forward_name: String,
    /// Reranker-assigned score, clamped to [0, 1].
    pub confidence: f32,
    pub reasoning: String,
}

// =============================================================================
// SEMANTIC CACHE TYPES
// =============================================================================

/// A cached LLM response keyed by query embedding, provider, and model.
///
/// No uniqueness on the embedding: near-duplicate queries coexist and
/// converge at read time through the similarity threshold.
#[derive(Debug, Clone)]
pub struct LlmCacheEntry {
    pub id: Uuid,
    pub query_embedding: Vector,
    pub provider: String,
    pub model: String,
    pub response: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

/// Best-similarity candidate for a cache lookup.
#[derive(Debug, Clone)]
pub struct CacheMatch {
    pub entry: LlmCacheEntry,
    pub similarity: f32,
}
