//! Centralized default constants for trellis.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates reference these constants instead of defining their own magic
//! numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default embedding model name (Ollama).
pub const EMBED_MODEL: &str = "nomic-embed-text";

/// Default embedding vector dimension for nomic-embed-text.
pub const EMBED_DIMENSION: usize = 768;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default provider identifier for cache keying.
pub const PROVIDER: &str = "ollama";

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default generation model name (Ollama).
pub const GEN_MODEL: &str = "gpt-oss:20b";

/// Default sampling temperature for reranking calls. Low on purpose:
/// proposal scoring should be repeatable, not creative.
pub const GEN_TEMPERATURE: f32 = 0.2;

/// Timeout for embedding requests in seconds.
pub const EMBED_TIMEOUT_SECS: u64 = 30;

/// Timeout for generation requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// LINK DISCOVERY
// =============================================================================

/// Nearest-neighbor candidates retrieved for one proposal call, before
/// the reranker sees them. Wide enough for recall, small enough that the
/// candidate listing fits one prompt.
pub const CANDIDATE_POOL: usize = 10;

/// Default cap on returned proposals.
pub const MAX_PROPOSALS: usize = 5;

/// Minimum reranker confidence for a proposal to survive filtering.
pub const PROPOSAL_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Snippet length in characters for candidate listings in prompts.
pub const SNIPPET_LENGTH: usize = 200;

// =============================================================================
// SEMANTIC CACHE
// =============================================================================

/// Minimum cosine similarity between a query embedding and a cached
/// entry's embedding for the entry to count as a hit.
pub const CACHE_SIMILARITY_THRESHOLD: f32 = 0.95;

// =============================================================================
// BACKFILL
// =============================================================================

/// Default number of concepts one backfill batch attempts.
pub const BACKFILL_BATCH_SIZE: usize = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_in_range() {
        assert!((0.0..=1.0).contains(&PROPOSAL_CONFIDENCE_THRESHOLD));
        assert!((0.0..=1.0).contains(&CACHE_SIMILARITY_THRESHOLD));
    }

    #[test]
    fn test_candidate_pool_covers_max_proposals() {
        assert!(CANDIDATE_POOL >= MAX_PROPOSALS);
    }
}
