//! Semantic response cache over the LLM.
//!
//! Caches generated responses keyed by query embedding similarity within
//! an exact (provider, model) scope. Writes never deduplicate; duplicate
//! and near-duplicate phrasings converge at read time through the
//! similarity threshold. There is no eviction policy.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use trellis_core::{logging, EmbeddingBackend, Error, ResponseCacheRepository, Result};

/// Similarity-keyed cache for LLM responses.
pub struct SemanticCache {
    backend: Arc<dyn EmbeddingBackend>,
    store: Arc<dyn ResponseCacheRepository>,
}

impl SemanticCache {
    /// Create a cache over the given embedding backend and store.
    pub fn new(backend: Arc<dyn EmbeddingBackend>, store: Arc<dyn ResponseCacheRepository>) -> Self {
        Self { backend, store }
    }

    /// Look up a cached response for a semantically equivalent query.
    ///
    /// Embeds `query_text`, takes the best match among entries stored under
    /// exactly (provider, model), and returns its response when the cosine
    /// similarity reaches `similarity_threshold`. A hit refreshes the
    /// entry's `last_used_at`.
    pub async fn get_cached_response(
        &self,
        query_text: &str,
        provider: &str,
        model: &str,
        similarity_threshold: f32,
    ) -> Result<Option<serde_json::Value>> {
        let start = Instant::now();
        let query = self.embed_query(query_text).await?;

        let best = self.store.best_match(provider, model, &query).await?;
        let elapsed = start.elapsed().as_millis();

        match best {
            Some(found) if found.similarity >= similarity_threshold => {
                debug!(
                    subsystem = "engine",
                    component = "semantic_cache",
                    provider = %provider,
                    model = %model,
                    similarity = found.similarity,
                    duration_ms = elapsed as u64,
                    "Semantic cache hit"
                );
                self.store.touch(found.entry.id).await?;
                Ok(Some(found.entry.response))
            }
            best => {
                debug!(
                    subsystem = "engine",
                    component = "semantic_cache",
                    provider = %provider,
                    model = %model,
                    nearest_similarity = best.map(|m| m.similarity),
                    duration_ms = elapsed as u64,
                    "Semantic cache miss"
                );
                if elapsed > logging::SLOW_OP_THRESHOLD_MS {
                    warn!(
                        subsystem = "engine",
                        component = "semantic_cache",
                        duration_ms = elapsed as u64,
                        slow = true,
                        "Slow semantic cache lookup"
                    );
                }
                Ok(None)
            }
        }
    }

    /// Store a response keyed by the query's embedding.
    ///
    /// Unconditional insert: no lookup, no write-time dedup.
    pub async fn store_cached_response(
        &self,
        query_text: &str,
        response: &serde_json::Value,
        provider: &str,
        model: &str,
    ) -> Result<()> {
        let query = self.embed_query(query_text).await?;
        let id = self.store.insert(&query, provider, model, response).await?;

        debug!(
            subsystem = "engine",
            component = "semantic_cache",
            provider = %provider,
            model = %model,
            entry_id = %id,
            "Cached LLM response"
        );
        Ok(())
    }

    /// Delete cached entries and return how many were removed.
    ///
    /// `provider` alone clears one provider, provider plus `model` narrows
    /// further, and neither clears everything.
    pub async fn clear_cache(
        &self,
        provider: Option<&str>,
        model: Option<&str>,
    ) -> Result<i64> {
        let deleted = self.store.clear(provider, model).await?;
        debug!(
            subsystem = "engine",
            component = "semantic_cache",
            provider = provider.unwrap_or("*"),
            model = model.unwrap_or("*"),
            result_count = deleted,
            "Cleared semantic cache entries"
        );
        Ok(deleted)
    }

    async fn embed_query(&self, query_text: &str) -> Result<trellis_core::Vector> {
        let mut vectors = self.backend.embed_texts(&[query_text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("backend returned no embedding".to_string()))
    }
}
