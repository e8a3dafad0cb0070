//! In-memory vector index over concept embeddings.
//!
//! One coarse read-write lock guards the whole index: queries are the
//! common case and take the read side, upserts are rare writes. The index
//! holds nothing until [`VectorIndex::initialize`] loads the active model's
//! rows from the store, and every entry mirrors a committed store row.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use trellis_core::{ConceptEmbeddingRepository, Neighbor, Result, Vector};

use crate::similarity::cosine_similarity;

/// Process-wide nearest-neighbor index with an explicit lifecycle.
///
/// Lookup is a linear scan over every entry. At personal-corpus scale
/// (thousands of concepts) that is faster than maintaining an ANN
/// structure; revisit past ~10^5 entries.
pub struct VectorIndex {
    state: RwLock<Option<IndexState>>,
}

struct IndexState {
    model: String,
    entries: HashMap<Uuid, Vector>,
}

impl VectorIndex {
    /// Create an uninitialized index.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
        }
    }

    /// Load every embedding row for the given model into memory.
    ///
    /// Repeatable: re-initialization replaces the previous state, including
    /// a state built for a different model.
    pub async fn initialize(
        &self,
        embeddings: &dyn ConceptEmbeddingRepository,
        model: &str,
    ) -> Result<usize> {
        let start = Instant::now();
        let rows = embeddings.list_for_model(model).await?;

        let entries: HashMap<Uuid, Vector> = rows
            .into_iter()
            .map(|row| (row.concept_id, row.vector))
            .collect();
        let count = entries.len();

        let mut state = self.state.write().await;
        *state = Some(IndexState {
            model: model.to_string(),
            entries,
        });

        info!(
            subsystem = "engine",
            component = "vector_index",
            op = "initialize",
            model = %model,
            result_count = count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Vector index initialized"
        );
        Ok(count)
    }

    /// Insert or replace one entry.
    ///
    /// Callers write the store row first; the index only ever mirrors
    /// committed data. A warn-and-skip covers the uninitialized window
    /// (writes before startup finished load on the next initialize).
    pub async fn upsert(&self, concept_id: Uuid, vector: Vector) {
        let mut state = self.state.write().await;
        match state.as_mut() {
            Some(inner) => {
                inner.entries.insert(concept_id, vector);
            }
            None => {
                warn!(
                    subsystem = "engine",
                    component = "vector_index",
                    concept_id = %concept_id,
                    "Upsert against uninitialized vector index skipped"
                );
            }
        }
    }

    /// Delete one entry; silent if absent or uninitialized.
    pub async fn remove(&self, concept_id: Uuid) {
        let mut state = self.state.write().await;
        if let Some(inner) = state.as_mut() {
            inner.entries.remove(&concept_id);
        }
    }

    /// Top-k nearest entries by cosine similarity.
    ///
    /// Excluded ids never appear. Ordering is similarity descending with
    /// concept id ascending as the tie-break, so equal scores page
    /// deterministically. Empty when uninitialized or `k == 0`.
    pub async fn query(&self, vector: &Vector, k: usize, exclude: &HashSet<Uuid>) -> Vec<Neighbor> {
        if k == 0 {
            return vec![];
        }

        let state = self.state.read().await;
        let Some(inner) = state.as_ref() else {
            debug!(
                subsystem = "engine",
                component = "vector_index",
                "Query against uninitialized vector index"
            );
            return vec![];
        };

        let query = vector.as_slice();
        let mut neighbors: Vec<Neighbor> = inner
            .entries
            .iter()
            .filter(|(id, _)| !exclude.contains(id))
            .map(|(id, entry)| Neighbor {
                concept_id: *id,
                score: cosine_similarity(query, entry.as_slice()),
            })
            .collect();

        neighbors.sort_unstable_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.concept_id.cmp(&b.concept_id))
        });
        neighbors.truncate(k);
        neighbors
    }

    /// Drop back to the uninitialized state.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        *state = None;
    }

    /// Whether `initialize` has run since construction or the last reset.
    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Number of indexed entries; 0 when uninitialized.
    pub async fn len(&self) -> usize {
        self.state
            .read()
            .await
            .as_ref()
            .map(|inner| inner.entries.len())
            .unwrap_or(0)
    }

    /// True when no entries are indexed.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Model the current state was loaded for, if initialized.
    pub async fn model(&self) -> Option<String> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|inner| inner.model.clone())
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}
