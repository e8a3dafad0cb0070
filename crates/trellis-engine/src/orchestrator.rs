//! Embedding lifecycle: lookup, generation, persistence, index mirroring.
//!
//! All embedding writes funnel through [`EmbeddingOrchestrator`], which
//! enforces the ordering the index depends on: the store row is committed
//! before the index entry appears. Concurrent requests for the same concept
//! share one in-flight computation instead of stacking duplicate provider
//! calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use trellis_core::{
    logging, BackfillOutcome, ConceptEmbeddingRepository, ConceptRepository, EmbeddingBackend,
    EmbeddingStatusReport, Error, Result, Vector,
};

use crate::index::VectorIndex;

/// Slot value for one in-flight embedding. `None` until the installing
/// caller publishes; errors travel as strings because [`Error`] is not
/// `Clone`.
type EmbedOutcome = Option<std::result::Result<Vector, String>>;

/// Coordinates embedding generation between the store, the vector index,
/// and the embedding backend.
pub struct EmbeddingOrchestrator {
    backend: Arc<dyn EmbeddingBackend>,
    index: Arc<VectorIndex>,
    embeddings: Arc<dyn ConceptEmbeddingRepository>,
    concepts: Arc<dyn ConceptRepository>,
    model: String,
    in_flight: Mutex<HashMap<Uuid, watch::Receiver<EmbedOutcome>>>,
    is_indexing: AtomicBool,
}

impl EmbeddingOrchestrator {
    /// Build an orchestrator for the backend's embedding model.
    pub fn new(
        backend: Arc<dyn EmbeddingBackend>,
        index: Arc<VectorIndex>,
        embeddings: Arc<dyn ConceptEmbeddingRepository>,
        concepts: Arc<dyn ConceptRepository>,
    ) -> Self {
        let model = backend.model_name().to_string();
        Self {
            backend,
            index,
            embeddings,
            concepts,
            model,
            in_flight: Mutex::new(HashMap::new()),
            is_indexing: AtomicBool::new(false),
        }
    }

    /// Embedding model this orchestrator reads and writes.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Return the stored embedding for a concept, generating it on a miss.
    ///
    /// A store hit comes back unchanged with no backend or index call.
    /// On a miss the embedding is generated, persisted, mirrored into the
    /// index, and returned. Concurrent callers for the same concept share
    /// a single backend call and all receive its outcome; the in-flight
    /// slot is gone before the outcome publishes, so a later call after a
    /// failure starts a fresh attempt.
    #[instrument(skip(self, concept_id, text), fields(subsystem = "engine", component = "orchestrator", op = "get_or_create", concept_id = %concept_id))]
    pub async fn get_or_create_embedding(&self, concept_id: Uuid, text: &str) -> Result<Vector> {
        if let Some(row) = self.embeddings.get(concept_id, &self.model).await? {
            debug!(model = %self.model, "Embedding store hit");
            return Ok(row.vector);
        }

        let tx = {
            let mut slots = self.in_flight.lock().await;
            if let Some(rx) = slots.get(&concept_id) {
                let rx = rx.clone();
                drop(slots);
                debug!("Joining in-flight embedding");
                return self.await_in_flight(concept_id, rx).await;
            }
            let (tx, rx) = watch::channel(None);
            slots.insert(concept_id, rx);
            tx
        };

        // Another task may have finished this concept between our store
        // miss and the slot install. Re-read before paying for a backend
        // call.
        let result = match self.embeddings.get(concept_id, &self.model).await {
            Ok(Some(row)) => Ok(row.vector),
            Ok(None) => self.embed_and_persist(concept_id, text).await,
            Err(e) => Err(e),
        };

        // Slot removal precedes the publish: callers arriving from here on
        // re-read the store rather than joining a finished flight.
        self.in_flight.lock().await.remove(&concept_id);
        tx.send_replace(Some(match &result {
            Ok(vector) => Ok(vector.clone()),
            Err(e) => Err(e.to_string()),
        }));

        result
    }

    async fn await_in_flight(
        &self,
        concept_id: Uuid,
        mut rx: watch::Receiver<EmbedOutcome>,
    ) -> Result<Vector> {
        let waited = rx
            .wait_for(|slot| slot.is_some())
            .await
            .map(|slot| slot.clone());
        let outcome = match waited {
            Ok(slot) => slot,
            Err(_) => {
                // Installer dropped without publishing. Clear the slot if it
                // is still the one we joined so the next caller starts over.
                let mut slots = self.in_flight.lock().await;
                if let Some(existing) = slots.get(&concept_id) {
                    if existing.same_channel(&rx) {
                        slots.remove(&concept_id);
                    }
                }
                return Err(Error::Embedding(
                    "in-flight embedding was dropped before completing".to_string(),
                ));
            }
        };

        match outcome {
            Some(Ok(vector)) => Ok(vector),
            Some(Err(message)) => Err(Error::Embedding(message)),
            None => Err(Error::Internal(
                "in-flight embedding resolved without a value".to_string(),
            )),
        }
    }

    /// Embed one text, write the store row, then mirror into the index.
    async fn embed_and_persist(&self, concept_id: Uuid, text: &str) -> Result<Vector> {
        let start = Instant::now();

        let mut vectors = self.backend.embed_texts(&[text.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| Error::Embedding("backend returned no embedding".to_string()))?;

        // Store first. The index only ever mirrors committed rows.
        self.embeddings
            .upsert(concept_id, &vector, &self.model)
            .await?;
        self.index.upsert(concept_id, vector.clone()).await;

        let elapsed = start.elapsed().as_millis();
        debug!(
            subsystem = "engine",
            component = "orchestrator",
            concept_id = %concept_id,
            model = %self.model,
            duration_ms = elapsed as u64,
            "Generated and persisted embedding"
        );
        if elapsed > logging::SLOW_OP_THRESHOLD_MS {
            warn!(
                subsystem = "engine",
                component = "orchestrator",
                concept_id = %concept_id,
                duration_ms = elapsed as u64,
                slow = true,
                "Slow embedding generation"
            );
        }
        Ok(vector)
    }

    /// Embed up to `batch_size` active concepts missing a row under the
    /// active model.
    ///
    /// Rows embedded under a different model count as missing. A provider
    /// failure skips that concept and continues; a store failure aborts
    /// the batch. `is_indexing` is set for the duration either way.
    #[instrument(skip(self), fields(subsystem = "engine", component = "orchestrator", op = "backfill"))]
    pub async fn check_and_generate_missing(&self, batch_size: usize) -> Result<BackfillOutcome> {
        self.is_indexing.store(true, Ordering::SeqCst);
        let result = self.run_backfill_batch(batch_size).await;
        self.is_indexing.store(false, Ordering::SeqCst);
        result
    }

    async fn run_backfill_batch(&self, batch_size: usize) -> Result<BackfillOutcome> {
        let start = Instant::now();
        let missing = self
            .concepts
            .missing_embeddings(&self.model, batch_size as i64)
            .await?;

        let mut outcome = BackfillOutcome {
            scanned: missing.len(),
            ..Default::default()
        };

        for concept in &missing {
            match self
                .get_or_create_embedding(concept.id, &concept.embedding_text())
                .await
            {
                Ok(_) => outcome.embedded += 1,
                // Provider trouble is per-item; the rest of the batch still
                // deserves a try.
                Err(e @ (Error::Embedding(_) | Error::Inference(_))) => {
                    warn!(
                        subsystem = "engine",
                        component = "orchestrator",
                        concept_id = %concept.id,
                        error = %e,
                        "Backfill failed for concept"
                    );
                    outcome.failed += 1;
                }
                // Store errors poison every remaining item. Stop here.
                Err(e) => return Err(e),
            }
        }

        info!(
            subsystem = "engine",
            component = "orchestrator",
            op = "backfill",
            scanned = outcome.scanned,
            embedded = outcome.embedded,
            failed = outcome.failed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Backfill batch finished"
        );
        Ok(outcome)
    }

    /// Embedding coverage for the active model. Pure read.
    pub async fn get_embedding_status(&self) -> Result<EmbeddingStatusReport> {
        let total = self.concepts.count_active().await?;
        let with_embeddings = self.embeddings.count_for_model(&self.model).await?;
        let last_indexed_at = self.embeddings.last_updated(&self.model).await?;

        Ok(EmbeddingStatusReport {
            total,
            with_embeddings,
            without_embeddings: (total - with_embeddings).max(0),
            is_indexing: self.is_indexing.load(Ordering::SeqCst),
            last_indexed_at,
        })
    }
}
