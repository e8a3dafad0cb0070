//! LLM-reranked link discovery.
//!
//! Proposals are advisory: nothing here writes links. The pipeline narrows
//! candidates with the vector index, asks the generation backend to rerank
//! the survivors, and defends against whatever comes back. The expensive
//! LLM step sits behind the semantic cache.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use trellis_core::{
    defaults, Concept, ConceptRepository, ConceptStatus, GenerationBackend, LinkNameRepository,
    LinkProposal, LinkRepository, Result,
};

use crate::cache::SemanticCache;
use crate::config::ContentGenConfig;
use crate::index::VectorIndex;
use crate::orchestrator::EmbeddingOrchestrator;
use crate::prompt::{build_link_prompt, parse_proposals};

/// Proposes typed links from one concept to semantically nearby concepts.
pub struct LinkProposer {
    concepts: Arc<dyn ConceptRepository>,
    links: Arc<dyn LinkRepository>,
    link_names: Arc<dyn LinkNameRepository>,
    orchestrator: Arc<EmbeddingOrchestrator>,
    index: Arc<VectorIndex>,
    cache: SemanticCache,
    generator: Arc<dyn GenerationBackend>,
    config: ContentGenConfig,
}

impl LinkProposer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        concepts: Arc<dyn ConceptRepository>,
        links: Arc<dyn LinkRepository>,
        link_names: Arc<dyn LinkNameRepository>,
        orchestrator: Arc<EmbeddingOrchestrator>,
        index: Arc<VectorIndex>,
        cache: SemanticCache,
        generator: Arc<dyn GenerationBackend>,
        config: ContentGenConfig,
    ) -> Self {
        Self {
            concepts,
            links,
            link_names,
            orchestrator,
            index,
            cache,
            generator,
            config,
        }
    }

    /// Propose up to `max_proposals` links for a source concept.
    ///
    /// Advisory read: a missing or trashed source yields an empty list, not
    /// an error. Returned proposals never include the source itself or any
    /// concept already linked to it in either direction, carry a confidence
    /// of at least `defaults::PROPOSAL_CONFIDENCE_THRESHOLD`, and arrive
    /// sorted by confidence descending with target id breaking ties.
    #[instrument(skip(self, source_id), fields(subsystem = "engine", component = "proposer", op = "propose", concept_id = %source_id))]
    pub async fn propose_links_for_concept(
        &self,
        source_id: Uuid,
        max_proposals: usize,
    ) -> Result<Vec<LinkProposal>> {
        let start = Instant::now();

        let source = match self.concepts.get(source_id).await? {
            Some(concept) if concept.status == ConceptStatus::Active => concept,
            Some(_) => {
                debug!("Source concept is trashed; nothing to propose");
                return Ok(vec![]);
            }
            None => {
                debug!("Source concept not found; nothing to propose");
                return Ok(vec![]);
            }
        };

        self.config.validate_for_content_generation()?;

        let source_vector = self
            .orchestrator
            .get_or_create_embedding(source_id, &source.embedding_text())
            .await?;

        // Never re-propose what is already linked, in either direction.
        let mut exclude: HashSet<Uuid> = self
            .links
            .linked_concept_ids(source_id)
            .await?
            .into_iter()
            .collect();
        exclude.insert(source_id);

        let neighbors = self
            .index
            .query(&source_vector, self.config.candidate_pool, &exclude)
            .await;
        if neighbors.is_empty() {
            debug!("No unlinked neighbors; nothing to propose");
            return Ok(vec![]);
        }

        let candidates = self.load_candidates(&neighbors).await?;
        if candidates.is_empty() {
            debug!("Every neighbor was filtered out; nothing to propose");
            return Ok(vec![]);
        }

        let prompt = build_link_prompt(&source, &candidates);
        let value = match self.rerank(source_id, &prompt).await? {
            Some(value) => value,
            None => return Ok(vec![]),
        };

        let default_name = self.link_names.get_default().await?;
        let titles: HashMap<Uuid, String> = candidates
            .iter()
            .map(|c| (c.id, c.title.clone()))
            .collect();

        let mut proposals =
            parse_proposals(&value, source_id, &titles, &default_name.forward_name);
        proposals.retain(|p| p.confidence >= defaults::PROPOSAL_CONFIDENCE_THRESHOLD);
        // The LLM's ordering is not trusted.
        proposals.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.target_concept_id.cmp(&b.target_concept_id))
        });
        proposals.truncate(max_proposals);

        info!(
            subsystem = "engine",
            component = "proposer",
            result_count = proposals.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Link proposals ready"
        );
        Ok(proposals)
    }

    /// Fetch neighbor concepts in rank order, dropping trashed rows the
    /// index has not caught up on.
    async fn load_candidates(
        &self,
        neighbors: &[trellis_core::Neighbor],
    ) -> Result<Vec<Concept>> {
        let candidate_ids: Vec<Uuid> = neighbors.iter().map(|n| n.concept_id).collect();
        let mut by_id: HashMap<Uuid, Concept> = self
            .concepts
            .get_many(&candidate_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(candidate_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .filter(|c| c.status == ConceptStatus::Active)
            .collect())
    }

    /// Resolve the reranker response for a prompt: semantic cache first,
    /// one generation call on a miss.
    ///
    /// `Ok(None)` means the backend answered with something that is not
    /// JSON; the response is discarded and deliberately not cached.
    async fn rerank(&self, source_id: Uuid, prompt: &str) -> Result<Option<serde_json::Value>> {
        let cached = self
            .cache
            .get_cached_response(
                prompt,
                &self.config.provider,
                &self.config.model,
                self.config.cache_similarity_threshold,
            )
            .await?;
        if let Some(value) = cached {
            return Ok(Some(value));
        }

        let raw = self
            .generator
            .generate_json_with_system(&self.config.system_prompt, prompt)
            .await?;

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => {
                self.cache
                    .store_cached_response(prompt, &value, &self.config.provider, &self.config.model)
                    .await?;
                Ok(Some(value))
            }
            Err(e) => {
                warn!(
                    subsystem = "engine",
                    component = "proposer",
                    concept_id = %source_id,
                    error = %e,
                    response_len = raw.len(),
                    "Discarding non-JSON reranker response"
                );
                Ok(None)
            }
        }
    }
}
