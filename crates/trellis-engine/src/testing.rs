//! Shared in-memory fakes for engine unit tests.
//!
//! [`InMemoryStore`] implements every repository trait over plain vectors,
//! so orchestration logic can be exercised without Postgres. Semantics
//! mirror the trellis-db implementations where the engine depends on them:
//! upsert replaces, linked ids cover both directions, cache clear validates
//! its filter shape.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use trellis_core::{
    CacheMatch, Concept, ConceptEmbedding, ConceptEmbeddingRepository, ConceptRepository,
    ConceptStatus, Error, Link, LinkName, LinkNameRepository, LinkRepository, LlmCacheEntry,
    ResponseCacheRepository, Result, Vector,
};

use crate::similarity::cosine_similarity;

/// In-memory stand-in for the whole database.
pub struct InMemoryStore {
    concepts: Mutex<Vec<Concept>>,
    embeddings: Mutex<Vec<ConceptEmbedding>>,
    links: Mutex<Vec<Link>>,
    link_names: Mutex<Vec<LinkName>>,
    cache: Mutex<Vec<LlmCacheEntry>>,
    fail_embedding_upserts: AtomicBool,
}

impl InMemoryStore {
    /// Empty store with the default link name already seeded, matching
    /// what the initial migration guarantees.
    pub fn new() -> Self {
        let store = Self {
            concepts: Mutex::new(Vec::new()),
            embeddings: Mutex::new(Vec::new()),
            links: Mutex::new(Vec::new()),
            link_names: Mutex::new(Vec::new()),
            cache: Mutex::new(Vec::new()),
            fail_embedding_upserts: AtomicBool::new(false),
        };
        store.link_names.lock().unwrap().push(LinkName {
            id: Uuid::new_v4(),
            forward_name: "related to".to_string(),
            reverse_name: "related to".to_string(),
            is_symmetric: true,
            is_default: true,
            is_deleted: false,
            created_at: Utc::now(),
        });
        store
    }

    pub async fn seed_concept(&self, title: &str, content: &str) -> Concept {
        let now = Utc::now();
        let concept = Concept {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            status: ConceptStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.concepts.lock().unwrap().push(concept.clone());
        concept
    }

    pub async fn set_status(&self, id: Uuid, status: ConceptStatus) {
        let mut concepts = self.concepts.lock().unwrap();
        if let Some(concept) = concepts.iter_mut().find(|c| c.id == id) {
            concept.status = status;
            concept.updated_at = Utc::now();
        }
    }

    pub async fn seed_embedding(&self, concept_id: Uuid, values: Vec<f32>, model: &str) {
        let now = Utc::now();
        let mut embeddings = self.embeddings.lock().unwrap();
        embeddings.retain(|e| !(e.concept_id == concept_id && e.model == model));
        embeddings.push(ConceptEmbedding {
            id: Uuid::new_v4(),
            concept_id,
            model: model.to_string(),
            vector: Vector::from(values),
            created_at: now,
            updated_at: now,
        });
    }

    /// Link two concepts under the default name.
    pub async fn seed_link(&self, source_id: Uuid, target_id: Uuid) -> Uuid {
        let link_name_id = self.default_link_name_id().await;
        self.create(source_id, target_id, link_name_id, None)
            .await
            .expect("Failed to seed link")
    }

    pub async fn default_link_name_id(&self) -> Uuid {
        self.link_names
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.is_default && !n.is_deleted)
            .map(|n| n.id)
            .expect("Default link name not seeded")
    }

    /// Remove every link name, so `get_default` reports `NotFound`.
    pub async fn delete_all_link_names(&self) {
        self.link_names.lock().unwrap().clear();
    }

    /// Make subsequent embedding upserts fail with an internal error.
    pub fn fail_embedding_upserts(&self, fail: bool) {
        self.fail_embedding_upserts.store(fail, Ordering::SeqCst);
    }

    pub async fn cache_entries(&self) -> Vec<LlmCacheEntry> {
        self.cache.lock().unwrap().clone()
    }

    pub async fn embedding_row_count(&self) -> usize {
        self.embeddings.lock().unwrap().len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConceptRepository for InMemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Concept>> {
        Ok(self
            .concepts
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Concept>> {
        let concepts = self.concepts.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| concepts.iter().find(|c| c.id == *id).cloned())
            .collect())
    }

    async fn list_active(&self) -> Result<Vec<Concept>> {
        Ok(self
            .concepts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.status == ConceptStatus::Active)
            .cloned()
            .collect())
    }

    async fn count_active(&self) -> Result<i64> {
        Ok(ConceptRepository::list_active(self).await?.len() as i64)
    }

    async fn missing_embeddings(&self, model: &str, limit: i64) -> Result<Vec<Concept>> {
        let embedded: Vec<Uuid> = self
            .embeddings
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.model == model)
            .map(|e| e.concept_id)
            .collect();

        // Insertion order doubles as created_at ascending here.
        Ok(self
            .concepts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.status == ConceptStatus::Active && !embedded.contains(&c.id))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ConceptEmbeddingRepository for InMemoryStore {
    async fn get(&self, concept_id: Uuid, model: &str) -> Result<Option<ConceptEmbedding>> {
        Ok(self
            .embeddings
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.concept_id == concept_id && e.model == model)
            .cloned())
    }

    async fn upsert(&self, concept_id: Uuid, vector: &Vector, model: &str) -> Result<()> {
        if self.fail_embedding_upserts.load(Ordering::SeqCst) {
            return Err(Error::Internal("injected upsert failure".to_string()));
        }

        let mut embeddings = self.embeddings.lock().unwrap();
        match embeddings
            .iter_mut()
            .find(|e| e.concept_id == concept_id && e.model == model)
        {
            Some(existing) => {
                existing.vector = vector.clone();
                existing.updated_at = Utc::now();
            }
            None => {
                let now = Utc::now();
                embeddings.push(ConceptEmbedding {
                    id: Uuid::new_v4(),
                    concept_id,
                    model: model.to_string(),
                    vector: vector.clone(),
                    created_at: now,
                    updated_at: now,
                });
            }
        }
        Ok(())
    }

    async fn remove(&self, concept_id: Uuid, model: &str) -> Result<()> {
        self.embeddings
            .lock()
            .unwrap()
            .retain(|e| !(e.concept_id == concept_id && e.model == model));
        Ok(())
    }

    async fn list_for_model(&self, model: &str) -> Result<Vec<ConceptEmbedding>> {
        Ok(self
            .embeddings
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.model == model)
            .cloned()
            .collect())
    }

    async fn count_for_model(&self, model: &str) -> Result<i64> {
        let active: Vec<Uuid> = ConceptRepository::list_active(self)
            .await?
            .iter()
            .map(|c| c.id)
            .collect();
        Ok(self
            .embeddings
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.model == model && active.contains(&e.concept_id))
            .count() as i64)
    }

    async fn last_updated(&self, model: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .embeddings
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.model == model)
            .map(|e| e.updated_at)
            .max())
    }
}

#[async_trait]
impl LinkRepository for InMemoryStore {
    async fn create(
        &self,
        source_id: Uuid,
        target_id: Uuid,
        link_name_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Uuid> {
        let mut links = self.links.lock().unwrap();
        if let Some(existing) = links
            .iter_mut()
            .find(|l| l.source_id == source_id && l.target_id == target_id)
        {
            existing.link_name_id = link_name_id;
            existing.notes = notes.map(str::to_string);
            existing.updated_at = Utc::now();
            return Ok(existing.id);
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        links.push(Link {
            id,
            source_id,
            target_id,
            link_name_id,
            notes: notes.map(str::to_string),
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn get_for_concept(&self, concept_id: Uuid) -> Result<Vec<Link>> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.source_id == concept_id || l.target_id == concept_id)
            .cloned()
            .collect())
    }

    async fn linked_concept_ids(&self, concept_id: Uuid) -> Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .get_for_concept(concept_id)
            .await?
            .iter()
            .map(|l| {
                if l.source_id == concept_id {
                    l.target_id
                } else {
                    l.source_id
                }
            })
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

#[async_trait]
impl LinkNameRepository for InMemoryStore {
    async fn get_default(&self) -> Result<LinkName> {
        self.link_names
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.is_default && !n.is_deleted)
            .cloned()
            .ok_or_else(|| Error::NotFound("default link name".to_string()))
    }

    async fn get_by_forward_name(&self, forward_name: &str) -> Result<Option<LinkName>> {
        Ok(self
            .link_names
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.forward_name == forward_name)
            .cloned())
    }

    async fn list_active(&self) -> Result<Vec<LinkName>> {
        Ok(self
            .link_names
            .lock()
            .unwrap()
            .iter()
            .filter(|n| !n.is_deleted)
            .cloned()
            .collect())
    }

    async fn soft_delete(&self, id: Uuid, replacement: Option<Uuid>) -> Result<()> {
        if let Some(replacement_id) = replacement {
            let mut links = self.links.lock().unwrap();
            for link in links.iter_mut().filter(|l| l.link_name_id == id) {
                link.link_name_id = replacement_id;
            }
        }
        let mut names = self.link_names.lock().unwrap();
        match names.iter_mut().find(|n| n.id == id) {
            Some(name) => {
                name.is_deleted = true;
                Ok(())
            }
            None => Err(Error::NotFound(format!("link name {}", id))),
        }
    }
}

#[async_trait]
impl ResponseCacheRepository for InMemoryStore {
    async fn best_match(
        &self,
        provider: &str,
        model: &str,
        query: &Vector,
    ) -> Result<Option<CacheMatch>> {
        Ok(self
            .cache
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.provider == provider && e.model == model)
            .map(|e| CacheMatch {
                entry: e.clone(),
                similarity: cosine_similarity(query.as_slice(), e.query_embedding.as_slice()),
            })
            .max_by(|a, b| {
                a.similarity
                    .partial_cmp(&b.similarity)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }))
    }

    async fn insert(
        &self,
        query_embedding: &Vector,
        provider: &str,
        model: &str,
        response: &serde_json::Value,
    ) -> Result<Uuid> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.cache.lock().unwrap().push(LlmCacheEntry {
            id,
            query_embedding: query_embedding.clone(),
            provider: provider.to_string(),
            model: model.to_string(),
            response: response.clone(),
            created_at: now,
            last_used_at: now,
        });
        Ok(id)
    }

    async fn touch(&self, id: Uuid) -> Result<()> {
        let mut cache = self.cache.lock().unwrap();
        match cache.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.last_used_at = Utc::now();
                Ok(())
            }
            None => Err(Error::NotFound(format!("cache entry {}", id))),
        }
    }

    async fn clear(&self, provider: Option<&str>, model: Option<&str>) -> Result<i64> {
        if provider.is_none() && model.is_some() {
            return Err(Error::InvalidInput(
                "cache clear by model requires a provider".to_string(),
            ));
        }

        let mut cache = self.cache.lock().unwrap();
        let before = cache.len();
        cache.retain(|e| {
            let provider_match = provider.map(|p| e.provider == p).unwrap_or(true);
            let model_match = model.map(|m| e.model == m).unwrap_or(true);
            !(provider_match && model_match)
        });
        Ok((before - cache.len()) as i64)
    }

    async fn count(&self, provider: Option<&str>) -> Result<i64> {
        Ok(self
            .cache
            .lock()
            .unwrap()
            .iter()
            .filter(|e| provider.map(|p| e.provider == p).unwrap_or(true))
            .count() as i64)
    }
}
