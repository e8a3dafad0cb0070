//! # trellis-engine
//!
//! Embedding-backed link discovery and semantic response caching.
//!
//! This crate provides:
//! - An in-memory cosine-similarity index over concept embeddings
//! - Orchestration of embedding generation, persistence, and backfill
//! - A similarity-keyed cache for LLM responses
//! - LLM-reranked link proposals between concepts
//!
//! Everything here works against the repository traits in `trellis-core`;
//! wiring the Postgres implementations in is the caller's job.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trellis_engine::{EmbeddingOrchestrator, VectorIndex};
//!
//! let index = Arc::new(VectorIndex::new());
//! index.initialize(embeddings.as_ref(), backend.model_name()).await?;
//!
//! let orchestrator = EmbeddingOrchestrator::new(backend, index, embeddings, concepts);
//! let vector = orchestrator.get_or_create_embedding(concept_id, &text).await?;
//! ```

pub mod cache;
pub mod config;
pub mod index;
pub mod orchestrator;
pub mod prompt;
pub mod proposer;
pub mod similarity;

// Shared in-memory fakes for the unit tests in this crate
#[cfg(test)]
mod testing;

// Re-export core types
pub use trellis_core::*;

// Re-export the engine components
pub use cache::SemanticCache;
pub use config::ContentGenConfig;
pub use index::VectorIndex;
pub use orchestrator::EmbeddingOrchestrator;
pub use proposer::LinkProposer;
pub use similarity::cosine_similarity;
