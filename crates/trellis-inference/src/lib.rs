//! # trellis-inference
//!
//! LLM inference backend abstraction for trellis.
//!
//! This crate provides:
//! - Pluggable embedding and generation backend traits (from trellis-core)
//! - Ollama implementation (default)
//! - Mock backend with a call-log spy for tests (feature `mock`)
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable Ollama backend
//! - `mock`: Enable the mock backend outside of this crate's own tests
//!
//! # Example
//!
//! ```rust,no_run
//! use trellis_inference::OllamaBackend;
//! use trellis_core::EmbeddingBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OllamaBackend::from_env();
//!     let texts = vec!["Hello".to_string()];
//!     let embeddings = backend.embed_texts(&texts).await.unwrap();
//! }
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

// Mock inference backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use trellis_core::*;

#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockEmbeddingGenerator, MockInferenceBackend};
