//! Content generation configuration.
//!
//! Carries the (provider, model) pair that keys the semantic cache, the
//! sampling temperature, and the retrieval knobs for link discovery.
//! Values come from the environment with defaults from
//! [`trellis_core::defaults`].

use trellis_core::{defaults, Error, Result};

use crate::prompt::LINK_PROPOSAL_SYSTEM_PROMPT;

/// Settings for LLM-backed content generation.
#[derive(Debug, Clone)]
pub struct ContentGenConfig {
    /// Provider label, e.g. "ollama". Keys the semantic cache.
    pub provider: String,
    /// Generation model name. Keys the semantic cache.
    pub model: String,
    /// Sampling temperature passed to the backend.
    pub temperature: f32,
    /// Nearest neighbors retrieved per link discovery run.
    pub candidate_pool: usize,
    /// Minimum cosine similarity for a semantic cache hit.
    pub cache_similarity_threshold: f32,
    /// System prompt for the link reranker.
    pub system_prompt: String,
}

impl Default for ContentGenConfig {
    fn default() -> Self {
        Self {
            provider: defaults::PROVIDER.to_string(),
            model: defaults::GEN_MODEL.to_string(),
            temperature: defaults::GEN_TEMPERATURE,
            candidate_pool: defaults::CANDIDATE_POOL,
            cache_similarity_threshold: defaults::CACHE_SIMILARITY_THRESHOLD,
            system_prompt: LINK_PROPOSAL_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl ContentGenConfig {
    /// Create from environment variables, falling back to defaults.
    ///
    /// - `TRELLIS_PROVIDER` — provider label
    /// - `OLLAMA_GEN_MODEL` — generation model (shared with the backend)
    /// - `TRELLIS_GEN_TEMPERATURE` — sampling temperature
    /// - `TRELLIS_CANDIDATE_POOL` — neighbors per discovery run
    /// - `TRELLIS_CACHE_SIMILARITY_THRESHOLD` — cache hit threshold
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            provider: std::env::var("TRELLIS_PROVIDER").unwrap_or(base.provider),
            model: std::env::var("OLLAMA_GEN_MODEL").unwrap_or(base.model),
            temperature: std::env::var("TRELLIS_GEN_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.temperature),
            candidate_pool: std::env::var("TRELLIS_CANDIDATE_POOL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.candidate_pool),
            cache_similarity_threshold: std::env::var("TRELLIS_CACHE_SIMILARITY_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.cache_similarity_threshold),
            system_prompt: base.system_prompt,
        }
    }

    /// Check that generation-dependent operations can run.
    ///
    /// Link discovery refuses to start with an unusable configuration
    /// rather than failing somewhere inside the pipeline.
    pub fn validate_for_content_generation(&self) -> Result<()> {
        if self.provider.trim().is_empty() {
            return Err(Error::Config("provider is not set".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("generation model is not set".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "temperature {} outside [0, 2]",
                self.temperature
            )));
        }
        if self.candidate_pool == 0 {
            return Err(Error::Config(
                "candidate pool must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.cache_similarity_threshold) {
            return Err(Error::Config(format!(
                "cache similarity threshold {} outside [0, 1]",
                self.cache_similarity_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ContentGenConfig::default();
        assert!(config.validate_for_content_generation().is_ok());
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "gpt-oss:20b");
    }

    #[test]
    fn test_empty_provider_rejected() {
        let config = ContentGenConfig {
            provider: "".to_string(),
            ..Default::default()
        };
        let err = config.validate_for_content_generation().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_empty_model_rejected() {
        let config = ContentGenConfig {
            model: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate_for_content_generation().is_err());
    }

    #[test]
    fn test_temperature_bounds() {
        let config = ContentGenConfig {
            temperature: 2.5,
            ..Default::default()
        };
        assert!(config.validate_for_content_generation().is_err());

        let config = ContentGenConfig {
            temperature: -0.1,
            ..Default::default()
        };
        assert!(config.validate_for_content_generation().is_err());
    }

    #[test]
    fn test_zero_candidate_pool_rejected() {
        let config = ContentGenConfig {
            candidate_pool: 0,
            ..Default::default()
        };
        assert!(config.validate_for_content_generation().is_err());
    }

    #[test]
    fn test_threshold_bounds() {
        let config = ContentGenConfig {
            cache_similarity_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate_for_content_generation().is_err());
    }
}
