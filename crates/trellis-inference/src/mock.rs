//! Mock inference backend for deterministic testing.
//!
//! Provides a mock implementation of the inference traits that generates
//! deterministic embeddings and responses for testing purposes. The call
//! log doubles as a spy: tests can assert exactly how many embed or
//! generate calls a component issued.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trellis_inference::mock::MockInferenceBackend;
//! use trellis_core::EmbeddingBackend;
//!
//! #[tokio::test]
//! async fn test_with_mock_backend() {
//!     let backend = MockInferenceBackend::new()
//!         .with_dimension(384)
//!         .with_fixed_response("Test response");
//!
//!     let texts = vec!["test text".to_string()];
//!     let embeddings = backend.embed_texts(&texts).await.unwrap();
//!     assert_eq!(embeddings[0].as_slice().len(), 384);
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use trellis_core::{EmbeddingBackend, Error, GenerationBackend, InferenceBackend, Result, Vector};

/// Mock inference backend for testing.
#[derive(Clone)]
pub struct MockInferenceBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    dimension: usize,
    embed_model: String,
    gen_model: String,
    temperature: f32,
    fixed_responses: HashMap<String, String>,
    default_response: String,
    failing_inputs: Vec<String>,
    latency_ms: u64,
    failure_rate: f64,
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
    pub timestamp: std::time::Instant,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            embed_model: "mock-embed".to_string(),
            gen_model: "mock-gen".to_string(),
            temperature: 0.0,
            fixed_responses: HashMap::new(),
            default_response: "Mock response".to_string(),
            failing_inputs: Vec::new(),
            latency_ms: 0,
            failure_rate: 0.0,
        }
    }
}

impl MockInferenceBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        Arc::make_mut(&mut self.config).dimension = dimension;
        self
    }

    /// Set the reported embedding model name.
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).embed_model = model.into();
        self
    }

    /// Set the reported generation model name.
    pub fn with_gen_model(mut self, model: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).gen_model = model.into();
        self
    }

    /// Set a fixed response for generation requests.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Add a response mapping for specific inputs.
    pub fn with_response_mapping(
        mut self,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .fixed_responses
            .insert(input.into(), output.into());
        self
    }

    /// Fail any embed or generate call whose input contains the fragment.
    pub fn with_failure_for_input(mut self, fragment: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config)
            .failing_inputs
            .push(fragment.into());
        self
    }

    /// Set simulated latency for all operations.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Set failure rate (0.0 - 1.0) for testing error handling.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.call_log.lock().unwrap().clear()
    }

    /// Get number of embed calls (one per embedded text).
    pub fn embed_call_count(&self) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == "embed")
            .count()
    }

    /// Get number of generation calls.
    pub fn generate_call_count(&self) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == "generate")
            .count()
    }

    fn log_call(&self, operation: &str, input: &str) {
        self.call_log.lock().unwrap().push(MockCall {
            operation: operation.to_string(),
            input: input.to_string(),
            timestamp: std::time::Instant::now(),
        });
    }

    fn should_fail(&self, input: &str) -> bool {
        if self
            .config
            .failing_inputs
            .iter()
            .any(|fragment| input.contains(fragment))
        {
            return true;
        }

        use rand::Rng;
        if self.config.failure_rate > 0.0 {
            rand::thread_rng().gen::<f64>() < self.config.failure_rate
        } else {
            false
        }
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }
    }

    /// Generate embedding for text (deterministic based on text content).
    pub async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, MockError> {
        self.log_call("embed", text);
        self.simulate_latency().await;

        if self.should_fail(text) {
            return Err(MockError::SimulatedFailure);
        }

        Ok(MockEmbeddingGenerator::generate(
            text,
            self.config.dimension,
        ))
    }

    /// Generate text response.
    pub async fn respond(&self, prompt: &str) -> std::result::Result<String, MockError> {
        self.log_call("generate", prompt);
        self.simulate_latency().await;

        if self.should_fail(prompt) {
            return Err(MockError::SimulatedFailure);
        }

        // Check for mapped response
        if let Some(response) = self.config.fixed_responses.get(prompt) {
            return Ok(response.clone());
        }

        Ok(self.config.default_response.clone())
    }
}

impl Default for MockInferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingBackend for MockInferenceBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            let values = self
                .embed(text)
                .await
                .map_err(|e| Error::Embedding(e.to_string()))?;
            results.push(Vector::from(values));
        }
        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.embed_model
    }
}

#[async_trait]
impl GenerationBackend for MockInferenceBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.respond(prompt)
            .await
            .map_err(|e| Error::Inference(e.to_string()))
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    async fn generate_json(&self, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    async fn generate_json_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    fn model_name(&self) -> &str {
        &self.config.gen_model
    }

    fn temperature(&self) -> f32 {
        self.config.temperature
    }
}

#[async_trait]
impl InferenceBackend for MockInferenceBackend {
    fn provider(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Mock embedding generator with deterministic output.
pub struct MockEmbeddingGenerator;

impl MockEmbeddingGenerator {
    /// Generate a deterministic embedding from text.
    ///
    /// Uses character-based hashing for reproducibility. The same text
    /// will always produce the same embedding.
    pub fn generate(text: &str, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0; dimension];

        // Use character codes to generate deterministic values
        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % dimension;
            vec[idx] += 0.1;
        }

        // Normalize to unit vector
        Self::normalize(&mut vec);
        vec
    }

    /// Generate embedding from seed (for random-like but deterministic vectors).
    pub fn generate_with_seed(seed: u64, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0; dimension];
        let mut state = seed;

        // Simple LCG for deterministic pseudo-random values
        for item in vec.iter_mut() {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            *item = ((state % 1000) as f32) / 1000.0 - 0.5;
        }

        Self::normalize(&mut vec);
        vec
    }

    fn normalize(vec: &mut [f32]) {
        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vec.iter_mut().for_each(|x| *x /= magnitude);
        }
    }

    /// Calculate cosine similarity between two vectors.
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if mag_a > 0.0 && mag_b > 0.0 {
            dot / (mag_a * mag_b)
        } else {
            0.0
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("Simulated failure for testing")]
    SimulatedFailure,
}
