//! AI Provider Module
//!
//! Defines the trait and types for AI providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{CoreError, CoreResult};

// =============================================================================
// AI Provider Trait
// =============================================================================

/// Trait for AI providers (OpenAI-compatible endpoints, local models, etc.)
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Returns the provider name
    fn name(&self) -> &str;

    /// Generates a completion from a prompt
    async fn complete(&self, request: CompletionRequest) -> CoreResult<CompletionResponse>;

    /// Generates embeddings for text
    async fn embed(&self, texts: Vec<String>) -> CoreResult<Vec<Vec<f32>>>;

    /// Performs a lightweight connectivity/auth check.
    ///
    /// This should be cheap (no expensive completions) and should not leak
    /// secrets in error messages.
    async fn health_check(&self) -> CoreResult<()> {
        Ok(())
    }

    /// Checks if the provider is available
    fn is_available(&self) -> bool;
}

// =============================================================================
// Completion Request
// =============================================================================

/// Request for text completion
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    /// System prompt/instructions
    pub system: Option<String>,
    /// User prompt
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Model to use (provider-specific)
    pub model: Option<String>,
    /// Whether to return JSON
    pub json_mode: bool,
}

impl CompletionRequest {
    /// Creates a new completion request
    pub fn new(prompt: &str) -> Self {
        Self {
            system: None,
            prompt: prompt.to_string(),
            max_tokens: None,
            temperature: None,
            model: None,
            json_mode: false,
        }
    }

    /// Sets the system prompt
    pub fn with_system(mut self, system: &str) -> Self {
        self.system = Some(system.to_string());
        self
    }

    /// Sets the maximum tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the model
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    /// Enables JSON mode
    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

// =============================================================================
// Completion Response
// =============================================================================

/// Response from text completion
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,
    /// Model used
    pub model: String,
    /// Token usage
    pub usage: TokenUsage,
    /// Finish reason
    pub finish_reason: FinishReason,
}

impl CompletionResponse {
    /// Creates a new completion response
    pub fn new(text: &str, model: &str) -> Self {
        Self {
            text: text.to_string(),
            model: model.to_string(),
            usage: TokenUsage::default(),
            finish_reason: FinishReason::Stop,
        }
    }
}

// =============================================================================
// Token Usage
// =============================================================================

/// Token usage statistics
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// Completion tokens
    pub completion_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Creates a new token usage record
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }
}

// =============================================================================
// Finish Reason
// =============================================================================

/// Reason for completion finish
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Normal stop
    #[default]
    Stop,
    /// Reached max tokens
    Length,
    /// Content filter triggered
    ContentFilter,
}

// =============================================================================
// Mock Provider (for testing)
// =============================================================================

/// Mock AI provider for testing.
///
/// Embeddings are deterministic character-histogram vectors, so similar texts
/// embed near each other and tests can exercise real ranking behavior.
pub struct MockAIProvider {
    name: String,
    response: String,
    available: bool,
    delay: Option<std::time::Duration>,
}

impl MockAIProvider {
    /// Creates a new mock provider
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            response: "Mock response".to_string(),
            available: true,
            delay: None,
        }
    }

    /// Sets the mock completion response
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Sets availability
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Adds an artificial delay before every call (for scheduling tests)
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn simulate_latency(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// Deterministic embedding used by the mock: 32-bin letter histogram,
    /// L2-normalized.
    pub fn embedding_for(text: &str) -> Vec<f32> {
        let mut bins = vec![0.0f32; 32];
        for byte in text.to_lowercase().bytes() {
            bins[(byte as usize) % 32] += 1.0;
        }
        let norm: f32 = bins.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut bins {
                *v /= norm;
            }
        }
        bins
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _request: CompletionRequest) -> CoreResult<CompletionResponse> {
        self.simulate_latency().await;
        if !self.available {
            return Err(CoreError::Internal("Provider not available".to_string()));
        }

        Ok(CompletionResponse {
            text: self.response.clone(),
            model: "mock-model".to_string(),
            usage: TokenUsage::new(10, 20),
            finish_reason: FinishReason::Stop,
        })
    }

    async fn embed(&self, texts: Vec<String>) -> CoreResult<Vec<Vec<f32>>> {
        self.simulate_latency().await;
        if !self.available {
            return Err(CoreError::EmbeddingError(
                "Provider not available".to_string(),
            ));
        }

        Ok(texts.iter().map(|t| Self::embedding_for(t)).collect())
    }

    async fn health_check(&self) -> CoreResult<()> {
        if !self.available {
            return Err(CoreError::Internal("Provider not available".to_string()));
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_builder() {
        let request = CompletionRequest::new("Hello")
            .with_system("You are a video archivist")
            .with_max_tokens(100)
            .with_temperature(0.7)
            .with_model("gpt-4o-mini")
            .with_json_mode();

        assert_eq!(request.prompt, "Hello");
        assert_eq!(request.system, Some("You are a video archivist".to_string()));
        assert_eq!(request.max_tokens, Some(100));
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.model, Some("gpt-4o-mini".to_string()));
        assert!(request.json_mode);
    }

    #[tokio::test]
    async fn test_mock_provider() {
        let provider = MockAIProvider::new("test").with_response("Test response");

        assert_eq!(provider.name(), "test");
        assert!(provider.is_available());

        let response = provider.complete(CompletionRequest::new("Hello")).await.unwrap();
        assert_eq!(response.text, "Test response");
    }

    #[tokio::test]
    async fn test_mock_provider_unavailable() {
        let provider = MockAIProvider::new("test").with_available(false);

        assert!(!provider.is_available());
        assert!(provider.complete(CompletionRequest::new("Hello")).await.is_err());
        assert!(matches!(
            provider.embed(vec!["x".to_string()]).await.unwrap_err(),
            CoreError::EmbeddingError(_)
        ));
    }

    #[tokio::test]
    async fn test_mock_embeddings_are_deterministic() {
        let provider = MockAIProvider::new("test");

        let a = provider.embed(vec!["beach waves".to_string()]).await.unwrap();
        let b = provider.embed(vec!["beach waves".to_string()]).await.unwrap();
        let c = provider.embed(vec!["city traffic".to_string()]).await.unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a[0].len(), 32);
    }
}
