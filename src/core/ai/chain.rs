//! Provider Chain
//!
//! Prioritized failover across interchangeable AI providers. Callers talk to
//! the chain as if it were a single provider; the chain tries each configured
//! provider in order, retrying transient failures with exponential backoff
//! before moving to the next.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::{CoreError, CoreResult};

use super::{AIProvider, CompletionRequest, CompletionResponse};

// =============================================================================
// Chain Configuration
// =============================================================================

/// Configuration for the provider chain
#[derive(Clone, Debug)]
pub struct ChainConfig {
    /// Retries per provider before failing over
    pub max_retries: u32,
    /// Base backoff delay; doubles per attempt
    pub backoff_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 100,
        }
    }
}

// =============================================================================
// Provider Chain
// =============================================================================

/// Prioritized list of AI providers with failover
pub struct ProviderChain {
    providers: Vec<Arc<dyn AIProvider>>,
    config: ChainConfig,
}

impl ProviderChain {
    /// Creates a chain from providers in priority order (first = preferred)
    pub fn new(providers: Vec<Arc<dyn AIProvider>>) -> Self {
        Self {
            providers,
            config: ChainConfig::default(),
        }
    }

    /// Creates a single-provider chain
    pub fn single(provider: impl AIProvider + 'static) -> Self {
        Self::new(vec![Arc::new(provider)])
    }

    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    /// Names of configured providers, in priority order
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Generates a completion, failing over across providers
    pub async fn complete(&self, request: CompletionRequest) -> CoreResult<CompletionResponse> {
        let mut last_error = None;

        for provider in &self.providers {
            if !provider.is_available() {
                debug!("Skipping unavailable provider '{}'", provider.name());
                continue;
            }
            match self.complete_with_retry(provider.as_ref(), &request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!("Provider '{}' failed: {}", provider.name(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| CoreError::Internal("No AI provider configured".to_string())))
    }

    /// Generates embeddings, failing over across providers.
    ///
    /// All failures surface as `EmbeddingError`; callers never see which
    /// backend was tried last.
    pub async fn embed(&self, texts: Vec<String>) -> CoreResult<Vec<Vec<f32>>> {
        let mut last_error = None;

        for provider in &self.providers {
            if !provider.is_available() {
                continue;
            }
            match provider.embed(texts.clone()).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) => {
                    warn!("Embedding via '{}' failed: {}", provider.name(), e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(CoreError::EmbeddingError(msg)) => Err(CoreError::EmbeddingError(msg)),
            Some(e) => Err(CoreError::EmbeddingError(e.to_string())),
            None => Err(CoreError::EmbeddingError(
                "No AI provider configured".to_string(),
            )),
        }
    }

    /// Embeds a single text
    pub async fn embed_one(&self, text: &str) -> CoreResult<Vec<f32>> {
        let mut embeddings = self.embed(vec![text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| CoreError::EmbeddingError("Provider returned no embedding".to_string()))
    }

    async fn complete_with_retry(
        &self,
        provider: &dyn AIProvider,
        request: &CompletionRequest,
    ) -> CoreResult<CompletionResponse> {
        let mut last_error = None;

        for attempt in 0..self.config.max_retries {
            match provider.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries - 1 {
                        tokio::time::sleep(tokio::time::Duration::from_millis(
                            self.config.backoff_ms * (2_u64.pow(attempt)),
                        ))
                        .await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::Internal("Unknown error".to_string())))
    }
}

// =============================================================================
// JSON Extraction
// =============================================================================

/// Extracts a JSON payload from a model response, stripping markdown code
/// fences when present.
pub fn extract_json_block(text: &str) -> &str {
    let candidate = if text.contains("```json") {
        text.split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(text)
    } else if text.contains("```") {
        text.split("```")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(text)
    } else {
        text
    };
    candidate.trim()
}
