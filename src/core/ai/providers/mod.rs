//! Remote AI Provider Implementations
//!
//! Compiled only with the `remote-providers` feature.

use serde::{Deserialize, Serialize};

mod openai;
pub use openai::OpenAIProvider;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for a remote provider
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// API key
    pub api_key: Option<String>,
    /// Base URL override (for OpenAI-compatible endpoints)
    pub base_url: Option<String>,
    /// Completion model override
    pub model: Option<String>,
    /// Embedding model override
    pub embedding_model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// Creates a config for the OpenAI API
    pub fn openai(api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            base_url: None,
            model: None,
            embedding_model: None,
            timeout_secs: None,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    pub fn with_embedding_model(mut self, model: &str) -> Self {
        self.embedding_model = Some(model.to_string());
        self
    }
}
