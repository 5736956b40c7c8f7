//! AI Collaborator Ports
//!
//! The engine treats model inference as an external concern: completions and
//! embeddings come from [`AIProvider`] implementations, and the
//! [`ProviderChain`] fails over across a prioritized list of them.

mod provider;
pub use provider::{
    AIProvider, CompletionRequest, CompletionResponse, FinishReason, MockAIProvider, TokenUsage,
};

mod chain;
pub use chain::{extract_json_block, ChainConfig, ProviderChain};

#[cfg(feature = "remote-providers")]
pub mod providers;
