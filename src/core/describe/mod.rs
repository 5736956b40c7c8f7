//! Unit Describer
//!
//! Produces the query text for one unit. Clip units go through the
//! [`ClipDescriber`] port (an external captioning collaborator); text units
//! are rephrased into visual language by the provider chain. Either way the
//! output is non-empty or the unit fails with `DescriptionUnavailable`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::ai::{CompletionRequest, ProviderChain};
use crate::core::scenes::Clip;
use crate::core::{CoreError, CoreResult};

// =============================================================================
// Clip Describer Port
// =============================================================================

/// Captioning collaborator for video clips
#[async_trait]
pub trait ClipDescriber: Send + Sync {
    /// Returns the describer name
    fn name(&self) -> &str;

    /// Describes the visual content of one clip of `video_path`.
    /// Must return non-empty text or `DescriptionUnavailable`.
    async fn describe(&self, video_path: &str, clip: &Clip) -> CoreResult<String>;
}

// =============================================================================
// Text Unit Describer
// =============================================================================

const DESCRIBE_SYSTEM_PROMPT: &str = "You describe stock footage. Given a line of narration, \
describe in one sentence the visual content of a video clip that would best accompany it. \
Mention subjects, setting, and motion. Return only the description.";

/// Rephrases narration segments into visual descriptions
pub struct TextDescriber {
    chain: Arc<ProviderChain>,
}

impl TextDescriber {
    pub fn new(chain: Arc<ProviderChain>) -> Self {
        Self { chain }
    }

    pub async fn describe(&self, narration: &str) -> CoreResult<String> {
        if narration.trim().is_empty() {
            return Err(CoreError::DescriptionUnavailable(
                "narration segment is empty".to_string(),
            ));
        }

        let request = CompletionRequest::new(narration)
            .with_system(DESCRIBE_SYSTEM_PROMPT)
            .with_temperature(0.4)
            .with_max_tokens(200);

        let response = self
            .chain
            .complete(request)
            .await
            .map_err(|e| CoreError::DescriptionUnavailable(e.to_string()))?;

        let description = response.text.trim().to_string();
        if description.is_empty() {
            return Err(CoreError::DescriptionUnavailable(
                "Model returned an empty description".to_string(),
            ));
        }
        Ok(description)
    }
}

// =============================================================================
// Background Bias
// =============================================================================

/// Prepends shared run context to a unit description so the embedded query
/// leans toward the run's overall setting.
pub fn apply_background_bias(description: &str, background: Option<&str>) -> String {
    match background.map(str::trim) {
        Some(bg) if !bg.is_empty() => format!("{}. {}", bg, description),
        _ => description.to_string(),
    }
}

// =============================================================================
// Mock Describer (for testing)
// =============================================================================

/// Mock clip describer for tests.
///
/// Describes a clip as its midpoint timestamp unless a canned response or
/// failure is configured.
pub struct MockClipDescriber {
    response: Option<String>,
    fail: bool,
    delay: Option<std::time::Duration>,
}

impl MockClipDescriber {
    pub fn new() -> Self {
        Self {
            response: None,
            fail: false,
            delay: None,
        }
    }

    pub fn with_response(mut self, response: &str) -> Self {
        self.response = Some(response.to_string());
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Default for MockClipDescriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClipDescriber for MockClipDescriber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn describe(&self, video_path: &str, clip: &Clip) -> CoreResult<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(CoreError::DescriptionUnavailable(
                "mock describer configured to fail".to_string(),
            ));
        }
        Ok(self.response.clone().unwrap_or_else(|| {
            format!("clip of {} around {:.1}s", video_path, clip.midpoint())
        }))
    }
}

// =============================================================================
// Tests
// =============================================================================
