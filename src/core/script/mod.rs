//! Script Module
//!
//! Turns narration text into ordered query segments. Literal text is
//! segmented locally with no model calls; free-form instructions are
//! expanded into a segment list by the provider chain, with per-segment
//! duration hints that sum to roughly the requested target.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::ai::{extract_json_block, CompletionRequest, ProviderChain};
use crate::core::{CoreError, CoreResult, TimeSec};

/// Target size for one grouped segment, in characters
const MAX_SEGMENT_CHARS: usize = 200;

/// Assumed narration reading speed
const WORDS_PER_SECOND: f64 = 2.5;

// =============================================================================
// Text Segment
// =============================================================================

/// One ordered narration segment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSegment {
    pub text: String,
    /// Expected on-screen duration for footage matched to this segment
    pub duration_hint: Option<TimeSec>,
}

impl TextSegment {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let hint = estimate_reading_duration(&text);
        Self {
            text,
            duration_hint: Some(hint),
        }
    }
}

/// Estimates how long the text takes to read aloud
pub fn estimate_reading_duration(text: &str) -> TimeSec {
    let words = text.split_whitespace().count();
    (words as f64 / WORDS_PER_SECOND).max(1.0)
}

// =============================================================================
// Text Segmentation
// =============================================================================

/// Segments literal narration text.
///
/// Pure and fully materialized: paragraphs split first, then sentences are
/// greedily grouped up to ~200 characters. Input order is preserved; an
/// all-whitespace input yields no segments.
pub fn segment(text: &str) -> Vec<TextSegment> {
    let mut segments = Vec::new();

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        let mut current = String::new();
        for sentence in split_sentences(paragraph) {
            if current.is_empty() {
                current = sentence;
            } else if current.len() + 1 + sentence.len() <= MAX_SEGMENT_CHARS {
                current.push(' ');
                current.push_str(&sentence);
            } else {
                segments.push(TextSegment::new(std::mem::take(&mut current)));
                current = sentence;
            }
        }
        if !current.is_empty() {
            segments.push(TextSegment::new(current));
        }
    }

    segments
}

/// Splits a paragraph into sentences on terminal punctuation, keeping the
/// punctuation attached.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in paragraph.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

// =============================================================================
// Instruction Expansion
// =============================================================================

const EXPAND_SYSTEM_PROMPT: &str = r#"You are a scriptwriter for short-form video. Given a brief instruction and a target duration, write the narration as a JSON array of segments:

[{"text": "...", "durationSec": 4.5}, ...]

Rules:
- Each segment describes one visual moment that archive footage could cover.
- durationSec values must sum to approximately the target duration.
- Return ONLY the JSON array."#;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpandedSegment {
    text: String,
    duration_sec: Option<f64>,
}

/// Expands free-form instructions into narration segments via the
/// provider chain
pub struct InstructionExpander {
    chain: std::sync::Arc<ProviderChain>,
}

impl InstructionExpander {
    pub fn new(chain: std::sync::Arc<ProviderChain>) -> Self {
        Self { chain }
    }

    /// Expands `instruction` into ordered segments whose duration hints sum
    /// to roughly `target_duration` seconds.
    ///
    /// Any provider or parse failure is `ExpansionFailed`; callers treat it
    /// as fatal because every downstream unit depends on this output.
    pub async fn expand(
        &self,
        instruction: &str,
        target_duration: TimeSec,
    ) -> CoreResult<Vec<TextSegment>> {
        if instruction.trim().is_empty() {
            return Err(CoreError::ExpansionFailed(
                "instruction must not be empty".to_string(),
            ));
        }
        if target_duration <= 0.0 {
            return Err(CoreError::ExpansionFailed(format!(
                "target duration must be positive, got {}",
                target_duration
            )));
        }

        let prompt = format!(
            "Instruction: {}\nTarget duration: {:.1} seconds\n\nWrite the narration segments.",
            instruction, target_duration
        );
        let request = CompletionRequest::new(&prompt)
            .with_system(EXPAND_SYSTEM_PROMPT)
            .with_temperature(0.7)
            .with_json_mode();

        let response = self
            .chain
            .complete(request)
            .await
            .map_err(|e| CoreError::ExpansionFailed(e.to_string()))?;

        let segments = parse_expansion(&response.text)?;
        info!(
            "Expanded instruction into {} segment(s) targeting {:.1}s",
            segments.len(),
            target_duration
        );
        Ok(segments)
    }
}

fn parse_expansion(text: &str) -> CoreResult<Vec<TextSegment>> {
    let json = extract_json_block(text);
    let raw: Vec<ExpandedSegment> = serde_json::from_str(json)
        .map_err(|e| CoreError::ExpansionFailed(format!("Failed to parse segments: {}", e)))?;

    let segments: Vec<TextSegment> = raw
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .map(|s| TextSegment {
            duration_hint: Some(
                s.duration_sec
                    .filter(|d| d.is_finite() && *d > 0.0)
                    .unwrap_or_else(|| estimate_reading_duration(&s.text)),
            ),
            text: s.text.trim().to_string(),
        })
        .collect();

    if segments.is_empty() {
        return Err(CoreError::ExpansionFailed(
            "Model returned no usable segments".to_string(),
        ));
    }
    Ok(segments)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::MockAIProvider;
    use std::sync::Arc;

    // -------------------------------------------------------------------------
    // Segmentation Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_segment_groups_short_sentences() {
        let text = "First sentence. Second sentence. Third sentence.";
        let segments = segment(text);

        assert_eq!(segments.len(), 1);
        assert_eq!(
            segments[0].text,
            "First sentence. Second sentence. Third sentence."
        );
        assert!(segments[0].duration_hint.unwrap() >= 1.0);
    }

    #[test]
    fn test_segment_splits_at_char_limit() {
        let long_sentence = format!("{}.", "word ".repeat(45).trim());
        let text = format!("{} {}", long_sentence, long_sentence);
        let segments = segment(&text);

        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn test_segment_respects_paragraphs() {
        let text = "Opening shot.\n\nClosing shot.";
        let segments = segment(text);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Opening shot.");
        assert_eq!(segments[1].text, "Closing shot.");
    }

    #[test]
    fn test_segment_preserves_order() {
        let text = "Alpha. Bravo.\n\nCharlie. Delta.\n\nEcho.";
        let segments = segment(text);
        let joined: String = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        assert_eq!(joined, "Alpha. Bravo. Charlie. Delta. Echo.");
    }

    #[test]
    fn test_segment_empty_input() {
        assert!(segment("").is_empty());
        assert!(segment("  \n\n  ").is_empty());
    }

    #[test]
    fn test_segment_unterminated_text() {
        let segments = segment("no terminal punctuation here");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "no terminal punctuation here");
    }

    #[test]
    fn test_estimate_reading_duration() {
        // 10 words at 2.5 words/sec = 4s
        let text = "one two three four five six seven eight nine ten";
        assert_eq!(estimate_reading_duration(text), 4.0);
        // floor of 1 second
        assert_eq!(estimate_reading_duration("hi"), 1.0);
    }

    // -------------------------------------------------------------------------
    // Expansion Tests
    // -------------------------------------------------------------------------

    fn chain_with_response(response: &str) -> Arc<ProviderChain> {
        Arc::new(ProviderChain::single(
            MockAIProvider::new("mock").with_response(response),
        ))
    }

    #[tokio::test]
    async fn test_expand_parses_segments() {
        let response = r#"[
            {"text": "A drone rises over the coastline.", "durationSec": 5.0},
            {"text": "Waves crash on the rocks.", "durationSec": 3.0}
        ]"#;
        let expander = InstructionExpander::new(chain_with_response(response));

        let segments = expander.expand("make a coastal intro", 8.0).await.unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].duration_hint, Some(5.0));
        assert_eq!(segments[1].text, "Waves crash on the rocks.");
    }

    #[tokio::test]
    async fn test_expand_strips_code_fences() {
        let response = "```json\n[{\"text\": \"City at night.\", \"durationSec\": 4.0}]\n```";
        let expander = InstructionExpander::new(chain_with_response(response));

        let segments = expander.expand("city montage", 4.0).await.unwrap();
        assert_eq!(segments.len(), 1);
    }

    #[tokio::test]
    async fn test_expand_fills_missing_duration_hint() {
        let response = r#"[{"text": "one two three four five"}]"#;
        let expander = InstructionExpander::new(chain_with_response(response));

        let segments = expander.expand("anything", 10.0).await.unwrap();
        assert_eq!(segments[0].duration_hint, Some(2.0));
    }

    #[tokio::test]
    async fn test_expand_bad_json_is_expansion_failed() {
        let expander = InstructionExpander::new(chain_with_response("sorry, I cannot do that"));

        let err = expander.expand("anything", 10.0).await.unwrap_err();
        assert!(matches!(err, CoreError::ExpansionFailed(_)));
    }

    #[tokio::test]
    async fn test_expand_provider_failure_is_expansion_failed() {
        let chain = Arc::new(ProviderChain::single(
            MockAIProvider::new("dead").with_available(false),
        ));
        let expander = InstructionExpander::new(chain);

        let err = expander.expand("anything", 10.0).await.unwrap_err();
        assert!(matches!(err, CoreError::ExpansionFailed(_)));
    }

    #[tokio::test]
    async fn test_expand_validates_input() {
        let expander = InstructionExpander::new(chain_with_response("[]"));

        assert!(matches!(
            expander.expand("  ", 10.0).await,
            Err(CoreError::ExpansionFailed(_))
        ));
        assert!(matches!(
            expander.expand("ok", 0.0).await,
            Err(CoreError::ExpansionFailed(_))
        ));
    }
}
