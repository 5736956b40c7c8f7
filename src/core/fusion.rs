//! Score Fusion
//!
//! Combines description-space and transcript-space similarity into a single
//! ranking score. Each space reports similarity in `[0.0, 1.0]`. A video seen
//! in only one space scores by that space alone: a missing modality is no
//! signal, never a penalty. Ordering is fully deterministic: fused score
//! descending, then video id ascending.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{Score, VideoId};

// =============================================================================
// Fusion Weights
// =============================================================================

/// Relative weights for the two similarity spaces.
///
/// Weights are normalized at construction so callers can pass any positive
/// pair (e.g. `3.0, 2.0`) and get the same ranking as `0.6, 0.4`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub description: f64,
    pub transcript: f64,
}

impl FusionWeights {
    /// Creates normalized weights. Non-positive or non-finite pairs fall back
    /// to the equal-weight default.
    pub fn new(description: f64, transcript: f64) -> Self {
        let sum = description + transcript;
        if !sum.is_finite() || sum <= 0.0 || description < 0.0 || transcript < 0.0 {
            return Self::default();
        }
        Self {
            description: description / sum,
            transcript: transcript / sum,
        }
    }

    /// Weights the description space only (transcript signal ignored).
    pub fn description_only() -> Self {
        Self {
            description: 1.0,
            transcript: 0.0,
        }
    }
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            description: 0.5,
            transcript: 0.5,
        }
    }
}

// =============================================================================
// Fused Hits
// =============================================================================

/// One video's fused score with its per-space components preserved for
/// display and debugging.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedHit {
    pub video_id: VideoId,
    pub score: Score,
    pub description_score: Option<Score>,
    pub transcript_score: Option<Score>,
}

/// Fuses per-space hit maps into a deterministically ordered ranking.
///
/// Weights apply only when both signals are present; a single-signal video
/// keeps that signal's score unchanged. Scores outside `[0.0, 1.0]` are
/// clamped before weighting, so the fused score is itself always in
/// `[0.0, 1.0]`.
pub fn fuse(
    description_hits: &HashMap<VideoId, Score>,
    transcript_hits: &HashMap<VideoId, Score>,
    weights: FusionWeights,
) -> Vec<FusedHit> {
    let mut fused: Vec<FusedHit> = Vec::with_capacity(description_hits.len());

    for (video_id, &desc_score) in description_hits {
        let desc_score = clamp_unit(desc_score);
        let trans_score = transcript_hits.get(video_id).map(|s| clamp_unit(*s));
        let score = match trans_score {
            Some(trans_score) => {
                weights.description * desc_score + weights.transcript * trans_score
            }
            // No transcript signal: the description score stands as-is.
            None => desc_score,
        };
        fused.push(FusedHit {
            video_id: video_id.clone(),
            score,
            description_score: Some(desc_score),
            transcript_score: trans_score,
        });
    }

    // Transcript-only videos compete at their full transcript score.
    for (video_id, &trans_score) in transcript_hits {
        if description_hits.contains_key(video_id) {
            continue;
        }
        let trans_score = clamp_unit(trans_score);
        fused.push(FusedHit {
            video_id: video_id.clone(),
            score: trans_score,
            description_score: None,
            transcript_score: Some(trans_score),
        });
    }

    sort_hits(&mut fused);
    fused
}

/// Sorts hits by fused score descending, then description score descending,
/// then video id ascending. Total ordering, so equal inputs always produce
/// byte-identical output.
pub fn sort_hits(hits: &mut [FusedHit]) {
    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| {
                b.description_score
                    .unwrap_or(0.0)
                    .total_cmp(&a.description_score.unwrap_or(0.0))
            })
            .then_with(|| a.video_id.cmp(&b.video_id))
    });
}

fn clamp_unit(score: Score) -> Score {
    if !score.is_finite() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(pairs: &[(&str, f64)]) -> HashMap<VideoId, Score> {
        pairs.iter().map(|(id, s)| (id.to_string(), *s)).collect()
    }

    #[test]
    fn test_weights_normalize() {
        let w = FusionWeights::new(3.0, 2.0);
        assert!((w.description - 0.6).abs() < 1e-12);
        assert!((w.transcript - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_weights_reject_invalid() {
        assert_eq!(FusionWeights::new(0.0, 0.0), FusionWeights::default());
        assert_eq!(FusionWeights::new(-1.0, 2.0), FusionWeights::default());
        assert_eq!(FusionWeights::new(f64::NAN, 1.0), FusionWeights::default());
    }

    #[test]
    fn test_fuse_combines_both_spaces() {
        let desc = hits(&[("a", 0.8), ("b", 0.4)]);
        let trans = hits(&[("a", 0.6), ("c", 0.9)]);

        let fused = fuse(&desc, &trans, FusionWeights::default());

        assert_eq!(fused.len(), 3);
        // c: transcript-only, keeps 0.9
        assert_eq!(fused[0].video_id, "c");
        assert_eq!(fused[0].score, 0.9);
        assert_eq!(fused[0].description_score, None);
        // a: 0.5*0.8 + 0.5*0.6 = 0.7
        assert_eq!(fused[1].video_id, "a");
        assert!((fused[1].score - 0.7).abs() < 1e-12);
        // b: description-only, keeps 0.4
        assert_eq!(fused[2].video_id, "b");
        assert_eq!(fused[2].score, 0.4);
        assert_eq!(fused[2].transcript_score, None);
    }

    #[test]
    fn test_fuse_absent_modality_is_not_a_penalty() {
        let desc = hits(&[("solo", 0.9)]);
        let fused = fuse(&desc, &HashMap::new(), FusionWeights::default());
        assert_eq!(fused[0].score, 0.9);

        let trans = hits(&[("voice", 0.9)]);
        let fused = fuse(&HashMap::new(), &trans, FusionWeights::default());
        assert_eq!(fused[0].score, 0.9);
    }

    #[test]
    fn test_fuse_single_strong_signal_outranks_weaker_pair() {
        // A description-only 0.9 must beat a video scoring 0.5 in both
        // spaces; weighting only applies when both signals exist.
        let desc = hits(&[("solo", 0.9), ("pair", 0.5)]);
        let trans = hits(&[("pair", 0.5)]);

        let fused = fuse(&desc, &trans, FusionWeights::default());

        assert_eq!(fused[0].video_id, "solo");
        assert_eq!(fused[0].score, 0.9);
        assert_eq!(fused[1].video_id, "pair");
        assert_eq!(fused[1].score, 0.5);
    }

    #[test]
    fn test_fuse_without_any_transcripts_equals_description_scores() {
        let desc = hits(&[("a", 0.93), ("b", 0.42), ("c", 0.05)]);

        let fused = fuse(&desc, &HashMap::new(), FusionWeights::default());

        assert_eq!(fused.len(), 3);
        for hit in &fused {
            assert_eq!(Some(hit.score), hit.description_score);
            assert_eq!(hit.transcript_score, None);
        }
    }

    #[test]
    fn test_fuse_tie_break_is_lexicographic() {
        let desc = hits(&[("zeta", 0.5), ("alpha", 0.5), ("mid", 0.5)]);
        let trans = HashMap::new();

        let fused = fuse(&desc, &trans, FusionWeights::default());
        let order: Vec<&str> = fused.iter().map(|h| h.video_id.as_str()).collect();
        assert_eq!(order, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_fuse_is_deterministic_across_runs() {
        let desc = hits(&[("a", 0.31), ("b", 0.93), ("c", 0.31), ("d", 0.05)]);
        let trans = hits(&[("b", 0.11), ("e", 0.77)]);

        let first = fuse(&desc, &trans, FusionWeights::new(0.6, 0.4));
        for _ in 0..10 {
            assert_eq!(fuse(&desc, &trans, FusionWeights::new(0.6, 0.4)), first);
        }
    }

    #[test]
    fn test_fuse_clamps_out_of_range_scores() {
        let desc = hits(&[("a", 1.7), ("b", -0.3)]);
        let trans = HashMap::new();

        let fused = fuse(&desc, &trans, FusionWeights::description_only());
        assert_eq!(fused[0].score, 1.0);
        assert_eq!(fused[1].score, 0.0);
    }
}
