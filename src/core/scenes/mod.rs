//! Scene Segmentation Module
//!
//! Splits a source video into clips from a frame-difference signal. The
//! segmenter itself is pure: it consumes an ordered list of
//! [`DiffSample`]s and a total duration. Extracting that signal from a real
//! file lives in [`ffmpeg`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{CoreResult, TimeSec};

pub mod ffmpeg;

// =============================================================================
// Clip Model
// =============================================================================

/// One contiguous clip produced by segmentation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    /// Unique clip ID
    pub id: String,
    /// Start time in seconds
    pub start_sec: TimeSec,
    /// End time in seconds
    pub end_sec: TimeSec,
}

impl Clip {
    pub fn new(start_sec: TimeSec, end_sec: TimeSec) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            start_sec,
            end_sec,
        }
    }

    /// Returns the duration of the clip in seconds
    pub fn duration(&self) -> TimeSec {
        self.end_sec - self.start_sec
    }

    /// Returns the midpoint time of the clip
    pub fn midpoint(&self) -> TimeSec {
        (self.start_sec + self.end_sec) / 2.0
    }
}

// =============================================================================
// Diff Signal
// =============================================================================

/// One frame-difference measurement, ordered by time
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSample {
    /// Frame timestamp in seconds
    pub time: TimeSec,
    /// Difference score against the previous frame (0.0 - 1.0)
    pub score: f64,
}

// =============================================================================
// Segmenter Configuration
// =============================================================================

/// Configuration for scene segmentation
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmenterConfig {
    /// Difference score above which a cut is considered (0.0 - 1.0).
    /// Lower values cut more aggressively.
    pub threshold: f64,
    /// Minimum clip duration in seconds; earlier spikes merge into the
    /// open clip instead of cutting
    pub min_duration: TimeSec,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            min_duration: 0.6,
        }
    }
}

// =============================================================================
// Scene Segmenter
// =============================================================================

/// Splits videos into clips at frame-difference spikes
pub struct SceneSegmenter {
    config: SegmenterConfig,
}

impl SceneSegmenter {
    /// Creates a segmenter with default configuration
    pub fn new() -> Self {
        Self {
            config: SegmenterConfig::default(),
        }
    }

    /// Creates a segmenter with custom configuration
    pub fn with_config(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Detects clips in a video file (ffmpeg/ffprobe must be on PATH)
    pub fn detect<P: AsRef<std::path::Path>>(&self, path: P) -> CoreResult<Vec<Clip>> {
        let path = path.as_ref();
        let duration = ffmpeg::video_duration(path)?;
        let samples = ffmpeg::extract_diff_signal(path)?;
        Ok(self.segment(&samples, duration))
    }

    /// Segments a diff signal into clips.
    ///
    /// Single pass: a sample above the threshold closes the open clip only
    /// when that clip has reached `min_duration`; the final open clip is
    /// always emitted at end of timeline, even when short. The result is
    /// contiguous, covers `[0, total_duration]`, and always has at least one
    /// clip; a non-positive duration degenerates to a single empty clip.
    pub fn segment(&self, samples: &[DiffSample], total_duration: TimeSec) -> Vec<Clip> {
        let total_duration = total_duration.max(0.0);

        let mut clips = Vec::new();
        let mut open_start: TimeSec = 0.0;

        for sample in samples {
            if sample.time <= open_start || sample.time >= total_duration {
                continue;
            }
            if sample.score > self.config.threshold
                && sample.time - open_start >= self.config.min_duration
            {
                clips.push(Clip::new(open_start, sample.time));
                open_start = sample.time;
            }
        }

        // The last clip always closes at end of timeline.
        clips.push(Clip::new(open_start, total_duration));

        debug!(
            "Segmented {:.2}s of video into {} clip(s)",
            total_duration,
            clips.len()
        );
        clips
    }
}

impl Default for SceneSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(pairs: &[(f64, f64)]) -> Vec<DiffSample> {
        pairs
            .iter()
            .map(|(time, score)| DiffSample {
                time: *time,
                score: *score,
            })
            .collect()
    }

    fn assert_covers(clips: &[Clip], total: f64) {
        assert!(!clips.is_empty());
        assert_eq!(clips[0].start_sec, 0.0);
        assert_eq!(clips.last().unwrap().end_sec, total);
        for window in clips.windows(2) {
            assert_eq!(window[0].end_sec, window[1].start_sec);
        }
    }

    // -------------------------------------------------------------------------
    // Clip Model Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_clip_creation() {
        let clip = Clip::new(2.5, 7.5);

        assert!(!clip.id.is_empty());
        assert_eq!(clip.duration(), 5.0);
        assert_eq!(clip.midpoint(), 5.0);
    }

    // -------------------------------------------------------------------------
    // Segmenter Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_default_config() {
        let segmenter = SceneSegmenter::new();
        assert_eq!(segmenter.config.threshold, 0.3);
        assert_eq!(segmenter.config.min_duration, 0.6);
    }

    #[test]
    fn test_segment_cuts_at_spikes() {
        let segmenter = SceneSegmenter::new();
        let signal = samples(&[(1.0, 0.05), (2.0, 0.8), (3.5, 0.02), (5.0, 0.9)]);

        let clips = segmenter.segment(&signal, 10.0);

        assert_eq!(clips.len(), 3);
        assert_eq!(clips[0].end_sec, 2.0);
        assert_eq!(clips[1].end_sec, 5.0);
        assert_eq!(clips[2].end_sec, 10.0);
        assert_covers(&clips, 10.0);
    }

    #[test]
    fn test_segment_merges_early_spikes() {
        let config = SegmenterConfig {
            threshold: 0.3,
            min_duration: 2.0,
        };
        let segmenter = SceneSegmenter::with_config(config);
        // Spike at 1.0 arrives before min_duration; it merges into the open
        // clip and the next qualifying spike at 3.0 cuts instead.
        let signal = samples(&[(1.0, 0.9), (3.0, 0.9)]);

        let clips = segmenter.segment(&signal, 10.0);

        assert_eq!(clips.len(), 2);
        assert_eq!(clips[0].end_sec, 3.0);
        assert_covers(&clips, 10.0);
    }

    #[test]
    fn test_segment_flat_signal_is_one_clip() {
        let segmenter = SceneSegmenter::new();
        let signal = samples(&[(1.0, 0.01), (2.0, 0.02), (3.0, 0.01)]);

        let clips = segmenter.segment(&signal, 10.0);

        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].start_sec, 0.0);
        assert_eq!(clips[0].end_sec, 10.0);
    }

    #[test]
    fn test_segment_empty_signal_is_one_clip() {
        let segmenter = SceneSegmenter::new();
        let clips = segmenter.segment(&[], 7.5);

        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].end_sec, 7.5);
    }

    #[test]
    fn test_segment_final_clip_may_be_short() {
        let segmenter = SceneSegmenter::new();
        // Cut at 9.8 leaves a 0.2s tail, below min_duration; still emitted.
        let signal = samples(&[(9.8, 0.9)]);

        let clips = segmenter.segment(&signal, 10.0);

        assert_eq!(clips.len(), 2);
        assert_eq!(clips[1].start_sec, 9.8);
        assert_eq!(clips[1].end_sec, 10.0);
        assert_covers(&clips, 10.0);
    }

    #[test]
    fn test_segment_ignores_out_of_range_samples() {
        let segmenter = SceneSegmenter::new();
        let signal = samples(&[(0.0, 0.9), (12.0, 0.9), (4.0, 0.9)]);

        let clips = segmenter.segment(&signal, 10.0);

        assert_eq!(clips.len(), 2);
        assert_eq!(clips[0].end_sec, 4.0);
    }

    #[test]
    fn test_segment_nonpositive_duration_yields_one_empty_clip() {
        let segmenter = SceneSegmenter::new();

        for duration in [0.0, -3.0] {
            let clips = segmenter.segment(&[], duration);
            assert_eq!(clips.len(), 1);
            assert_eq!(clips[0].start_sec, 0.0);
            assert_eq!(clips[0].duration(), 0.0);
        }
    }

    #[test]
    fn test_detect_file_not_found() {
        let segmenter = SceneSegmenter::new();
        let result = segmenter.detect("/nonexistent/video.mp4");
        assert!(matches!(
            result,
            Err(crate::core::CoreError::FileNotFound(_))
        ));
    }
}
