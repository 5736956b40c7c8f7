//! Archive data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::{TimeSec, VideoId};

// =============================================================================
// Video Metadata
// =============================================================================

/// Structured attributes extracted at indexing time. All string fields are
/// free-form labels produced by the describer; empty string = unknown.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    #[serde(default)]
    pub scene: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub time_of_day: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub orientation: String,
    #[serde(default)]
    pub camera: String,
    #[serde(default)]
    pub duration_sec: TimeSec,
    /// Star rating, 0 = unrated, 1-5 = rated
    #[serde(default)]
    pub rating: u8,
}

// =============================================================================
// Video Record
// =============================================================================

/// One indexed video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: VideoId,
    pub path: String,
    /// Generated visual description, never empty for an indexed video
    pub description: String,
    /// Spoken transcript; empty when the video has no usable speech
    #[serde(default)]
    pub transcript: String,
    pub metadata: VideoMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    pub fn new(path: impl Into<String>, description: impl Into<String>) -> Self {
        let path = path.into();
        let now = Utc::now();
        Self {
            id: video_id_for_path(&path),
            path,
            description: description.into(),
            transcript: String::new(),
            metadata: VideoMetadata::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = transcript.into();
        self
    }

    pub fn with_metadata(mut self, metadata: VideoMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether the record carries a transcript signal
    pub fn has_transcript(&self) -> bool {
        !self.transcript.trim().is_empty()
    }
}

/// Stable identifier derived from the archive-relative path. Re-processing a
/// video keeps its id, so the vector index and store stay in sync across
/// updates.
pub fn video_id_for_path(path: &str) -> VideoId {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let digest = hasher.finalize();
    // 16 bytes of the digest is plenty for collision resistance here
    digest[..16].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_is_stable() {
        let a = video_id_for_path("clips/beach.mp4");
        let b = video_id_for_path("clips/beach.mp4");
        let c = video_id_for_path("clips/city.mp4");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_record_builder() {
        let record = VideoRecord::new("clips/beach.mp4", "waves at sunset")
            .with_transcript("listen to the waves");

        assert_eq!(record.id, video_id_for_path("clips/beach.mp4"));
        assert!(record.has_transcript());

        let silent = VideoRecord::new("clips/drone.mp4", "aerial shot");
        assert!(!silent.has_transcript());
    }
}
