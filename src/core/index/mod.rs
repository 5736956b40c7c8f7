//! Vector Index Port
//!
//! The retrieval engine searches two embedding spaces per video: one built
//! from generated descriptions, one from spoken transcripts. Backends
//! (Chroma, Qdrant, pgvector, ...) live behind the [`VectorIndex`] trait;
//! the engine only assumes similarity scores in `[0.0, 1.0]`, higher is
//! more similar.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{CoreResult, Score, VideoId};

mod memory;
pub use memory::MemoryVectorIndex;

// =============================================================================
// Index Space
// =============================================================================

/// Which of the two embedding spaces an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexSpace {
    Description,
    Transcript,
}

impl IndexSpace {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexSpace::Description => "description",
            IndexSpace::Transcript => "transcript",
        }
    }
}

impl std::fmt::Display for IndexSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Hits
// =============================================================================

/// One nearest-neighbor result from a single space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexHit {
    pub video_id: VideoId,
    /// Similarity in `[0.0, 1.0]`, higher = more similar.
    pub score: Score,
}

// =============================================================================
// Vector Index Trait
// =============================================================================

/// Nearest-neighbor store over per-video embeddings.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Inserts or replaces the embedding for a video in one space
    async fn upsert(
        &self,
        space: IndexSpace,
        video_id: &str,
        embedding: Vec<f32>,
    ) -> CoreResult<()>;

    /// Returns up to `limit` nearest neighbors in one space, best first
    async fn search(
        &self,
        space: IndexSpace,
        embedding: &[f32],
        limit: usize,
    ) -> CoreResult<Vec<IndexHit>>;

    /// Removes a video from both spaces (missing entries are not an error)
    async fn remove(&self, video_id: &str) -> CoreResult<()>;

    /// Checks backend reachability
    async fn health_check(&self) -> CoreResult<()>;
}
