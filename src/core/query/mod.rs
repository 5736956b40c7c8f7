//! Query Engine
//!
//! Turns a free-text query into a ranked candidate list: embed the query
//! once, over-fetch nearest neighbors from both embedding spaces, fuse the
//! two signals into one score, apply metadata filters from the archive, and
//! truncate to the requested size.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::ai::ProviderChain;
use crate::core::archive::{VideoMetadata, VideoStore};
use crate::core::fusion::{self, FusionWeights};
use crate::core::index::{IndexSpace, VectorIndex};
use crate::core::{CoreError, CoreResult, Score, TimeSec, VideoId};

// =============================================================================
// Metadata Filter
// =============================================================================

/// Equality filter over structured video metadata. `None` fields match
/// everything; string matches are case-insensitive.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataFilter {
    pub scene: Option<String>,
    pub location: Option<String>,
    pub time_of_day: Option<String>,
    pub color: Option<String>,
    pub orientation: Option<String>,
    pub camera: Option<String>,
    /// Minimum duration in seconds
    pub min_duration_sec: Option<TimeSec>,
    /// Minimum star rating (1-5)
    pub min_rating: Option<u8>,
}

impl MetadataFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, metadata: &VideoMetadata) -> bool {
        let field_matches = |want: &Option<String>, have: &str| match want {
            Some(want) => want.eq_ignore_ascii_case(have),
            None => true,
        };

        field_matches(&self.scene, &metadata.scene)
            && field_matches(&self.location, &metadata.location)
            && field_matches(&self.time_of_day, &metadata.time_of_day)
            && field_matches(&self.color, &metadata.color)
            && field_matches(&self.orientation, &metadata.orientation)
            && field_matches(&self.camera, &metadata.camera)
            && self
                .min_duration_sec
                .map(|min| metadata.duration_sec >= min)
                .unwrap_or(true)
            && self
                .min_rating
                .map(|min| metadata.rating >= min)
                .unwrap_or(true)
    }
}

// =============================================================================
// Search Parameters
// =============================================================================

/// Parameters for a single search
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Maximum number of candidates returned
    pub top_k: usize,
    /// Metadata constraints applied after fusion
    #[serde(default)]
    pub filter: MetadataFilter,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: 10,
            filter: MetadataFilter::default(),
        }
    }
}

impl SearchParams {
    pub fn top_k(top_k: usize) -> Self {
        Self {
            top_k,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = filter;
        self
    }
}

// =============================================================================
// Candidate
// =============================================================================

/// One ranked search result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub video_id: VideoId,
    pub path: String,
    /// Combined similarity score
    pub score: Score,
    /// Description-space similarity, when that space returned this video
    pub description_score: Option<Score>,
    /// Transcript-space similarity, when that space returned this video
    pub transcript_score: Option<Score>,
    pub duration_sec: TimeSec,
    pub metadata: VideoMetadata,
}

// =============================================================================
// Query Engine
// =============================================================================

/// Dual-space retrieval over the archive
pub struct QueryEngine {
    chain: Arc<ProviderChain>,
    index: Arc<dyn VectorIndex>,
    store: Arc<VideoStore>,
    weights: FusionWeights,
}

impl QueryEngine {
    pub fn new(
        chain: Arc<ProviderChain>,
        index: Arc<dyn VectorIndex>,
        store: Arc<VideoStore>,
    ) -> Self {
        Self {
            chain,
            index,
            store,
            weights: FusionWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: FusionWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Over-fetch factor applied to each space before fusion. Fusing from a
    /// wider pool keeps videos that rank mid-table in both spaces from being
    /// cut before their combined score is known.
    fn fetch_size(top_k: usize) -> usize {
        (top_k * 3).max(30)
    }

    /// Searches the archive for `query_text`
    pub async fn search(&self, query_text: &str, params: &SearchParams) -> CoreResult<Vec<Candidate>> {
        if query_text.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "query text must not be empty".to_string(),
            ));
        }
        if params.top_k == 0 {
            return Err(CoreError::ValidationError(
                "top_k must be at least 1".to_string(),
            ));
        }

        // Embed exactly once; both spaces share the query vector.
        let embedding = self.chain.embed_one(query_text).await?;
        let fetch = Self::fetch_size(params.top_k);

        let description_hits = self
            .index
            .search(IndexSpace::Description, &embedding, fetch)
            .await?;
        let transcript_hits = self
            .index
            .search(IndexSpace::Transcript, &embedding, fetch)
            .await?;

        debug!(
            "Query fetched {} description hits, {} transcript hits",
            description_hits.len(),
            transcript_hits.len()
        );

        let description_map: HashMap<VideoId, Score> = description_hits
            .into_iter()
            .map(|h| (h.video_id, h.score))
            .collect();
        let transcript_map: HashMap<VideoId, Score> = transcript_hits
            .into_iter()
            .map(|h| (h.video_id, h.score))
            .collect();

        let fused = fusion::fuse(&description_map, &transcript_map, self.weights);

        let mut candidates = Vec::with_capacity(params.top_k);
        for hit in fused {
            // Index entries without a surviving record are stale; skip them.
            let Some(record) = self.store.get(&hit.video_id)? else {
                debug!("Skipping stale index entry {}", hit.video_id);
                continue;
            };
            if !params.filter.matches(&record.metadata) {
                continue;
            }
            candidates.push(Candidate {
                video_id: hit.video_id,
                path: record.path,
                score: hit.score,
                description_score: hit.description_score,
                transcript_score: hit.transcript_score,
                duration_sec: record.metadata.duration_sec,
                metadata: record.metadata,
            });
            if candidates.len() >= params.top_k {
                break;
            }
        }

        info!(
            "Query returned {} candidate(s) (top_k {})",
            candidates.len(),
            params.top_k
        );
        Ok(candidates)
    }
}
