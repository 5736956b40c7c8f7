//! Retrieval Engine Facade
//!
//! Wires the provider chain, vector index, archive store, and describer
//! ports into the three public operations: free-text query, clip-sequence
//! matching, and narration matching. Construction goes through
//! [`RetrievalEngineBuilder`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::core::ai::ProviderChain;
use crate::core::archive::{VideoRecord, VideoStore};
use crate::core::assign::{Assignment, AssignmentCoordinator, CoordinatorConfig, QueryUnit};
use crate::core::describe::ClipDescriber;
use crate::core::fusion::FusionWeights;
use crate::core::index::{IndexSpace, VectorIndex};
use crate::core::query::{Candidate, QueryEngine, SearchParams};
use crate::core::scenes::{Clip, SceneSegmenter, SegmenterConfig};
use crate::core::script::{self, InstructionExpander};
use crate::core::{CoreError, CoreResult, TimeSec, VideoId};

// =============================================================================
// Engine Builder
// =============================================================================

/// Builder for [`RetrievalEngine`]
#[derive(Default)]
pub struct RetrievalEngineBuilder {
    chain: Option<Arc<ProviderChain>>,
    index: Option<Arc<dyn VectorIndex>>,
    store: Option<Arc<VideoStore>>,
    clip_describer: Option<Arc<dyn ClipDescriber>>,
    weights: Option<FusionWeights>,
    segmenter_config: Option<SegmenterConfig>,
}

impl RetrievalEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(mut self, chain: ProviderChain) -> Self {
        self.chain = Some(Arc::new(chain));
        self
    }

    pub fn index(mut self, index: impl VectorIndex + 'static) -> Self {
        self.index = Some(Arc::new(index));
        self
    }

    pub fn index_arc(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn store(mut self, store: VideoStore) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn clip_describer(mut self, describer: impl ClipDescriber + 'static) -> Self {
        self.clip_describer = Some(Arc::new(describer));
        self
    }

    pub fn fusion_weights(mut self, weights: FusionWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn segmenter_config(mut self, config: SegmenterConfig) -> Self {
        self.segmenter_config = Some(config);
        self
    }

    pub fn build(self) -> CoreResult<RetrievalEngine> {
        let chain = self
            .chain
            .ok_or_else(|| CoreError::ValidationError("provider chain is required".to_string()))?;
        let index = self
            .index
            .ok_or_else(|| CoreError::ValidationError("vector index is required".to_string()))?;
        let store = self
            .store
            .ok_or_else(|| CoreError::ValidationError("video store is required".to_string()))?;

        // Clip matching degrades per-unit without a describer; query and
        // narration matching never need one.
        let clip_describer = self
            .clip_describer
            .unwrap_or_else(|| Arc::new(NoClipDescriber));

        let mut query = QueryEngine::new(Arc::clone(&chain), Arc::clone(&index), Arc::clone(&store));
        if let Some(weights) = self.weights {
            query = query.with_weights(weights);
        }
        let query = Arc::new(query);

        Ok(RetrievalEngine {
            coordinator: AssignmentCoordinator::new(
                Arc::clone(&query),
                Arc::clone(&chain),
                clip_describer,
            ),
            expander: InstructionExpander::new(Arc::clone(&chain)),
            segmenter: SceneSegmenter::with_config(self.segmenter_config.unwrap_or_default()),
            query,
            chain,
            index,
            store,
        })
    }
}

/// Placeholder used when no captioning collaborator is wired in
struct NoClipDescriber;

#[async_trait]
impl ClipDescriber for NoClipDescriber {
    fn name(&self) -> &str {
        "none"
    }

    async fn describe(&self, _video_path: &str, _clip: &Clip) -> CoreResult<String> {
        Err(CoreError::DescriptionUnavailable(
            "no clip describer configured".to_string(),
        ))
    }
}

// =============================================================================
// Retrieval Engine
// =============================================================================

/// Default narration length assumed when an instruction comes without a
/// target duration
const DEFAULT_TARGET_DURATION: TimeSec = 30.0;

/// The assembled engine
pub struct RetrievalEngine {
    chain: Arc<ProviderChain>,
    index: Arc<dyn VectorIndex>,
    store: Arc<VideoStore>,
    query: Arc<QueryEngine>,
    coordinator: AssignmentCoordinator,
    expander: InstructionExpander,
    segmenter: SceneSegmenter,
}

impl RetrievalEngine {
    pub fn builder() -> RetrievalEngineBuilder {
        RetrievalEngineBuilder::new()
    }

    pub fn store(&self) -> &VideoStore {
        &self.store
    }

    // =========================================================================
    // Archive Maintenance
    // =========================================================================

    /// Indexes (or re-indexes) a video: persists the record and upserts its
    /// embeddings. A video without a transcript gets no transcript vector.
    pub async fn index_video(&self, record: VideoRecord) -> CoreResult<()> {
        let description_embedding = self.chain.embed_one(&record.description).await?;
        self.index
            .upsert(IndexSpace::Description, &record.id, description_embedding)
            .await?;

        if record.has_transcript() {
            let transcript_embedding = self.chain.embed_one(&record.transcript).await?;
            self.index
                .upsert(IndexSpace::Transcript, &record.id, transcript_embedding)
                .await?;
        }

        self.store.save(&record)?;
        info!("Indexed video {} ({})", record.id, record.path);
        Ok(())
    }

    /// Removes a video from the store and both index spaces
    pub async fn remove_video(&self, id: &VideoId) -> CoreResult<()> {
        self.store.delete(id)?;
        self.index.remove(id).await?;
        Ok(())
    }

    /// Updates a video's star rating
    pub fn rate_video(&self, id: &VideoId, rating: u8) -> CoreResult<()> {
        self.store.set_rating(id, rating)
    }

    // =========================================================================
    // Public Operations
    // =========================================================================

    /// Free-text archive search
    pub async fn run_query(&self, text: &str, params: &SearchParams) -> CoreResult<Vec<Candidate>> {
        self.query.search(text, params).await
    }

    /// Matches every clip of a source video to a unique archive video.
    ///
    /// Segmentation shells out to ffmpeg, so it runs on the blocking pool.
    pub async fn run_clip_match(
        &self,
        video_path: &str,
        config: &CoordinatorConfig,
    ) -> CoreResult<Assignment> {
        let segmenter = SceneSegmenter::with_config(self.segmenter.config().clone());
        let path = video_path.to_string();
        let clips = tokio::task::spawn_blocking(move || segmenter.detect(&path))
            .await
            .map_err(|e| CoreError::Internal(format!("segmentation task panicked: {}", e)))??;

        self.match_clips(video_path, clips, config).await
    }

    /// Matches pre-segmented clips (for embedded use and tests)
    pub async fn match_clips(
        &self,
        video_path: &str,
        clips: Vec<Clip>,
        config: &CoordinatorConfig,
    ) -> CoreResult<Assignment> {
        let units: Vec<QueryUnit> = clips
            .into_iter()
            .enumerate()
            .map(|(ordinal, clip)| QueryUnit::from_clip(ordinal, video_path, clip))
            .collect();
        self.coordinator.run(units, config).await
    }

    /// Matches narration text to unique archive videos.
    ///
    /// Literal text is segmented locally; when `is_instruction` is set the
    /// text is first expanded into narration by the provider chain, and any
    /// expansion failure aborts the run.
    pub async fn run_text_match(
        &self,
        text: &str,
        is_instruction: bool,
        target_duration: Option<TimeSec>,
        config: &CoordinatorConfig,
    ) -> CoreResult<Assignment> {
        let segments = if is_instruction {
            self.expander
                .expand(text, target_duration.unwrap_or(DEFAULT_TARGET_DURATION))
                .await?
        } else {
            script::segment(text)
        };

        let units: Vec<QueryUnit> = segments
            .into_iter()
            .enumerate()
            .map(|(ordinal, segment)| QueryUnit::from_text(ordinal, segment))
            .collect();
        self.coordinator.run(units, config).await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::MockAIProvider;
    use crate::core::assign::{UnassignedReason, UnitOutcome};
    use crate::core::index::MemoryVectorIndex;

    async fn engine_with_archive(records: &[(&str, &str, Option<&str>)]) -> RetrievalEngine {
        let engine = RetrievalEngine::builder()
            .chain(ProviderChain::single(MockAIProvider::new("mock")))
            .index(MemoryVectorIndex::new())
            .store(VideoStore::in_memory().unwrap())
            .build()
            .unwrap();

        for (path, description, transcript) in records {
            let mut record = VideoRecord::new(*path, *description);
            if let Some(t) = transcript {
                record = record.with_transcript(*t);
            }
            record.metadata.duration_sec = 100.0;
            engine.index_video(record).await.unwrap();
        }
        engine
    }

    #[test]
    fn test_builder_requires_ports() {
        let result = RetrievalEngine::builder()
            .chain(ProviderChain::single(MockAIProvider::new("mock")))
            .build();
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_index_and_query_round_trip() {
        let engine = engine_with_archive(&[
            ("clips/beach.mp4", "waves on a sandy beach", Some("sound of waves")),
            ("clips/city.mp4", "downtown traffic at night", None),
        ])
        .await;

        let results = engine
            .run_query("sandy beach waves", &SearchParams::top_k(2))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].path, "clips/beach.mp4");
        // The beach video has both signals, the city video only one.
        assert!(results[0].transcript_score.is_some());
    }

    #[tokio::test]
    async fn test_query_without_transcripts_scores_by_description_only() {
        // No video in the corpus has a transcript, so every combined score
        // must equal the description score exactly.
        let engine = engine_with_archive(&[
            ("clips/beach.mp4", "waves on a sandy beach", None),
            ("clips/city.mp4", "downtown traffic at night", None),
            ("clips/forest.mp4", "a trail through a pine forest", None),
        ])
        .await;

        let results = engine
            .run_query("sandy beach waves", &SearchParams::top_k(3))
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        for candidate in &results {
            assert_eq!(Some(candidate.score), candidate.description_score);
            assert_eq!(candidate.transcript_score, None);
        }
    }

    #[tokio::test]
    async fn test_remove_video_clears_index() {
        let engine =
            engine_with_archive(&[("clips/beach.mp4", "waves on a sandy beach", None)]).await;
        let id = crate::core::archive::video_id_for_path("clips/beach.mp4");

        engine.remove_video(&id).await.unwrap();

        let results = engine
            .run_query("waves", &SearchParams::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_rate_video() {
        let engine =
            engine_with_archive(&[("clips/beach.mp4", "waves on a sandy beach", None)]).await;
        let id = crate::core::archive::video_id_for_path("clips/beach.mp4");

        engine.rate_video(&id, 5).unwrap();
        assert_eq!(engine.store().require(&id).unwrap().metadata.rating, 5);
    }

    #[tokio::test]
    async fn test_clip_match_without_describer_degrades() {
        let engine =
            engine_with_archive(&[("clips/beach.mp4", "waves on a sandy beach", None)]).await;

        let clips = vec![Clip::new(0.0, 5.0)];
        let assignment = engine
            .match_clips("source.mp4", clips, &CoordinatorConfig::default())
            .await
            .unwrap();

        assert!(matches!(
            assignment.entries[0].outcome,
            UnitOutcome::Unassigned {
                reason: UnassignedReason::Description { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_text_match_literal() {
        let engine = engine_with_archive(&[
            ("clips/beach.mp4", "waves on a sandy beach", None),
            ("clips/city.mp4", "downtown traffic at night", None),
        ])
        .await;

        let assignment = engine
            .run_text_match(
                "Waves on a sandy beach.\n\nDowntown traffic at night.",
                false,
                None,
                &CoordinatorConfig::default(),
            )
            .await
            .unwrap();

        assert_eq!(assignment.entries.len(), 2);
        assert_eq!(assignment.assigned_count(), 2);
        let a = assignment.entries[0].assigned_video().unwrap();
        let b = assignment.entries[1].assigned_video().unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_text_match_instruction_expansion_failure_aborts() {
        // The mock chain answers with prose, not JSON, so expansion fails.
        let engine =
            engine_with_archive(&[("clips/beach.mp4", "waves on a sandy beach", None)]).await;

        let err = engine
            .run_text_match(
                "make a montage",
                true,
                Some(15.0),
                &CoordinatorConfig::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::ExpansionFailed(_)));
    }

    #[tokio::test]
    async fn test_text_match_empty_text_yields_empty_assignment() {
        let engine = engine_with_archive(&[]).await;

        let assignment = engine
            .run_text_match("   ", false, None, &CoordinatorConfig::default())
            .await
            .unwrap();
        assert!(assignment.entries.is_empty());
    }
}
