//! Assignment Coordinator
//!
//! Matches an ordered sequence of query units against the archive so that no
//! video is assigned to two units in one run. Candidate fetch runs
//! concurrently under a bounded semaphore; resolution is strictly sequential
//! in unit order, so earlier units always win contested candidates and the
//! outcome is independent of task completion order.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::core::ai::ProviderChain;
use crate::core::describe::{apply_background_bias, ClipDescriber, TextDescriber};
use crate::core::query::{Candidate, MetadataFilter, QueryEngine, SearchParams};
use crate::core::scenes::Clip;
use crate::core::script::TextSegment;
use crate::core::{CoreError, CoreResult, RunId, TimeSec, VideoId};

// =============================================================================
// Query Unit
// =============================================================================

/// What a unit was cut from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum UnitSource {
    /// A clip of a source video
    Clip { video_path: String, clip: Clip },
    /// A narration segment
    Text { segment: TextSegment },
}

/// One ordered unit of a matching run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryUnit {
    /// Position in the run; resolution priority
    pub ordinal: usize,
    pub source: UnitSource,
    /// Minimum duration the assigned video must cover
    pub duration_hint: Option<TimeSec>,
    /// Pre-computed query text; skips the describer when set
    pub query_text: Option<String>,
}

impl QueryUnit {
    pub fn from_clip(ordinal: usize, video_path: &str, clip: Clip) -> Self {
        let duration = clip.duration();
        Self {
            ordinal,
            source: UnitSource::Clip {
                video_path: video_path.to_string(),
                clip,
            },
            duration_hint: Some(duration),
            query_text: None,
        }
    }

    pub fn from_text(ordinal: usize, segment: TextSegment) -> Self {
        let duration_hint = segment.duration_hint;
        Self {
            ordinal,
            source: UnitSource::Text { segment },
            duration_hint,
            query_text: None,
        }
    }

    pub fn with_query_text(mut self, text: &str) -> Self {
        self.query_text = Some(text.to_string());
        self
    }
}

// =============================================================================
// Assignment Results
// =============================================================================

/// Why a unit ended the run without a video
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum UnassignedReason {
    /// Query embedding failed
    Embedding { detail: String },
    /// The unit could not be described
    Description { detail: String },
    /// The per-unit fetch deadline passed
    Timeout,
    /// Search failed for a unit-local reason
    SearchFailed { detail: String },
    /// Every fetched candidate was claimed by an earlier unit or failed the
    /// duration filter
    Exhausted,
}

/// Outcome for one unit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum UnitOutcome {
    Assigned { candidate: Candidate },
    Unassigned { reason: UnassignedReason },
}

/// One entry of an assignment, in unit order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentEntry {
    pub ordinal: usize,
    pub outcome: UnitOutcome,
}

impl AssignmentEntry {
    pub fn assigned_video(&self) -> Option<&VideoId> {
        match &self.outcome {
            UnitOutcome::Assigned { candidate } => Some(&candidate.video_id),
            UnitOutcome::Unassigned { .. } => None,
        }
    }
}

/// Result of one matching run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub run_id: RunId,
    pub entries: Vec<AssignmentEntry>,
}

impl Assignment {
    pub fn assigned_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, UnitOutcome::Assigned { .. }))
            .count()
    }

    pub fn unassigned_count(&self) -> usize {
        self.entries.len() - self.assigned_count()
    }

    /// Errors with `AssignmentExhausted` unless every unit got a video
    pub fn require_fully_assigned(self) -> CoreResult<Self> {
        let unassigned = self.unassigned_count();
        if unassigned > 0 {
            return Err(CoreError::AssignmentExhausted(unassigned));
        }
        Ok(self)
    }
}

// =============================================================================
// Coordinator Configuration
// =============================================================================

/// Configuration for an assignment run
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Maximum units fetching candidates at once
    pub max_concurrency: usize,
    /// Candidates fetched per unit before resolution
    pub per_unit_top_k: usize,
    /// Deadline for one unit's describe + search
    pub unit_timeout: std::time::Duration,
    /// Shared context prepended to every unit description
    pub background: Option<String>,
    /// Metadata constraints applied to every unit's search
    pub filter: MetadataFilter,
    /// Whether assigned videos must cover the unit's duration hint
    pub enforce_duration: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: num_cpus::get().clamp(1, 10),
            per_unit_top_k: 20,
            unit_timeout: std::time::Duration::from_secs(30),
            background: None,
            filter: MetadataFilter::default(),
            enforce_duration: true,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_background(mut self, background: &str) -> Self {
        self.background = Some(background.to_string());
        self
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = filter;
        self
    }
}

// =============================================================================
// Assignment Coordinator
// =============================================================================

/// Runs the fetch-then-resolve assignment protocol
pub struct AssignmentCoordinator {
    query: Arc<QueryEngine>,
    clip_describer: Arc<dyn ClipDescriber>,
    text_describer: Arc<TextDescriber>,
}

impl AssignmentCoordinator {
    pub fn new(
        query: Arc<QueryEngine>,
        chain: Arc<ProviderChain>,
        clip_describer: Arc<dyn ClipDescriber>,
    ) -> Self {
        Self {
            query,
            clip_describer,
            text_describer: Arc::new(TextDescriber::new(chain)),
        }
    }

    /// Runs a full assignment over `units`.
    ///
    /// Per-unit failures degrade that unit to unassigned; an unavailable
    /// index or failed expansion aborts the whole run.
    pub async fn run(
        &self,
        units: Vec<QueryUnit>,
        config: &CoordinatorConfig,
    ) -> CoreResult<Assignment> {
        let run_id = ulid::Ulid::new().to_string();
        info!(
            "Starting assignment run {} with {} unit(s)",
            run_id,
            units.len()
        );

        let fetched = self.fetch_all(&units, config).await?;
        let entries = resolve(&units, fetched, config);

        let assignment = Assignment { run_id, entries };
        info!(
            "Run {} assigned {}/{} unit(s)",
            assignment.run_id,
            assignment.assigned_count(),
            assignment.entries.len()
        );
        Ok(assignment)
    }

    /// Phase 1: fetch candidate lists concurrently, buffered in unit order
    async fn fetch_all(
        &self,
        units: &[QueryUnit],
        config: &CoordinatorConfig,
    ) -> CoreResult<Vec<CoreResult<Vec<Candidate>>>> {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        let mut handles = Vec::with_capacity(units.len());

        for unit in units.iter().cloned() {
            let semaphore = Arc::clone(&semaphore);
            let query = Arc::clone(&self.query);
            let clip_describer = Arc::clone(&self.clip_describer);
            let text_describer = Arc::clone(&self.text_describer);
            let config = config.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| CoreError::Internal("semaphore closed".to_string()))?;

                let ordinal = unit.ordinal;
                let fetch = fetch_unit(query, clip_describer, text_describer, unit, &config);
                match tokio::time::timeout(config.unit_timeout, fetch).await {
                    Ok(result) => result,
                    Err(_) => Err(CoreError::Timeout(format!(
                        "unit {} exceeded fetch deadline",
                        ordinal
                    ))),
                }
            }));
        }

        // Awaiting in submission order keeps results aligned with unit
        // ordinals regardless of which task finishes first.
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = handle
                .await
                .map_err(|e| CoreError::Internal(format!("unit task panicked: {}", e)))?;

            if let Err(e) = &result {
                if e.is_run_fatal() {
                    warn!("Aborting assignment run: {}", e);
                    return Err(match e {
                        CoreError::IndexUnavailable(msg) => {
                            CoreError::IndexUnavailable(msg.clone())
                        }
                        CoreError::ExpansionFailed(msg) => CoreError::ExpansionFailed(msg.clone()),
                        _ => CoreError::Internal(e.to_string()),
                    });
                }
            }
            results.push(result);
        }
        Ok(results)
    }
}

/// Describes one unit and searches the archive for it
async fn fetch_unit(
    query: Arc<QueryEngine>,
    clip_describer: Arc<dyn ClipDescriber>,
    text_describer: Arc<TextDescriber>,
    unit: QueryUnit,
    config: &CoordinatorConfig,
) -> CoreResult<Vec<Candidate>> {
    let description = match &unit.query_text {
        Some(text) => text.clone(),
        None => match &unit.source {
            UnitSource::Clip { video_path, clip } => {
                clip_describer.describe(video_path, clip).await?
            }
            UnitSource::Text { segment } => text_describer.describe(&segment.text).await?,
        },
    };

    let query_text = apply_background_bias(&description, config.background.as_deref());
    let params = SearchParams {
        top_k: config.per_unit_top_k,
        filter: config.filter.clone(),
    };
    query.search(&query_text, &params).await
}

/// Phase 2: sequential greedy resolution in unit order
fn resolve(
    units: &[QueryUnit],
    fetched: Vec<CoreResult<Vec<Candidate>>>,
    config: &CoordinatorConfig,
) -> Vec<AssignmentEntry> {
    let mut claimed: HashSet<VideoId> = HashSet::new();
    let mut entries = Vec::with_capacity(units.len());

    for (unit, result) in units.iter().zip(fetched) {
        let outcome = match result {
            Ok(candidates) => {
                let pick = candidates.into_iter().find(|c| {
                    if claimed.contains(&c.video_id) {
                        return false;
                    }
                    if config.enforce_duration {
                        if let Some(hint) = unit.duration_hint {
                            if c.duration_sec < hint {
                                return false;
                            }
                        }
                    }
                    true
                });
                match pick {
                    Some(candidate) => {
                        claimed.insert(candidate.video_id.clone());
                        UnitOutcome::Assigned { candidate }
                    }
                    None => {
                        warn!("Unit {} exhausted its candidate list", unit.ordinal);
                        UnitOutcome::Unassigned {
                            reason: UnassignedReason::Exhausted,
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Unit {} degraded: {}", unit.ordinal, e);
                UnitOutcome::Unassigned {
                    reason: unassigned_reason(e),
                }
            }
        };
        entries.push(AssignmentEntry {
            ordinal: unit.ordinal,
            outcome,
        });
    }

    entries
}

fn unassigned_reason(error: CoreError) -> UnassignedReason {
    match error {
        CoreError::EmbeddingError(detail) => UnassignedReason::Embedding { detail },
        CoreError::DescriptionUnavailable(detail) => UnassignedReason::Description { detail },
        CoreError::Timeout(_) => UnassignedReason::Timeout,
        other => UnassignedReason::SearchFailed {
            detail: other.to_string(),
        },
    }
}

// =============================================================================
// Tests
// =============================================================================
