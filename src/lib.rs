//! Reelfind Core Library
//!
//! Multi-modal retrieval and unique-assignment engine for a video archive.
//! Fuses description and transcript similarity into one ranking, and matches
//! ordered sequences of query units (video clips or text segments) against a
//! shared candidate pool so that no video is reused across units.
//!
//! Model inference, embedding generation, and vector search backends are
//! external collaborators accessed through the ports in [`core::ai`],
//! [`core::index`], and [`core::describe`].

pub mod core;

pub use crate::core::{
    assign::{Assignment, AssignmentCoordinator, CoordinatorConfig, QueryUnit, UnassignedReason},
    engine::{RetrievalEngine, RetrievalEngineBuilder},
    fusion::FusionWeights,
    query::{Candidate, MetadataFilter, SearchParams},
    scenes::{SceneSegmenter, SegmenterConfig},
    CoreError, CoreResult,
};

/// Initializes tracing for binaries and examples embedding the engine.
///
/// Library consumers that install their own subscriber should skip this.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
