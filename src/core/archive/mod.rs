//! Video Archive
//!
//! Metadata store for indexed videos. Embeddings live in the vector index;
//! this module owns the record of truth for paths, descriptions, transcripts,
//! and structured metadata used for equality filtering.

mod models;
pub use models::*;

mod store;
pub use store::VideoStore;
