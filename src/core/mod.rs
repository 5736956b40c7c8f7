//! Reelfind Core Engine
//!
//! Retrieval core: score fusion, dual-space query engine, scene and text
//! segmentation, and the unique-assignment coordinator.

pub mod ai;
pub mod archive;
pub mod assign;
pub mod describe;
pub mod engine;
pub mod fusion;
pub mod index;
pub mod query;
pub mod scenes;
pub mod script;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
