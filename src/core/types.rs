//! Reelfind Core Type Definitions
//!
//! Defines fundamental types used throughout the project.

// =============================================================================
// ID Types
// =============================================================================

/// Video record unique identifier (hex digest of the canonicalized path)
pub type VideoId = String;

/// Assignment run unique identifier (ULID)
pub type RunId = String;

// =============================================================================
// Time and Score Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

/// Similarity score in `[0.0, 1.0]`, higher = more similar
pub type Score = f64;
