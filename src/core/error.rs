//! Reelfind Core Error Types
//!
//! Defines error types used throughout the engine.

use thiserror::Error;

// =============================================================================
// Core Error Type
// =============================================================================

/// Core engine error
#[derive(Error, Debug)]
pub enum CoreError {
    // -------------------------------------------------------------------------
    // Retrieval errors
    // -------------------------------------------------------------------------
    #[error("Embedding failed: {0}")]
    EmbeddingError(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Description unavailable: {0}")]
    DescriptionUnavailable(String),

    #[error("Instruction expansion failed: {0}")]
    ExpansionFailed(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("No assignable candidate remained for {0} unit(s)")]
    AssignmentExhausted(usize),

    // -------------------------------------------------------------------------
    // Archive errors
    // -------------------------------------------------------------------------
    #[error("Video not found: {0}")]
    VideoNotFound(crate::core::VideoId),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    // -------------------------------------------------------------------------
    // Media probing errors
    // -------------------------------------------------------------------------
    #[error("FFprobe failed: {0}")]
    FFprobeError(String),

    #[error("FFmpeg failed: {0}")]
    FFmpegError(String),

    // -------------------------------------------------------------------------
    // AI collaborator errors
    // -------------------------------------------------------------------------
    #[error("AI request failed: {0}")]
    AIRequestFailed(String),

    // -------------------------------------------------------------------------
    // General errors
    // -------------------------------------------------------------------------
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Whether the error aborts a whole assignment run rather than a single
    /// unit. Index outages and expansion failures poison every unit equally,
    /// so continuing the run would only repeat the same failure.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            CoreError::IndexUnavailable(_) | CoreError::ExpansionFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::IndexUnavailable("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "Vector index unavailable: connection refused"
        );

        let err = CoreError::AssignmentExhausted(3);
        assert!(err.to_string().contains("3 unit(s)"));
    }

    #[test]
    fn test_run_fatal_classification() {
        assert!(CoreError::IndexUnavailable("down".into()).is_run_fatal());
        assert!(CoreError::ExpansionFailed("bad json".into()).is_run_fatal());
        assert!(!CoreError::EmbeddingError("oops".into()).is_run_fatal());
        assert!(!CoreError::Timeout("unit 2".into()).is_run_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CoreError = io_err.into();
        assert!(matches!(err, CoreError::IoError(_)));
    }
}
