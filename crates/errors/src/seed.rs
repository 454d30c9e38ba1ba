//! Seed-data staging error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error("invalid seed archive {path}: {reason}")]
    InvalidArchive { path: String, reason: String },

    #[error("archive entry escapes the staging root: {entry}")]
    PathTraversal { entry: String },

    #[error("extraction failed at {path}: {message}")]
    ExtractionFailed { path: String, message: String },

    #[error("cleanup failed for {path}: {message}")]
    CleanupFailed { path: String, message: String },
}

impl SeedError {
    /// Convert an `io::Error` into an extraction failure with an associated path
    #[must_use]
    pub fn extraction(path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::ExtractionFailed {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Convert an `io::Error` into a cleanup failure with an associated path
    #[must_use]
    pub fn cleanup(path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::CleanupFailed {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
