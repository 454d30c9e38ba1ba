#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the berth test harness
//!
//! This crate provides fine-grained error types organized by domain:
//! seed-data staging, container fixtures, and fixture configuration.

use thiserror::Error;

pub mod config;
pub mod fixture;
pub mod seed;

// Re-export all error types at the root
pub use config::ConfigError;
pub use fixture::FixtureError;
pub use seed::SeedError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("seed error: {0}")]
    Seed(#[from] SeedError),

    #[error("fixture error: {0}")]
    Fixture(#[from] FixtureError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<std::path::PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

/// Result type alias for berth operations
pub type Result<T> = std::result::Result<T, Error>;
