//! Fixture configuration error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("seed data requires an exclusive instance: {detail}")]
    SeedOnSharedInstance { detail: String },

    #[error("seed archive not found: {path}")]
    SeedArchiveMissing { path: String },
}
