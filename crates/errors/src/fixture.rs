//! Container fixture error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum FixtureError {
    #[error("failed to start {service} container: {message}")]
    StartFailed { service: String, message: String },

    #[error("failed to stop {service} container: {message}")]
    StopFailed { service: String, message: String },

    #[error("container runtime error for {service}: {message}")]
    Runtime { service: String, message: String },

    #[error("seed import failed for {service}: {message}")]
    SeedImportFailed { service: String, message: String },

    #[error("registry holds a different fixture type under this fingerprint")]
    RegistryTypeMismatch,
}

impl FixtureError {
    /// Wrap a container runtime error with the owning service name
    #[must_use]
    pub fn runtime(service: &str, err: impl std::fmt::Display) -> Self {
        Self::Runtime {
            service: service.to_string(),
            message: err.to_string(),
        }
    }
}
