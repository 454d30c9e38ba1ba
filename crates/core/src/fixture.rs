//! Fixture and configuration contracts

use berth_errors::Error;
use std::future::Future;

/// Identity of a runnable fixture: image identity plus seed-data identity
/// plus whatever configuration changes the resulting container.
///
/// Two configurations with equal fingerprints are interchangeable, so a
/// shared acquisition may hand back an instance launched for either.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    service: String,
    digest: String,
}

impl Fingerprint {
    /// Digest the identity parts for one service.
    #[must_use]
    pub fn compute(service: &str, parts: &[&str]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(service.as_bytes());
        for part in parts {
            hasher.update(&[0]);
            hasher.update(part.as_bytes());
        }
        Self {
            service: service.to_string(),
            digest: hasher.finalize().to_hex().to_string(),
        }
    }

    /// Name of the service this fingerprint belongs to
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }
}

/// Configuration for a fixture, validated before any resource is allocated.
pub trait FixtureConfig: Clone + Send + Sync + 'static {
    /// Check the configuration; invalid combinations (such as seed data on
    /// a shared instance) must fail here, before a container exists.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the invalid combination.
    fn validate(&self) -> Result<(), Error>;

    /// Identity used to share running instances across acquisitions
    fn fingerprint(&self) -> Fingerprint;

    /// Whether acquisitions with an equal fingerprint reuse one instance
    fn shared(&self) -> bool;
}

/// A runnable service fixture.
pub trait Fixture: Sized + Send + Sync + 'static {
    type Config: FixtureConfig;

    /// Start the underlying container and wait until it is ready to serve.
    fn launch(config: Self::Config) -> impl Future<Output = Result<Self, Error>> + Send;

    /// Connection parameters to publish for the application under test
    fn properties(&self) -> Vec<(String, String)>;
}
