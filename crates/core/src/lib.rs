#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Session-scoped container fixture management for berth
//!
//! A [`TestSession`] owns the fixtures a test binary starts: shared
//! instances are kept in a registry keyed by configuration fingerprint and
//! reused across acquisitions, exclusive instances are handed to the caller
//! outright. Every acquisition validates its configuration first and
//! publishes the fixture's connection parameters as process environment
//! variables for the application under test.

mod fixture;
mod properties;
mod registry;

pub use fixture::{Fingerprint, Fixture, FixtureConfig};
pub use properties::PropertySink;
pub use registry::FixtureRegistry;

use berth_errors::Error;
use std::ops::Deref;
use std::sync::Arc;

/// Session-scoped context owning shared fixtures and published properties.
///
/// Construct one per test binary and pass it explicitly to each setup that
/// needs a fixture; dropping the session tears down every shared instance
/// it still holds.
#[derive(Default)]
pub struct TestSession {
    registry: FixtureRegistry,
    properties: PropertySink,
}

impl TestSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Properties published by fixtures acquired through this session
    #[must_use]
    pub fn properties(&self) -> &PropertySink {
        &self.properties
    }

    /// Shared fixtures currently registered
    #[must_use]
    pub fn registry(&self) -> &FixtureRegistry {
        &self.registry
    }

    /// Acquire a fixture for this configuration.
    ///
    /// The configuration is validated before any container is started.
    /// Shared configurations reuse a running instance with an equal
    /// fingerprint when one exists; exclusive configurations always launch
    /// a fresh container owned by the caller. Either way the fixture's
    /// connection parameters are published afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the container cannot be
    /// launched.
    pub async fn acquire<F: Fixture>(&self, config: F::Config) -> Result<Acquired<F>, Error> {
        config.validate()?;

        let acquired = if config.shared() {
            Acquired::Shared(self.registry.get_or_launch::<F>(config).await?)
        } else {
            Acquired::Exclusive(F::launch(config).await?)
        };

        self.properties.publish(acquired.properties());
        Ok(acquired)
    }
}

/// A fixture acquired from a session.
///
/// Shared instances are reference-counted registry entries that outlive the
/// acquisition; exclusive instances belong to the caller, who decides when
/// to dispose of them.
#[derive(Debug)]
pub enum Acquired<F: Fixture> {
    Shared(Arc<F>),
    Exclusive(F),
}

impl<F: Fixture> Acquired<F> {
    /// Whether this acquisition reuses a registry-held instance
    #[must_use]
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }

    /// Take ownership of an exclusive fixture; `None` for shared ones
    #[must_use]
    pub fn into_exclusive(self) -> Option<F> {
        match self {
            Self::Shared(_) => None,
            Self::Exclusive(fixture) => Some(fixture),
        }
    }
}

impl<F: Fixture> Deref for Acquired<F> {
    type Target = F;

    fn deref(&self) -> &F {
        match self {
            Self::Shared(fixture) => fixture,
            Self::Exclusive(fixture) => fixture,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_errors::ConfigError;
    use std::sync::atomic::{AtomicU64, Ordering};

    static LAUNCHES: AtomicU64 = AtomicU64::new(0);

    #[derive(Clone)]
    struct EchoConfig {
        shared: bool,
        tag: String,
        reject: bool,
    }

    impl EchoConfig {
        fn shared(tag: &str) -> Self {
            Self {
                shared: true,
                tag: tag.to_string(),
                reject: false,
            }
        }

        fn exclusive(tag: &str) -> Self {
            Self {
                shared: false,
                tag: tag.to_string(),
                reject: false,
            }
        }
    }

    impl FixtureConfig for EchoConfig {
        fn validate(&self) -> Result<(), Error> {
            if self.reject {
                return Err(ConfigError::InvalidValue {
                    field: "tag".to_string(),
                    value: self.tag.clone(),
                }
                .into());
            }
            Ok(())
        }

        fn fingerprint(&self) -> Fingerprint {
            Fingerprint::compute("echo", &[&self.tag])
        }

        fn shared(&self) -> bool {
            self.shared
        }
    }

    #[derive(Debug)]
    struct EchoFixture {
        tag: String,
        serial: u64,
    }

    impl Fixture for EchoFixture {
        type Config = EchoConfig;

        async fn launch(config: EchoConfig) -> Result<Self, Error> {
            Ok(Self {
                tag: config.tag,
                serial: LAUNCHES.fetch_add(1, Ordering::SeqCst),
            })
        }

        fn properties(&self) -> Vec<(String, String)> {
            vec![("BERTH_TEST_ECHO_TAG".to_string(), self.tag.clone())]
        }
    }

    #[test]
    fn equal_configs_share_a_fingerprint() {
        let a = EchoConfig::shared("alpha").fingerprint();
        let b = EchoConfig::shared("alpha").fingerprint();
        let c = EchoConfig::shared("beta").fingerprint();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn shared_acquisitions_reuse_one_instance() {
        let session = TestSession::new();

        let first = session
            .acquire::<EchoFixture>(EchoConfig::shared("reuse"))
            .await
            .unwrap();
        let second = session
            .acquire::<EchoFixture>(EchoConfig::shared("reuse"))
            .await
            .unwrap();

        assert!(first.is_shared());
        assert_eq!(first.serial, second.serial);
        assert_eq!(session.registry().len().await, 1);
    }

    #[tokio::test]
    async fn exclusive_acquisitions_launch_fresh_instances() {
        let session = TestSession::new();

        let first = session
            .acquire::<EchoFixture>(EchoConfig::exclusive("solo"))
            .await
            .unwrap();
        let second = session
            .acquire::<EchoFixture>(EchoConfig::exclusive("solo"))
            .await
            .unwrap();

        assert!(!first.is_shared());
        assert_ne!(first.serial, second.serial);
        assert!(session.registry().is_empty().await);
        assert!(second.into_exclusive().is_some());
    }

    #[tokio::test]
    async fn acquisition_publishes_properties() {
        let session = TestSession::new();

        session
            .acquire::<EchoFixture>(EchoConfig::shared("published"))
            .await
            .unwrap();

        assert_eq!(
            session.properties().get("BERTH_TEST_ECHO_TAG").as_deref(),
            Some("published")
        );
        assert_eq!(
            std::env::var("BERTH_TEST_ECHO_TAG").as_deref(),
            Ok("published")
        );
    }

    #[tokio::test]
    async fn invalid_config_fails_before_launch() {
        let session = TestSession::new();

        let err = session
            .acquire::<EchoFixture>(EchoConfig {
                shared: true,
                tag: "bad".to_string(),
                reject: true,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));
        // A rejected configuration never reaches the registry.
        assert!(session.registry().is_empty().await);
    }
}
