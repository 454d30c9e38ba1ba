//! Shared fixture instances keyed by configuration fingerprint

use crate::fixture::{Fingerprint, Fixture, FixtureConfig};
use berth_errors::{Error, FixtureError};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Running shared fixtures for one test session.
///
/// Entries live until the owning session is dropped; dropping the registry
/// drops the held fixtures, which tear down their containers.
#[derive(Default)]
pub struct FixtureRegistry {
    inner: Mutex<HashMap<Fingerprint, Arc<dyn Any + Send + Sync>>>,
}

impl FixtureRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the shared instance for this configuration, launching one on a
    /// registry miss.
    ///
    /// The registry lock is held across the launch, so concurrent acquires
    /// of an equal fingerprint cannot race into two containers.
    ///
    /// # Errors
    ///
    /// Returns an error if the launch fails, or if the fingerprint is
    /// already taken by a fixture of a different type.
    pub async fn get_or_launch<F: Fixture>(&self, config: F::Config) -> Result<Arc<F>, Error> {
        let fingerprint = config.fingerprint();
        let mut registered = self.inner.lock().await;

        if let Some(existing) = registered.get(&fingerprint) {
            tracing::info!(service = fingerprint.service(), "reusing shared fixture");
            return Arc::clone(existing)
                .downcast::<F>()
                .map_err(|_| FixtureError::RegistryTypeMismatch.into());
        }

        tracing::info!(service = fingerprint.service(), "launching shared fixture");
        let fixture = Arc::new(F::launch(config).await?);
        registered.insert(fingerprint, Arc::clone(&fixture) as Arc<dyn Any + Send + Sync>);
        Ok(fixture)
    }

    /// Number of registered shared fixtures
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether the registry holds no fixtures
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
