#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! RabbitMQ fixture for berth
//!
//! Starts a disposable RabbitMQ broker (management image) and publishes the
//! connection parameters as `TC_RABBITMQ_ADDRESS`, `TC_RABBITMQ_USER` and
//! `TC_RABBITMQ_PASSWORD`.

use berth_core::{Fingerprint, Fixture, FixtureConfig};
use berth_errors::{Error, FixtureError};
use testcontainers::core::IntoContainerPort;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::rabbitmq::RabbitMq;

const SERVICE: &str = "rabbitmq";
const IMAGE_TAG: &str = "3.8.9-management";
const AMQP_PORT: u16 = 5672;
// The management image ships with the default administrator account.
const ADMIN_USER: &str = "guest";
const ADMIN_PASSWORD: &str = "guest";

/// Published property key for the AMQP address
pub const TC_RABBITMQ_ADDRESS: &str = "TC_RABBITMQ_ADDRESS";
/// Published property key for the admin user
pub const TC_RABBITMQ_USER: &str = "TC_RABBITMQ_USER";
/// Published property key for the admin password
pub const TC_RABBITMQ_PASSWORD: &str = "TC_RABBITMQ_PASSWORD";

/// Configuration for a RabbitMQ fixture
#[derive(Debug, Clone, Default)]
pub struct RabbitConfig {
    exclusive: bool,
}

impl RabbitConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an exclusive container instead of the shared instance
    #[must_use]
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }
}

impl FixtureConfig for RabbitConfig {
    fn validate(&self) -> Result<(), Error> {
        Ok(())
    }

    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::compute(SERVICE, &[&format!("rabbitmq:{IMAGE_TAG}")])
    }

    fn shared(&self) -> bool {
        !self.exclusive
    }
}

/// A running RabbitMQ container
pub struct RabbitFixture {
    container: ContainerAsync<RabbitMq>,
    host: String,
    port: u16,
    address: String,
}

impl RabbitFixture {
    /// AMQP address of the containerized broker
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Host the broker is reachable on
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Mapped AMQP port
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop the container. Exclusive fixtures are also stopped when the
    /// last handle drops; this just makes the teardown point explicit.
    ///
    /// # Errors
    ///
    /// Returns an error if the container runtime refuses the stop.
    pub async fn stop(&self) -> Result<(), Error> {
        self.container.stop().await.map_err(|e| {
            FixtureError::StopFailed {
                service: SERVICE.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

impl Fixture for RabbitFixture {
    type Config = RabbitConfig;

    async fn launch(config: RabbitConfig) -> Result<Self, Error> {
        tracing::info!(shared = config.shared(), "starting RabbitMQ fixture");

        let container = RabbitMq::default()
            .with_tag(IMAGE_TAG)
            .start()
            .await
            .map_err(|e| FixtureError::StartFailed {
                service: SERVICE.to_string(),
                message: e.to_string(),
            })?;

        let host = container
            .get_host()
            .await
            .map_err(|e| FixtureError::runtime(SERVICE, e))?;
        let port = container
            .get_host_port_ipv4(AMQP_PORT.tcp())
            .await
            .map_err(|e| FixtureError::runtime(SERVICE, e))?;

        let host = host.to_string();
        let address = format!("amqp://{host}:{port}");

        Ok(Self {
            container,
            host,
            port,
            address,
        })
    }

    fn properties(&self) -> Vec<(String, String)> {
        vec![
            (TC_RABBITMQ_ADDRESS.to_string(), self.address.clone()),
            (TC_RABBITMQ_USER.to_string(), ADMIN_USER.to_string()),
            (TC_RABBITMQ_PASSWORD.to_string(), ADMIN_PASSWORD.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_shared() {
        let config = RabbitConfig::new();
        assert!(config.shared());
        config.validate().unwrap();
    }

    #[test]
    fn exclusive_config_is_not_shared() {
        assert!(!RabbitConfig::new().exclusive().shared());
    }

    #[test]
    fn broker_fingerprint_is_stable() {
        assert_eq!(
            RabbitConfig::new().fingerprint(),
            RabbitConfig::new().exclusive().fingerprint()
        );
    }
}
