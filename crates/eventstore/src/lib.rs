#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event-store fixture for berth
//!
//! Starts a disposable Axon Server container, optionally pre-seeded with
//! control and event data from zip archives, and publishes the connection
//! parameters as `TC_AXON_HOST`, `TC_AXON_GRPC_PORT`, `TC_AXON_HTTP_PORT`
//! and `TC_AXON_TOKEN`.
//!
//! Seed archives are staged on the host through `berth-seed` and
//! bind-mounted onto the server's control-db and event-storage paths before
//! the container starts.

use berth_core::{Fingerprint, Fixture, FixtureConfig};
use berth_errors::{ConfigError, Error, FixtureError};
use berth_seed::SeedStage;
use std::path::PathBuf;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, Mount, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use uuid::Uuid;

const SERVICE: &str = "eventstore";
const IMAGE: &str = "axoniq/axonserver";
const IMAGE_TAG: &str = "4.4.12";
const HTTP_PORT: u16 = 8024;
const GRPC_PORT: u16 = 8124;
// The server is ready once this line appears in its log.
const READY_MESSAGE: &str = "Started AxonServer";
const STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Published property key for the server host
pub const TC_AXON_HOST: &str = "TC_AXON_HOST";
/// Published property key for the mapped gRPC port
pub const TC_AXON_GRPC_PORT: &str = "TC_AXON_GRPC_PORT";
/// Published property key for the mapped HTTP port
pub const TC_AXON_HTTP_PORT: &str = "TC_AXON_HTTP_PORT";
/// Published property key for the access-control token
pub const TC_AXON_TOKEN: &str = "TC_AXON_TOKEN";

/// Configuration for an event-store fixture
#[derive(Debug, Clone, Default)]
pub struct EventStoreConfig {
    exclusive: bool,
    init_control_data: Option<PathBuf>,
    init_event_data: Option<PathBuf>,
}

impl EventStoreConfig {
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

    /// Zip archive of control-db data to seed the server with
    #[must_use]
    pub fn with_init_control_data(mut self, archive: impl Into<PathBuf>) -> Self {
        self.init_control_data = Some(archive.into());
        self
    }

    /// Zip archive of event-storage data to seed the server with
    #[must_use]
    pub fn with_init_event_data(mut self, archive: impl Into<PathBuf>) -> Self {
        self.init_event_data = Some(archive.into());
        self
    }

    fn seeded(&self) -> bool {
        self.init_control_data.is_some() || self.init_event_data.is_some()
    }
}

impl FixtureConfig for EventStoreConfig {
    fn validate(&self) -> Result<(), Error> {
        if self.seeded() && !self.exclusive {
            return Err(ConfigError::SeedOnSharedInstance {
                detail: "seeding control or event data into a shared event-store instance"
                    .to_string(),
            }
            .into());
        }
        for archive in [&self.init_control_data, &self.init_event_data]
            .into_iter()
            .flatten()
        {
            if !archive.is_file() {
                return Err(ConfigError::SeedArchiveMissing {
                    path: archive.display().to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn fingerprint(&self) -> Fingerprint {
        let control = self
            .init_control_data
            .as_ref()
            .map_or_else(String::new, |p| p.display().to_string());
        let events = self
            .init_event_data
            .as_ref()
            .map_or_else(String::new, |p| p.display().to_string());
        Fingerprint::compute(SERVICE, &[&format!("{IMAGE}:{IMAGE_TAG}"), &control, &events])
    }

    fn shared(&self) -> bool {
        !self.exclusive
    }
}

/// A running event-store container and its staged seed data
pub struct EventStoreFixture {
    container: ContainerAsync<GenericImage>,
    control_stage: Option<SeedStage>,
    event_stage: Option<SeedStage>,
    host: String,
    grpc_port: u16,
    http_port: u16,
    token: String,
}

impl EventStoreFixture {
    /// Host the server is reachable on
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Mapped gRPC port
    #[must_use]
    pub fn grpc_port(&self) -> u16 {
        self.grpc_port
    }

    /// Mapped HTTP port
    #[must_use]
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Access-control token the server was started with
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Stop the container and remove the staged seed trees.
    ///
    /// Dropping the fixture performs the same cleanup best-effort; this
    /// method makes failures observable.
    ///
    /// # Errors
    ///
    /// Returns the first error from stopping the container or removing a
    /// staged tree.
    pub async fn dispose(self) -> Result<(), Error> {
        self.container.stop().await.map_err(|e| FixtureError::StopFailed {
            service: SERVICE.to_string(),
            message: e.to_string(),
        })?;

        if let Some(stage) = &self.control_stage {
            stage.unstage().await?;
        }
        if let Some(stage) = &self.event_stage {
            stage.unstage().await?;
        }
        Ok(())
    }
}

impl Fixture for EventStoreFixture {
    type Config = EventStoreConfig;

    async fn launch(config: EventStoreConfig) -> Result<Self, Error> {
        tracing::info!(
            shared = config.shared(),
            seeded = config.seeded(),
            "starting event-store fixture"
        );

        let token = Uuid::new_v4().to_string();
        let base_path = format!("/home/data/{}", Uuid::new_v4());
        let control_path = format!("{base_path}/control");
        let event_path = format!("{base_path}/events");

        let control_stage = match &config.init_control_data {
            Some(archive) => Some(SeedStage::provision("eventstore-control", archive).await?),
            None => None,
        };
        let event_stage = match &config.init_event_data {
            Some(archive) => Some(SeedStage::provision("eventstore-events", archive).await?),
            None => None,
        };

        let image = GenericImage::new(IMAGE, IMAGE_TAG)
            .with_exposed_port(HTTP_PORT.tcp())
            .with_exposed_port(GRPC_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout(READY_MESSAGE));

        let mut request = image
            .with_env_var("AXONIQ_AXONSERVER_ACCESSCONTROL_TOKEN", token.as_str())
            .with_env_var("AXONIQ_AXONSERVER_DEVMODE_ENABLED", "true")
            .with_env_var("AXONIQ_AXONSERVER_CONTROLDB_PATH", control_path.as_str())
            .with_env_var("AXONIQ_AXONSERVER_EVENT_STORAGE", event_path.as_str())
            .with_env_var(
                "JAVA_OPTS",
                "-Daxoniq.axonserver.default-command-timeout=900000",
            )
            .with_startup_timeout(STARTUP_TIMEOUT);

        if let Some(stage) = &control_stage {
            request = request.with_mount(Mount::bind_mount(
                stage.path().display().to_string(),
                control_path.clone(),
            ));
        }
        if let Some(stage) = &event_stage {
            request = request.with_mount(Mount::bind_mount(
                stage.path().display().to_string(),
                event_path.clone(),
            ));
        }

        let container = request.start().await.map_err(|e| FixtureError::StartFailed {
            service: SERVICE.to_string(),
            message: e.to_string(),
        })?;

        let host = container
            .get_host()
            .await
            .map_err(|e| FixtureError::runtime(SERVICE, e))?
            .to_string();
        let grpc_port = container
            .get_host_port_ipv4(GRPC_PORT.tcp())
            .await
            .map_err(|e| FixtureError::runtime(SERVICE, e))?;
        let http_port = container
            .get_host_port_ipv4(HTTP_PORT.tcp())
            .await
            .map_err(|e| FixtureError::runtime(SERVICE, e))?;

        Ok(Self {
            container,
            control_stage,
            event_stage,
            host,
            grpc_port,
            http_port,
            token,
        })
    }

    fn properties(&self) -> Vec<(String, String)> {
        vec![
            (TC_AXON_HOST.to_string(), self.host.clone()),
            (TC_AXON_GRPC_PORT.to_string(), self.grpc_port.to_string()),
            (TC_AXON_HTTP_PORT.to_string(), self.http_port.to_string()),
            (TC_AXON_TOKEN.to_string(), self.token.clone()),
        ]
    }
}
