#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! PostgreSQL fixture for berth
//!
//! Starts a disposable PostgreSQL container, optionally restores a
//! `pg_restore`-compatible dump into the fresh database, and publishes the
//! connection parameters as `TC_DB_URL`, `TC_DB_USER` and `TC_DB_PASSWORD`.

use berth_core::{Fingerprint, Fixture, FixtureConfig};
use berth_errors::{ConfigError, Error, FixtureError};
use std::path::PathBuf;
use testcontainers::core::{ExecCommand, IntoContainerPort};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use uuid::Uuid;

const SERVICE: &str = "postgres";
const IMAGE_TAG: &str = "10.3";
const DEFAULT_USER: &str = "test";
const PASSWORD: &str = "test";
const PG_PORT: u16 = 5432;
const DUMP_TARGET: &str = "/initData.dump";

/// Published property key for the database URL
pub const TC_DB_URL: &str = "TC_DB_URL";
/// Published property key for the database user
pub const TC_DB_USER: &str = "TC_DB_USER";
/// Published property key for the database password
pub const TC_DB_PASSWORD: &str = "TC_DB_PASSWORD";

/// Configuration for a PostgreSQL fixture
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    shared: bool,
    user: String,
    init_dump: Option<PathBuf>,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            shared: true,
            user: DEFAULT_USER.to_string(),
            init_dump: None,
        }
    }
}

impl PostgresConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an exclusive container instead of the shared instance
    #[must_use]
    pub fn exclusive(mut self) -> Self {
        self.shared = false;
        self
    }

    /// Database user; also used as the database name
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Dump to restore into the fresh database via `pg_restore`
    #[must_use]
    pub fn with_init_dump(mut self, dump: impl Into<PathBuf>) -> Self {
        self.init_dump = Some(dump.into());
        self
    }
}

impl FixtureConfig for PostgresConfig {
    fn validate(&self) -> Result<(), Error> {
        if self.user.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "user".to_string(),
                value: String::new(),
            }
            .into());
        }
        if let Some(dump) = &self.init_dump {
            if self.shared {
                return Err(ConfigError::SeedOnSharedInstance {
                    detail: "restoring a dump into a shared PostgreSQL instance".to_string(),
                }
                .into());
            }
            if !dump.is_file() {
                return Err(ConfigError::SeedArchiveMissing {
                    path: dump.display().to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn fingerprint(&self) -> Fingerprint {
        let dump = self
            .init_dump
            .as_ref()
            .map_or_else(String::new, |p| p.display().to_string());
        Fingerprint::compute(SERVICE, &[&format!("postgres:{IMAGE_TAG}"), &self.user, &dump])
    }

    fn shared(&self) -> bool {
        self.shared
    }
}

/// A running PostgreSQL container
pub struct PostgresFixture {
    container: ContainerAsync<Postgres>,
    host: String,
    port: u16,
    url: String,
    user: String,
}

impl PostgresFixture {
    /// Connection URL for the containerized database
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Host the database is reachable on
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Mapped database port
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Database user
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
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

impl Fixture for PostgresFixture {
    type Config = PostgresConfig;

    async fn launch(config: PostgresConfig) -> Result<Self, Error> {
        // A per-instance PGDATA keeps restarted containers from ever seeing
        // a stale data directory on the overlay.
        let data_path = format!("/var/lib/postgresql/data/{}", Uuid::new_v4());
        tracing::info!(user = %config.user, shared = config.shared, "starting PostgreSQL fixture");

        let request = Postgres::default()
            .with_user(config.user.as_str())
            .with_password(PASSWORD)
            .with_db_name(config.user.as_str())
            .with_tag(IMAGE_TAG)
            .with_env_var("PGDATA", data_path.as_str());

        let request = if let Some(dump) = &config.init_dump {
            let bytes = tokio::fs::read(dump)
                .await
                .map_err(|e| Error::io_with_path(&e, dump.as_path()))?;
            request.with_copy_to(DUMP_TARGET, bytes)
        } else {
            request
        };

        let container = request.start().await.map_err(|e| FixtureError::StartFailed {
            service: SERVICE.to_string(),
            message: e.to_string(),
        })?;

        if config.init_dump.is_some() {
            restore_dump(&container, &config.user).await?;
        }

        let host = container
            .get_host()
            .await
            .map_err(|e| FixtureError::runtime(SERVICE, e))?;
        let port = container
            .get_host_port_ipv4(PG_PORT.tcp())
            .await
            .map_err(|e| FixtureError::runtime(SERVICE, e))?;
        let host = host.to_string();
        let url = format!(
            "postgres://{user}:{PASSWORD}@{host}:{port}/{user}",
            user = config.user
        );

        Ok(Self {
            container,
            host,
            port,
            url,
            user: config.user,
        })
    }

    fn properties(&self) -> Vec<(String, String)> {
        vec![
            (TC_DB_URL.to_string(), self.url.clone()),
            (TC_DB_USER.to_string(), self.user.clone()),
            (TC_DB_PASSWORD.to_string(), PASSWORD.to_string()),
        ]
    }
}

async fn restore_dump(container: &ContainerAsync<Postgres>, user: &str) -> Result<(), Error> {
    tracing::info!("restoring init dump into PostgreSQL fixture");
    let restore = format!("pg_restore -C --clean -d postgres -U {user} {DUMP_TARGET}");

    let mut result = container
        .exec(ExecCommand::new(["bash", "-c", restore.as_str()]))
        .await
        .map_err(|e| FixtureError::runtime(SERVICE, e))?;

    let exit = result
        .exit_code()
        .await
        .map_err(|e| FixtureError::runtime(SERVICE, e))?;
    if exit != Some(0) {
        let stdout = result.stdout_to_vec().await.unwrap_or_default();
        return Err(FixtureError::SeedImportFailed {
            service: SERVICE.to_string(),
            message: format!(
                "pg_restore exited with {exit:?}: {}",
                String::from_utf8_lossy(&stdout)
            ),
        }
        .into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_errors::ConfigError;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_shared_with_default_user() {
        let config = PostgresConfig::new();
        assert!(config.shared());
        config.validate().unwrap();
    }

    #[test]
    fn dump_on_shared_instance_is_rejected() {
        let temp = TempDir::new().unwrap();
        let dump = temp.path().join("init.dump");
        std::fs::write(&dump, b"dump").unwrap();

        let err = PostgresConfig::new()
            .with_init_dump(dump.as_path())
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::SeedOnSharedInstance { .. })
        ));
    }

    #[test]
    fn missing_dump_is_rejected() {
        let temp = TempDir::new().unwrap();

        let err = PostgresConfig::new()
            .exclusive()
            .with_init_dump(temp.path().join("absent.dump"))
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::SeedArchiveMissing { .. })
        ));
    }

    #[test]
    fn empty_user_is_rejected() {
        let err = PostgresConfig::new().with_user("").validate().unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn fingerprint_tracks_user_and_dump_identity() {
        let base = PostgresConfig::new().fingerprint();
        assert_eq!(base, PostgresConfig::new().fingerprint());
        assert_ne!(base, PostgresConfig::new().with_user("other").fingerprint());
        assert_ne!(
            base,
            PostgresConfig::new()
                .with_init_dump("/seeds/init.dump")
                .fingerprint()
        );
    }
}
