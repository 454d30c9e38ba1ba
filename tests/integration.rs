//! Integration tests for the berth test harness
//!
//! These tests exercise the harness crates together without a container
//! runtime: seed staging end to end, session-level configuration
//! validation, and fingerprint identity across services.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

mod utils {
    use super::*;
    use zip::write::{FileOptions, ZipWriter};

    /// Write a zip archive with the given entries; `None` content marks a
    /// directory entry.
    pub fn build_zip(dir: &Path, name: &str, entries: &[(&str, Option<&[u8]>)]) -> PathBuf {
        let path = dir.join(name);
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ZipWriter::new(file);

        for (entry, content) in entries {
            match content {
                Some(bytes) => {
                    writer.start_file(*entry, FileOptions::default()).unwrap();
                    writer.write_all(bytes).unwrap();
                }
                None => {
                    writer
                        .add_directory(*entry, FileOptions::default())
                        .unwrap();
                }
            }
        }

        writer.finish().unwrap();
        path
    }
}

#[tokio::test]
async fn seed_stage_lifecycle_round_trips() {
    let temp = TempDir::new().unwrap();
    let archive = utils::build_zip(
        temp.path(),
        "snapshot.zip",
        &[
            ("control/", None),
            ("control/meta.db", Some(b"control bytes".as_slice())),
            ("events/segment-0/00001.events", Some(b"event bytes".as_slice())),
        ],
    );

    let stage = berth_seed::SeedStage::provision("berth-it", &archive)
        .await
        .unwrap();

    assert_eq!(
        std::fs::read(stage.path().join("control/meta.db")).unwrap(),
        b"control bytes"
    );
    assert_eq!(
        std::fs::read(stage.path().join("events/segment-0/00001.events")).unwrap(),
        b"event bytes"
    );

    let root = stage.path().to_path_buf();
    stage.unstage().await.unwrap();
    assert!(!root.exists());

    // Unstaging an already removed tree stays a no-op.
    berth_seed::unstage(&root).await.unwrap();
}

#[tokio::test]
async fn stage_into_caller_owned_root_and_clean_up() {
    let temp = TempDir::new().unwrap();
    let archive = utils::build_zip(
        temp.path(),
        "tree.zip",
        &[("a/b/file.txt", Some(b"leaf".as_slice()))],
    );
    let root = temp.path().join("staged");
    std::fs::create_dir_all(&root).unwrap();

    berth_seed::stage(&archive, &root).await.unwrap();
    assert_eq!(std::fs::read(root.join("a/b/file.txt")).unwrap(), b"leaf");

    berth_seed::unstage(&root).await.unwrap();
    assert!(!root.exists());
}

#[tokio::test]
async fn traversal_archives_never_touch_the_outside() {
    use berth_errors::{Error, SeedError};

    let temp = TempDir::new().unwrap();
    let archive = utils::build_zip(
        temp.path(),
        "hostile.zip",
        &[
            ("innocent.txt", Some(b"fine".as_slice())),
            ("../../evil.txt", Some(b"boom".as_slice())),
        ],
    );
    let root = temp.path().join("staged");
    std::fs::create_dir_all(&root).unwrap();

    let err = berth_seed::stage(&archive, &root).await.unwrap_err();
    assert!(matches!(err, Error::Seed(SeedError::PathTraversal { .. })));
    assert!(!temp.path().join("evil.txt").exists());

    // The aborted stage may have left earlier entries behind; cleanup is
    // the caller's job either way.
    berth_seed::unstage(&root).await.unwrap();
    assert!(!root.exists());
}

#[test]
fn seeded_configs_demand_exclusive_instances() {
    use berth_core::FixtureConfig;
    use berth_errors::{ConfigError, Error};

    let temp = TempDir::new().unwrap();
    let dump = temp.path().join("init.dump");
    std::fs::write(&dump, b"dump").unwrap();
    let archive = utils::build_zip(temp.path(), "events.zip", &[("e", Some(b"x".as_slice()))]);

    let err = berth_postgres::PostgresConfig::new()
        .with_init_dump(dump.as_path())
        .validate()
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::SeedOnSharedInstance { .. })
    ));

    let err = berth_eventstore::EventStoreConfig::new()
        .with_init_event_data(archive.as_path())
        .validate()
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::SeedOnSharedInstance { .. })
    ));

    // The exclusive variants of the same configurations pass.
    berth_postgres::PostgresConfig::new()
        .exclusive()
        .with_init_dump(dump.as_path())
        .validate()
        .unwrap();
    berth_eventstore::EventStoreConfig::new()
        .exclusive()
        .with_init_event_data(archive.as_path())
        .validate()
        .unwrap();
}

#[test]
fn fingerprints_are_distinct_across_services() {
    use berth_core::FixtureConfig;

    let postgres = berth_postgres::PostgresConfig::new().fingerprint();
    let rabbit = berth_rabbit::RabbitConfig::new().fingerprint();
    let eventstore = berth_eventstore::EventStoreConfig::new().fingerprint();

    assert_ne!(postgres, rabbit);
    assert_ne!(rabbit, eventstore);
    assert_ne!(postgres, eventstore);
}
