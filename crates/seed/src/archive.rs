//! Zip extraction onto a staging root

use berth_errors::{Error, SeedError};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::paths::resolve_entry;

/// Recognized seed archive suffix
const SEED_SUFFIX: &str = ".zip";

/// Size of the intermediate copy buffer for file entries
const COPY_BUF_SIZE: usize = 8 * 1024;

/// Extract a zip seed archive into `dest_root`.
///
/// `dest_root` must be an existing directory the caller owns exclusively.
/// Entries are processed in archive order; the first entry that escapes the
/// root aborts the whole pass. Partial state may remain on failure, so
/// callers should run [`unstage`](crate::unstage) on `dest_root` regardless
/// of the outcome.
///
/// # Errors
///
/// Returns an error if:
/// - The archive path is missing, not a regular file, or lacks the `.zip`
///   suffix (checked before any extraction I/O)
/// - An entry's resolved path escapes `dest_root`
/// - Directory creation or file writing fails
pub async fn stage(archive: &Path, dest_root: &Path) -> Result<(), Error> {
    validate_archive_path(archive)?;

    let archive = archive.to_path_buf();
    let dest_root = dest_root.to_path_buf();

    tokio::task::spawn_blocking(move || extract_zip(&archive, &dest_root))
        .await
        .map_err(|e| Error::internal(format!("stage task failed: {e}")))??;

    Ok(())
}

fn validate_archive_path(archive: &Path) -> Result<(), Error> {
    let metadata = std::fs::metadata(archive).map_err(|e| SeedError::InvalidArchive {
        path: archive.display().to_string(),
        reason: e.to_string(),
    })?;

    if !metadata.is_file() {
        return Err(SeedError::InvalidArchive {
            path: archive.display().to_string(),
            reason: "not a regular file".to_string(),
        }
        .into());
    }

    let is_zip = archive
        .file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with(SEED_SUFFIX));
    if !is_zip {
        return Err(SeedError::InvalidArchive {
            path: archive.display().to_string(),
            reason: format!("expected a `{SEED_SUFFIX}` archive"),
        }
        .into());
    }

    Ok(())
}

fn extract_zip(archive: &Path, dest_root: &Path) -> Result<(), Error> {
    let file = File::open(archive).map_err(|e| SeedError::extraction(archive, &e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| SeedError::InvalidArchive {
        path: archive.display().to_string(),
        reason: e.to_string(),
    })?;

    // Entry candidates are rebuilt off the canonicalized root, so the
    // containment check compares canonical paths on both sides.
    let canonical_root = dest_root
        .canonicalize()
        .map_err(|e| SeedError::extraction(dest_root, &e))?;

    tracing::debug!(
        archive = %archive.display(),
        dest = %canonical_root.display(),
        entries = zip.len(),
        "staging seed archive"
    );

    let mut buf = [0u8; COPY_BUF_SIZE];
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| SeedError::ExtractionFailed {
            path: archive.display().to_string(),
            message: e.to_string(),
        })?;

        let name = entry.name().to_string();
        let target = resolve_entry(&canonical_root, &name)?;

        if entry.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| SeedError::extraction(&target, &e))?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SeedError::extraction(parent, &e))?;
            }
            let mut out = File::create(&target).map_err(|e| SeedError::extraction(&target, &e))?;
            copy_entry(&mut entry, &mut out, &mut buf)
                .map_err(|e| SeedError::extraction(&target, &e))?;
        }
    }

    Ok(())
}

fn copy_entry(
    reader: &mut impl Read,
    writer: &mut impl Write,
    buf: &mut [u8],
) -> std::io::Result<()> {
    loop {
        let n = reader.read(buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
    }
    writer.flush()
}
