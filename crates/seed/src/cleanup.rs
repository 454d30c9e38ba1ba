//! Deepest-first removal of staged trees

use berth_errors::{Error, SeedError};
use std::path::{Path, PathBuf};

/// Remove a staged tree in full, deepest-first.
///
/// A missing `dest_root` is a no-op, which makes repeated calls safe.
/// Individual paths that refuse to delete are logged and skipped; the rest
/// of the tree is still attempted.
///
/// # Errors
///
/// Returns `SeedError::CleanupFailed` if the tree cannot be enumerated at
/// all (for example an unreadable directory). Per-path delete failures do
/// not surface here.
pub async fn unstage(dest_root: &Path) -> Result<(), Error> {
    let dest_root = dest_root.to_path_buf();

    tokio::task::spawn_blocking(move || remove_tree(&dest_root))
        .await
        .map_err(|e| Error::internal(format!("unstage task failed: {e}")))??;

    Ok(())
}

fn remove_tree(root: &Path) -> Result<(), Error> {
    if !root.exists() {
        tracing::debug!(path = %root.display(), "staging root already gone, nothing to clean");
        return Ok(());
    }

    let mut paths = Vec::new();
    collect_tree(root, &mut paths).map_err(|e| SeedError::cleanup(root, &e))?;

    // A parent sorts before its descendants, so reversing the sorted list
    // deletes deepest entries first and directories only once empty.
    paths.sort_unstable();
    paths.reverse();

    tracing::debug!(path = %root.display(), entries = paths.len(), "removing staged tree");

    for path in &paths {
        let removed = match std::fs::symlink_metadata(path) {
            Ok(metadata) if metadata.is_dir() => std::fs::remove_dir(path),
            Ok(_) => std::fs::remove_file(path),
            Err(e) => Err(e),
        };
        if let Err(e) = removed {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to remove staged path, continuing"
            );
        }
    }

    Ok(())
}

fn collect_tree(root: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    out.push(root.to_path_buf());

    let metadata = std::fs::symlink_metadata(root)?;
    if metadata.is_dir() {
        for entry in std::fs::read_dir(root)? {
            collect_tree(&entry?.path(), out)?;
        }
    }

    Ok(())
}
