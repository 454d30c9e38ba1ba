//! Entry path containment checks for seed extraction

use berth_errors::{Error, SeedError};
use std::path::{Component, Path, PathBuf};

/// Resolve an archive entry's relative path beneath the staging root.
///
/// `root` must already be canonicalized by the caller. The entry path is
/// rebuilt component by component: `.` segments are dropped, and any
/// parent-directory, root, or drive-prefix component rejects the entry.
/// The rebuilt candidate is then checked to still sit under the root.
///
/// # Errors
///
/// Returns `SeedError::PathTraversal` if the entry would land outside the
/// staging root.
pub fn resolve_entry(root: &Path, entry: &str) -> Result<PathBuf, Error> {
    let mut resolved = root.to_path_buf();

    for component in Path::new(entry).components() {
        match component {
            Component::Normal(name) => resolved.push(name),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SeedError::PathTraversal {
                    entry: entry.to_string(),
                }
                .into());
            }
        }
    }

    if !resolved.starts_with(root) {
        return Err(SeedError::PathTraversal {
            entry: entry.to_string(),
        }
        .into());
    }

    Ok(resolved)
}
