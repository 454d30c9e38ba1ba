//! Owning handle for a staged seed tree

use berth_errors::Error;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A staged seed tree rooted in a fresh process-temp directory.
///
/// [`SeedStage::provision`] allocates the root, extracts the archive into
/// it, and hands back an owning handle. The root is exclusively owned by
/// this handle for its lifetime; call [`SeedStage::unstage`] for
/// deterministic removal. Dropping the handle schedules best-effort cleanup
/// instead.
#[derive(Debug)]
pub struct SeedStage {
    root: PathBuf,
}

impl SeedStage {
    /// Create a fresh staging root and extract `archive` into it.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be created or extraction fails.
    /// A failed extraction clears the partially populated root before the
    /// error surfaces.
    pub async fn provision(prefix: &str, archive: &Path) -> Result<Self, Error> {
        let root = std::env::temp_dir().join(format!("{prefix}-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| Error::io_with_path(&e, root.as_path()))?;

        if let Err(e) = crate::stage(archive, &root).await {
            let _ = crate::unstage(&root).await;
            return Err(e);
        }

        tracing::info!(
            archive = %archive.display(),
            root = %root.display(),
            "provisioned seed stage"
        );
        Ok(Self { root })
    }

    /// Path of the staging root
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Remove the staged tree in full
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be enumerated; see
    /// [`unstage`](crate::unstage).
    pub async fn unstage(&self) -> Result<(), Error> {
        crate::unstage(&self.root).await
    }
}

impl Drop for SeedStage {
    fn drop(&mut self) {
        let root = self.root.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = crate::unstage(&root).await;
            });
        }
    }
}
