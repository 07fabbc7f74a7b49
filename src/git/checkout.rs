//! Scoped scratch clones.
//!
//! A `ScratchCheckout` clones a repository into a temporary directory and
//! removes it when dropped, whichever way the caller leaves its scope.

use git2::build::RepoBuilder;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::error::Result;

pub struct ScratchCheckout {
    dir: TempDir,
    path: PathBuf,
}

impl ScratchCheckout {
    /// Clone `source` into a fresh directory under `parent`.
    pub fn create(source: &Path, parent: &Path) -> Result<Self> {
        let dir = TempDir::with_prefix_in("vuln-blame-", parent)?;
        let path = dir.path().join("checkout");
        let url = source.to_string_lossy().to_string();
        RepoBuilder::new().clone(&url, &path)?;
        debug!("cloned {} into {}", url, path.display());
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the clone now, reporting any I/O error instead of ignoring it on drop.
    pub fn release(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}
