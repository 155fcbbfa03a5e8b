//! Per-job workspace management.
//!
//! Each job builds inside a freshly created temp directory that no other job
//! may observe. Reclamation happens explicitly once the terminal notification
//! attempt resolves; dropping the workspace is the fallback on early exits.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::StageError;

/// An exclusively-owned filesystem scope for one job's intermediate state.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates a fresh workspace under `root`.
    pub fn create(root: &Path) -> Result<Self, StageError> {
        fs::create_dir_all(root).map_err(|e| {
            StageError::Fetch(format!(
                "failed to create workspace root {}: {}",
                root.display(),
                e
            ))
        })?;

        let dir = tempfile::Builder::new()
            .prefix("build-")
            .tempdir_in(root)
            .map_err(|e| StageError::Fetch(format!("failed to allocate workspace: {}", e)))?;

        debug!(workspace = %dir.path().display(), "workspace created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Resolves the true project root after source acquisition.
    ///
    /// If the workspace contains exactly one entry and it is a directory, that
    /// directory is the project root (a single wrapping folder, typical of
    /// archive exports and some checkouts, is flattened). Applied uniformly
    /// regardless of how the source was acquired.
    pub fn project_root(&self) -> Result<PathBuf, StageError> {
        let entries: Vec<_> = fs::read_dir(self.path())
            .map_err(|e| StageError::Fetch(format!("failed to list workspace: {}", e)))?
            .filter_map(|entry| entry.ok())
            .collect();

        if entries.len() == 1 && entries[0].path().is_dir() {
            return Ok(entries[0].path());
        }
        Ok(self.path().to_path_buf())
    }

    /// Reclaims the workspace. Failures are logged, never fatal: the job is
    /// already terminal by the time this runs.
    pub fn cleanup(self) {
        let path = self.dir.path().display().to_string();
        if let Err(e) = self.dir.close() {
            warn!(workspace = %path, error = %e, "failed to reclaim workspace");
        } else {
            debug!(workspace = %path, "workspace reclaimed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspaces_are_distinct() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::create(root.path()).unwrap();
        let b = Workspace::create(root.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_project_root_flattens_single_wrapping_dir() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path()).unwrap();

        let inner = ws.path().join("my-project-main");
        fs::create_dir(&inner).unwrap();
        fs::write(inner.join("package.json"), "{}").unwrap();

        assert_eq!(ws.project_root().unwrap(), inner);
    }

    #[test]
    fn test_project_root_stays_put_with_multiple_entries() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path()).unwrap();

        fs::create_dir(ws.path().join("src")).unwrap();
        fs::write(ws.path().join("package.json"), "{}").unwrap();

        assert_eq!(ws.project_root().unwrap(), ws.path());
    }

    #[test]
    fn test_project_root_single_file_is_not_flattened() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path()).unwrap();

        fs::write(ws.path().join("package.json"), "{}").unwrap();

        assert_eq!(ws.project_root().unwrap(), ws.path());
    }

    #[test]
    fn test_cleanup_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path()).unwrap();
        let path = ws.path().to_path_buf();
        fs::write(path.join("junk"), "x").unwrap();

        ws.cleanup();
        assert!(!path.exists());
    }
}
