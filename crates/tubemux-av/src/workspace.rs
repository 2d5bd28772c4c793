//! Scratch directory management for a single download-and-mux run.
//!
//! A [`Workspace`] is a uniquely named directory holding the intermediate
//! track files of one run. It is created before any download starts and
//! destroyed when the run ends, whatever the outcome.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::{Error, Result};

/// Prefix of every workspace directory name.
const WORKSPACE_PREFIX: &str = "tubemux-";

/// Isolated scratch directory owned by one run.
///
/// Dropping a workspace without calling [`Workspace::destroy`] still removes
/// the directory on a best-effort basis.
///
/// # Example
///
/// ```no_run
/// use tubemux_av::Workspace;
///
/// let workspace = Workspace::create(None)?;
/// let video = workspace.temp_file("video.mp4");
/// // ... download into `video`, mux, finalize ...
/// workspace.destroy();
/// # Ok::<(), tubemux_av::Error>(())
/// ```
#[derive(Debug)]
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace under `root`, or under the system temp
    /// directory when no root is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Workspace`] if the directory cannot be created.
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let temp_dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| Error::workspace(format!("failed to create temp dir: {e}")))?;

        tracing::debug!("created workspace {:?}", temp_dir.path());
        Ok(Self { temp_dir })
    }

    /// Path to the workspace directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path for a named file inside the workspace.
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Move a file produced inside the workspace to its final destination.
    ///
    /// Tries a rename first and falls back to copy+remove when the
    /// destination lives on another filesystem. An existing file at the
    /// destination is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if `produced` does not exist or cannot be moved.
    pub fn finalize(&self, produced: &Path, destination: &Path) -> Result<PathBuf> {
        if !produced.exists() {
            return Err(Error::file_not_found(produced));
        }

        if let Err(rename_err) = std::fs::rename(produced, destination) {
            tracing::debug!("rename into place failed ({rename_err}), copying instead");
            if let Err(e) = std::fs::copy(produced, destination) {
                // Never leave a truncated copy behind.
                let _ = std::fs::remove_file(destination);
                return Err(Error::workspace(format!(
                    "failed to move output to {}: {e}",
                    destination.display()
                )));
            }
            let _ = std::fs::remove_file(produced);
        }

        Ok(destination.to_path_buf())
    }

    /// Remove the workspace and everything in it.
    ///
    /// Never fails: a directory that is already gone is fine, any other
    /// removal error is logged as a warning.
    pub fn destroy(self) {
        let path = self.temp_dir.path().to_path_buf();
        match self.temp_dir.close() {
            Ok(()) => tracing::debug!("removed workspace {:?}", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("workspace {:?} was already gone", path)
            }
            Err(e) => tracing::warn!("failed to remove workspace {:?}: {e}", path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn create_under_root() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(Some(root.path())).unwrap();

        assert!(ws.path().is_dir());
        assert!(ws.path().starts_with(root.path()));
        let name = ws.path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(WORKSPACE_PREFIX));
    }

    #[test]
    fn workspaces_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::create(Some(root.path())).unwrap();
        let b = Workspace::create(Some(root.path())).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn create_fails_for_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does/not/exist");
        let err = Workspace::create(Some(&missing)).unwrap_err();
        assert!(matches!(err, Error::Workspace(_)));
    }

    #[test]
    fn temp_file_inside_workspace() {
        let ws = Workspace::create(None).unwrap();
        let tf = ws.temp_file("video.mp4");
        assert!(tf.starts_with(ws.path()));
        assert_eq!(tf.file_name().unwrap(), "video.mp4");
    }

    #[test]
    fn destroy_removes_populated_dir() {
        let ws = Workspace::create(None).unwrap();
        let path = ws.path().to_path_buf();
        fs::write(ws.temp_file("video.mp4"), b"video").unwrap();
        fs::create_dir(ws.temp_file("nested")).unwrap();
        fs::write(ws.temp_file("nested/audio.m4a"), b"audio").unwrap();

        ws.destroy();
        assert!(!path.exists());
    }

    #[test]
    fn destroy_empty_dir() {
        let ws = Workspace::create(None).unwrap();
        let path = ws.path().to_path_buf();
        ws.destroy();
        assert!(!path.exists());
    }

    #[test]
    fn destroy_tolerates_missing_dir() {
        let ws = Workspace::create(None).unwrap();
        let path = ws.path().to_path_buf();
        fs::remove_dir_all(&path).unwrap();
        ws.destroy();
        assert!(!path.exists());
    }

    #[test]
    fn finalize_moves_output() {
        let out_dir = tempfile::tempdir().unwrap();
        let ws = Workspace::create(None).unwrap();
        let produced = ws.temp_file("merged.mp4");
        fs::write(&produced, b"muxed").unwrap();

        let dest = out_dir.path().join("movie.mp4");
        let final_path = ws.finalize(&produced, &dest).unwrap();

        assert_eq!(final_path, dest);
        assert_eq!(fs::read(&dest).unwrap(), b"muxed");
        assert!(!produced.exists());
    }

    #[test]
    fn finalize_replaces_existing_destination() {
        let out_dir = tempfile::tempdir().unwrap();
        let dest = out_dir.path().join("movie.mov");
        fs::write(&dest, b"old").unwrap();

        let ws = Workspace::create(None).unwrap();
        let produced = ws.temp_file("merged.mov");
        fs::write(&produced, b"new").unwrap();

        ws.finalize(&produced, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn finalize_missing_output_fails() {
        let out_dir = tempfile::tempdir().unwrap();
        let ws = Workspace::create(None).unwrap();
        let dest = out_dir.path().join("movie.mp4");

        let err = ws.finalize(&ws.temp_file("merged.mp4"), &dest).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
        assert!(!dest.exists());
    }
}
