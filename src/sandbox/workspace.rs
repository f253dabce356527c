use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::ExecutionError;

/// An exclusively owned scratch directory for one execution
///
/// The directory name carries a random suffix so concurrent requests never
/// collide. It is removed recursively by `release`, or when the workspace is
/// dropped on any other exit path.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates a fresh, empty workspace under `root`
    pub fn acquire(root: &Path) -> Result<Self, ExecutionError> {
        let workspace_error = |source| ExecutionError::Workspace {
            root: root.to_path_buf(),
            source,
        };

        fs::create_dir_all(root).map_err(workspace_error)?;
        let dir = tempfile::Builder::new()
            .prefix("run-")
            .tempdir_in(root)
            .map_err(workspace_error)?;

        log::debug!("Acquired workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a new file into the workspace, refusing to overwrite anything
    pub fn create_file(&self, name: &str, contents: &str) -> Result<PathBuf, ExecutionError> {
        let path = self.dir.path().join(name);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.write_all(contents.as_bytes())?;
        Ok(path)
    }

    /// Removes the workspace and everything in it
    pub fn release(self) -> Result<(), ExecutionError> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        log::debug!("Released workspace {}", path.display());
        Ok(())
    }
}
