use std::path::{Path, PathBuf};

/// Removes the file at `path` when dropped, whatever the exit path was.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A uniquely named path in the system temp directory with the given extension,
    /// e.g. `.mp4`.
    pub fn unique(extension: &str) -> Self {
        let name = format!("deepfake-{}{}", uuid::Uuid::new_v4(), extension);
        Self::new(std::env::temp_dir().join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed temp file: {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!(
                "Error cleaning up temp file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
