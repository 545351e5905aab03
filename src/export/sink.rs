//! Destinations for finished documents.

use crate::error::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Delivers a finished artifact under its file name.
pub trait ArtifactSink: Send + Sync {
    /// Store `bytes` as `file_name`, returning the path when the artifact
    /// lands on the filesystem.
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<Option<PathBuf>>;
}

/// Writes artifacts into a directory.
///
/// The bytes go to a temporary file in the same directory first and are
/// renamed into place, so readers never observe a partial document.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for DirectorySink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<Option<PathBuf>> {
        if Path::new(file_name).file_name().and_then(|n| n.to_str()) != Some(file_name) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("`{}` is not a plain file name", file_name),
            )));
        }
        std::fs::create_dir_all(&self.dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        let path = self.dir.join(file_name);
        tmp.persist(&path).map_err(|e| Error::Io(e.error))?;
        debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(Some(path))
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Artifacts saved so far, in order.
    pub fn artifacts(&self) -> Vec<(String, Vec<u8>)> {
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ArtifactSink for MemorySink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<Option<PathBuf>> {
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((file_name.to_string(), bytes.to_vec()));
        Ok(None)
    }
}
