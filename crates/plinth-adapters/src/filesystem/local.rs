//! Local filesystem adapter using std::fs.

use std::io::Write as _;
use std::path::Path;

use plinth_core::{application::ports::Filesystem, error::PlinthResult};
use tempfile::NamedTempFile;
use tracing::trace;

use crate::error::AdapterError;

/// Production filesystem implementation using `std::fs`.
///
/// Writes go to a temporary file in the target's directory and are renamed
/// into place, so a reader never sees a half-written file.
#[derive(Debug, Clone, Copy)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    /// Create a new local filesystem adapter.
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for LocalFilesystem {
    fn read_to_string(&self, path: &Path) -> PlinthResult<String> {
        std::fs::read_to_string(path).map_err(|e| AdapterError::io("read", path, e).into())
    }

    fn write_atomic(&self, path: &Path, content: &str) -> PlinthResult<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        self.create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)
            .map_err(|e| AdapterError::io("create temp file for", path, e))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| AdapterError::io("write", path, e))?;
        tmp.persist(path)
            .map_err(|e| AdapterError::io("rename into", path, e.error))?;

        trace!(path = %path.display(), bytes = content.len(), "Wrote file");
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn remove_file(&self, path: &Path) -> PlinthResult<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AdapterError::io("remove", path, e).into()),
        }
    }

    fn create_dir_all(&self, path: &Path) -> PlinthResult<()> {
        std::fs::create_dir_all(path)
            .map_err(|e| AdapterError::io("create directory", path, e).into())
    }
}
