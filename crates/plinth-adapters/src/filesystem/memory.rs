//! In-memory filesystem adapter for testing.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use plinth_core::{
    application::{ApplicationError, ports::Filesystem},
    error::{PlinthError, PlinthResult},
};

/// Thread-safe in-memory filesystem. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    files: BTreeMap<PathBuf, String>,
    directories: BTreeSet<PathBuf>,
    /// Every path passed to `write_atomic`, in call order.
    writes: Vec<PathBuf>,
}

fn poisoned() -> PlinthError {
    ApplicationError::LockError {
        resource: "memory filesystem".into(),
    }
    .into()
}

impl MemoryFilesystem {
    /// Create a new empty memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file (testing helper). Parent directories are implied.
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            let path = path.into();
            register_parents(&mut inner.directories, &path);
            inner.files.insert(path, content.into());
        }
        self
    }

    /// Read a file's content (testing helper).
    pub fn read_file(&self, path: impl AsRef<Path>) -> Option<String> {
        let inner = self.inner.read().ok()?;
        inner.files.get(path.as_ref()).cloned()
    }

    /// List all files, sorted.
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .map(|inner| inner.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Paths written since creation, in call order.
    pub fn writes(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .map(|inner| inner.writes.clone())
            .unwrap_or_default()
    }
}

fn register_parents(directories: &mut BTreeSet<PathBuf>, path: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir.as_os_str().is_empty() || !directories.insert(dir.to_path_buf()) {
            break;
        }
        current = dir.parent();
    }
}

impl Filesystem for MemoryFilesystem {
    fn read_to_string(&self, path: &Path) -> PlinthResult<String> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        inner
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| PlinthError::not_found(path.display().to_string()))
    }

    fn write_atomic(&self, path: &Path, content: &str) -> PlinthResult<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        register_parents(&mut inner.directories, path);
        inner.files.insert(path.to_path_buf(), content.to_string());
        inner.writes.push(path.to_path_buf());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner
            .read()
            .map(|inner| inner.files.contains_key(path) || inner.directories.contains(path))
            .unwrap_or(false)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.inner
            .read()
            .map(|inner| inner.files.contains_key(path))
            .unwrap_or(false)
    }

    fn remove_file(&self, path: &Path) -> PlinthResult<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        inner.files.remove(path);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> PlinthResult<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        inner.directories.insert(path.to_path_buf());
        register_parents(&mut inner.directories, path);
        Ok(())
    }
}
