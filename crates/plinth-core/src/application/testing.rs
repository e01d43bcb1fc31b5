//! Test doubles shared by the application-layer unit tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::application::{ApplicationError, ports::Filesystem};
use crate::error::{PlinthError, PlinthResult};

/// Map-backed filesystem that records every write.
#[derive(Default)]
pub struct MemoryFs {
    files: Mutex<BTreeMap<PathBuf, String>>,
    writes: Mutex<Vec<String>>,
    read_only: Mutex<Vec<PathBuf>>,
}

impl MemoryFs {
    pub fn with_file(path: &str, content: &str) -> Self {
        let fs = Self::default();
        fs.put(path, content);
        fs
    }

    pub fn put(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), content.to_string());
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(Path::new(path)).cloned()
    }

    /// Make every later `write_atomic` to `path` fail.
    pub fn deny_writes(&self, path: &str) {
        self.read_only.lock().unwrap().push(PathBuf::from(path));
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

impl Filesystem for MemoryFs {
    fn read_to_string(&self, path: &Path) -> PlinthResult<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| PlinthError::not_found(path.display().to_string()))
    }

    fn write_atomic(&self, path: &Path, content: &str) -> PlinthResult<()> {
        if self.read_only.lock().unwrap().iter().any(|p| p == path) {
            return Err(ApplicationError::FilesystemError {
                path: path.to_path_buf(),
                reason: "read-only".into(),
            }
            .into());
        }
        self.writes.lock().unwrap().push(path.display().to_string());
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.exists(path)
    }

    fn remove_file(&self, path: &Path) -> PlinthResult<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    fn create_dir_all(&self, _path: &Path) -> PlinthResult<()> {
        Ok(())
    }
}
