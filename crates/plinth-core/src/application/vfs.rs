//! Transactional, copy-on-write overlay over one module's directory subtree.
//!
//! Every path is relative to the *anchor*, `project_root/context_root`.
//! Handlers read and write through the overlay; nothing reaches disk until
//! [`VirtualFileSystem::commit`] (or [`VirtualFileSystem::flush_to_disk`]).
//!
//! ```text
//!   read_file(p) ─► overlay Present ─► content
//!                ─► overlay Deleted ─► NotFound
//!                ─► no entry        ─► disk(anchor/p) or NotFound
//! ```
//!
//! Flush is atomic per file (the `Filesystem` port writes through a temp
//! file and renames) but not across the set: the first failure stops the
//! flush and files written before it stay on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::ports::Filesystem;
use crate::domain::{DomainError, ExecutionContext, RelativePath};
use crate::error::{PlinthError, PlinthResult};

/// Where an overlay entry's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Seeded from disk and not modified since.
    Loaded,
    /// Created or modified in memory.
    Written,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum OverlayEntry {
    Present {
        content: String,
        provenance: Provenance,
    },
    Deleted,
}

/// Paths applied by one flush, anchor-relative, in flush order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub written: Vec<String>,
    pub deleted: Vec<String>,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.deleted.is_empty()
    }
}

pub struct VirtualFileSystem {
    id: String,
    project_root: PathBuf,
    context_root: RelativePath,
    anchor: PathBuf,
    overlay: BTreeMap<RelativePath, OverlayEntry>,
    fs: Arc<dyn Filesystem>,
    released: bool,
}

impl VirtualFileSystem {
    pub fn new(
        project_root: impl Into<PathBuf>,
        context_root: RelativePath,
        fs: Arc<dyn Filesystem>,
    ) -> Self {
        let project_root = project_root.into();
        let anchor = context_root.to_path(&project_root);
        let id = format!("vfs-{}", &Uuid::new_v4().simple().to_string()[..8]);

        debug!(vfs = %id, anchor = %anchor.display(), "VFS created");

        Self {
            id,
            project_root,
            context_root,
            anchor,
            overlay: BTreeMap::new(),
            fs,
            released: false,
        }
    }

    /// A VFS anchored where `ctx` says the module lives.
    pub fn for_context(ctx: &ExecutionContext, fs: Arc<dyn Filesystem>) -> Self {
        Self::new(ctx.project().root.clone(), ctx.context_root(), fs)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn context_root(&self) -> &RelativePath {
        &self.context_root
    }

    pub fn anchor(&self) -> &Path {
        &self.anchor
    }

    pub fn len(&self) -> usize {
        self.overlay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlay.is_empty()
    }

    /// Written and deleted paths, sorted.
    pub fn touched_paths(&self) -> Vec<String> {
        self.overlay
            .iter()
            .filter(|(_, entry)| {
                matches!(
                    entry,
                    OverlayEntry::Deleted
                        | OverlayEntry::Present {
                            provenance: Provenance::Written,
                            ..
                        }
                )
            })
            .map(|(path, _)| path.to_string())
            .collect()
    }

    /// Provenance of a present overlay entry.
    pub fn provenance(&self, path: &str) -> Option<Provenance> {
        let key = self.normalize(path).ok()?;
        match self.overlay.get(&key)? {
            OverlayEntry::Present { provenance, .. } => Some(*provenance),
            OverlayEntry::Deleted => None,
        }
    }

    // ========================================================================
    // File operations
    // ========================================================================

    pub fn read_file(&self, path: &str) -> PlinthResult<String> {
        let key = self.normalize(path)?;
        match self.overlay.get(&key) {
            Some(OverlayEntry::Present { content, .. }) => Ok(content.clone()),
            Some(OverlayEntry::Deleted) => Err(PlinthError::not_found(key.into_string())),
            None => self.fs.read_to_string(&self.disk_path(&key)),
        }
    }

    /// Record new content in the overlay. Disk is untouched.
    pub fn write_file(&mut self, path: &str, content: impl Into<String>) -> PlinthResult<RelativePath> {
        let key = self.normalize(path)?;
        self.overlay.insert(
            key.clone(),
            OverlayEntry::Present {
                content: content.into(),
                provenance: Provenance::Written,
            },
        );
        Ok(key)
    }

    pub fn file_exists(&self, path: &str) -> bool {
        let Ok(key) = self.normalize(path) else {
            return false;
        };
        match self.overlay.get(&key) {
            Some(OverlayEntry::Present { .. }) => true,
            Some(OverlayEntry::Deleted) => false,
            None => self.fs.is_file(&self.disk_path(&key)),
        }
    }

    /// Mask the file until flush. Disk is untouched.
    pub fn delete_file(&mut self, path: &str) -> PlinthResult<RelativePath> {
        let key = self.normalize(path)?;
        self.overlay.insert(key.clone(), OverlayEntry::Deleted);
        Ok(key)
    }

    /// Best-effort preload. Returns how many files were seeded.
    ///
    /// Paths already in the overlay, missing on disk, unreadable or invalid
    /// are skipped.
    pub fn initialize_with_files<I, S>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seeded = 0;

        for raw in paths {
            let raw = raw.as_ref();
            let key = match self.normalize(raw) {
                Ok(key) => key,
                Err(e) => {
                    debug!(vfs = %self.id, path = raw, error = %e, "Preload skipped");
                    continue;
                }
            };
            if self.overlay.contains_key(&key) {
                continue;
            }

            let disk = self.disk_path(&key);
            if !self.fs.is_file(&disk) {
                debug!(vfs = %self.id, path = %key, "Preload skipped: not on disk");
                continue;
            }

            match self.fs.read_to_string(&disk) {
                Ok(content) => {
                    self.overlay.insert(
                        key,
                        OverlayEntry::Present {
                            content,
                            provenance: Provenance::Loaded,
                        },
                    );
                    seeded += 1;
                }
                Err(e) => {
                    debug!(vfs = %self.id, path = %key, error = %e, "Preload skipped: unreadable");
                }
            }
        }

        debug!(vfs = %self.id, seeded, "Preload finished");
        seeded
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Apply the overlay to disk in sorted path order.
    ///
    /// `Written` entries are written atomically and become `Loaded`;
    /// `Deleted` entries are removed from disk and dropped from the overlay.
    /// `Loaded` entries are left alone, so flushing twice is a no-op the
    /// second time.
    pub fn flush_to_disk(&mut self) -> PlinthResult<FlushReport> {
        let mut report = FlushReport::default();
        let keys: Vec<RelativePath> = self.overlay.keys().cloned().collect();

        for key in keys {
            let disk = self.disk_path(&key);
            match self.overlay.get_mut(&key) {
                Some(OverlayEntry::Present {
                    content,
                    provenance,
                }) if *provenance == Provenance::Written => {
                    self.fs.write_atomic(&disk, content)?;
                    *provenance = Provenance::Loaded;
                    report.written.push(key.to_string());
                }
                Some(OverlayEntry::Deleted) => {
                    if self.fs.exists(&disk) {
                        self.fs.remove_file(&disk)?;
                        report.deleted.push(key.to_string());
                    }
                    self.overlay.remove(&key);
                }
                _ => {}
            }
        }

        debug!(
            vfs = %self.id,
            written = report.written.len(),
            deleted = report.deleted.len(),
            "Flushed to disk"
        );
        Ok(report)
    }

    /// Drop the overlay. Idempotent.
    pub fn clear(&mut self) {
        self.overlay.clear();
    }

    /// Flush, then release.
    pub fn commit(mut self) -> PlinthResult<FlushReport> {
        let result = self.flush_to_disk();
        self.release();
        result
    }

    /// Release without touching disk.
    pub fn discard(mut self) {
        debug!(vfs = %self.id, pending = self.touched_paths().len(), "VFS discarded");
        self.release();
    }

    fn release(&mut self) {
        self.clear();
        self.released = true;
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn normalize(&self, path: &str) -> PlinthResult<RelativePath> {
        let key = RelativePath::parse(path)?;
        if key.is_root() {
            return Err(DomainError::MissingRequiredField { field: "path" }.into());
        }
        Ok(key)
    }

    fn disk_path(&self, key: &RelativePath) -> PathBuf {
        key.to_path(&self.anchor)
    }
}

impl Drop for VirtualFileSystem {
    fn drop(&mut self) {
        if !self.released {
            let pending = self.touched_paths().len();
            if pending > 0 {
                warn!(vfs = %self.id, pending, "VFS dropped without commit; discarding changes");
            }
            self.clear();
        }
    }
}

impl std::fmt::Debug for VirtualFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualFileSystem")
            .field("id", &self.id)
            .field("anchor", &self.anchor)
            .field("entries", &self.overlay.len())
            .finish()
    }
}
