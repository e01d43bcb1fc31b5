//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the engine needs from external systems.
//! The `plinth-adapters` crate provides implementations.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::vfs::VirtualFileSystem;
use crate::domain::{
    ActionOutcome, ExecutionContext, KeyDefinitions, RelativePath, truthiness,
};
use crate::error::PlinthResult;

/// Port for filesystem operations on absolute paths.
///
/// Implemented by:
/// - `plinth_adapters::filesystem::LocalFilesystem` (production)
/// - `plinth_adapters::filesystem::MemoryFilesystem` (testing)
///
/// A missing file is reported as [`crate::error::PlinthError::not_found`] so
/// callers can tell it apart from other I/O failures.
pub trait Filesystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> PlinthResult<String>;

    /// Write through a temporary sibling and rename into place. Parent
    /// directories are created as needed.
    fn write_atomic(&self, path: &Path, content: &str) -> PlinthResult<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    fn remove_file(&self, path: &Path) -> PlinthResult<()>;

    fn create_dir_all(&self, path: &Path) -> PlinthResult<()>;
}

/// Port for rendering `{{…}}` templates against the context data tree.
///
/// Implemented by:
/// - `plinth_adapters::renderer::SimpleRenderer`
#[cfg_attr(test, mockall::automock)]
pub trait TemplateEvaluator: Send + Sync {
    fn render(&self, template: &str, ctx: &ExecutionContext) -> PlinthResult<String>;

    /// Judge a value. Defaults to the shared truthiness rule.
    fn is_truthy(&self, value: &Value) -> bool {
        truthiness::is_truthy(value)
    }
}

/// Port for loading the path-key catalog of a marketplace scope.
///
/// Implemented by:
/// - `plinth_adapters::catalog::InMemoryCatalog` (built-in keys)
/// - `plinth_adapters::catalog::TomlKeyCatalog` (`<dir>/<scope>.toml`)
pub trait PathKeyCatalog: Send + Sync {
    fn load_key_catalog(&self, scope: &str) -> PlinthResult<KeyDefinitions>;
}

/// Port for content-aware file mergers.
///
/// Mergers read and write exclusively through the VFS; `path` is
/// anchor-relative.
pub trait ContentMerger: Send + Sync {
    fn execute(
        &self,
        path: &RelativePath,
        params: &Value,
        ctx: &ExecutionContext,
        vfs: &mut VirtualFileSystem,
    ) -> PlinthResult<ActionOutcome>;
}

/// A subprocess to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Port for subprocess invocation.
///
/// The working directory is always explicit; the process-wide current
/// directory is never changed.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &CommandSpec, working_dir: &Path) -> PlinthResult<CommandOutput>;
}
