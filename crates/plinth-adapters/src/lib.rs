//! Infrastructure adapters for Plinth.
//!
//! This crate implements the ports defined in `plinth_core::application::ports`
//! and holds every piece of I/O: the disk, subprocesses, template rendering,
//! key catalogs, content mergers and the blueprint/manifest loaders.

pub mod catalog;
pub mod command;
pub mod error;
pub mod filesystem;
pub mod loader;
pub mod mergers;
pub mod renderer;

// Re-export commonly used adapters
pub use catalog::{InMemoryCatalog, TomlKeyCatalog, builtin_keys};
pub use command::ProcessCommandRunner;
pub use error::AdapterError;
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use loader::{BlueprintLoader, LoadedProject, ProjectManifest};
pub use mergers::{
    ExportWrapMerger, JsonMerger, PackageJsonMerger, YamlMerger, default_mergers,
};
pub use renderer::SimpleRenderer;
