//! Loaders for blueprint files and the project manifest.

mod blueprint;
mod manifest;

pub use blueprint::BlueprintLoader;
pub use manifest::{LoadedProject, MANIFEST_FILE, ModuleEntry, ProjectManifest, ProjectSection};
