//! Application layer for Plinth.
//!
//! This layer contains:
//! - **Services**: the engine pipeline and the module runner
//! - **Handlers**: one per action kind, behind a dispatch registry
//! - **VFS**: the transactional overlay every handler writes through
//! - **Ports**: traits the adapters crate implements
//! - **Errors**: application-specific error types
//!
//! Path and truthiness rules live in `crate::domain`; this layer wires them
//! to the outside world.

pub mod error;
pub mod handlers;
pub mod ports;
pub mod services;
pub mod vfs;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ApplicationError;
pub use handlers::{ActionHandler, Collaborators, HandlerRegistry, MergerRegistry, merger_names};
pub use ports::{
    CommandOutput, CommandRunner, CommandSpec, ContentMerger, Filesystem, PathKeyCatalog,
    TemplateEvaluator,
};
pub use services::{
    BlueprintEngine, BlueprintValidator, CommitStatus, ModuleReport, ModuleRunner, ModuleSpec,
    PathResolver, RunOptions, RunReport,
};
pub use vfs::{FlushReport, Provenance, VirtualFileSystem};
