//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `plinth-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by the engine, implemented by infrastructure
//!   - `Filesystem`: absolute-path file operations under the VFS
//!   - `TemplateEvaluator`: `{{…}}` rendering and truthiness
//!   - `PathKeyCatalog`: key definitions per marketplace scope
//!   - `ContentMerger`: named, content-aware file merges
//!   - `CommandRunner`: subprocesses with an explicit working directory
//!
//! - **Driving (Input) Ports**: Called by the outside world
//!   - `ActionHandler` (see `application::handlers`), the per-kind contract
//!     the dispatcher calls into

pub mod output;

pub use output::{
    CommandOutput, CommandRunner, CommandSpec, ContentMerger, Filesystem, PathKeyCatalog,
    TemplateEvaluator,
};

#[cfg(test)]
pub use output::{MockCommandRunner, MockTemplateEvaluator};
