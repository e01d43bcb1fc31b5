//! Plinth Core - blueprint execution engine
//!
//! This crate provides the domain and application layers of Plinth, which
//! applies module blueprints to a project through a transactional virtual
//! filesystem, following hexagonal (ports and adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            plinth-cli (CLI)             │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │          Application Services           │
//! │   ModuleRunner ─► BlueprintEngine       │
//! │   (validate, expand, gate, dispatch)    │
//! └──────────────────┬──────────────────────┘
//!                    │ writes through
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │   VirtualFileSystem (per module)        │
//! └──────────────────┬──────────────────────┘
//!                    │ uses ports
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     plinth-adapters (Infrastructure)    │
//! │ Filesystem, renderer, catalog, mergers  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use plinth_core::prelude::*;
//!
//! let resolver = Arc::new(PathResolver::new(catalog));
//! let collaborators = Collaborators { evaluator, resolver, mergers, runner, fs };
//! let engine = BlueprintEngine::new(
//!     collaborators.resolver.clone(),
//!     collaborators.evaluator.clone(),
//!     HandlerRegistry::with_defaults(&collaborators),
//! );
//!
//! let runner = ModuleRunner::new(Arc::new(engine), collaborators.fs.clone());
//! let report = runner.run_all(&modules, &project);
//! assert!(report.success);
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        ActionHandler, BlueprintEngine, Collaborators, CommitStatus, HandlerRegistry,
        MergerRegistry, ModuleReport, ModuleRunner, ModuleSpec, PathResolver, RunOptions,
        RunReport, VirtualFileSystem,
        ports::{CommandRunner, ContentMerger, Filesystem, PathKeyCatalog, TemplateEvaluator},
    };
    pub use crate::domain::{
        Action, ActionKind, Blueprint, ExecutionContext, ExecutionResult, ModuleInfo,
        ProjectMetadata, RelativePath, StructureKind,
    };
    pub use crate::error::{PlinthError, PlinthResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
