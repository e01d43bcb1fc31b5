// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for Plinth.
//!
//! Pure data and rules: actions, blueprints, the execution context, the
//! path-key catalog model and the truthiness rule. No I/O happens here; the
//! filesystem, template rendering and subprocesses are reached through ports
//! in the application layer.

pub mod action;
pub mod blueprint;
pub mod common;
pub mod context;
pub mod error;
pub mod execution;
pub mod path_key;
pub mod truthiness;

mod validation;

pub use action::{
    AddEnvVar, AddImport, AddScript, Action, ActionKind, Condition, CreateFile, DEFAULT_ENV_FILE,
    DEFAULT_MANIFEST, EnhanceFile, ExtendSchema, FallbackPolicy, InstallPackages, MergeConfig,
    MergeJson, Operation, RunCommand, TextInsert, WrapConfig,
};
pub use blueprint::Blueprint;
pub use common::RelativePath;
pub use context::{
    ExecutionContext, ModuleInfo, PackageCategory, ProjectMetadata, StructureKind,
    WorkspacePackage, lookup_path,
};
pub use error::{DomainError, ErrorCategory};
pub use execution::{ActionOutcome, EngineState, ExecutionResult};
pub use path_key::{KeyDefinition, KeyDefinitions, KeyReference, SemanticNamespace};
pub use truthiness::{is_truthy, is_truthy_opt, is_truthy_text};
pub use validation::{DomainValidator, ValidationIssue, ValidationReport};
