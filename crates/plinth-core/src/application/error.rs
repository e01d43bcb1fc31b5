//! Application layer errors.
//!
//! These errors represent failures in orchestration, not business logic.
//! Business logic errors are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{ActionKind, ValidationReport};
use crate::error::ErrorCategory;

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// Neither the overlay nor the disk has the file.
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// Template rendering failed.
    #[error("Template rendering failed: {reason}")]
    RenderingFailed { reason: String },

    /// Blueprint failed batch validation.
    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationReport),

    /// A handler reported failure for one action.
    #[error("{action} failed: {reason}")]
    HandlerFailed { action: String, reason: String },

    /// The dispatcher has no handler for this kind.
    #[error("no handler registered for {0}")]
    NoHandler(ActionKind),

    /// A handler asked for a content merger that is not registered.
    #[error("no content merger registered as '{name}'")]
    MergerNotRegistered { name: String },

    /// A merging handler was invoked without a VFS.
    #[error("{kind} requires a virtual filesystem but none was supplied")]
    VfsRequired { kind: ActionKind },

    /// Key catalog could not be loaded.
    #[error("Key catalog error for scope '{scope}': {reason}")]
    CatalogError { scope: String, reason: String },

    /// A subprocess failed to start or exited non-zero.
    #[error("Command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// A content merger rejected its input.
    #[error("Merge into {path} failed: {reason}")]
    MergeFailed { path: String, reason: String },

    /// Shared state lock poisoned.
    #[error("Lock poisoned: {resource}")]
    LockError { resource: &'static str },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::FileNotFound { path } => vec![
                format!("Expected file: {}", path),
                "Set `fallback = \"create\"` on the action to create it instead".into(),
                "Or `fallback = \"skip\"` to ignore the action when the file is missing".into(),
            ],
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
            ],
            Self::ValidationFailed(report) => report
                .iter()
                .map(ToString::to_string)
                .chain(std::iter::once(
                    "Try: plinth validate to re-check after fixing".to_string(),
                ))
                .collect(),
            Self::NoHandler(kind) => vec![format!(
                "Register a handler for {} in the handler registry",
                kind
            )],
            Self::MergerNotRegistered { name } => vec![
                format!("Unknown merger '{}'", name),
                "Built-in mergers: json, yaml, package-json, code-export-wrap".into(),
            ],
            Self::VfsRequired { .. } => vec![
                "Merging actions must run inside a module runner".into(),
            ],
            Self::CatalogError { scope, .. } => vec![
                format!("Check the key catalog for scope '{}'", scope),
                "Try: plinth keys --scope <SCOPE>".into(),
            ],
            Self::CommandFailed { .. } => vec![
                "Run the command manually to see its full output".into(),
            ],
            _ => vec!["Check the error details above".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FileNotFound { .. } | Self::MergerNotRegistered { .. } => {
                ErrorCategory::NotFound
            }
            Self::ValidationFailed(_) | Self::MergeFailed { .. } => ErrorCategory::Validation,
            Self::CatalogError { .. } => ErrorCategory::Configuration,
            Self::FilesystemError { .. }
            | Self::RenderingFailed { .. }
            | Self::HandlerFailed { .. }
            | Self::NoHandler(_)
            | Self::VfsRequired { .. }
            | Self::CommandFailed { .. }
            | Self::LockError { .. } => ErrorCategory::Internal,
        }
    }
}
