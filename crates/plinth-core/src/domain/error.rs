// ============================================================================
// domain/error.rs - DOMAIN ERRORS
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (results are aggregated and re-reported)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    #[error("Invalid blueprint: {0}")]
    InvalidBlueprint(String),

    #[error("Invalid action #{index}: {reason}")]
    InvalidAction { index: usize, reason: String },

    #[error("Absolute paths not allowed: {path}")]
    AbsolutePathNotAllowed { path: String },

    #[error("Path escapes the module root: {path}")]
    PathOutsideRoot { path: String },

    #[error("Required field missing: {field}")]
    MissingRequiredField { field: &'static str },

    // ========================================================================
    // Path Key Errors
    // ========================================================================
    #[error("Unknown path key '{key}' in scope '{scope}'")]
    UnknownPathKey { key: String, scope: String },

    #[error("Path key '{key}' could not be resolved in '{path}'")]
    UnresolvedPathKey { key: String, path: String },

    #[error("Path key '{key}' resolves to {count} paths where exactly one is required")]
    AmbiguousPathKey { key: String, count: usize },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidBlueprint(msg) => vec![
                "Check the blueprint definition".into(),
                format!("Details: {}", msg),
            ],
            Self::InvalidAction { index, .. } => vec![format!(
                "Fix action #{} in the blueprint and re-run",
                index
            )],
            Self::AbsolutePathNotAllowed { .. } | Self::PathOutsideRoot { .. } => vec![
                "Blueprint paths must be relative to the module root".into(),
                "Remove leading '/' and '..' segments".into(),
            ],
            Self::UnknownPathKey { scope, .. } => vec![
                format!("The key is not defined in the '{}' catalog", scope),
                "Try: plinth keys to list available path keys".into(),
            ],
            Self::AmbiguousPathKey { .. } => vec![
                "Semantic keys fan out during preprocessing; avoid building them from {{item}}".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownPathKey { .. } | Self::UnresolvedPathKey { .. } => ErrorCategory::NotFound,
            Self::InvalidBlueprint(_)
            | Self::InvalidAction { .. }
            | Self::AbsolutePathNotAllowed { .. }
            | Self::PathOutsideRoot { .. }
            | Self::MissingRequiredField { .. }
            | Self::AmbiguousPathKey { .. } => ErrorCategory::Validation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Internal,
}
