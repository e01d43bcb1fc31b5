//! Unified error handling for Plinth Core.
//!
//! This module provides a unified error type that wraps domain and application
//! errors, with rich context and user-actionable suggestions.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// Root error type for Plinth Core operations.
///
/// This enum wraps all possible errors that can occur when using plinth-core,
/// providing a unified interface for error handling.
#[derive(Debug, Error, Clone)]
pub enum PlinthError {
    /// Errors from the domain layer (invalid blueprints, paths, keys).
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Errors from the application layer (orchestration failures).
    #[error("Application error: {0}")]
    Application(#[from] ApplicationError),

    /// Configuration or setup errors.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl PlinthError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Configuration { message } => vec![
                format!("Configuration issue: {}", message),
                "Check your setup and try again".into(),
            ],
            Self::Internal { .. } => vec![
                "This appears to be a bug in Plinth".into(),
                "Please report this issue at: https://github.com/cosecruz/plinth/issues".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::NotFound => ErrorCategory::NotFound,
                crate::domain::ErrorCategory::Internal => ErrorCategory::Internal,
            },
            Self::Application(e) => e.category(),
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Shorthand for an [`ApplicationError::FileNotFound`] wrapped in `PlinthError`.
    pub fn not_found(path: impl Into<String>) -> Self {
        ApplicationError::FileNotFound { path: path.into() }.into()
    }

    /// Check if this error is a missing-file error.
    ///
    /// Handlers use this to apply their fallback policy instead of failing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Application(ApplicationError::FileNotFound { .. }))
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Configuration,
    Internal,
}

/// Convenient result type alias.
pub type PlinthResult<T> = Result<T, PlinthError>;

/// Extension trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> PlinthResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> PlinthResult<T> {
        self.map_err(|e| PlinthError::Internal {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}
