//! Adapter-side failures and their mapping into [`PlinthError`].

use std::io;
use std::path::PathBuf;

use plinth_core::{
    application::ApplicationError,
    domain::DomainError,
    error::PlinthError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to {operation} '{path}': {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("unsupported file format for '{path}' (expected .toml or .json)")]
    UnsupportedFormat { path: PathBuf },
}

impl AdapterError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<AdapterError> for PlinthError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Io { path, source, .. } if source.kind() == io::ErrorKind::NotFound => {
                PlinthError::not_found(path.display().to_string())
            }
            AdapterError::Io {
                operation,
                path,
                source,
            } => ApplicationError::FilesystemError {
                reason: format!("failed to {operation}: {source}"),
                path,
            }
            .into(),
            other @ (AdapterError::Parse { .. } | AdapterError::UnsupportedFormat { .. }) => {
                DomainError::InvalidBlueprint(other.to_string()).into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_maps_to_not_found() {
        let err: PlinthError = AdapterError::io(
            "read",
            "/nope",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        )
        .into();
        assert!(err.is_not_found());
    }

    #[test]
    fn parse_failure_is_a_blueprint_error() {
        let err: PlinthError = AdapterError::parse("bp.toml", "expected `=`").into();
        assert!(matches!(err, PlinthError::Domain(DomainError::InvalidBlueprint(_))));
        assert!(err.to_string().contains("bp.toml"));
    }
}
