//! Key catalogs read from `<dir>/<scope>.toml`.
//!
//! ```toml
//! [keys."auth.config"]
//! path = "src/auth.config.ts"
//! description = "Authentication configuration"
//!
//! [keys."workspace.packages"]
//! path = "packages"
//! structures = ["monorepo"]
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use plinth_core::{
    application::{ApplicationError, ports::PathKeyCatalog},
    domain::{KeyDefinition, KeyDefinitions},
    error::{PlinthError, PlinthResult},
};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::AdapterError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    keys: BTreeMap<String, KeyDefinition>,
}

/// Directory of per-scope TOML catalogs, with an optional fallback for
/// scopes that have no file.
#[derive(Clone)]
pub struct TomlKeyCatalog {
    dir: PathBuf,
    fallback: Option<Arc<dyn PathKeyCatalog>>,
}

impl TomlKeyCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fallback: None,
        }
    }

    /// Consult `fallback` when `<scope>.toml` does not exist.
    pub fn with_fallback(mut self, fallback: Arc<dyn PathKeyCatalog>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, scope: &str) -> PlinthResult<PathBuf> {
        let valid = !scope.is_empty()
            && scope
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !scope.starts_with('.');
        if !valid {
            return Err(ApplicationError::CatalogError {
                scope: scope.to_string(),
                reason: "scope names may only contain letters, digits, '-', '_' and '.'".into(),
            }
            .into());
        }
        Ok(self.dir.join(format!("{scope}.toml")))
    }
}

impl PathKeyCatalog for TomlKeyCatalog {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    fn load_key_catalog(&self, scope: &str) -> PlinthResult<KeyDefinitions> {
        let path = self.file_for(scope)?;

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return match &self.fallback {
                    Some(fallback) => {
                        debug!(scope, "No catalog file; using fallback");
                        fallback.load_key_catalog(scope)
                    }
                    None => Err(PlinthError::not_found(path.display().to_string())),
                };
            }
            Err(e) => return Err(AdapterError::io("read", &path, e).into()),
        };

        let file: CatalogFile =
            toml::from_str(&raw).map_err(|e| ApplicationError::CatalogError {
                scope: scope.to_string(),
                reason: format!("{}: {e}", path.display()),
            })?;

        debug!(scope, keys = file.keys.len(), "Loaded key catalog file");
        Ok(KeyDefinitions {
            scope: scope.to_string(),
            keys: file.keys,
        })
    }
}

impl std::fmt::Debug for TomlKeyCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TomlKeyCatalog")
            .field("dir", &self.dir)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
