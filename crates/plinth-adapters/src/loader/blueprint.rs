//! Blueprint files.
//!
//! A blueprint is a TOML or JSON document, picked by file extension:
//!
//! ```toml
//! id   = "auth"
//! name = "Authentication"
//! contextualFiles = ["src/index.ts"]
//!
//! [[actions]]
//! type = "INSTALL_PACKAGES"
//! packages = ["lib@1.2.0"]
//!
//! [[actions]]
//! type = "CREATE_FILE"
//! path = "${paths.auth.config}"
//! template = "auth.config.ts.hbs"
//! condition = "{{module.parameters.withConfig}}"
//! ```

use std::path::{Path, PathBuf};

use plinth_core::{domain::Blueprint, error::PlinthResult};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::error::AdapterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Reads [`Blueprint`]s from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlueprintLoader;

impl BlueprintLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse blueprint text in the format implied by `path`.
    pub fn parse(&self, path: &Path, raw: &str) -> Result<Blueprint, AdapterError> {
        match Format::of(path) {
            Some(Format::Toml) => toml::from_str(raw).map_err(|e| AdapterError::parse(path, e)),
            Some(Format::Json) => {
                serde_json::from_str(raw).map_err(|e| AdapterError::parse(path, e))
            }
            None => Err(AdapterError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Load one blueprint file.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn load(&self, path: &Path) -> PlinthResult<Blueprint> {
        let raw = std::fs::read_to_string(path).map_err(|e| AdapterError::io("read", path, e))?;
        let blueprint = self.parse(path, &raw)?;
        debug!(id = %blueprint.id, actions = blueprint.len(), "Loaded blueprint");
        Ok(blueprint)
    }

    /// Load every `.toml`/`.json` blueprint under `dir`, sorted by path.
    ///
    /// Files that fail to parse are skipped with a warning; a missing or
    /// unreadable directory is an error.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn load_dir(&self, dir: &Path) -> PlinthResult<Vec<(PathBuf, Blueprint)>> {
        if !dir.is_dir() {
            return Err(AdapterError::io(
                "open directory",
                dir,
                std::io::Error::from(std::io::ErrorKind::NotFound),
            )
            .into());
        }

        let mut blueprints = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory loop"));
                AdapterError::io("walk", path, source)
            })?;

            let path = entry.path();
            if !entry.file_type().is_file() || Format::of(path).is_none() {
                continue;
            }

            match self.load(path) {
                Ok(blueprint) => blueprints.push((path.to_path_buf(), blueprint)),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable blueprint"),
            }
        }

        debug!(count = blueprints.len(), "Finished loading blueprints");
        Ok(blueprints)
    }
}
