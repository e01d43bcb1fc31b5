//! The project manifest, `plinth.toml`.
//!
//! ```toml
//! [project]
//! name = "acme"
//! structure = "monorepo"          # or "single-app" (default)
//! root = "."                      # relative to this file (default)
//!
//! [[project.packages]]
//! name = "web"
//! path = "apps/web"
//! category = "frontend"           # frontend | backend | library
//!
//! [variables]
//! license = "MIT"
//!
//! [[modules]]
//! id = "auth"
//! scope = "core"                  # default "core"
//! blueprint = "blueprints/auth.toml"
//! target_package = "packages/auth"
//! template_root = "templates/auth"
//!
//! [modules.parameters]
//! provider = "github"
//! ```
//!
//! Modules run in the order they are listed. Relative `root`, `blueprint`
//! and `template_root` paths are resolved against the manifest's directory.

use std::path::{Path, PathBuf};

use plinth_core::{
    application::ModuleSpec,
    domain::{ModuleInfo, ProjectMetadata, RelativePath, StructureKind, WorkspacePackage},
    error::PlinthResult,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use super::BlueprintLoader;
use crate::{catalog::CORE_SCOPE, error::AdapterError};

/// Conventional manifest file name.
pub const MANIFEST_FILE: &str = "plinth.toml";

fn default_scope() -> String {
    CORE_SCOPE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    pub name: String,
    #[serde(default)]
    pub structure: StructureKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<WorkspacePackage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleEntry {
    pub id: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    pub blueprint: PathBuf,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_package: Option<RelativePath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectManifest {
    pub project: ProjectSection,
    /// Free-form template variables for every module.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
}

/// A manifest with every path resolved and every blueprint loaded.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub manifest_path: PathBuf,
    pub project: ProjectMetadata,
    pub variables: Map<String, Value>,
    pub modules: Vec<ModuleSpec>,
}

impl LoadedProject {
    pub fn module(&self, id: &str) -> Option<&ModuleSpec> {
        self.modules.iter().find(|m| m.info.id == id)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

impl ProjectManifest {
    pub fn parse(path: &Path, raw: &str) -> Result<Self, AdapterError> {
        let manifest: Self = toml::from_str(raw).map_err(|e| AdapterError::parse(path, e))?;
        manifest.check(path)?;
        Ok(manifest)
    }

    fn check(&self, path: &Path) -> Result<(), AdapterError> {
        let invalid = |reason: String| Err(AdapterError::parse(path, reason));

        let single_app = self.project.structure == StructureKind::SingleApp;
        if single_app && !self.project.packages.is_empty() {
            return invalid("single-app projects cannot declare packages".into());
        }

        let mut seen = std::collections::HashSet::new();
        for module in &self.modules {
            if module.id.trim().is_empty() {
                return invalid("module with an empty id".into());
            }
            if !seen.insert(module.id.as_str()) {
                return invalid(format!("module '{}' is listed twice", module.id));
            }
            if single_app && module.target_package.is_some() {
                debug!(module = %module.id, "target_package ignored in a single-app project");
            }
        }
        Ok(())
    }

    /// Read and validate a manifest without loading any blueprint.
    pub fn read(path: &Path) -> PlinthResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| AdapterError::io("read", path, e))?;
        Ok(Self::parse(path, &raw)?)
    }

    /// Read the manifest at `path` and load every module's blueprint.
    #[instrument(skip(loader), fields(path = %path.display()))]
    pub fn load(path: &Path, loader: &BlueprintLoader) -> PlinthResult<LoadedProject> {
        let manifest = Self::read(path)?;
        let base = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let root = match &manifest.project.root {
            Some(root) => resolve(base, root),
            None => base.to_path_buf(),
        };
        let project = ProjectMetadata {
            name: manifest.project.name.clone(),
            root,
            structure: manifest.project.structure,
            packages: manifest.project.packages.clone(),
        };

        let mut modules = Vec::with_capacity(manifest.modules.len());
        for entry in &manifest.modules {
            let blueprint = loader.load(&resolve(base, &entry.blueprint))?;

            let mut info = ModuleInfo::new(&entry.id, &entry.scope);
            info.parameters = entry.parameters.clone();
            info.target_package = entry.target_package.clone();

            let spec = ModuleSpec::new(info, blueprint);
            modules.push(match &entry.template_root {
                Some(dir) => spec.with_template_root(resolve(base, dir)),
                None => spec,
            });
        }

        info!(
            project = %project.name,
            structure = %project.structure,
            modules = modules.len(),
            "Loaded project manifest"
        );
        Ok(LoadedProject {
            manifest_path: path.to_path_buf(),
            project,
            variables: manifest.variables,
            modules,
        })
    }
}
