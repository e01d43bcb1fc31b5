//! Per-module execution context.
//!
//! The context is read-only for the whole engine run. Everything a template,
//! a condition or a `forEach` expression can see is exposed as one JSON tree:
//!
//! ```text
//! { "project": { "name", "root", "structure", "packages": [...] },
//!   "module":  { "id", "scope", "parameters": {...}, "targetPackage" },
//!   <free-form variables at top level> }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::common::RelativePath;

/// Project topology.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructureKind {
    #[default]
    SingleApp,
    Monorepo,
}

impl StructureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SingleApp => "single-app",
            Self::Monorepo => "monorepo",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a workspace package in a monorepo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageCategory {
    Frontend,
    Backend,
    Library,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspacePackage {
    pub name: String,
    /// Project-relative package directory, e.g. `apps/web`.
    pub path: RelativePath,
    pub category: PackageCategory,
}

impl WorkspacePackage {
    pub fn new(name: impl Into<String>, path: RelativePath, category: PackageCategory) -> Self {
        Self {
            name: name.into(),
            path,
            category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    /// Absolute project root on disk.
    pub root: PathBuf,
    #[serde(default)]
    pub structure: StructureKind,
    /// Declared workspace packages, in declaration order. Empty for single-app.
    #[serde(default)]
    pub packages: Vec<WorkspacePackage>,
}

impl ProjectMetadata {
    pub fn single_app(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            structure: StructureKind::SingleApp,
            packages: Vec::new(),
        }
    }

    pub fn monorepo(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        packages: Vec<WorkspacePackage>,
    ) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            structure: StructureKind::Monorepo,
            packages,
        }
    }

    pub fn is_monorepo(&self) -> bool {
        self.structure == StructureKind::Monorepo
    }
}

/// The module being applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub id: String,
    /// Marketplace scope whose key catalog applies.
    pub scope: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Package the module is installed into (monorepo only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_package: Option<RelativePath>,
}

impl ModuleInfo {
    pub fn new(id: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scope: scope.into(),
            parameters: Map::new(),
            target_package: None,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_target_package(mut self, package: RelativePath) -> Self {
        self.target_package = Some(package);
        self
    }
}

/// Read-only environment for one module's engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    project: ProjectMetadata,
    module: ModuleInfo,
    variables: Map<String, Value>,
    template_root: Option<PathBuf>,
    data: Value,
}

impl ExecutionContext {
    pub fn new(project: ProjectMetadata, module: ModuleInfo) -> Self {
        let mut ctx = Self {
            project,
            module,
            variables: Map::new(),
            template_root: None,
            data: Value::Null,
        };
        ctx.rebuild_data();
        ctx
    }

    /// Merge free-form template variables into the top level of the data tree.
    ///
    /// `project` and `module` always win over a variable of the same name.
    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables.extend(variables);
        self.rebuild_data();
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: Value) -> Self {
        self.variables.insert(key.into(), value);
        self.rebuild_data();
        self
    }

    /// Directory that `CREATE_FILE` `template` references are relative to.
    pub fn with_template_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.template_root = Some(root.into());
        self
    }

    fn rebuild_data(&mut self) {
        let mut data = self.variables.clone();

        let packages: Vec<Value> = self
            .project
            .packages
            .iter()
            .map(|p| json!({ "name": p.name, "path": p.path.as_str(), "category": p.category }))
            .collect();

        data.insert(
            "project".into(),
            json!({
                "name": self.project.name,
                "root": self.project.root.display().to_string(),
                "structure": self.project.structure.as_str(),
                "packages": packages,
            }),
        );
        data.insert(
            "module".into(),
            json!({
                "id": self.module.id,
                "scope": self.module.scope,
                "parameters": Value::Object(self.module.parameters.clone()),
                "targetPackage": self.module.target_package.as_ref().map(|p| p.as_str()),
            }),
        );

        self.data = Value::Object(data);
    }

    pub fn project(&self) -> &ProjectMetadata {
        &self.project
    }

    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }

    pub fn structure(&self) -> StructureKind {
        self.project.structure
    }

    pub fn template_root(&self) -> Option<&Path> {
        self.template_root.as_deref()
    }

    /// The full data tree.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Dot-path lookup (`module.parameters.provider`, `project.packages.0.name`).
    ///
    /// Numeric segments index into arrays. Returns `None` for anything missing.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.data, path)
    }

    /// Subtree offset of this module's VFS: the target package in a monorepo,
    /// the project root otherwise.
    pub fn context_root(&self) -> RelativePath {
        match (&self.project.structure, &self.module.target_package) {
            (StructureKind::Monorepo, Some(pkg)) => pkg.clone(),
            _ => RelativePath::default(),
        }
    }

    /// Absolute directory VFS paths are relative to.
    pub fn anchor(&self) -> PathBuf {
        self.context_root().to_path(&self.project.root)
    }

    /// Convert a project-relative path into an anchor-relative one.
    ///
    /// `None` when the path lies outside the anchor.
    pub fn anchor_relative(&self, project_path: &RelativePath) -> Option<RelativePath> {
        project_path.strip_prefix(&self.context_root())
    }

    /// Convert an anchor-relative path back to a project-relative one.
    pub fn project_relative(&self, anchor_path: &RelativePath) -> RelativePath {
        let root = self.context_root();
        if root.is_root() {
            return anchor_path.clone();
        }
        root.join(anchor_path.as_str()).unwrap_or_else(|_| anchor_path.clone())
    }
}

/// Dot-path navigation through a JSON tree.
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }

    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
