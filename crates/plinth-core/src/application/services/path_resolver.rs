//! Path-key resolution against the project topology.
//!
//! ```text
//! single-app            key ─► [key.path]
//! monorepo, apps.<c>.*  key ─► [pkg.path/key.path for pkg in packages if pkg ∈ c]
//! monorepo, other       key ─► [targetPackage/key.path]
//! ```
//!
//! Results are relative to the module's VFS anchor. Paths that fall outside
//! the anchor cannot be written by this module and are dropped.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::application::{ApplicationError, ports::PathKeyCatalog};
use crate::domain::{
    ExecutionContext, KeyDefinitions, RelativePath, SemanticNamespace, StructureKind,
};
use crate::error::PlinthResult;

/// Anchor-relative paths for one key, plus the project-relative paths that
/// fell outside the module anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyResolution {
    pub paths: Vec<RelativePath>,
    pub dropped: Vec<RelativePath>,
}

impl KeyResolution {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

pub struct PathResolver {
    catalog: Arc<dyn PathKeyCatalog>,
    cache: RwLock<HashMap<String, Arc<KeyDefinitions>>>,
}

impl PathResolver {
    pub fn new(catalog: Arc<dyn PathKeyCatalog>) -> Self {
        Self {
            catalog,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Catalog for `scope`, loaded once and cached.
    pub fn definitions(&self, scope: &str) -> PlinthResult<Arc<KeyDefinitions>> {
        {
            let cache = self.cache.read().map_err(|_| ApplicationError::LockError {
                resource: "key catalog cache",
            })?;
            if let Some(defs) = cache.get(scope) {
                return Ok(Arc::clone(defs));
            }
        }

        let defs = Arc::new(self.catalog.load_key_catalog(scope)?);
        debug!(scope, keys = defs.len(), "Key catalog loaded");

        let mut cache = self.cache.write().map_err(|_| ApplicationError::LockError {
            resource: "key catalog cache",
        })?;
        Ok(Arc::clone(
            cache.entry(scope.to_string()).or_insert(defs),
        ))
    }

    /// Resolve `key` to anchor-relative paths, in package declaration order.
    ///
    /// Empty for unknown keys, keys unsupported by the topology, and catalogs
    /// that fail to load.
    pub fn resolve_key(&self, key: &str, ctx: &ExecutionContext) -> Vec<RelativePath> {
        self.resolve(key, ctx).paths
    }

    /// Like [`resolve_key`](Self::resolve_key), keeping the paths dropped for
    /// lying outside the anchor so callers can report them.
    pub fn resolve(&self, key: &str, ctx: &ExecutionContext) -> KeyResolution {
        let scope = ctx.module().scope.as_str();
        let defs = match self.definitions(scope) {
            Ok(defs) => defs,
            Err(e) => {
                warn!(scope, key, error = %e, "Key catalog unavailable");
                return KeyResolution::default();
            }
        };

        let Some(def) = defs.get(key) else {
            debug!(scope, key, "Unknown path key");
            return KeyResolution::default();
        };

        let structure = ctx.structure();
        if !def.supports(structure) {
            debug!(scope, key, %structure, "Path key not supported by project structure");
            return KeyResolution::default();
        }

        let project_paths: Vec<PlinthResult<RelativePath>> = match structure {
            StructureKind::SingleApp => vec![RelativePath::parse(&def.path).map_err(Into::into)],
            StructureKind::Monorepo => match SemanticNamespace::of(key) {
                Some(namespace) => ctx
                    .project()
                    .packages
                    .iter()
                    .filter(|pkg| namespace.matches(pkg.category))
                    .map(|pkg| pkg.path.join(&def.path).map_err(Into::into))
                    .collect(),
                None => {
                    let base = ctx.module().target_package.clone().unwrap_or_default();
                    vec![base.join(&def.path).map_err(Into::into)]
                }
            },
        };

        let mut resolution = KeyResolution::default();
        for candidate in project_paths {
            let path = match candidate {
                Ok(path) => path,
                Err(e) => {
                    warn!(key, error = %e, "Path key definition is not a valid relative path");
                    continue;
                }
            };
            match ctx.anchor_relative(&path) {
                Some(relative) => resolution.paths.push(relative),
                None => {
                    warn!(
                        key,
                        path = %path,
                        anchor = %ctx.context_root(),
                        "Resolved path lies outside the module anchor; dropped"
                    );
                    resolution.dropped.push(path);
                }
            }
        }

        resolution
    }

    /// The scope's catalog defines `key` and the key supports `structure`.
    pub fn is_defined_key(&self, key: &str, scope: &str, structure: StructureKind) -> bool {
        self.definitions(scope)
            .map(|defs| defs.is_defined(key, structure))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::domain::{
        KeyDefinition, ModuleInfo, PackageCategory, ProjectMetadata, WorkspacePackage,
    };

    /// Catalog with a fixed key set that counts loads.
    pub(crate) struct FixedCatalog {
        pub defs: KeyDefinitions,
        pub loads: AtomicUsize,
    }

    impl FixedCatalog {
        pub(crate) fn standard() -> Self {
            Self {
                defs: KeyDefinitions::new("core")
                    .with_key("auth.config", KeyDefinition::new("src/auth.config.ts"))
                    .with_key("apps.frontend.components", KeyDefinition::new("src/components"))
                    .with_key("apps.all.root", KeyDefinition::new("."))
                    .with_key(
                        "workspace.turbo",
                        KeyDefinition::new("turbo.json").only(StructureKind::Monorepo),
                    ),
                loads: AtomicUsize::new(0),
            }
        }
    }

    impl PathKeyCatalog for FixedCatalog {
        fn load_key_catalog(&self, scope: &str) -> PlinthResult<KeyDefinitions> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if scope == self.defs.scope {
                Ok(self.defs.clone())
            } else {
                Err(ApplicationError::CatalogError {
                    scope: scope.to_string(),
                    reason: "no such scope".into(),
                }
                .into())
            }
        }
    }

    fn rel(s: &str) -> RelativePath {
        RelativePath::parse(s).unwrap()
    }

    pub(crate) fn monorepo(target: Option<&str>) -> ExecutionContext {
        let project = ProjectMetadata::monorepo(
            "acme",
            "/work/acme",
            vec![
                WorkspacePackage::new("web", rel("apps/web"), PackageCategory::Frontend),
                WorkspacePackage::new("api", rel("apps/api"), PackageCategory::Backend),
                WorkspacePackage::new("admin", rel("apps/admin"), PackageCategory::Frontend),
                WorkspacePackage::new("auth", rel("packages/auth"), PackageCategory::Library),
            ],
        );
        let mut module = ModuleInfo::new("auth", "core");
        if let Some(t) = target {
            module = module.with_target_package(rel(t));
        }
        ExecutionContext::new(project, module)
    }

    fn strings(paths: Vec<RelativePath>) -> Vec<String> {
        paths.into_iter().map(RelativePath::into_string).collect()
    }

    fn resolver() -> PathResolver {
        PathResolver::new(Arc::new(FixedCatalog::standard()))
    }

    #[test]
    fn single_app_resolves_to_key_path() {
        let ctx = ExecutionContext::new(
            ProjectMetadata::single_app("solo", "/work/solo"),
            ModuleInfo::new("auth", "core"),
        );
        let r = resolver();
        assert_eq!(strings(r.resolve_key("auth.config", &ctx)), vec!["src/auth.config.ts"]);
        assert_eq!(strings(r.resolve_key("apps.frontend.components", &ctx)), vec!["src/components"]);
        assert!(r.resolve_key("workspace.turbo", &ctx).is_empty());
    }

    #[test]
    fn semantic_key_fans_out_per_matching_app() {
        let r = resolver();
        let ctx = monorepo(None);
        assert_eq!(
            strings(r.resolve_key("apps.frontend.components", &ctx)),
            vec!["apps/web/src/components", "apps/admin/src/components"]
        );
        assert_eq!(
            strings(r.resolve_key("apps.all.root", &ctx)),
            vec!["apps/web", "apps/api", "apps/admin"]
        );
    }

    #[test]
    fn plain_key_scopes_to_target_package_and_anchor() {
        let r = resolver();
        let ctx = monorepo(Some("packages/auth"));
        assert_eq!(strings(r.resolve_key("auth.config", &ctx)), vec!["src/auth.config.ts"]);
    }

    #[test]
    fn paths_outside_anchor_are_dropped() {
        let r = resolver();
        let ctx = monorepo(Some("packages/auth"));
        assert!(r.resolve_key("apps.frontend.components", &ctx).is_empty());

        let resolution = r.resolve("apps.frontend.components", &ctx);
        assert!(resolution.is_empty());
        assert_eq!(
            strings(resolution.dropped),
            vec!["apps/web/src/components", "apps/admin/src/components"]
        );
    }

    #[test]
    fn unknown_key_and_scope_are_empty() {
        let r = resolver();
        assert!(r.resolve_key("nope", &monorepo(None)).is_empty());

        let other_scope = ExecutionContext::new(
            ProjectMetadata::single_app("solo", "/w"),
            ModuleInfo::new("x", "elsewhere"),
        );
        assert!(r.resolve_key("auth.config", &other_scope).is_empty());
    }

    #[test]
    fn catalog_is_loaded_once_per_scope() {
        let catalog = Arc::new(FixedCatalog::standard());
        let r = PathResolver::new(catalog.clone());
        let ctx = monorepo(None);

        r.resolve_key("auth.config", &ctx);
        r.resolve_key("apps.all.root", &ctx);
        assert!(r.is_defined_key("auth.config", "core", StructureKind::Monorepo));

        assert_eq!(catalog.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn is_defined_key_checks_topology() {
        let r = resolver();
        assert!(r.is_defined_key("workspace.turbo", "core", StructureKind::Monorepo));
        assert!(!r.is_defined_key("workspace.turbo", "core", StructureKind::SingleApp));
        assert!(!r.is_defined_key("auth.config", "missing-scope", StructureKind::SingleApp));
    }
}
