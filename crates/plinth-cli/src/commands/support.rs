//! Wiring shared by the commands that run blueprints.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use plinth_adapters::{
    BlueprintLoader, InMemoryCatalog, LoadedProject, LocalFilesystem, ProcessCommandRunner,
    ProjectManifest, SimpleRenderer, TomlKeyCatalog, default_mergers, loader::MANIFEST_FILE,
};
use plinth_core::application::{
    BlueprintEngine, Collaborators, HandlerRegistry, ModuleRunner, PathResolver, RunOptions,
    ports::PathKeyCatalog,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    cli::ManifestArgs,
    config::AppConfig,
    error::{CliError, CliResult},
};

/// Key catalog from the configuration: a TOML directory backed by the
/// built-in keys, or the built-in keys alone.
pub fn catalog(config: &AppConfig) -> CliResult<Arc<dyn PathKeyCatalog>> {
    let builtin: Arc<dyn PathKeyCatalog> = Arc::new(InMemoryCatalog::with_builtin()?);
    let catalog: Arc<dyn PathKeyCatalog> = match &config.catalog.dir {
        Some(dir) => {
            debug!(dir = %dir.display(), "Using TOML key catalog");
            Arc::new(TomlKeyCatalog::new(dir).with_fallback(builtin))
        }
        None => builtin,
    };
    Ok(catalog)
}

/// Production collaborators: local disk, subprocesses, built-in mergers.
pub fn collaborators(config: &AppConfig) -> CliResult<Collaborators> {
    Ok(Collaborators {
        evaluator: Arc::new(SimpleRenderer::new()),
        resolver: Arc::new(PathResolver::new(catalog(config)?)),
        mergers: Arc::new(default_mergers()),
        runner: Arc::new(ProcessCommandRunner::new()),
        fs: Arc::new(LocalFilesystem::new()),
    })
}

pub fn engine(c: &Collaborators) -> BlueprintEngine {
    BlueprintEngine::new(
        c.resolver.clone(),
        c.evaluator.clone(),
        HandlerRegistry::with_defaults(c),
    )
}

/// Module runner over `c` carrying the merged template variables.
pub fn runner(
    c: &Collaborators,
    options: RunOptions,
    variables: Map<String, Value>,
) -> ModuleRunner {
    ModuleRunner::new(Arc::new(engine(c)), c.fs.clone())
        .with_options(options)
        .with_variables(variables)
}

/// Configured variables overlaid by the manifest's own.
pub fn variables(config: &AppConfig, project: &LoadedProject) -> Map<String, Value> {
    let mut merged = config.variables.clone();
    merged.extend(project.variables.clone());
    merged
}

pub fn manifest_path(args: &ManifestArgs) -> PathBuf {
    args.manifest
        .clone()
        .unwrap_or_else(|| PathBuf::from(MANIFEST_FILE))
}

/// Load the manifest and every blueprint it names.
pub fn load_project(path: &Path) -> CliResult<LoadedProject> {
    if !path.is_file() {
        return Err(CliError::ManifestNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(ProjectManifest::load(path, &BlueprintLoader::new())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_core::domain::StructureKind;

    #[test]
    fn builtin_catalog_knows_core_keys() {
        let c = collaborators(&AppConfig::default()).unwrap();
        assert!(c
            .resolver
            .is_defined_key("auth.config", "core", StructureKind::SingleApp));
    }

    #[test]
    fn toml_dir_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("acme.toml"),
            "[keys.\"acme.widget\"]\npath = \"src/widget.ts\"\n",
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.catalog.dir = Some(dir.path().to_path_buf());
        let c = collaborators(&config).unwrap();

        assert!(c
            .resolver
            .is_defined_key("acme.widget", "acme", StructureKind::Monorepo));
        assert!(c
            .resolver
            .is_defined_key("db.schema", "core", StructureKind::SingleApp));
    }

    #[test]
    fn missing_manifest_is_reported_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        assert!(matches!(
            load_project(&path),
            Err(CliError::ManifestNotFound { path: p }) if p == path
        ));
    }

    #[test]
    fn manifest_variables_win() {
        let mut config = AppConfig::default();
        config.variables.insert("license".into(), "MIT".into());
        config.variables.insert("author".into(), "ops".into());

        let project = LoadedProject {
            manifest_path: PathBuf::from(MANIFEST_FILE),
            project: plinth_core::domain::ProjectMetadata::single_app("site", "."),
            variables: Map::from_iter([("license".to_string(), Value::from("Apache-2.0"))]),
            modules: vec![],
        };

        let merged = variables(&config, &project);
        assert_eq!(merged["license"], "Apache-2.0");
        assert_eq!(merged["author"], "ops");
    }
}
