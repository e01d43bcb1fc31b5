//! Action handlers and their dispatch registry.
//!
//! The engine knows nothing about what a handler does; it looks the action's
//! kind up in a [`HandlerRegistry`] and records the [`ActionOutcome`].
//!
//! The default registry is built by an exhaustive match over [`ActionKind`],
//! so adding a kind without a handler is a compile error.

mod command;
mod env;
mod file;
mod merge;
mod package;
mod support;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::application::{
    ApplicationError,
    ports::{CommandRunner, ContentMerger, Filesystem, TemplateEvaluator},
    services::PathResolver,
    vfs::VirtualFileSystem,
};
use crate::domain::{Action, ActionKind, ActionOutcome, ExecutionContext};
use crate::error::PlinthResult;

pub use command::RunCommandHandler;
pub use env::AddEnvVarHandler;
pub use file::{AddImportHandler, CreateFileHandler, ExtendSchemaHandler, TextInsertHandler};
pub use merge::{EnhanceFileHandler, MergeConfigHandler, MergeJsonHandler, WrapConfigHandler};
pub use package::{AddScriptHandler, InstallPackagesHandler, PackageSpec};

/// Names the built-in handlers delegate to.
pub mod merger_names {
    pub const JSON: &str = "json";
    pub const YAML: &str = "yaml";
    pub const PACKAGE_JSON: &str = "package-json";
    pub const CODE_EXPORT_WRAP: &str = "code-export-wrap";
}

/// Per-kind action contract.
///
/// `target_root` is the module's anchor on disk. File-touching handlers
/// require `vfs` and report anchor-relative paths.
///
/// Report failures through `Err`. The engine turns a panic into a failed
/// action only when panics unwind; under `panic = "abort"` (the release
/// profile) a panicking handler ends the process.
pub trait ActionHandler: Send + Sync {
    fn handle(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        target_root: &Path,
        vfs: Option<&mut VirtualFileSystem>,
    ) -> PlinthResult<ActionOutcome>;
}

// ============================================================================
// Merger registry
// ============================================================================

/// Content mergers by name.
#[derive(Clone, Default)]
pub struct MergerRegistry {
    mergers: BTreeMap<String, Arc<dyn ContentMerger>>,
}

impl MergerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, merger: Arc<dyn ContentMerger>) -> Self {
        self.register(name, merger);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, merger: Arc<dyn ContentMerger>) {
        self.mergers.insert(name.into(), merger);
    }

    pub fn get(&self, name: &str) -> PlinthResult<Arc<dyn ContentMerger>> {
        self.mergers.get(name).cloned().ok_or_else(|| {
            ApplicationError::MergerNotRegistered {
                name: name.to_string(),
            }
            .into()
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mergers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for MergerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.mergers.keys()).finish()
    }
}

// ============================================================================
// Collaborators
// ============================================================================

/// Everything the built-in handlers call out to.
#[derive(Clone)]
pub struct Collaborators {
    pub evaluator: Arc<dyn TemplateEvaluator>,
    pub resolver: Arc<PathResolver>,
    pub mergers: Arc<MergerRegistry>,
    pub runner: Arc<dyn CommandRunner>,
    /// Used to read `CREATE_FILE` template assets.
    pub fs: Arc<dyn Filesystem>,
}

// ============================================================================
// Handler registry
// ============================================================================

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<ActionKind, Box<dyn ActionHandler>>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler for every kind.
    pub fn with_defaults(collaborators: &Collaborators) -> Self {
        let mut registry = Self::new();
        for kind in ActionKind::ALL {
            registry.register(kind, default_handler(kind, collaborators));
        }
        registry
    }

    /// Register (or replace) the handler for `kind`.
    pub fn register(&mut self, kind: ActionKind, handler: Box<dyn ActionHandler>) {
        self.handlers.insert(kind, handler);
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Look the kind up and call its handler.
    pub fn dispatch(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        target_root: &Path,
        vfs: Option<&mut VirtualFileSystem>,
    ) -> PlinthResult<ActionOutcome> {
        let kind = action.kind();
        let handler = self
            .handlers
            .get(&kind)
            .ok_or(ApplicationError::NoHandler(kind))?;

        debug!(action = %action.describe(), "Dispatching");
        handler.handle(action, ctx, target_root, vfs)
    }
}

fn default_handler(kind: ActionKind, c: &Collaborators) -> Box<dyn ActionHandler> {
    match kind {
        ActionKind::CreateFile => Box::new(CreateFileHandler::new(c.clone())),
        ActionKind::EnhanceFile => Box::new(EnhanceFileHandler::new(c.clone())),
        ActionKind::MergeJson => Box::new(MergeJsonHandler::new(c.clone())),
        ActionKind::MergeConfig => Box::new(MergeConfigHandler::new(c.clone())),
        ActionKind::InstallPackages => Box::new(InstallPackagesHandler::new(c.clone())),
        ActionKind::AddScript => Box::new(AddScriptHandler::new(c.clone())),
        ActionKind::AddEnvVar => Box::new(AddEnvVarHandler::new(c.clone())),
        ActionKind::RunCommand => Box::new(RunCommandHandler::new(c.clone())),
        ActionKind::AppendToFile => Box::new(TextInsertHandler::append(c.clone())),
        ActionKind::PrependToFile => Box::new(TextInsertHandler::prepend(c.clone())),
        ActionKind::AddImport => Box::new(AddImportHandler::new(c.clone())),
        ActionKind::ExtendSchema => Box::new(ExtendSchemaHandler::new(c.clone())),
        ActionKind::WrapConfig => Box::new(WrapConfigHandler::new(c.clone())),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use serde_json::Value;

    use super::*;
    use crate::application::ports::{MockCommandRunner, MockTemplateEvaluator};
    use crate::application::services::path_resolver::tests::FixedCatalog;
    use crate::application::testing::MemoryFs;
    use crate::domain::{ModuleInfo, ProjectMetadata, RelativePath};

    /// Merger that records its calls and writes the params as the file body.
    #[derive(Default)]
    pub(crate) struct RecordingMerger {
        pub calls: Mutex<Vec<(String, Value)>>,
    }

    impl ContentMerger for RecordingMerger {
        fn execute(
            &self,
            path: &RelativePath,
            params: &Value,
            _ctx: &ExecutionContext,
            vfs: &mut VirtualFileSystem,
        ) -> PlinthResult<ActionOutcome> {
            self.calls
                .lock()
                .unwrap()
                .push((path.to_string(), params.clone()));
            let written = vfs.write_file(path.as_str(), params.to_string())?;
            Ok(ActionOutcome::touched(written.into_string()))
        }
    }

    /// Evaluator that substitutes `{{module.id}}` and nothing else.
    pub(crate) fn plain_evaluator() -> MockTemplateEvaluator {
        let mut evaluator = MockTemplateEvaluator::new();
        evaluator
            .expect_render()
            .returning(|t, ctx| Ok(t.replace("{{module.id}}", &ctx.module().id)));
        evaluator
    }

    pub(crate) struct Harness {
        pub fs: Arc<MemoryFs>,
        pub merger: Arc<RecordingMerger>,
        pub collaborators: Collaborators,
        pub ctx: ExecutionContext,
    }

    impl Harness {
        pub(crate) fn new() -> Self {
            Self::with_runner(MockCommandRunner::new())
        }

        pub(crate) fn with_runner(runner: MockCommandRunner) -> Self {
            let fs = Arc::new(MemoryFs::default());
            let merger = Arc::new(RecordingMerger::default());
            let mergers = MergerRegistry::new()
                .with(merger_names::JSON, merger.clone())
                .with(merger_names::YAML, merger.clone())
                .with(merger_names::PACKAGE_JSON, merger.clone())
                .with(merger_names::CODE_EXPORT_WRAP, merger.clone());

            let collaborators = Collaborators {
                evaluator: Arc::new(plain_evaluator()),
                resolver: Arc::new(PathResolver::new(Arc::new(FixedCatalog::standard()))),
                mergers: Arc::new(mergers),
                runner: Arc::new(runner),
                fs: fs.clone(),
            };
            let ctx = ExecutionContext::new(
                ProjectMetadata::single_app("solo", "/w"),
                ModuleInfo::new("auth", "core"),
            )
            .with_template_root("/templates");

            Self {
                fs,
                merger,
                collaborators,
                ctx,
            }
        }

        pub(crate) fn vfs(&self) -> VirtualFileSystem {
            VirtualFileSystem::for_context(&self.ctx, self.fs.clone())
        }

        pub(crate) fn run(
            &self,
            action: &Action,
            vfs: &mut VirtualFileSystem,
        ) -> PlinthResult<ActionOutcome> {
            HandlerRegistry::with_defaults(&self.collaborators).dispatch(
                action,
                &self.ctx,
                Path::new("/w"),
                Some(vfs),
            )
        }
    }

    #[test]
    fn default_registry_covers_every_kind() {
        let h = Harness::new();
        let registry = HandlerRegistry::with_defaults(&h.collaborators);
        assert!(ActionKind::ALL.iter().all(|k| registry.contains(*k)));
    }

    #[test]
    fn empty_registry_reports_missing_handler() {
        let h = Harness::new();
        let action = Action::new(crate::domain::Operation::AddScript(crate::domain::AddScript {
            name: "dev".into(),
            command: "vite".into(),
            manifest: None,
        }));

        let err = HandlerRegistry::new()
            .dispatch(&action, &h.ctx, Path::new("/w"), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "Application error: no handler registered for ADD_SCRIPT");
    }

    #[test]
    fn unknown_merger_is_an_error() {
        let err = MergerRegistry::new().get("toml").err().unwrap();
        assert!(err.to_string().contains("'toml'"));
    }
}
