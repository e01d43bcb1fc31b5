//! One transactional turn per module.
//!
//! For each module: build its context, open a VFS anchored at its target
//! directory, run the blueprint, then commit on success or discard on
//! failure. The VFS is consumed either way.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn};

use crate::application::{
    ports::Filesystem,
    services::BlueprintEngine,
    vfs::{FlushReport, VirtualFileSystem},
};
use crate::domain::{Blueprint, ExecutionContext, ExecutionResult, ModuleInfo, ProjectMetadata};

/// A module ready to run: who it is, and what it does.
#[derive(Debug, Clone)]
pub struct ModuleSpec {
    pub info: ModuleInfo,
    pub blueprint: Blueprint,
    /// Directory that `CREATE_FILE` template references resolve against.
    pub template_root: Option<PathBuf>,
}

impl ModuleSpec {
    pub fn new(info: ModuleInfo, blueprint: Blueprint) -> Self {
        Self {
            info,
            blueprint,
            template_root: None,
        }
    }

    pub fn with_template_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.template_root = Some(root.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Execute every module but never write to disk.
    pub dry_run: bool,
    /// Keep going after a module fails.
    pub continue_on_failure: bool,
}

/// What happened to a module's VFS after the engine finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum CommitStatus {
    Committed,
    Discarded,
    FlushFailed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub module: String,
    pub result: ExecutionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flush: Option<FlushReport>,
    #[serde(flatten)]
    pub status: CommitStatus,
}

impl ModuleReport {
    pub fn success(&self) -> bool {
        self.result.success && !matches!(self.status, CommitStatus::FlushFailed { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub modules: Vec<ModuleReport>,
    /// Modules skipped because an earlier one failed.
    pub not_run: Vec<String>,
    pub success: bool,
}

pub struct ModuleRunner {
    engine: Arc<BlueprintEngine>,
    fs: Arc<dyn Filesystem>,
    options: RunOptions,
    variables: Map<String, Value>,
}

impl ModuleRunner {
    pub fn new(engine: Arc<BlueprintEngine>, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            engine,
            fs,
            options: RunOptions::default(),
            variables: Map::new(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Free-form variables merged into every module's context.
    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    pub fn context_for(&self, module: &ModuleSpec, project: &ProjectMetadata) -> ExecutionContext {
        let ctx = ExecutionContext::new(project.clone(), module.info.clone())
            .with_variables(self.variables.clone());
        match &module.template_root {
            Some(root) => ctx.with_template_root(root),
            None => ctx,
        }
    }

    #[instrument(skip_all, fields(module = %module.info.id, dry_run = self.options.dry_run))]
    pub fn run_module(&self, module: &ModuleSpec, project: &ProjectMetadata) -> ModuleReport {
        let ctx = self.context_for(module, project);
        let mut vfs = VirtualFileSystem::for_context(&ctx, Arc::clone(&self.fs));

        let result = self.engine.run(&module.blueprint, &ctx, &mut vfs);

        let (flush, status) = if !result.success {
            warn!(error = result.error().unwrap_or_default(), "Module failed; discarding");
            vfs.discard();
            (None, CommitStatus::Discarded)
        } else if self.options.dry_run {
            info!(files = result.files.len(), "Dry run; discarding");
            vfs.discard();
            (None, CommitStatus::Discarded)
        } else {
            match vfs.commit() {
                Ok(report) => {
                    info!(
                        written = report.written.len(),
                        deleted = report.deleted.len(),
                        "Module committed"
                    );
                    (Some(report), CommitStatus::Committed)
                }
                Err(e) => {
                    error!(error = %e, "Flush failed; earlier files may already be on disk");
                    (
                        None,
                        CommitStatus::FlushFailed {
                            error: e.to_string(),
                        },
                    )
                }
            }
        };

        ModuleReport {
            module: module.info.id.clone(),
            result,
            flush,
            status,
        }
    }

    /// Run `modules` in order.
    ///
    /// Stops after the first failure unless `continue_on_failure` is set;
    /// the remaining module ids land in `not_run`.
    #[instrument(skip_all, fields(project = %project.name, modules = modules.len()))]
    pub fn run_all(&self, modules: &[ModuleSpec], project: &ProjectMetadata) -> RunReport {
        let mut report = RunReport {
            success: true,
            ..RunReport::default()
        };

        for (index, module) in modules.iter().enumerate() {
            let module_report = self.run_module(module, project);
            let ok = module_report.success();
            report.modules.push(module_report);

            if !ok {
                report.success = false;
                if !self.options.continue_on_failure {
                    report.not_run = modules[index + 1..]
                        .iter()
                        .map(|m| m.info.id.clone())
                        .collect();
                    if !report.not_run.is_empty() {
                        warn!(not_run = ?report.not_run, "Stopping after failed module");
                    }
                    break;
                }
            }
        }

        info!(
            success = report.success,
            ran = report.modules.len(),
            not_run = report.not_run.len(),
            "Run finished"
        );
        report
    }
}

impl std::fmt::Debug for ModuleRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRunner")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::handlers::{Collaborators, HandlerRegistry, MergerRegistry};
    use crate::application::ports::{MockCommandRunner, TemplateEvaluator};
    use crate::application::services::PathResolver;
    use crate::application::services::path_resolver::tests::FixedCatalog;
    use crate::application::testing::MemoryFs;
    use crate::domain::{Action, CreateFile, Operation, RelativePath};
    use crate::error::PlinthResult;

    struct Verbatim;

    impl TemplateEvaluator for Verbatim {
        fn render(&self, template: &str, ctx: &ExecutionContext) -> PlinthResult<String> {
            Ok(template.replace("{{module.id}}", &ctx.module().id))
        }
    }

    fn create(path: &str, content: &str) -> Action {
        Action::new(Operation::CreateFile(CreateFile {
            path: path.into(),
            content: Some(content.into()),
            template: None,
            overwrite: false,
        }))
    }

    fn runner(fs: Arc<MemoryFs>, options: RunOptions) -> ModuleRunner {
        let evaluator: Arc<dyn TemplateEvaluator> = Arc::new(Verbatim);
        let resolver = Arc::new(PathResolver::new(Arc::new(FixedCatalog::standard())));
        let collaborators = Collaborators {
            evaluator: Arc::clone(&evaluator),
            resolver: Arc::clone(&resolver),
            mergers: Arc::new(MergerRegistry::new()),
            runner: Arc::new(MockCommandRunner::new()),
            fs: fs.clone(),
        };
        let engine = BlueprintEngine::new(
            resolver,
            evaluator,
            HandlerRegistry::with_defaults(&collaborators),
        );
        ModuleRunner::new(Arc::new(engine), fs).with_options(options)
    }

    fn module(id: &str, actions: Vec<Action>) -> ModuleSpec {
        ModuleSpec::new(
            ModuleInfo::new(id, "core"),
            Blueprint::new(id, id).with_actions(actions),
        )
    }

    fn broken(id: &str) -> ModuleSpec {
        // MERGE_JSON with no registered merger fails at dispatch time.
        module(
            id,
            vec![
                create("{{module.id}}.txt", "partial"),
                Action::new(Operation::MergeJson(crate::domain::MergeJson {
                    path: "{{module.id}}.txt".into(),
                    content: json!({}),
                    fallback: Default::default(),
                })),
            ],
        )
    }

    #[test]
    fn success_commits_and_failure_discards() {
        let fs = Arc::new(MemoryFs::default());
        let runner = runner(fs.clone(), RunOptions::default());
        let project = ProjectMetadata::single_app("solo", "/w");

        let ok = runner.run_module(&module("auth", vec![create("{{module.id}}.ts", "x")]), &project);
        assert_eq!(ok.status, CommitStatus::Committed);
        assert_eq!(fs.get("/w/auth.ts").as_deref(), Some("x"));
        assert_eq!(ok.flush.map(|f| f.written), Some(vec!["auth.ts".to_string()]));

        let failed = runner.run_module(&broken("db"), &project);
        assert_eq!(failed.status, CommitStatus::Discarded);
        assert!(!failed.success());
        assert_eq!(fs.get("/w/db.txt"), None);
    }

    #[test]
    fn dry_run_never_writes() {
        let fs = Arc::new(MemoryFs::default());
        let runner = runner(
            fs.clone(),
            RunOptions {
                dry_run: true,
                ..RunOptions::default()
            },
        );
        let report = runner.run_module(
            &module("auth", vec![create("auth.ts", "x")]),
            &ProjectMetadata::single_app("solo", "/w"),
        );

        assert!(report.success());
        assert_eq!(report.result.files, vec!["auth.ts"]);
        assert_eq!(report.status, CommitStatus::Discarded);
        assert!(fs.writes().is_empty());
    }

    #[test]
    fn run_all_stops_at_first_failure() {
        let fs = Arc::new(MemoryFs::default());
        let project = ProjectMetadata::single_app("solo", "/w");
        let modules = vec![
            module("a", vec![create("a.ts", "a")]),
            broken("b"),
            module("c", vec![create("c.ts", "c")]),
        ];

        let report = runner(fs.clone(), RunOptions::default()).run_all(&modules, &project);
        assert!(!report.success);
        assert_eq!(report.modules.len(), 2);
        assert_eq!(report.not_run, vec!["c"]);
        assert!(fs.get("/w/a.ts").is_some());
        assert!(fs.get("/w/c.ts").is_none());

        let keep_going = runner(
            fs.clone(),
            RunOptions {
                continue_on_failure: true,
                ..RunOptions::default()
            },
        )
        .run_all(&modules, &project);
        assert!(!keep_going.success);
        assert_eq!(keep_going.modules.len(), 3);
        assert!(keep_going.not_run.is_empty());
        assert!(fs.get("/w/c.ts").is_some());
    }

    #[test]
    fn flush_failure_fails_module_and_keeps_earlier_writes() {
        let fs = Arc::new(MemoryFs::default());
        fs.deny_writes("/w/b.ts");
        let project = ProjectMetadata::single_app("solo", "/w");
        let modules = vec![
            module(
                "ab",
                vec![create("a.ts", "a"), create("b.ts", "b"), create("c.ts", "c")],
            ),
            module("d", vec![create("d.ts", "d")]),
        ];

        let report = runner(fs.clone(), RunOptions::default()).run_all(&modules, &project);

        let failed = &report.modules[0];
        assert!(failed.result.success);
        assert!(!failed.success());
        assert!(failed.flush.is_none());
        match &failed.status {
            CommitStatus::FlushFailed { error } => assert!(error.contains("b.ts"), "{error}"),
            other => panic!("unexpected status {other:?}"),
        }

        assert!(!report.success);
        assert_eq!(report.modules.len(), 1);
        assert_eq!(report.not_run, vec!["d"]);

        // Flush runs in path order and is not rolled back: `a.ts` stays.
        assert_eq!(fs.get("/w/a.ts").as_deref(), Some("a"));
        assert_eq!(fs.get("/w/b.ts"), None);
        assert_eq!(fs.get("/w/c.ts"), None);
        assert_eq!(fs.get("/w/d.ts"), None);
    }

    #[test]
    fn package_scoped_module_writes_under_its_package() {
        let fs = Arc::new(MemoryFs::default());
        let project = ProjectMetadata::monorepo("mono", "/w", vec![]);
        let mut spec = module("auth", vec![create("index.ts", "export {}")]);
        spec.info = spec
            .info
            .with_target_package(RelativePath::parse("packages/auth").unwrap());

        let report = runner(fs.clone(), RunOptions::default()).run_module(&spec, &project);

        assert_eq!(report.result.files, vec!["packages/auth/index.ts"]);
        assert_eq!(fs.get("/w/packages/auth/index.ts").as_deref(), Some("export {}"));
    }

    #[test]
    fn variables_reach_the_context() {
        let fs = Arc::new(MemoryFs::default());
        let mut vars = Map::new();
        vars.insert("author".into(), json!("ada"));
        let runner = runner(fs, RunOptions::default()).with_variables(vars);

        let ctx = runner.context_for(
            &module("auth", vec![]).with_template_root("/tpl"),
            &ProjectMetadata::single_app("solo", "/w"),
        );
        assert_eq!(ctx.lookup("author"), Some(&json!("ada")));
        assert_eq!(ctx.template_root(), Some(std::path::Path::new("/tpl")));
    }
}
