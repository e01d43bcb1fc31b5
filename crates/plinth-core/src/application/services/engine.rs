//! Blueprint execution loop.
//!
//! ```text
//! Idle ─► Preprocessing ─► Executing ─► Completed
//!              │               │
//!              └──────┬────────┘
//!                     ▼
//!                   Failed
//! ```
//!
//! Preprocessing validates the blueprint as a batch, expands path keys and
//! `forEach`, then preloads every file the expanded actions will read.
//! Executing gates, dispatches and records each action in order and stops at
//! the first handler error. The engine never returns `Err`: every outcome is
//! an [`ExecutionResult`]. A panicking handler is caught and reported as a
//! failed action when panics unwind.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::{
    ApplicationError,
    handlers::HandlerRegistry,
    ports::TemplateEvaluator,
    services::{
        ActionPreprocessor, BlueprintValidator, ConditionGate, Expansion, GateDecision,
        PathResolver,
    },
    vfs::VirtualFileSystem,
};
use crate::domain::{
    Action, Blueprint, DEFAULT_MANIFEST, EngineState, ExecutionContext, ExecutionResult,
    RelativePath, ValidationReport, path_key,
};

pub struct BlueprintEngine {
    resolver: Arc<PathResolver>,
    evaluator: Arc<dyn TemplateEvaluator>,
    handlers: HandlerRegistry,
}

impl BlueprintEngine {
    pub fn new(
        resolver: Arc<PathResolver>,
        evaluator: Arc<dyn TemplateEvaluator>,
        handlers: HandlerRegistry,
    ) -> Self {
        Self {
            resolver,
            evaluator,
            handlers,
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Validate and expand without executing anything.
    pub fn expand(
        &self,
        blueprint: &Blueprint,
        ctx: &ExecutionContext,
    ) -> Result<Expansion, ValidationReport> {
        BlueprintValidator::validate(blueprint, ctx, &self.resolver)?;
        Ok(ActionPreprocessor::new(&self.resolver).expand(&blueprint.actions, ctx))
    }

    /// Run `blueprint` against `vfs`. The VFS is never flushed here.
    #[instrument(
        skip_all,
        fields(blueprint = %blueprint.id, module = %ctx.module().id, vfs = %vfs.id())
    )]
    pub fn run(
        &self,
        blueprint: &Blueprint,
        ctx: &ExecutionContext,
        vfs: &mut VirtualFileSystem,
    ) -> ExecutionResult {
        let mut result = ExecutionResult::new();
        let mut state = EngineState::Idle;

        // ── Preprocessing ──
        transition(&mut state, EngineState::Preprocessing);

        let expansion = match self.expand(blueprint, ctx) {
            Ok(expansion) => expansion,
            Err(report) => {
                warn!(issues = report.len(), "Blueprint failed validation");
                transition(&mut state, EngineState::Failed);
                let mut issues = report.iter().map(ToString::to_string);
                let first = issues.next().unwrap_or_else(|| report.to_string());
                let mut failed = result.fail(first);
                failed.errors.extend(issues);
                return failed;
            }
        };

        for warning in expansion.warnings {
            result.warn(warning);
        }
        result.total_actions = expansion.actions.len();

        let preload = preload_paths(&expansion.actions, blueprint);
        let seeded = vfs.initialize_with_files(&preload);
        debug!(requested = preload.len(), seeded, "VFS preloaded");

        // ── Executing ──
        transition(&mut state, EngineState::Executing);

        let gate = ConditionGate::new(self.evaluator.as_ref());
        let target_root = ctx.anchor();

        for (index, action) in expansion.actions.iter().enumerate() {
            let label = action.describe();

            match gate.evaluate(action.condition.as_ref(), ctx) {
                GateDecision::Run => {}
                GateDecision::Skip => {
                    debug!(index, action = %label, "Skipped by condition");
                    result.skip(format!("{label} (condition false)"));
                    continue;
                }
                GateDecision::FailedClosed { warning } => {
                    result.warn(format!("{label}: {warning}"));
                    result.skip(format!("{label} (condition error)"));
                    continue;
                }
            }

            let dispatched = panic::catch_unwind(AssertUnwindSafe(|| {
                self.handlers
                    .dispatch(action, ctx, &target_root, Some(&mut *vfs))
            }))
            .unwrap_or_else(|payload| {
                Err(ApplicationError::HandlerFailed {
                    action: action.kind().to_string(),
                    reason: format!("handler panicked: {}", panic_message(payload.as_ref())),
                }
                .into())
            });

            match dispatched {
                Ok(outcome) => {
                    result.executed_actions += 1;
                    result.touch(
                        outcome
                            .files
                            .iter()
                            .map(|f| project_relative(ctx, f)),
                    );
                    if outcome.skipped {
                        let reason = outcome.message.unwrap_or_default();
                        debug!(index, action = %label, %reason, "Handler skipped");
                        result.skip(format!("{label} ({reason})"));
                    }
                }
                Err(e) => {
                    warn!(index, action = %label, error = %e, "Action failed; stopping");
                    transition(&mut state, EngineState::Failed);
                    return result.fail(format!("{label}: {e}"));
                }
            }
        }

        transition(&mut state, EngineState::Completed);
        info!(
            files = result.files.len(),
            skipped = result.skipped.len(),
            warnings = result.warnings.len(),
            "Blueprint completed"
        );
        result.complete()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn transition(state: &mut EngineState, next: EngineState) {
    debug!(from = %state, to = %next, "Engine state");
    *state = next;
}

/// Files the expanded actions will read, plus the manifest and contextual
/// files. Paths still holding unresolved placeholders are left out.
fn preload_paths(actions: &[Action], blueprint: &Blueprint) -> Vec<String> {
    let mut paths = BTreeSet::new();
    paths.insert(DEFAULT_MANIFEST.to_string());

    for action in actions {
        if !action.kind().reads_target() {
            continue;
        }
        match action.target_path() {
            Some(path) if !path.contains("{{") && !path_key::has_key_reference(path) => {
                paths.insert(path.to_string());
            }
            _ => {}
        }
    }

    paths.extend(blueprint.contextual_files.iter().cloned());
    paths.into_iter().collect()
}

fn project_relative(ctx: &ExecutionContext, anchor_path: &str) -> String {
    match RelativePath::parse(anchor_path) {
        Ok(path) => ctx.project_relative(&path).into_string(),
        Err(_) => anchor_path.to_string(),
    }
}

impl std::fmt::Debug for BlueprintEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlueprintEngine").finish_non_exhaustive()
    }
}
