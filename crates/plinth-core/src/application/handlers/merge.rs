//! Handlers that delegate to a named content merger.

use std::path::Path;

use serde_json::{Map, Value, json};

use super::{ActionHandler, Collaborators, merger_names, support};
use crate::application::vfs::VirtualFileSystem;
use crate::domain::{
    Action, ActionOutcome, ExecutionContext, FallbackPolicy, Operation, RelativePath,
    action::map_value,
};
use crate::error::{PlinthError, PlinthResult};

/// Render every string in `params`, then hand `path` to merger `name`.
fn delegate(
    c: &Collaborators,
    name: &str,
    path: &RelativePath,
    params: &Value,
    fallback: FallbackPolicy,
    ctx: &ExecutionContext,
    vfs: &mut VirtualFileSystem,
) -> PlinthResult<ActionOutcome> {
    if let Some(skipped) = support::check_target(vfs, path, fallback)? {
        return Ok(skipped);
    }

    let merger = c.mergers.get(name)?;
    let params = render_value(c, params, ctx)?;
    merger.execute(path, &params, ctx, vfs)
}

/// Render `{{…}}` in every string leaf of a JSON value.
pub(super) fn render_value(
    c: &Collaborators,
    value: &Value,
    ctx: &ExecutionContext,
) -> PlinthResult<Value> {
    let mut failure = None;
    let rendered = map_value(value, &mut |s: &str| match support::render(c, s, ctx) {
        Ok(out) => out,
        Err(e) => {
            failure.get_or_insert(e);
            s.to_string()
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(rendered),
    }
}

fn mismatch(expected: &'static str, action: &Action) -> PlinthError {
    PlinthError::Internal {
        message: format!("{expected} handler received {}", action.kind()),
    }
}

// ============================================================================
// ENHANCE_FILE
// ============================================================================

pub struct EnhanceFileHandler {
    c: Collaborators,
}

impl EnhanceFileHandler {
    pub fn new(c: Collaborators) -> Self {
        Self { c }
    }
}

impl ActionHandler for EnhanceFileHandler {
    fn handle(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        _target_root: &Path,
        vfs: Option<&mut VirtualFileSystem>,
    ) -> PlinthResult<ActionOutcome> {
        let Operation::EnhanceFile(op) = &action.operation else {
            return Err(mismatch("ENHANCE_FILE", action));
        };
        let vfs = support::require_vfs(action.kind(), vfs)?;
        let path = support::resolve_path(&self.c, &op.path, ctx)?;
        delegate(&self.c, &op.modifier, &path, &op.params, op.fallback, ctx, vfs)
    }
}

// ============================================================================
// MERGE_JSON
// ============================================================================

pub struct MergeJsonHandler {
    c: Collaborators,
}

impl MergeJsonHandler {
    pub fn new(c: Collaborators) -> Self {
        Self { c }
    }
}

impl ActionHandler for MergeJsonHandler {
    fn handle(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        _target_root: &Path,
        vfs: Option<&mut VirtualFileSystem>,
    ) -> PlinthResult<ActionOutcome> {
        let Operation::MergeJson(op) = &action.operation else {
            return Err(mismatch("MERGE_JSON", action));
        };
        let vfs = support::require_vfs(action.kind(), vfs)?;
        let path = support::resolve_path(&self.c, &op.path, ctx)?;
        delegate(&self.c, merger_names::JSON, &path, &op.content, op.fallback, ctx, vfs)
    }
}

// ============================================================================
// MERGE_CONFIG
// ============================================================================

pub struct MergeConfigHandler {
    c: Collaborators,
}

impl MergeConfigHandler {
    pub fn new(c: Collaborators) -> Self {
        Self { c }
    }

    /// Explicit strategy first, then the file extension.
    fn strategy_for(strategy: Option<&str>, path: &RelativePath) -> PlinthResult<String> {
        if let Some(strategy) = strategy {
            return Ok(strategy.to_string());
        }
        match path.extension().as_deref() {
            Some("json") => Ok(merger_names::JSON.into()),
            Some("yaml" | "yml") => Ok(merger_names::YAML.into()),
            other => Err(PlinthError::Configuration {
                message: format!(
                    "no merge strategy for '{path}' (extension {}); set `strategy` on the action",
                    other.unwrap_or("none")
                ),
            }),
        }
    }
}

impl ActionHandler for MergeConfigHandler {
    fn handle(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        _target_root: &Path,
        vfs: Option<&mut VirtualFileSystem>,
    ) -> PlinthResult<ActionOutcome> {
        let Operation::MergeConfig(op) = &action.operation else {
            return Err(mismatch("MERGE_CONFIG", action));
        };
        let vfs = support::require_vfs(action.kind(), vfs)?;
        let path = support::resolve_path(&self.c, &op.path, ctx)?;
        let strategy = Self::strategy_for(op.strategy.as_deref(), &path)?;
        delegate(&self.c, &strategy, &path, &op.params, op.fallback, ctx, vfs)
    }
}

// ============================================================================
// WRAP_CONFIG
// ============================================================================

pub struct WrapConfigHandler {
    c: Collaborators,
}

impl WrapConfigHandler {
    pub fn new(c: Collaborators) -> Self {
        Self { c }
    }
}

impl ActionHandler for WrapConfigHandler {
    fn handle(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        _target_root: &Path,
        vfs: Option<&mut VirtualFileSystem>,
    ) -> PlinthResult<ActionOutcome> {
        let Operation::WrapConfig(op) = &action.operation else {
            return Err(mismatch("WRAP_CONFIG", action));
        };
        let vfs = support::require_vfs(action.kind(), vfs)?;
        let path = support::resolve_path(&self.c, &op.path, ctx)?;

        let mut params = Map::new();
        params.insert("wrapper".into(), json!(op.wrapper));
        if let Some(import) = &op.import {
            params.insert("import".into(), json!(import));
        }
        if !op.options.is_null() {
            params.insert("options".into(), op.options.clone());
        }

        delegate(
            &self.c,
            merger_names::CODE_EXPORT_WRAP,
            &path,
            &Value::Object(params),
            op.fallback,
            ctx,
            vfs,
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::tests::Harness;
    use super::*;
    use crate::domain::{EnhanceFile, MergeConfig, MergeJson, WrapConfig};

    #[test]
    fn merge_json_delegates_rendered_content() {
        let h = Harness::new();
        h.fs.put("/w/tsconfig.json", "{}");
        let mut vfs = h.vfs();
        let action = Action::new(Operation::MergeJson(MergeJson {
            path: "tsconfig.json".into(),
            content: json!({ "compilerOptions": { "paths": { "@{{module.id}}/*": ["src/*"] } } }),
            fallback: FallbackPolicy::Error,
        }));

        let outcome = h.run(&action, &mut vfs).unwrap();

        assert_eq!(outcome.files, vec!["tsconfig.json"]);
        let calls = h.merger.calls.lock().unwrap();
        assert_eq!(calls[0].0, "tsconfig.json");
        assert_eq!(
            calls[0].1,
            json!({ "compilerOptions": { "paths": { "@auth/*": ["src/*"] } } })
        );
    }

    #[test]
    fn missing_target_honours_fallback_before_merging() {
        let h = Harness::new();
        let mut vfs = h.vfs();
        let mut op = MergeJson {
            path: "missing.json".into(),
            content: json!({}),
            fallback: FallbackPolicy::Error,
        };

        let err = h.run(&Action::new(Operation::MergeJson(op.clone())), &mut vfs).unwrap_err();
        assert!(err.is_not_found());

        op.fallback = FallbackPolicy::Skip;
        let skipped = h.run(&Action::new(Operation::MergeJson(op.clone())), &mut vfs).unwrap();
        assert!(skipped.skipped);
        assert!(h.merger.calls.lock().unwrap().is_empty());

        op.fallback = FallbackPolicy::Create;
        h.run(&Action::new(Operation::MergeJson(op)), &mut vfs).unwrap();
        assert_eq!(h.merger.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn merge_config_picks_strategy() {
        assert_eq!(
            MergeConfigHandler::strategy_for(None, &RelativePath::parse("a/b.YML").unwrap()).unwrap(),
            "yaml"
        );
        assert_eq!(
            MergeConfigHandler::strategy_for(None, &RelativePath::parse("c.json").unwrap()).unwrap(),
            "json"
        );
        assert_eq!(
            MergeConfigHandler::strategy_for(Some("package-json"), &RelativePath::parse("x.toml").unwrap())
                .unwrap(),
            "package-json"
        );
        assert!(MergeConfigHandler::strategy_for(None, &RelativePath::parse("x.toml").unwrap()).is_err());
    }

    #[test]
    fn merge_config_unknown_extension_fails() {
        let h = Harness::new();
        h.fs.put("/w/Cargo.toml", "");
        let mut vfs = h.vfs();
        let action = Action::new(Operation::MergeConfig(MergeConfig {
            path: "Cargo.toml".into(),
            strategy: None,
            params: json!({}),
            fallback: FallbackPolicy::Error,
        }));
        assert!(h.run(&action, &mut vfs).is_err());
    }

    #[test]
    fn enhance_file_uses_named_modifier() {
        let h = Harness::new();
        h.fs.put("/w/app.yaml", "a: 1");
        let mut vfs = h.vfs();
        let action = Action::new(Operation::EnhanceFile(EnhanceFile {
            path: "app.yaml".into(),
            modifier: "yaml".into(),
            params: json!({ "b": 2 }),
            fallback: FallbackPolicy::Error,
        }));
        h.run(&action, &mut vfs).unwrap();

        let unknown = Action::new(Operation::EnhanceFile(EnhanceFile {
            path: "app.yaml".into(),
            modifier: "ast-magic".into(),
            params: Value::Null,
            fallback: FallbackPolicy::Error,
        }));
        let err = h.run(&unknown, &mut vfs).unwrap_err();
        assert!(err.to_string().contains("ast-magic"));
    }

    #[test]
    fn wrap_config_builds_params() {
        let h = Harness::new();
        h.fs.put("/w/next.config.js", "module.exports = {};");
        let mut vfs = h.vfs();
        let action = Action::new(Operation::WrapConfig(WrapConfig {
            path: "next.config.js".into(),
            wrapper: "withAuth".into(),
            import: Some("const { withAuth } = require('auth');".into()),
            options: Value::Null,
            fallback: FallbackPolicy::Error,
        }));
        h.run(&action, &mut vfs).unwrap();

        let calls = h.merger.calls.lock().unwrap();
        assert_eq!(
            calls[0].1,
            json!({ "wrapper": "withAuth", "import": "const { withAuth } = require('auth');" })
        );
    }
}
