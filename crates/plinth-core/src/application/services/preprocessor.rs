//! Blueprint action expansion.
//!
//! Two passes, in order:
//!
//! 1. **Path keys**: every `${paths.<key>}` in the action's path field is
//!    resolved. One path substitutes in place; N paths clone the action N
//!    times (cartesian across several multi-path keys). Unknown keys are left
//!    in place with a warning. Keys built from `{{…}}` are left for dispatch.
//! 2. **forEach**: the expression is looked up in the context data tree; a
//!    non-empty array clones the action once per element with `{{item}}` and
//!    `{{item.<field>}}` substituted in every templated field.
//!
//! Conditions are not evaluated here. Expansion never fails: every problem
//! becomes a warning and the action passes through.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, warn};

use crate::application::services::PathResolver;
use crate::domain::{Action, ExecutionContext, RelativePath, lookup_path, path_key};

/// Expanded actions plus every non-fatal problem met on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    pub actions: Vec<Action>,
    pub warnings: Vec<String>,
}

pub struct ActionPreprocessor<'r> {
    resolver: &'r PathResolver,
}

impl<'r> ActionPreprocessor<'r> {
    pub fn new(resolver: &'r PathResolver) -> Self {
        Self { resolver }
    }

    /// Run both passes over `actions`. Output order is input order, then
    /// path order, then element order.
    pub fn expand(&self, actions: &[Action], ctx: &ExecutionContext) -> Expansion {
        let mut warnings = Vec::new();

        let keyed: Vec<Action> = actions
            .iter()
            .flat_map(|a| self.expand_path_keys(a, ctx, &mut warnings))
            .collect();

        let expanded: Vec<Action> = keyed
            .iter()
            .flat_map(|a| Self::expand_for_each(a, ctx, &mut warnings))
            .collect();

        debug!(
            input = actions.len(),
            output = expanded.len(),
            warnings = warnings.len(),
            "Actions expanded"
        );

        Expansion {
            actions: expanded,
            warnings,
        }
    }

    /// Pass 1 for a single action.
    pub fn expand_path_keys(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        warnings: &mut Vec<String>,
    ) -> Vec<Action> {
        let Some(template) = action.path_field() else {
            return vec![action.clone()];
        };

        let refs = path_key::find_key_references(template);
        if refs.is_empty() {
            return vec![action.clone()];
        }

        let mut variants = vec![template.to_string()];
        let mut seen = HashSet::new();

        for reference in refs {
            if !seen.insert(reference.key) {
                continue;
            }
            if reference.is_deferred() {
                debug!(key = reference.key, "Path key deferred until dispatch");
                continue;
            }

            let resolution = self.resolver.resolve(reference.key, ctx);
            if !resolution.dropped.is_empty() {
                let message = format!(
                    "{}: path key '{}' dropped {} outside module root '{}'",
                    action.describe(),
                    reference.key,
                    joined(&resolution.dropped),
                    ctx.context_root()
                );
                warn!("{message}");
                warnings.push(message);
            }

            let paths = resolution.paths;
            if paths.is_empty() {
                let message = format!(
                    "{}: path key '{}' could not be resolved; left unexpanded",
                    action.describe(),
                    reference.key
                );
                warn!("{message}");
                warnings.push(message);
                continue;
            }

            variants = variants
                .iter()
                .flat_map(|variant| {
                    paths.iter().map(move |p| {
                        path_key::substitute_key(variant, reference.key, path_text(p))
                    })
                })
                .collect();
        }

        if variants.len() == 1 && variants[0] == template {
            return vec![action.clone()];
        }

        variants.into_iter().map(|v| action.with_path(v)).collect()
    }

    /// Pass 2 for a single action.
    pub fn expand_for_each(
        action: &Action,
        ctx: &ExecutionContext,
        warnings: &mut Vec<String>,
    ) -> Vec<Action> {
        let Some(expression) = action.for_each.as_deref() else {
            return vec![action.clone()];
        };

        let problem = match ctx.lookup(expression) {
            Some(Value::Array(items)) if !items.is_empty() => {
                return items
                    .iter()
                    .map(|item| {
                        let mut clone = action.map_strings(|s| substitute_item(s, item));
                        clone.for_each = None;
                        clone
                    })
                    .collect();
            }
            Some(Value::Array(_)) => "is an empty array",
            Some(_) => "is not an array",
            None => "is not defined",
        };

        let message = format!(
            "{}: forEach '{}' {}; action runs once unexpanded",
            action.describe(),
            expression,
            problem
        );
        warn!("{message}");
        warnings.push(message);
        vec![action.clone()]
    }
}

/// Text substituted for a resolved path. The anchor itself becomes `.` so
/// `${paths.k}/a.ts` stays relative.
fn joined(paths: &[RelativePath]) -> String {
    paths
        .iter()
        .map(RelativePath::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn path_text(path: &RelativePath) -> &str {
    if path.is_root() { "." } else { path.as_str() }
}

/// Replace `{{item}}` and `{{item.<field>}}` tags in `template`.
///
/// Other `{{…}}` tags are left for the template evaluator.
pub fn substitute_item(template: &str, item: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open..].find("}}") else {
            break;
        };
        let close = open + close;
        let inner = rest[open + 2..close].trim();

        out.push_str(&rest[..open]);
        match item_value(inner, item) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(&rest[open..close + 2]),
        }
        rest = &rest[close + 2..];
    }

    out.push_str(rest);
    out
}

fn item_value(tag: &str, item: &Value) -> Option<String> {
    if tag == "item" {
        return Some(stringify(item));
    }
    let field = tag.strip_prefix("item.")?;
    Some(lookup_path(item, field).map(stringify).unwrap_or_default())
}

/// Strings verbatim, scalars via display, arrays and objects as compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::application::services::path_resolver::tests::{FixedCatalog, monorepo};
    use crate::domain::{
        ActionKind, Condition, CreateFile, InstallPackages, ModuleInfo, Operation,
        ProjectMetadata,
    };

    fn create(path: &str, content: &str) -> Action {
        Action::new(Operation::CreateFile(CreateFile {
            path: path.into(),
            content: Some(content.into()),
            template: None,
            overwrite: true,
        }))
    }

    fn resolver() -> PathResolver {
        PathResolver::new(Arc::new(FixedCatalog::standard()))
    }

    fn single_app() -> ExecutionContext {
        ExecutionContext::new(
            ProjectMetadata::single_app("solo", "/w"),
            ModuleInfo::new("ui", "core"),
        )
    }

    fn paths(actions: &[Action]) -> Vec<&str> {
        actions.iter().filter_map(Action::target_path).collect()
    }

    #[test]
    fn for_each_fans_out_and_strips_marker() {
        let ctx = single_app().with_variable("items", json!(["x", "y"]));
        let r = resolver();
        let action = create("out/{{item}}.txt", "name={{item}}").with_for_each("items");

        let out = ActionPreprocessor::new(&r).expand(&[action], &ctx);

        assert_eq!(paths(&out.actions), vec!["out/x.txt", "out/y.txt"]);
        assert!(out.actions.iter().all(|a| a.for_each.is_none()));
        assert!(out.warnings.is_empty());
        match &out.actions[1].operation {
            Operation::CreateFile(op) => assert_eq!(op.content.as_deref(), Some("name=y")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn for_each_substitutes_object_fields_and_packages() {
        let ctx = single_app().with_variable(
            "deps",
            json!([{ "name": "zod", "version": "3.0.0" }, { "name": "ky", "version": 1 }]),
        );
        let action = Action::new(Operation::InstallPackages(InstallPackages {
            packages: vec!["{{item.name}}@{{item.version}}".into()],
            dev: false,
            manifest: None,
        }))
        .with_for_each("deps");

        let mut warnings = Vec::new();
        let out = ActionPreprocessor::expand_for_each(&action, &ctx, &mut warnings);

        let specs: Vec<String> = out
            .iter()
            .map(|a| match &a.operation {
                Operation::InstallPackages(op) => op.packages[0].clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(specs, vec!["zod@3.0.0", "ky@1"]);
    }

    #[test]
    fn bad_for_each_passes_through_with_warning() {
        let ctx = single_app()
            .with_variable("empty", json!([]))
            .with_variable("scalar", json!("nope"));
        let r = resolver();
        let pre = ActionPreprocessor::new(&r);

        for expr in ["empty", "scalar", "missing.key"] {
            let out = pre.expand(&[create("a/{{item}}.txt", "").with_for_each(expr)], &ctx);
            assert_eq!(out.actions.len(), 1, "{expr}");
            assert_eq!(out.actions[0].target_path(), Some("a/{{item}}.txt"));
            assert_eq!(out.warnings.len(), 1, "{expr}");
        }
    }

    #[test]
    fn path_key_fans_out_preserving_other_fields() {
        let r = resolver();
        let ctx = monorepo(None);
        let action = create("${paths.apps.frontend.components}/Button.tsx", "btn")
            .with_condition(Condition::Template("{{#if module.parameters.ui}}".into()));

        let out = ActionPreprocessor::new(&r).expand(&[action.clone()], &ctx);

        assert_eq!(
            paths(&out.actions),
            vec!["apps/web/src/components/Button.tsx", "apps/admin/src/components/Button.tsx"]
        );
        for expanded in &out.actions {
            assert_eq!(expanded.condition, action.condition);
            assert_eq!(expanded.kind(), ActionKind::CreateFile);
        }
    }

    #[test]
    fn multiple_multi_path_keys_are_cartesian() {
        let r = resolver();
        let ctx = monorepo(None);
        let action = create(
            "${paths.apps.frontend.components}/${paths.apps.all.root}",
            "",
        );

        let out = ActionPreprocessor::new(&r).expand(&[action], &ctx);
        assert_eq!(out.actions.len(), 2 * 3);
        assert_eq!(out.actions[0].target_path(), Some("apps/web/src/components/apps/web"));
    }

    #[test]
    fn unresolved_key_is_kept_with_warning() {
        let r = resolver();
        let ctx = single_app();
        let out = ActionPreprocessor::new(&r).expand(&[create("${paths.typo.key}/a.ts", "")], &ctx);

        assert_eq!(paths(&out.actions), vec!["${paths.typo.key}/a.ts"]);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("typo.key"));
    }

    #[test]
    fn templated_key_is_deferred_then_for_each_expands() {
        let r = resolver();
        let ctx = single_app().with_variable("parts", json!(["auth"]));
        let action = create("${paths.{{item}}.config}", "").with_for_each("parts");

        let out = ActionPreprocessor::new(&r).expand(&[action], &ctx);

        assert!(out.warnings.is_empty());
        assert_eq!(paths(&out.actions), vec!["${paths.auth.config}"]);
    }

    #[test]
    fn root_path_keeps_result_relative() {
        let r = resolver();
        let ctx = monorepo(Some("apps/web"));
        let mut warnings = Vec::new();
        let out = ActionPreprocessor::new(&r).expand_path_keys(
            &create("${paths.apps.all.root}/README.md", ""),
            &ctx,
            &mut warnings,
        );
        assert_eq!(paths(&out), vec!["./README.md"]);

        // `apps/api` and `apps/admin` sit outside `apps/web`.
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("apps/api, apps/admin"), "{}", warnings[0]);
        assert!(warnings[0].contains("'apps/web'"), "{}", warnings[0]);
    }

    #[test]
    fn stringify_forms() {
        assert_eq!(stringify(&json!("a")), "a");
        assert_eq!(stringify(&json!(3)), "3");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&json!([1, "b"])), r#"[1,"b"]"#);
        assert_eq!(stringify(&json!({"k": 1})), r#"{"k":1}"#);
        assert_eq!(substitute_item("{{ item }}-{{other}}", &json!("x")), "x-{{other}}");
    }
}
