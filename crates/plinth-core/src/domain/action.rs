//! Blueprint actions.
//!
//! An [`Action`] is one declarative operation. The operation itself is a
//! closed sum type ([`Operation`]) with one variant per kind, each carrying
//! only its own fields; `condition` and `forEach` are common to every kind.
//!
//! ## Serialized form
//!
//! ```toml
//! [[actions]]
//! type = "CREATE_FILE"
//! path = "${paths.auth.config}"
//! content = "export const provider = '{{module.parameters.provider}}';"
//! condition = "{{#if module.parameters.provider}}"
//!
//! [[actions]]
//! type = "INSTALL_PACKAGES"
//! packages = ["lib@1.2.0"]
//! ```
//!
//! ## Expansion
//!
//! Actions are never mutated once a blueprint is loaded. Preprocessing builds
//! new values through [`Action::with_path`] and [`Action::map_strings`], which
//! clone the typed variant and substitute field by field.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default module manifest targeted by package operations.
pub const DEFAULT_MANIFEST: &str = "package.json";

/// Default environment file targeted by `ADD_ENV_VAR`.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Type tag of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    CreateFile,
    EnhanceFile,
    MergeJson,
    MergeConfig,
    InstallPackages,
    AddScript,
    AddEnvVar,
    RunCommand,
    AppendToFile,
    PrependToFile,
    AddImport,
    ExtendSchema,
    WrapConfig,
}

impl ActionKind {
    pub const ALL: [ActionKind; 13] = [
        Self::CreateFile,
        Self::EnhanceFile,
        Self::MergeJson,
        Self::MergeConfig,
        Self::InstallPackages,
        Self::AddScript,
        Self::AddEnvVar,
        Self::RunCommand,
        Self::AppendToFile,
        Self::PrependToFile,
        Self::AddImport,
        Self::ExtendSchema,
        Self::WrapConfig,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateFile => "CREATE_FILE",
            Self::EnhanceFile => "ENHANCE_FILE",
            Self::MergeJson => "MERGE_JSON",
            Self::MergeConfig => "MERGE_CONFIG",
            Self::InstallPackages => "INSTALL_PACKAGES",
            Self::AddScript => "ADD_SCRIPT",
            Self::AddEnvVar => "ADD_ENV_VAR",
            Self::RunCommand => "RUN_COMMAND",
            Self::AppendToFile => "APPEND_TO_FILE",
            Self::PrependToFile => "PREPEND_TO_FILE",
            Self::AddImport => "ADD_IMPORT",
            Self::ExtendSchema => "EXTEND_SCHEMA",
            Self::WrapConfig => "WRAP_CONFIG",
        }
    }

    /// Kinds whose handler reads the target file before writing it.
    pub const fn reads_target(self) -> bool {
        !matches!(self, Self::CreateFile | Self::RunCommand)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a file-targeting action does when its target file is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Fail the action (and therefore the module).
    #[default]
    Error,
    /// Skip the action with a message.
    Skip,
    /// Treat the file as empty and create it.
    Create,
}

/// Optional gate on an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Literal(bool),
    Template(String),
}

/// One declarative blueprint operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(flatten)]
    pub operation: Operation,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,

    /// Dot-path into the context data; one clone per array element.
    #[serde(default, alias = "for_each", skip_serializing_if = "Option::is_none")]
    pub for_each: Option<String>,
}

/// The operation-specific part of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    CreateFile(CreateFile),
    EnhanceFile(EnhanceFile),
    MergeJson(MergeJson),
    MergeConfig(MergeConfig),
    InstallPackages(InstallPackages),
    AddScript(AddScript),
    AddEnvVar(AddEnvVar),
    RunCommand(RunCommand),
    AppendToFile(TextInsert),
    PrependToFile(TextInsert),
    AddImport(AddImport),
    ExtendSchema(ExtendSchema),
    WrapConfig(WrapConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFile {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Template file, relative to the context's template root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceFile {
    pub path: String,
    /// Name of the content merger to delegate to.
    pub modifier: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeJson {
    pub path: String,
    pub content: Value,
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeConfig {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallPackages {
    /// `name@version` specs; a missing version means `latest`.
    pub packages: Vec<String>,
    #[serde(default)]
    pub dev: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddScript {
    pub name: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEnvVar {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCommand {
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

/// Payload of `APPEND_TO_FILE` and `PREPEND_TO_FILE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextInsert {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddImport {
    pub path: String,
    pub imports: Vec<String>,
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendSchema {
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    pub definitions: Vec<String>,
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapConfig {
    pub path: String,
    pub wrapper: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

impl Operation {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::CreateFile(_) => ActionKind::CreateFile,
            Self::EnhanceFile(_) => ActionKind::EnhanceFile,
            Self::MergeJson(_) => ActionKind::MergeJson,
            Self::MergeConfig(_) => ActionKind::MergeConfig,
            Self::InstallPackages(_) => ActionKind::InstallPackages,
            Self::AddScript(_) => ActionKind::AddScript,
            Self::AddEnvVar(_) => ActionKind::AddEnvVar,
            Self::RunCommand(_) => ActionKind::RunCommand,
            Self::AppendToFile(_) => ActionKind::AppendToFile,
            Self::PrependToFile(_) => ActionKind::PrependToFile,
            Self::AddImport(_) => ActionKind::AddImport,
            Self::ExtendSchema(_) => ActionKind::ExtendSchema,
            Self::WrapConfig(_) => ActionKind::WrapConfig,
        }
    }
}

impl Action {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            condition: None,
            for_each: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_for_each(mut self, expression: impl Into<String>) -> Self {
        self.for_each = Some(expression.into());
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.operation.kind()
    }

    /// The target path template, with defaults applied for manifest and env
    /// operations. `RUN_COMMAND` has no target file.
    pub fn target_path(&self) -> Option<&str> {
        match &self.operation {
            Operation::CreateFile(op) => Some(&op.path),
            Operation::EnhanceFile(op) => Some(&op.path),
            Operation::MergeJson(op) => Some(&op.path),
            Operation::MergeConfig(op) => Some(&op.path),
            Operation::InstallPackages(op) => {
                Some(op.manifest.as_deref().unwrap_or(DEFAULT_MANIFEST))
            }
            Operation::AddScript(op) => Some(op.manifest.as_deref().unwrap_or(DEFAULT_MANIFEST)),
            Operation::AddEnvVar(op) => Some(op.path.as_deref().unwrap_or(DEFAULT_ENV_FILE)),
            Operation::RunCommand(_) => None,
            Operation::AppendToFile(op) | Operation::PrependToFile(op) => Some(&op.path),
            Operation::AddImport(op) => Some(&op.path),
            Operation::ExtendSchema(op) => Some(&op.path),
            Operation::WrapConfig(op) => Some(&op.path),
        }
    }

    /// The field that path-key expansion rewrites, if the action has one set.
    ///
    /// For `RUN_COMMAND` this is the working directory.
    pub fn path_field(&self) -> Option<&str> {
        match &self.operation {
            Operation::RunCommand(op) => op.working_dir.as_deref(),
            Operation::InstallPackages(op) => op.manifest.as_deref(),
            Operation::AddScript(op) => op.manifest.as_deref(),
            Operation::AddEnvVar(op) => op.path.as_deref(),
            _ => self.target_path(),
        }
    }

    /// Clone with the path field replaced. Every other field is preserved.
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        let mut next = self.clone();
        let path = path.into();
        match &mut next.operation {
            Operation::CreateFile(op) => op.path = path,
            Operation::EnhanceFile(op) => op.path = path,
            Operation::MergeJson(op) => op.path = path,
            Operation::MergeConfig(op) => op.path = path,
            Operation::InstallPackages(op) => op.manifest = Some(path),
            Operation::AddScript(op) => op.manifest = Some(path),
            Operation::AddEnvVar(op) => op.path = Some(path),
            Operation::RunCommand(op) => op.working_dir = Some(path),
            Operation::AppendToFile(op) | Operation::PrependToFile(op) => op.path = path,
            Operation::AddImport(op) => op.path = path,
            Operation::ExtendSchema(op) => op.path = path,
            Operation::WrapConfig(op) => op.path = path,
        }
        next
    }

    /// Clone with `f` applied to every templated string field.
    ///
    /// Covers paths, content, template references, script name and command,
    /// package specs, env key and value, command and args, imports,
    /// definitions, wrapper, and every string nested in `params`/`content`
    /// JSON. `condition` and `forEach` are copied unchanged.
    pub fn map_strings<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str) -> String,
    {
        let operation = match &self.operation {
            Operation::CreateFile(op) => Operation::CreateFile(CreateFile {
                path: f(&op.path),
                content: op.content.as_deref().map(&mut f),
                template: op.template.as_deref().map(&mut f),
                overwrite: op.overwrite,
            }),
            Operation::EnhanceFile(op) => Operation::EnhanceFile(EnhanceFile {
                path: f(&op.path),
                modifier: op.modifier.clone(),
                params: map_value(&op.params, &mut f),
                fallback: op.fallback,
            }),
            Operation::MergeJson(op) => Operation::MergeJson(MergeJson {
                path: f(&op.path),
                content: map_value(&op.content, &mut f),
                fallback: op.fallback,
            }),
            Operation::MergeConfig(op) => Operation::MergeConfig(MergeConfig {
                path: f(&op.path),
                strategy: op.strategy.clone(),
                params: map_value(&op.params, &mut f),
                fallback: op.fallback,
            }),
            Operation::InstallPackages(op) => Operation::InstallPackages(InstallPackages {
                packages: op.packages.iter().map(|p| f(p)).collect(),
                dev: op.dev,
                manifest: op.manifest.as_deref().map(&mut f),
            }),
            Operation::AddScript(op) => Operation::AddScript(AddScript {
                name: f(&op.name),
                command: f(&op.command),
                manifest: op.manifest.as_deref().map(&mut f),
            }),
            Operation::AddEnvVar(op) => Operation::AddEnvVar(AddEnvVar {
                key: f(&op.key),
                value: f(&op.value),
                path: op.path.as_deref().map(&mut f),
                description: op.description.as_deref().map(&mut f),
                overwrite: op.overwrite,
            }),
            Operation::RunCommand(op) => Operation::RunCommand(RunCommand {
                command: f(&op.command),
                args: op.args.iter().map(|a| f(a)).collect(),
                working_dir: op.working_dir.as_deref().map(&mut f),
            }),
            Operation::AppendToFile(op) => Operation::AppendToFile(map_insert(op, &mut f)),
            Operation::PrependToFile(op) => Operation::PrependToFile(map_insert(op, &mut f)),
            Operation::AddImport(op) => Operation::AddImport(AddImport {
                path: f(&op.path),
                imports: op.imports.iter().map(|i| f(i)).collect(),
                fallback: op.fallback,
            }),
            Operation::ExtendSchema(op) => Operation::ExtendSchema(ExtendSchema {
                path: f(&op.path),
                imports: op.imports.iter().map(|i| f(i)).collect(),
                definitions: op.definitions.iter().map(|d| f(d)).collect(),
                fallback: op.fallback,
            }),
            Operation::WrapConfig(op) => Operation::WrapConfig(WrapConfig {
                path: f(&op.path),
                wrapper: f(&op.wrapper),
                import: op.import.as_deref().map(&mut f),
                options: map_value(&op.options, &mut f),
                fallback: op.fallback,
            }),
        };

        Self {
            operation,
            condition: self.condition.clone(),
            for_each: self.for_each.clone(),
        }
    }

    /// Short human-readable label, e.g. `CREATE_FILE src/auth.ts`.
    pub fn describe(&self) -> String {
        match (&self.operation, self.target_path()) {
            (Operation::RunCommand(op), _) => format!("{} `{}`", self.kind(), op.command),
            (_, Some(path)) => format!("{} {}", self.kind(), path),
            (_, None) => self.kind().to_string(),
        }
    }
}

fn map_insert<F: FnMut(&str) -> String>(op: &TextInsert, f: &mut F) -> TextInsert {
    TextInsert {
        path: f(&op.path),
        content: f(&op.content),
        fallback: op.fallback,
    }
}

/// Apply `f` to every string leaf (object keys included) of a JSON value.
pub fn map_value<F: FnMut(&str) -> String>(value: &Value, f: &mut F) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        Value::Array(items) => Value::Array(items.iter().map(|v| map_value(v, f)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (f(k), map_value(v, f)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(path: &str, content: &str) -> Action {
        Action::new(Operation::CreateFile(CreateFile {
            path: path.into(),
            content: Some(content.into()),
            template: None,
            overwrite: false,
        }))
    }

    #[test]
    fn deserializes_tagged_json() {
        let action: Action = serde_json::from_value(json!({
            "type": "INSTALL_PACKAGES",
            "packages": ["lib@1.2.0"],
            "forEach": "module.parameters.extras",
            "condition": true
        }))
        .unwrap();

        assert_eq!(action.kind(), ActionKind::InstallPackages);
        assert_eq!(action.for_each.as_deref(), Some("module.parameters.extras"));
        assert_eq!(action.condition, Some(Condition::Literal(true)));
        assert_eq!(action.target_path(), Some("package.json"));
    }

    #[test]
    fn condition_accepts_template_strings() {
        let action: Action = serde_json::from_value(json!({
            "type": "APPEND_TO_FILE",
            "path": "README.md",
            "content": "x",
            "condition": "{{#if module.parameters.docs}}"
        }))
        .unwrap();
        assert!(matches!(action.condition, Some(Condition::Template(ref t)) if t.contains("#if")));
    }

    #[test]
    fn with_path_preserves_other_fields() {
        let original = create("${paths.apps.frontend.components}", "body")
            .with_condition(Condition::Literal(true));
        let clone = original.with_path("apps/web/src/components");

        assert_eq!(clone.target_path(), Some("apps/web/src/components"));
        assert_eq!(clone.condition, original.condition);
        match clone.operation {
            Operation::CreateFile(op) => assert_eq!(op.content.as_deref(), Some("body")),
            other => panic!("unexpected {other:?}"),
        }
        // original untouched
        assert_eq!(original.target_path(), Some("${paths.apps.frontend.components}"));
    }

    #[test]
    fn map_strings_reaches_nested_params() {
        let action = Action::new(Operation::EnhanceFile(EnhanceFile {
            path: "src/{{item}}.ts".into(),
            modifier: "json".into(),
            params: json!({ "name": "{{item}}", "list": ["{{item}}", 3] }),
            fallback: FallbackPolicy::Skip,
        }));

        let mapped = action.map_strings(|s| s.replace("{{item}}", "x"));
        match mapped.operation {
            Operation::EnhanceFile(op) => {
                assert_eq!(op.path, "src/x.ts");
                assert_eq!(op.modifier, "json");
                assert_eq!(op.params, json!({ "name": "x", "list": ["x", 3] }));
                assert_eq!(op.fallback, FallbackPolicy::Skip);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn run_command_path_field_is_working_dir() {
        let action = Action::new(Operation::RunCommand(RunCommand {
            command: "npm".into(),
            args: vec!["install".into()],
            working_dir: None,
        }));
        assert_eq!(action.path_field(), None);
        assert_eq!(action.target_path(), None);
        assert_eq!(action.describe(), "RUN_COMMAND `npm`");

        let scoped = action.with_path("apps/web");
        assert_eq!(scoped.path_field(), Some("apps/web"));
    }

    #[test]
    fn kind_strings_match_serde_tags() {
        for kind in ActionKind::ALL {
            let tag = serde_json::to_value(kind).unwrap();
            assert_eq!(tag, Value::String(kind.as_str().to_string()));
        }
    }
}
