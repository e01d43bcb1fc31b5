//! Package manifest handlers (`INSTALL_PACKAGES`, `ADD_SCRIPT`).
//!
//! Both render their fields and hand a fragment to the `package-json`
//! merger; the merger creates a minimal manifest when none exists.

use std::path::Path;

use serde_json::{Map, Value, json};

use super::{ActionHandler, Collaborators, merger_names, support};
use crate::application::vfs::VirtualFileSystem;
use crate::domain::{Action, ActionOutcome, DEFAULT_MANIFEST, DomainError, ExecutionContext, Operation};
use crate::error::{PlinthError, PlinthResult};

/// A parsed `name@version` spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
}

impl PackageSpec {
    pub const LATEST: &'static str = "latest";

    /// `lib@1.2.0`, `@scope/lib@^2`, `lib` (→ `latest`), `@scope/lib` (→ `latest`).
    ///
    /// The version separator is the last `@` that is not the first character.
    pub fn parse(spec: &str) -> Result<Self, DomainError> {
        let spec = spec.trim();
        let (name, version) = match spec.rfind('@') {
            Some(at) if at > 0 => (&spec[..at], &spec[at + 1..]),
            _ => (spec, ""),
        };

        if name.is_empty() || name == "@" {
            return Err(DomainError::InvalidBlueprint(format!(
                "invalid package spec '{spec}'"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            version: if version.is_empty() {
                Self::LATEST.to_string()
            } else {
                version.to_string()
            },
        })
    }
}

fn mismatch(expected: &'static str, action: &Action) -> PlinthError {
    PlinthError::Internal {
        message: format!("{expected} handler received {}", action.kind()),
    }
}

fn manifest_path(
    c: &Collaborators,
    manifest: Option<&str>,
    ctx: &ExecutionContext,
) -> PlinthResult<crate::domain::RelativePath> {
    support::resolve_path(c, manifest.unwrap_or(DEFAULT_MANIFEST), ctx)
}

pub struct InstallPackagesHandler {
    c: Collaborators,
}

impl InstallPackagesHandler {
    pub fn new(c: Collaborators) -> Self {
        Self { c }
    }
}

impl ActionHandler for InstallPackagesHandler {
    fn handle(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        _target_root: &Path,
        vfs: Option<&mut VirtualFileSystem>,
    ) -> PlinthResult<ActionOutcome> {
        let Operation::InstallPackages(op) = &action.operation else {
            return Err(mismatch("INSTALL_PACKAGES", action));
        };
        let vfs = support::require_vfs(action.kind(), vfs)?;
        let path = manifest_path(&self.c, op.manifest.as_deref(), ctx)?;

        let mut deps = Map::new();
        for raw in &op.packages {
            let spec = PackageSpec::parse(&support::render(&self.c, raw, ctx)?)?;
            deps.insert(spec.name, Value::String(spec.version));
        }

        let section = if op.dev { "devDependencies" } else { "dependencies" };
        let params = json!({ section: deps });

        self.c
            .mergers
            .get(merger_names::PACKAGE_JSON)?
            .execute(&path, &params, ctx, vfs)
    }
}

pub struct AddScriptHandler {
    c: Collaborators,
}

impl AddScriptHandler {
    pub fn new(c: Collaborators) -> Self {
        Self { c }
    }
}

impl ActionHandler for AddScriptHandler {
    fn handle(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        _target_root: &Path,
        vfs: Option<&mut VirtualFileSystem>,
    ) -> PlinthResult<ActionOutcome> {
        let Operation::AddScript(op) = &action.operation else {
            return Err(mismatch("ADD_SCRIPT", action));
        };
        let vfs = support::require_vfs(action.kind(), vfs)?;
        let path = manifest_path(&self.c, op.manifest.as_deref(), ctx)?;

        let name = support::render(&self.c, &op.name, ctx)?;
        let command = support::render(&self.c, &op.command, ctx)?;
        let params = json!({ "scripts": { name: command } });

        self.c
            .mergers
            .get(merger_names::PACKAGE_JSON)?
            .execute(&path, &params, ctx, vfs)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::tests::Harness;
    use super::*;
    use crate::domain::{AddScript, InstallPackages};

    #[test]
    fn parses_package_specs() {
        let cases = [
            ("lib@1.2.0", "lib", "1.2.0"),
            ("lib", "lib", "latest"),
            ("@scope/lib@^2.0.0", "@scope/lib", "^2.0.0"),
            ("@scope/lib", "@scope/lib", "latest"),
            (" lib@ ", "lib", "latest"),
        ];
        for (spec, name, version) in cases {
            let parsed = PackageSpec::parse(spec).unwrap();
            assert_eq!((parsed.name.as_str(), parsed.version.as_str()), (name, version), "{spec}");
        }
        assert!(PackageSpec::parse("").is_err());
        assert!(PackageSpec::parse("@").is_err());
    }

    #[test]
    fn install_targets_dependencies_section() {
        let h = Harness::new();
        let mut vfs = h.vfs();
        let action = Action::new(Operation::InstallPackages(InstallPackages {
            packages: vec!["lib@1.2.0".into(), "@types/node".into()],
            dev: true,
            manifest: None,
        }));

        let outcome = h.run(&action, &mut vfs).unwrap();

        assert_eq!(outcome.files, vec!["package.json"]);
        let calls = h.merger.calls.lock().unwrap();
        assert_eq!(
            calls[0].1,
            json!({ "devDependencies": { "lib": "1.2.0", "@types/node": "latest" } })
        );
    }

    #[test]
    fn add_script_renders_name_and_command() {
        let h = Harness::new();
        let mut vfs = h.vfs();
        let action = Action::new(Operation::AddScript(AddScript {
            name: "{{module.id}}:seed".into(),
            command: "tsx seed.ts".into(),
            manifest: Some("tools/package.json".into()),
        }));

        h.run(&action, &mut vfs).unwrap();

        let calls = h.merger.calls.lock().unwrap();
        assert_eq!(calls[0].0, "tools/package.json");
        assert_eq!(calls[0].1, json!({ "scripts": { "auth:seed": "tsx seed.ts" } }));
    }
}
