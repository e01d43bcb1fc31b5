//! `package.json` manifest edits.

use plinth_core::{
    application::{ports::ContentMerger, VirtualFileSystem},
    domain::{ActionOutcome, ExecutionContext, RelativePath},
    error::PlinthResult,
};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::{json::JsonMerger, merge_failed, read_existing};

/// Sections a fragment may touch.
const SECTIONS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "scripts",
];

const INITIAL_VERSION: &str = "0.1.0";

/// Merges `{ "<section>": { name: value } }` fragments into a manifest.
///
/// Entries in a section replace existing entries of the same name. When the
/// manifest does not exist yet a minimal one is created.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageJsonMerger;

impl PackageJsonMerger {
    pub fn new() -> Self {
        Self
    }

    /// Name for a freshly created manifest: its directory, else the module
    /// anchor, else the project.
    fn package_name(path: &RelativePath, ctx: &ExecutionContext) -> String {
        if let Some((dir, _)) = path.as_str().rsplit_once('/') {
            return dir.rsplit('/').next().unwrap_or(dir).to_string();
        }
        let anchor = ctx.context_root();
        if anchor.is_root() {
            ctx.project().name.clone()
        } else {
            anchor.file_name().to_string()
        }
    }
}

impl ContentMerger for PackageJsonMerger {
    fn execute(
        &self,
        path: &RelativePath,
        params: &Value,
        ctx: &ExecutionContext,
        vfs: &mut VirtualFileSystem,
    ) -> PlinthResult<ActionOutcome> {
        let Some(fragment) = params.as_object() else {
            return Err(merge_failed(path, "package fragment must be an object"));
        };

        let mut manifest = match read_existing(vfs, path)? {
            Some(content) => JsonMerger::parse(path, &content)?,
            None => {
                let name = Self::package_name(path, ctx);
                info!(path = %path, name = %name, "Creating package manifest");
                json!({ "name": name, "version": INITIAL_VERSION })
            }
        };
        let Some(root) = manifest.as_object_mut() else {
            return Err(merge_failed(path, "package manifest is not a JSON object"));
        };

        for (section, entries) in fragment {
            if !SECTIONS.contains(&section.as_str()) {
                return Err(merge_failed(
                    path,
                    format!("unsupported manifest section '{section}'"),
                ));
            }
            let Some(entries) = entries.as_object() else {
                return Err(merge_failed(path, format!("'{section}' must be an object")));
            };

            let target = root
                .entry(section.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            let Some(target) = target.as_object_mut() else {
                return Err(merge_failed(
                    path,
                    format!("existing '{section}' is not an object"),
                ));
            };
            for (name, value) in entries {
                target.insert(name.clone(), value.clone());
            }
            debug!(path = %path, section, count = entries.len(), "Updated manifest section");
        }

        let written = vfs.write_file(path.as_str(), JsonMerger::serialize(path, &manifest)?)?;
        Ok(ActionOutcome::touched(written.into_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use plinth_core::domain::{ModuleInfo, ProjectMetadata};

    use super::super::tests::{ctx, rel, vfs_with};
    use super::*;
    use crate::filesystem::MemoryFilesystem;

    fn manifest(vfs: &VirtualFileSystem, path: &str) -> Value {
        serde_json::from_str(&vfs.read_file(path).unwrap()).unwrap()
    }

    #[test]
    fn updates_existing_sections() {
        let (_fs, mut vfs) = vfs_with(&[(
            "package.json",
            r#"{ "name": "shop", "dependencies": { "lib": "1.0.0", "react": "^18" } }"#,
        )]);

        PackageJsonMerger::new()
            .execute(
                &rel("package.json"),
                &json!({ "dependencies": { "lib": "1.2.0" }, "scripts": { "dev": "vite" } }),
                &ctx(),
                &mut vfs,
            )
            .unwrap();

        assert_eq!(
            manifest(&vfs, "package.json"),
            json!({
                "name": "shop",
                "dependencies": { "lib": "1.2.0", "react": "^18" },
                "scripts": { "dev": "vite" }
            })
        );
    }

    #[test]
    fn creates_minimal_manifest() {
        let (_fs, mut vfs) = vfs_with(&[]);
        let merger = PackageJsonMerger::new();

        merger
            .execute(
                &rel("package.json"),
                &json!({ "devDependencies": { "vitest": "latest" } }),
                &ctx(),
                &mut vfs,
            )
            .unwrap();
        merger
            .execute(
                &rel("tools/package.json"),
                &json!({ "scripts": { "seed": "tsx seed.ts" } }),
                &ctx(),
                &mut vfs,
            )
            .unwrap();

        assert_eq!(
            manifest(&vfs, "package.json"),
            json!({ "name": "shop", "version": "0.1.0", "devDependencies": { "vitest": "latest" } })
        );
        assert_eq!(manifest(&vfs, "tools/package.json")["name"], "tools");
    }

    #[test]
    fn package_anchor_names_new_manifest() {
        let ctx = ExecutionContext::new(
            ProjectMetadata::monorepo("acme", "/acme", Vec::new()),
            ModuleInfo::new("auth", "core").with_target_package(rel("packages/auth")),
        );
        let mut vfs = VirtualFileSystem::for_context(&ctx, Arc::new(MemoryFilesystem::new()));

        PackageJsonMerger::new()
            .execute(&rel("package.json"), &json!({}), &ctx, &mut vfs)
            .unwrap();

        assert_eq!(manifest(&vfs, "package.json")["name"], "auth");
    }

    #[test]
    fn rejects_unknown_sections() {
        let (_fs, mut vfs) = vfs_with(&[]);
        let err = PackageJsonMerger::new()
            .execute(&rel("package.json"), &json!({ "main": "x" }), &ctx(), &mut vfs)
            .unwrap_err();
        assert!(err.to_string().contains("unsupported manifest section 'main'"));
    }
}
