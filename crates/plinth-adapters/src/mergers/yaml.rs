//! Deep YAML merge, sharing the JSON merge rules.

use plinth_core::{
    application::{ports::ContentMerger, VirtualFileSystem},
    domain::{ActionOutcome, ExecutionContext, RelativePath},
    error::PlinthResult,
};
use serde_json::Value;
use tracing::debug;

use super::{deep_merge, merge_failed, read_existing};

/// Merges the params object into a YAML mapping.
///
/// Comments and key order of the original document are not preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlMerger;

impl YamlMerger {
    pub fn new() -> Self {
        Self
    }
}

impl ContentMerger for YamlMerger {
    fn execute(
        &self,
        path: &RelativePath,
        params: &Value,
        _ctx: &ExecutionContext,
        vfs: &mut VirtualFileSystem,
    ) -> PlinthResult<ActionOutcome> {
        let existing = read_existing(vfs, path)?.unwrap_or_default();
        let mut document: Value = if existing.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_yaml::from_str(&existing)
                .map_err(|e| merge_failed(path, format!("invalid YAML: {e}")))?
        };

        if !params.is_object() || !document.is_object() {
            return Err(merge_failed(path, "both sides of a YAML merge must be mappings"));
        }

        deep_merge(&mut document, params);
        let out = serde_yaml::to_string(&document)
            .map_err(|e| merge_failed(path, format!("cannot serialize YAML: {e}")))?;
        let written = vfs.write_file(path.as_str(), out)?;
        debug!(path = %written, "Merged YAML");
        Ok(ActionOutcome::touched(written.into_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::tests::{ctx, rel, vfs_with};
    use super::*;

    #[test]
    fn merges_nested_mappings() {
        let (_fs, mut vfs) = vfs_with(&[(
            "docker-compose.yml",
            "services:\n  web:\n    image: web:1\n    ports:\n      - \"3000:3000\"\n",
        )]);

        YamlMerger::new()
            .execute(
                &rel("docker-compose.yml"),
                &json!({ "services": { "db": { "image": "postgres:16" }, "web": { "ports": ["3000:3000", "9229:9229"] } } }),
                &ctx(),
                &mut vfs,
            )
            .unwrap();

        let merged: Value =
            serde_yaml::from_str(&vfs.read_file("docker-compose.yml").unwrap()).unwrap();
        assert_eq!(
            merged,
            json!({ "services": {
                "web": { "image": "web:1", "ports": ["3000:3000", "9229:9229"] },
                "db": { "image": "postgres:16" }
            } })
        );
    }

    #[test]
    fn scalar_document_is_rejected() {
        let (_fs, mut vfs) = vfs_with(&[("x.yaml", "just text")]);
        let err = YamlMerger::new()
            .execute(&rel("x.yaml"), &json!({ "a": 1 }), &ctx(), &mut vfs)
            .unwrap_err();
        assert!(err.to_string().contains("mappings"));
    }
}
