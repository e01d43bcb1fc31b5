//! Content mergers the built-in handlers delegate to by name.
//!
//! | name               | merger               | used by                            |
//! |--------------------|----------------------|------------------------------------|
//! | `json`             | [`JsonMerger`]       | `MERGE_JSON`, `MERGE_CONFIG` .json |
//! | `yaml`             | [`YamlMerger`]       | `MERGE_CONFIG` .yaml/.yml          |
//! | `package-json`     | [`PackageJsonMerger`]| `INSTALL_PACKAGES`, `ADD_SCRIPT`   |
//! | `code-export-wrap` | [`ExportWrapMerger`] | `WRAP_CONFIG`                      |
//!
//! Every merger reads and writes through the VFS it is given. A missing file
//! is treated as empty; the handler has already applied the fallback policy.

mod export_wrap;
mod json;
mod package_json;
mod yaml;

use std::sync::Arc;

use plinth_core::{
    application::{ApplicationError, MergerRegistry, VirtualFileSystem, merger_names},
    domain::RelativePath,
    error::{PlinthError, PlinthResult},
};
use serde_json::Value;

pub use export_wrap::ExportWrapMerger;
pub use json::JsonMerger;
pub use package_json::PackageJsonMerger;
pub use yaml::YamlMerger;

/// Registry with every built-in merger under its conventional name.
pub fn default_mergers() -> MergerRegistry {
    MergerRegistry::new()
        .with(merger_names::JSON, Arc::new(JsonMerger::new()))
        .with(merger_names::YAML, Arc::new(YamlMerger::new()))
        .with(merger_names::PACKAGE_JSON, Arc::new(PackageJsonMerger::new()))
        .with(merger_names::CODE_EXPORT_WRAP, Arc::new(ExportWrapMerger::new()))
}

/// Current content, or `None` when the file does not exist yet.
pub(crate) fn read_existing(
    vfs: &VirtualFileSystem,
    path: &RelativePath,
) -> PlinthResult<Option<String>> {
    match vfs.read_file(path.as_str()) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

pub(crate) fn merge_failed(path: &RelativePath, reason: impl Into<String>) -> PlinthError {
    ApplicationError::MergeFailed {
        path: path.to_string(),
        reason: reason.into(),
    }
    .into()
}

/// Recursive merge of `patch` into `base`.
///
/// Objects merge key by key, arrays gain the patch elements they do not
/// already contain, anything else is replaced by the patch.
pub(crate) fn deep_merge(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(base), Value::Array(patch)) => {
            for item in patch {
                if !base.contains(item) {
                    base.push(item.clone());
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}
