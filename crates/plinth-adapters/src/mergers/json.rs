//! Deep JSON merge.

use plinth_core::{
    application::{ports::ContentMerger, VirtualFileSystem},
    domain::{ActionOutcome, ExecutionContext, RelativePath},
    error::PlinthResult,
};
use serde_json::Value;
use tracing::debug;

use super::{deep_merge, merge_failed, read_existing};

/// Merges the params object into a JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMerger;

impl JsonMerger {
    pub fn new() -> Self {
        Self
    }

    /// Parse a JSON document; blank content is an empty object.
    pub(crate) fn parse(path: &RelativePath, content: &str) -> PlinthResult<Value> {
        if content.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(content).map_err(|e| merge_failed(path, format!("invalid JSON: {e}")))
    }

    /// Pretty-print with a trailing newline.
    pub(crate) fn serialize(path: &RelativePath, value: &Value) -> PlinthResult<String> {
        let mut out = serde_json::to_string_pretty(value)
            .map_err(|e| merge_failed(path, format!("cannot serialize JSON: {e}")))?;
        out.push('\n');
        Ok(out)
    }
}

impl ContentMerger for JsonMerger {
    fn execute(
        &self,
        path: &RelativePath,
        params: &Value,
        _ctx: &ExecutionContext,
        vfs: &mut VirtualFileSystem,
    ) -> PlinthResult<ActionOutcome> {
        let existing = read_existing(vfs, path)?.unwrap_or_default();
        let mut document = Self::parse(path, &existing)?;

        if !params.is_object() {
            return Err(merge_failed(path, "merge content must be a JSON object"));
        }
        if !document.is_object() {
            return Err(merge_failed(path, "existing document is not a JSON object"));
        }

        deep_merge(&mut document, params);
        let written = vfs.write_file(path.as_str(), Self::serialize(path, &document)?)?;
        debug!(path = %written, "Merged JSON");
        Ok(ActionOutcome::touched(written.into_string()))
    }
}
