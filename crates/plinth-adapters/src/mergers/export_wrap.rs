//! Wrap a module's default export in a function call.
//!
//! ```text
//! export default { reactStrictMode: true };
//!   ─► import withAuth from "auth/next";
//!      export default withAuth({ reactStrictMode: true }, {"basePath":"/auth"});
//! ```

use plinth_core::{
    application::{ports::ContentMerger, VirtualFileSystem},
    domain::{ActionOutcome, ExecutionContext, RelativePath},
    error::PlinthResult,
};
use serde_json::Value;
use tracing::debug;

use super::{merge_failed, read_existing};

const EXPORT_MARKERS: &[&str] = &["export default ", "module.exports = "];

/// Params: `wrapper` (required), `import` (line to add), `options` (JSON
/// passed as the second argument).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportWrapMerger;

impl ExportWrapMerger {
    pub fn new() -> Self {
        Self
    }
}

/// Byte offset of the last export marker that starts a line, and its length.
fn find_export(source: &str) -> Option<(usize, usize)> {
    EXPORT_MARKERS
        .iter()
        .filter_map(|marker| {
            source
                .match_indices(marker)
                .filter(|(at, _)| *at == 0 || source[..*at].ends_with('\n'))
                .map(|(at, _)| (at, marker.len()))
                .last()
        })
        .max_by_key(|(at, _)| *at)
}

fn wrap(source: &str, wrapper: &str, options: Option<&str>) -> Option<(String, bool)> {
    let (at, marker_len) = find_export(source)?;
    let expr_start = at + marker_len;
    let expr = source[expr_start..].trim_end();
    let expr = expr.strip_suffix(';').unwrap_or(expr).trim_end();

    if expr.starts_with(&format!("{wrapper}(")) {
        return Some((source.to_string(), false));
    }

    let call = match options {
        Some(options) => format!("{wrapper}({expr}, {options})"),
        None => format!("{wrapper}({expr})"),
    };
    let mut out = String::with_capacity(source.len() + call.len());
    out.push_str(&source[..expr_start]);
    out.push_str(&call);
    out.push_str(";\n");
    Some((out, true))
}

/// Insert `line` after the last import/require line, or at the top.
fn add_import(source: &str, line: &str) -> String {
    if source.lines().any(|l| l.trim() == line.trim()) {
        return source.to_string();
    }

    let lines: Vec<&str> = source.lines().collect();
    let last_import = lines.iter().rposition(|l| {
        let l = l.trim_start();
        l.starts_with("import ") || (l.starts_with("const ") && l.contains("require("))
    });

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 2);
    match last_import {
        Some(i) => {
            out.extend(&lines[..=i]);
            out.push(line);
            out.extend(&lines[i + 1..]);
        }
        None => {
            out.push(line);
            out.push("");
            out.extend(&lines);
        }
    }
    let mut joined = out.join("\n");
    if source.ends_with('\n') {
        joined.push('\n');
    }
    joined
}

impl ContentMerger for ExportWrapMerger {
    fn execute(
        &self,
        path: &RelativePath,
        params: &Value,
        _ctx: &ExecutionContext,
        vfs: &mut VirtualFileSystem,
    ) -> PlinthResult<ActionOutcome> {
        let wrapper = params
            .get("wrapper")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .ok_or_else(|| merge_failed(path, "missing 'wrapper' parameter"))?;
        let import = params.get("import").and_then(Value::as_str);
        let options = match params.get("options") {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.to_string()),
        };

        let source = read_existing(vfs, path)?.unwrap_or_default();
        let (wrapped, changed) = wrap(&source, wrapper, options.as_deref())
            .ok_or_else(|| merge_failed(path, "no `export default` or `module.exports =` found"))?;

        let content = match import {
            Some(import) => add_import(&wrapped, import),
            None => wrapped,
        };

        if content == source {
            debug!(path = %path, wrapper, "Export already wrapped");
            return Ok(ActionOutcome::skipped(format!("{path} already wrapped with {wrapper}")));
        }

        let written = vfs.write_file(path.as_str(), content)?;
        debug!(path = %written, wrapper, changed, "Wrapped default export");
        Ok(ActionOutcome::touched(written.into_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::tests::{ctx, rel, vfs_with};
    use super::*;

    #[test]
    fn wraps_esm_default_export_with_options_and_import() {
        let (_fs, mut vfs) = vfs_with(&[(
            "next.config.mjs",
            "import path from \"node:path\";\n\nexport default {\n  reactStrictMode: true,\n};\n",
        )]);

        ExportWrapMerger::new()
            .execute(
                &rel("next.config.mjs"),
                &json!({
                    "wrapper": "withAuth",
                    "import": "import withAuth from \"auth/next\";",
                    "options": { "basePath": "/auth" },
                }),
                &ctx(),
                &mut vfs,
            )
            .unwrap();

        assert_eq!(
            vfs.read_file("next.config.mjs").unwrap(),
            "import path from \"node:path\";\nimport withAuth from \"auth/next\";\n\nexport default withAuth({\n  reactStrictMode: true,\n}, {\"basePath\":\"/auth\"});\n"
        );
    }

    #[test]
    fn wraps_commonjs_export_and_is_idempotent() {
        let (_fs, mut vfs) = vfs_with(&[("app.config.js", "module.exports = config;")]);
        let merger = ExportWrapMerger::new();
        let params = json!({ "wrapper": "withPlugin", "import": "const withPlugin = require(\"plugin\");" });

        let first = merger
            .execute(&rel("app.config.js"), &params, &ctx(), &mut vfs)
            .unwrap();
        let second = merger
            .execute(&rel("app.config.js"), &params, &ctx(), &mut vfs)
            .unwrap();

        assert!(!first.skipped);
        assert!(second.skipped);
        assert_eq!(
            vfs.read_file("app.config.js").unwrap(),
            "const withPlugin = require(\"plugin\");\n\nmodule.exports = withPlugin(config);\n"
        );
    }

    #[test]
    fn missing_export_or_wrapper_fails() {
        let (_fs, mut vfs) = vfs_with(&[("x.js", "const a = 1;\n")]);
        let merger = ExportWrapMerger::new();

        assert!(merger
            .execute(&rel("x.js"), &json!({ "wrapper": "w" }), &ctx(), &mut vfs)
            .is_err());
        assert!(merger
            .execute(&rel("x.js"), &json!({}), &ctx(), &mut vfs)
            .is_err());
    }
}
