//! Helpers shared by the built-in handlers.

use crate::application::{ApplicationError, handlers::Collaborators, vfs::VirtualFileSystem};
use crate::domain::{
    ActionKind, ActionOutcome, DomainError, ExecutionContext, FallbackPolicy, RelativePath,
    path_key,
};
use crate::error::{PlinthError, PlinthResult};

/// Render `{{…}}` placeholders; text without any is returned as-is.
pub(super) fn render(c: &Collaborators, text: &str, ctx: &ExecutionContext) -> PlinthResult<String> {
    if text.contains("{{") {
        c.evaluator.render(text, ctx)
    } else {
        Ok(text.to_string())
    }
}

/// Render a path template and resolve any `${paths.<key>}` left after
/// expansion. Each remaining key must resolve to exactly one path.
pub(super) fn resolve_path(
    c: &Collaborators,
    raw: &str,
    ctx: &ExecutionContext,
) -> PlinthResult<RelativePath> {
    let mut path = render(c, raw, ctx)?;

    let keys: Vec<String> = path_key::find_key_references(&path)
        .into_iter()
        .map(|r| r.key.to_string())
        .collect();

    for key in keys {
        let resolved = c.resolver.resolve_key(&key, ctx);
        let replacement = match resolved.as_slice() {
            [] => {
                return Err(DomainError::UnresolvedPathKey {
                    key,
                    path: raw.to_string(),
                }
                .into());
            }
            [single] if single.is_root() => ".".to_string(),
            [single] => single.to_string(),
            many => {
                return Err(DomainError::AmbiguousPathKey {
                    key,
                    count: many.len(),
                }
                .into());
            }
        };
        path = path_key::substitute_key(&path, &key, &replacement);
    }

    Ok(RelativePath::parse(&path)?)
}

pub(super) fn require_vfs(
    kind: ActionKind,
    vfs: Option<&mut VirtualFileSystem>,
) -> PlinthResult<&mut VirtualFileSystem> {
    vfs.ok_or_else(|| ApplicationError::VfsRequired { kind }.into())
}

/// What to do about an existing target file.
pub(super) enum Target {
    Existing(String),
    /// Missing, but the policy says create it.
    Create,
    /// Missing and the policy says skip.
    Skip(ActionOutcome),
}

/// Read `path`, applying `fallback` when it is missing.
pub(super) fn read_target(
    vfs: &VirtualFileSystem,
    path: &RelativePath,
    fallback: FallbackPolicy,
) -> PlinthResult<Target> {
    match vfs.read_file(path.as_str()) {
        Ok(content) => Ok(Target::Existing(content)),
        Err(e) if e.is_not_found() => match fallback {
            FallbackPolicy::Error => Err(e),
            FallbackPolicy::Skip => Ok(Target::Skip(ActionOutcome::skipped(format!(
                "{path} not found; skipped"
            )))),
            FallbackPolicy::Create => Ok(Target::Create),
        },
        Err(e) => Err(e),
    }
}

/// Existence check with the same fallback semantics, for delegating handlers
/// whose merger reads the file itself.
pub(super) fn check_target(
    vfs: &VirtualFileSystem,
    path: &RelativePath,
    fallback: FallbackPolicy,
) -> PlinthResult<Option<ActionOutcome>> {
    if vfs.file_exists(path.as_str()) {
        return Ok(None);
    }
    match fallback {
        FallbackPolicy::Error => Err(PlinthError::not_found(path.to_string())),
        FallbackPolicy::Skip => Ok(Some(ActionOutcome::skipped(format!(
            "{path} not found; skipped"
        )))),
        FallbackPolicy::Create => Ok(None),
    }
}

/// Lines that look like import statements.
pub(super) fn is_import_line(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("import ") || line.starts_with("import{") || line.starts_with("use ")
}

/// Insert every import not already present after the last existing import
/// line (or at the top). Returns `None` when nothing was missing.
pub(super) fn insert_imports(content: &str, imports: &[String]) -> Option<String> {
    let existing: Vec<&str> = content.lines().map(str::trim).collect();
    let missing: Vec<&str> = imports
        .iter()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty() && !existing.contains(i))
        .collect();

    if missing.is_empty() {
        return None;
    }

    let mut lines: Vec<&str> = content.lines().collect();
    let at = lines
        .iter()
        .rposition(|l| is_import_line(l))
        .map_or(0, |i| i + 1);

    for (offset, import) in missing.into_iter().enumerate() {
        lines.insert(at + offset, import);
    }

    let mut out = lines.join("\n");
    if content.is_empty() || content.ends_with('\n') {
        out.push('\n');
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_go_after_the_last_import() {
        let src = "import a from 'a';\nimport b from 'b';\n\nconst x = 1;\n";
        let out = insert_imports(src, &["import c from 'c';".into(), "import a from 'a';".into()])
            .unwrap();
        assert_eq!(
            out,
            "import a from 'a';\nimport b from 'b';\nimport c from 'c';\n\nconst x = 1;\n"
        );
    }

    #[test]
    fn imports_go_to_the_top_without_existing_ones() {
        let out = insert_imports("const x = 1;", &["import z from 'z';".into()]).unwrap();
        assert_eq!(out, "import z from 'z';\nconst x = 1;");
    }

    #[test]
    fn nothing_missing_is_none() {
        assert!(insert_imports("import a from 'a';\n", &["import a from 'a';".into()]).is_none());
    }
}
