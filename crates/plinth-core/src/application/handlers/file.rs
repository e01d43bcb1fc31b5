//! Plain-text file handlers.

use std::path::Path;

use tracing::debug;

use super::{
    ActionHandler, Collaborators,
    support::{self, Target},
};
use crate::application::vfs::VirtualFileSystem;
use crate::domain::{
    Action, ActionOutcome, DomainError, ExecutionContext, Operation, RelativePath,
};
use crate::error::{PlinthError, PlinthResult};

fn mismatch(expected: &'static str, action: &Action) -> PlinthError {
    PlinthError::Internal {
        message: format!("{expected} handler received {}", action.kind()),
    }
}

// ============================================================================
// CREATE_FILE
// ============================================================================

pub struct CreateFileHandler {
    c: Collaborators,
}

impl CreateFileHandler {
    pub fn new(c: Collaborators) -> Self {
        Self { c }
    }

    fn load_template(&self, template: &str, ctx: &ExecutionContext) -> PlinthResult<String> {
        let root = ctx.template_root().ok_or_else(|| PlinthError::Configuration {
            message: format!("template '{template}' referenced but no template root is set"),
        })?;
        let relative = RelativePath::parse(template)?;
        self.c.fs.read_to_string(&relative.to_path(root))
    }
}

impl ActionHandler for CreateFileHandler {
    fn handle(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        _target_root: &Path,
        vfs: Option<&mut VirtualFileSystem>,
    ) -> PlinthResult<ActionOutcome> {
        let Operation::CreateFile(op) = &action.operation else {
            return Err(mismatch("CREATE_FILE", action));
        };
        let vfs = support::require_vfs(action.kind(), vfs)?;
        let path = support::resolve_path(&self.c, &op.path, ctx)?;

        if !op.overwrite && vfs.file_exists(path.as_str()) {
            return Ok(ActionOutcome::skipped(format!(
                "{path} already exists; set overwrite = true to replace it"
            )));
        }

        let raw = match (&op.content, &op.template) {
            (Some(content), _) => content.clone(),
            (None, Some(template)) => {
                let name = support::render(&self.c, template, ctx)?;
                self.load_template(&name, ctx)?
            }
            (None, None) => {
                return Err(DomainError::MissingRequiredField { field: "content" }.into());
            }
        };
        let content = support::render(&self.c, &raw, ctx)?;

        let written = vfs.write_file(path.as_str(), content)?;
        debug!(path = %written, "File created");
        Ok(ActionOutcome::touched(written.into_string()))
    }
}

// ============================================================================
// APPEND_TO_FILE / PREPEND_TO_FILE
// ============================================================================

pub struct TextInsertHandler {
    c: Collaborators,
    prepend: bool,
}

impl TextInsertHandler {
    pub fn append(c: Collaborators) -> Self {
        Self { c, prepend: false }
    }

    pub fn prepend(c: Collaborators) -> Self {
        Self { c, prepend: true }
    }
}

impl ActionHandler for TextInsertHandler {
    fn handle(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        _target_root: &Path,
        vfs: Option<&mut VirtualFileSystem>,
    ) -> PlinthResult<ActionOutcome> {
        let op = match &action.operation {
            Operation::AppendToFile(op) | Operation::PrependToFile(op) => op,
            _ => return Err(mismatch("APPEND/PREPEND", action)),
        };
        let vfs = support::require_vfs(action.kind(), vfs)?;
        let path = support::resolve_path(&self.c, &op.path, ctx)?;

        let existing = match support::read_target(vfs, &path, op.fallback)? {
            Target::Existing(content) => content,
            Target::Create => String::new(),
            Target::Skip(outcome) => return Ok(outcome),
        };
        let text = support::render(&self.c, &op.content, ctx)?;

        let updated = if self.prepend {
            let mut out = text;
            if !existing.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&existing);
            out
        } else {
            let mut out = existing;
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&text);
            out
        };

        let written = vfs.write_file(path.as_str(), updated)?;
        Ok(ActionOutcome::touched(written.into_string()))
    }
}

// ============================================================================
// ADD_IMPORT
// ============================================================================

pub struct AddImportHandler {
    c: Collaborators,
}

impl AddImportHandler {
    pub fn new(c: Collaborators) -> Self {
        Self { c }
    }
}

impl ActionHandler for AddImportHandler {
    fn handle(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        _target_root: &Path,
        vfs: Option<&mut VirtualFileSystem>,
    ) -> PlinthResult<ActionOutcome> {
        let Operation::AddImport(op) = &action.operation else {
            return Err(mismatch("ADD_IMPORT", action));
        };
        let vfs = support::require_vfs(action.kind(), vfs)?;
        let path = support::resolve_path(&self.c, &op.path, ctx)?;

        let existing = match support::read_target(vfs, &path, op.fallback)? {
            Target::Existing(content) => content,
            Target::Create => String::new(),
            Target::Skip(outcome) => return Ok(outcome),
        };
        let imports = op
            .imports
            .iter()
            .map(|i| support::render(&self.c, i, ctx))
            .collect::<PlinthResult<Vec<_>>>()?;

        match support::insert_imports(&existing, &imports) {
            Some(updated) => {
                let written = vfs.write_file(path.as_str(), updated)?;
                Ok(ActionOutcome::touched(written.into_string()))
            }
            None => Ok(ActionOutcome::skipped(format!("{path}: imports already present"))),
        }
    }
}

// ============================================================================
// EXTEND_SCHEMA
// ============================================================================

pub struct ExtendSchemaHandler {
    c: Collaborators,
}

impl ExtendSchemaHandler {
    pub fn new(c: Collaborators) -> Self {
        Self { c }
    }
}

impl ActionHandler for ExtendSchemaHandler {
    fn handle(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        _target_root: &Path,
        vfs: Option<&mut VirtualFileSystem>,
    ) -> PlinthResult<ActionOutcome> {
        let Operation::ExtendSchema(op) = &action.operation else {
            return Err(mismatch("EXTEND_SCHEMA", action));
        };
        let vfs = support::require_vfs(action.kind(), vfs)?;
        let path = support::resolve_path(&self.c, &op.path, ctx)?;

        let existing = match support::read_target(vfs, &path, op.fallback)? {
            Target::Existing(content) => content,
            Target::Create => String::new(),
            Target::Skip(outcome) => return Ok(outcome),
        };

        let render_all = |items: &[String]| {
            items
                .iter()
                .map(|s| support::render(&self.c, s, ctx))
                .collect::<PlinthResult<Vec<_>>>()
        };
        let imports = render_all(&op.imports)?;
        let definitions = render_all(&op.definitions)?;

        let mut updated = support::insert_imports(&existing, &imports).unwrap_or(existing);
        let mut added = 0;
        for definition in definitions {
            let definition = definition.trim();
            if definition.is_empty() || updated.contains(definition) {
                continue;
            }
            if !updated.is_empty() {
                if !updated.ends_with('\n') {
                    updated.push('\n');
                }
                updated.push('\n');
            }
            updated.push_str(definition);
            updated.push('\n');
            added += 1;
        }

        let written = vfs.write_file(path.as_str(), updated)?;
        Ok(ActionOutcome::touched(written.into_string())
            .with_message(format!("{added} definition(s) added")))
    }
}
