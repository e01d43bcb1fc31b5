use std::path::Path;

use super::{ActionHandler, Collaborators, support};
use crate::application::vfs::VirtualFileSystem;
use crate::domain::{Action, ActionOutcome, DEFAULT_ENV_FILE, ExecutionContext, Operation};
use crate::error::{PlinthError, PlinthResult};

/// `ADD_ENV_VAR`: append `KEY=value` to a dotenv file.
pub struct AddEnvVarHandler {
    c: Collaborators,
}

impl AddEnvVarHandler {
    pub fn new(c: Collaborators) -> Self {
        Self { c }
    }
}

/// Index of the line defining `key`, ignoring comments and `export `.
fn find_key_line(content: &str, key: &str) -> Option<usize> {
    content.lines().position(|line| {
        let line = line.trim_start();
        let line = line.strip_prefix("export ").unwrap_or(line);
        line.split_once('=')
            .is_some_and(|(name, _)| name.trim() == key)
    })
}

impl ActionHandler for AddEnvVarHandler {
    fn handle(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        _target_root: &Path,
        vfs: Option<&mut VirtualFileSystem>,
    ) -> PlinthResult<ActionOutcome> {
        let Operation::AddEnvVar(op) = &action.operation else {
            return Err(PlinthError::Internal {
                message: format!("ADD_ENV_VAR handler received {}", action.kind()),
            });
        };
        let vfs = support::require_vfs(action.kind(), vfs)?;
        let path = support::resolve_path(
            &self.c,
            op.path.as_deref().unwrap_or(DEFAULT_ENV_FILE),
            ctx,
        )?;

        let key = support::render(&self.c, &op.key, ctx)?;
        let value = support::render(&self.c, &op.value, ctx)?;
        let entry = format!("{key}={value}");

        let existing = match vfs.read_file(path.as_str()) {
            Ok(content) => content,
            Err(e) if e.is_not_found() => String::new(),
            Err(e) => return Err(e),
        };

        let updated = match find_key_line(&existing, &key) {
            Some(_) if !op.overwrite => {
                return Ok(ActionOutcome::skipped(format!(
                    "{key} already defined in {path}"
                )));
            }
            Some(index) => {
                let mut lines: Vec<&str> = existing.lines().collect();
                lines[index] = &entry;
                let mut out = lines.join("\n");
                if existing.ends_with('\n') {
                    out.push('\n');
                }
                out
            }
            None => {
                let mut out = existing;
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                if let Some(description) = &op.description {
                    let description = support::render(&self.c, description, ctx)?;
                    out.push_str(&format!("# {description}\n"));
                }
                out.push_str(&entry);
                out.push('\n');
                out
            }
        };

        let written = vfs.write_file(path.as_str(), updated)?;
        Ok(ActionOutcome::touched(written.into_string()))
    }
}
