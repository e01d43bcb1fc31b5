//! Subprocess adapter.

use std::path::Path;
use std::process::Command;

use plinth_core::{
    application::{ApplicationError, CommandOutput, CommandRunner, CommandSpec},
    error::PlinthResult,
};
use tracing::{debug, instrument};

/// Runs commands with `std::process::Command`, always with an explicit
/// `current_dir`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessCommandRunner;

impl ProcessCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessCommandRunner {
    #[instrument(skip_all, fields(command = %command, dir = %working_dir.display()))]
    fn run(&self, command: &CommandSpec, working_dir: &Path) -> PlinthResult<CommandOutput> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .current_dir(working_dir)
            .output()
            .map_err(|e| ApplicationError::CommandFailed {
                command: command.to_string(),
                reason: format!("failed to start in {}: {e}", working_dir.display()),
            })?;

        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(status = ?result.status, "Command finished");
        Ok(result)
    }
}
