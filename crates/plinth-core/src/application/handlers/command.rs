use std::path::Path;

use tracing::info;

use super::{ActionHandler, Collaborators, support};
use crate::application::{ApplicationError, ports::CommandSpec, vfs::VirtualFileSystem};
use crate::domain::{Action, ActionOutcome, ExecutionContext, Operation};
use crate::error::{PlinthError, PlinthResult};

/// `RUN_COMMAND`: run a subprocess in `target_root[/workingDir]`.
///
/// The command runs immediately, before the module's VFS is committed.
pub struct RunCommandHandler {
    c: Collaborators,
}

impl RunCommandHandler {
    pub fn new(c: Collaborators) -> Self {
        Self { c }
    }
}

impl ActionHandler for RunCommandHandler {
    fn handle(
        &self,
        action: &Action,
        ctx: &ExecutionContext,
        target_root: &Path,
        _vfs: Option<&mut VirtualFileSystem>,
    ) -> PlinthResult<ActionOutcome> {
        let Operation::RunCommand(op) = &action.operation else {
            return Err(PlinthError::Internal {
                message: format!("RUN_COMMAND handler received {}", action.kind()),
            });
        };

        let rendered = support::render(&self.c, &op.command, ctx)?;
        let mut words = rendered.split_whitespace().map(str::to_string);
        let program = words.next().ok_or(ApplicationError::CommandFailed {
            command: op.command.clone(),
            reason: "empty command".into(),
        })?;
        let mut args: Vec<String> = words.collect();
        for arg in &op.args {
            args.push(support::render(&self.c, arg, ctx)?);
        }
        let spec = CommandSpec::new(program, args);

        let working_dir = match &op.working_dir {
            Some(dir) => support::resolve_path(&self.c, dir, ctx)?.to_path(target_root),
            None => target_root.to_path_buf(),
        };

        info!(command = %spec, cwd = %working_dir.display(), "Running command");
        let output = self.c.runner.run(&spec, &working_dir)?;

        if !output.success() {
            let code = output
                .status
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            let stderr = output.stderr.trim();
            return Err(ApplicationError::CommandFailed {
                command: spec.to_string(),
                reason: if stderr.is_empty() {
                    format!("exit status {code}")
                } else {
                    format!("exit status {code}: {stderr}")
                },
            }
            .into());
        }

        Ok(ActionOutcome::default().with_message(format!("ran `{spec}`")))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::super::tests::Harness;
    use super::*;
    use crate::application::handlers::HandlerRegistry;
    use crate::application::ports::{CommandOutput, MockCommandRunner};
    use crate::domain::RunCommand;

    fn command(cmd: &str, args: &[&str], working_dir: Option<&str>) -> Action {
        Action::new(Operation::RunCommand(RunCommand {
            command: cmd.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            working_dir: working_dir.map(Into::into),
        }))
    }

    fn dispatch(h: &Harness, action: &Action) -> PlinthResult<ActionOutcome> {
        // No VFS: commands do not need one.
        HandlerRegistry::with_defaults(&h.collaborators).dispatch(action, &h.ctx, Path::new("/w"), None)
    }

    #[test]
    fn runs_with_explicit_working_dir() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|spec, dir| {
                spec.program == "npx"
                    && spec.args == ["prisma", "generate", "--schema=auth"]
                    && dir == Path::new("/w/db")
            })
            .times(1)
            .returning(|_, _| {
                Ok(CommandOutput {
                    status: Some(0),
                    ..Default::default()
                })
            });
        let h = Harness::with_runner(runner);

        let outcome = dispatch(&h, &command("npx prisma generate", &["--schema={{module.id}}"], Some("db")))
            .unwrap();

        assert!(outcome.files.is_empty());
        assert_eq!(outcome.message.as_deref(), Some("ran `npx prisma generate --schema=auth`"));
    }

    #[test]
    fn non_zero_exit_fails_with_stderr() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_, _| {
            Ok(CommandOutput {
                status: Some(1),
                stdout: String::new(),
                stderr: "ENOENT\n".into(),
            })
        });
        let h = Harness::with_runner(runner);

        let err = dispatch(&h, &command("npm install", &[], None)).unwrap_err();
        assert!(err.to_string().contains("exit status 1: ENOENT"), "{err}");
    }
}
