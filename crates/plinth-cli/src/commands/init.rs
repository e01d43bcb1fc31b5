//! `plinth init`: create a default configuration file.

use std::path::Path;

use crate::{
    cli::{GlobalArgs, InitArgs},
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

/// Write the built-in defaults to `--config`, or the default location.
pub fn execute(args: InitArgs, global: GlobalArgs, output: OutputManager) -> CliResult<()> {
    let config_path = global.config.clone().unwrap_or_else(AppConfig::config_path);

    if config_path.exists() && !args.force {
        match confirm_overwrite(&config_path, &global)? {
            Some(true) => {}
            Some(false) => return Err(CliError::Cancelled),
            None => {
                output.warning(&format!(
                    "Config already exists at {}  (use --force to overwrite)",
                    config_path.display(),
                ))?;
                return Ok(());
            }
        }
    }

    let toml = toml::to_string_pretty(&AppConfig::default()).map_err(|e| CliError::ConfigError {
        message: format!("Failed to serialise default config: {e}"),
        source: Some(Box::new(e)),
    })?;

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_cli_context(|| {
            format!("Failed to create config directory '{}'", parent.display())
        })?;
    }

    std::fs::write(&config_path, &toml)
        .with_cli_context(|| format!("Failed to write config to '{}'", config_path.display()))?;

    output.success(&format!(
        "Configuration created at {}",
        config_path.display(),
    ))?;

    Ok(())
}

/// Ask before replacing an existing file. `None` when nobody can be asked:
/// no terminal on stdin, `--quiet`, or a build without prompts.
#[cfg(feature = "interactive")]
fn confirm_overwrite(path: &Path, global: &GlobalArgs) -> CliResult<Option<bool>> {
    use std::io::IsTerminal as _;

    if global.quiet || !std::io::stdin().is_terminal() {
        return Ok(None);
    }
    dialoguer::Confirm::new()
        .with_prompt(format!("Overwrite {}?", path.display()))
        .default(false)
        .interact()
        .map(Some)
        .map_err(|e| CliError::InvalidInput {
            message: "could not read the answer".into(),
            source: Some(Box::new(e)),
        })
}

#[cfg(not(feature = "interactive"))]
fn confirm_overwrite(_path: &Path, _global: &GlobalArgs) -> CliResult<Option<bool>> {
    Ok(None)
}
