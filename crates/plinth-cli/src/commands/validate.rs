//! `plinth validate`: batch-validate every module without writing.

use plinth_core::application::RunOptions;
use plinth_core::domain::ValidationIssue;
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    cli::ValidateArgs,
    commands::support,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// Validation outcome for one module.
#[derive(Debug, Serialize)]
struct ModuleValidation {
    module: String,
    blueprint: String,
    issues: Vec<ValidationIssue>,
    /// Expansion warnings; only computed for modules without issues.
    warnings: Vec<String>,
}

#[instrument(skip_all)]
pub fn execute(args: ValidateArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let path = support::manifest_path(&args.manifest);
    let project = support::load_project(&path)?;

    let collaborators = support::collaborators(&config)?;
    let engine = support::engine(&collaborators);
    let runner = support::runner(
        &collaborators,
        RunOptions::default(),
        support::variables(&config, &project),
    );

    let results: Vec<ModuleValidation> = project
        .modules
        .iter()
        .map(|module| {
            let ctx = runner.context_for(module, &project.project);
            let (issues, warnings) = match engine.expand(&module.blueprint, &ctx) {
                Ok(expansion) => (Vec::new(), expansion.warnings),
                Err(report) => (report.issues, Vec::new()),
            };
            ModuleValidation {
                module: module.info.id.clone(),
                blueprint: module.blueprint.id.clone(),
                issues,
                warnings,
            }
        })
        .collect();

    let count: usize = results.iter().map(|r| r.issues.len()).sum();
    info!(modules = results.len(), issues = count, "Validation finished");

    if output.is_json() {
        output.json(&results)?;
    } else {
        for result in &results {
            if result.issues.is_empty() {
                output.success(&format!("{} ({})", result.module, result.blueprint))?;
            } else {
                output.error(&format!(
                    "{} ({}): {} issue(s)",
                    result.module,
                    result.blueprint,
                    result.issues.len()
                ))?;
                for issue in &result.issues {
                    output.detail(&issue.to_string())?;
                }
            }
            for warning in &result.warnings {
                output.warning(&format!("{}: {warning}", result.module))?;
            }
        }
    }

    if count > 0 {
        return Err(CliError::ValidationFailed { count });
    }
    output.success(&format!("{} module(s) valid", results.len()))?;
    Ok(())
}
