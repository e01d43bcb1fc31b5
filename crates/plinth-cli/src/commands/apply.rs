//! `plinth apply`: run every module of the project manifest.

use plinth_core::application::{CommitStatus, ModuleReport, RunOptions, RunReport};
use tracing::{info, instrument};

use crate::{
    cli::ApplyArgs,
    commands::support,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

#[instrument(skip_all, fields(dry_run = args.dry_run))]
pub fn execute(args: ApplyArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let path = support::manifest_path(&args.manifest);
    let project = support::load_project(&path)?;

    let options = RunOptions {
        dry_run: args.dry_run,
        continue_on_failure: args.continue_on_failure || config.execution.continue_on_failure,
    };
    let collaborators = support::collaborators(&config)?;
    let runner = support::runner(
        &collaborators,
        options,
        support::variables(&config, &project),
    );

    let spinner = output.spinner(&format!(
        "Applying {} module(s) to {}",
        project.modules.len(),
        project.project.name
    ));
    let report = runner.run_all(&project.modules, &project.project);
    spinner.finish_and_clear();

    if output.is_json() {
        output.json(&report)?;
    } else {
        output.header(&format!(
            "{} ({}, {})",
            project.project.name,
            project.project.structure,
            project.project.root.display()
        ))?;
        print_report(&report, options, &output)?;
    }

    let failed = report.modules.iter().filter(|m| !m.success()).count();
    info!(
        modules = report.modules.len(),
        failed,
        not_run = report.not_run.len(),
        "Apply finished"
    );
    if report.success {
        Ok(())
    } else {
        Err(CliError::ApplyFailed { failed })
    }
}

fn print_report(
    report: &RunReport,
    options: RunOptions,
    output: &OutputManager,
) -> std::io::Result<()> {
    if report.modules.is_empty() && report.not_run.is_empty() {
        return output.info("The manifest declares no modules");
    }

    for module in &report.modules {
        print_module(module, options, output)?;
    }

    if !report.not_run.is_empty() {
        output.warning(&format!("Not run: {}", report.not_run.join(", ")))?;
    }

    let applied = report.modules.iter().filter(|m| m.success()).count();
    let summary = format!("{applied}/{} module(s) succeeded", report.modules.len());
    match (report.success, options.dry_run) {
        (true, true) => output.success(&format!("{summary} (dry run, nothing written)")),
        (true, false) => output.success(&summary),
        (false, _) => output.error(&summary),
    }
}

fn print_module(
    module: &ModuleReport,
    options: RunOptions,
    output: &OutputManager,
) -> std::io::Result<()> {
    let result = &module.result;
    match &module.status {
        CommitStatus::Committed => {
            let written = module.flush.as_ref().map_or(0, |f| f.written.len());
            output.success(&format!(
                "{}: {}/{} action(s), {written} file(s) written",
                module.module, result.executed_actions, result.total_actions
            ))?;
            if let Some(flush) = &module.flush {
                for path in &flush.written {
                    output.detail(&format!("wrote   {path}"))?;
                }
                for path in &flush.deleted {
                    output.detail(&format!("deleted {path}"))?;
                }
            }
        }
        CommitStatus::Discarded if result.success && options.dry_run => {
            output.info(&format!(
                "{}: {}/{} action(s), {} file(s) would change",
                module.module,
                result.executed_actions,
                result.total_actions,
                result.files.len()
            ))?;
            for path in &result.files {
                output.detail(path)?;
            }
        }
        CommitStatus::Discarded => {
            output.error(&format!(
                "{}: {}",
                module.module,
                result.error().unwrap_or("failed")
            ))?;
            for error in result.errors.iter().skip(1) {
                output.detail(error)?;
            }
        }
        CommitStatus::FlushFailed { error } => {
            output.error(&format!("{}: could not write to disk: {error}", module.module))?;
        }
    }

    for warning in &result.warnings {
        output.warning(&format!("{}: {warning}", module.module))?;
    }
    for skipped in &result.skipped {
        output.detail(&format!("skipped {skipped}"))?;
    }
    Ok(())
}
