//! `plinth expand`: print a blueprint's actions after expansion.

use plinth_adapters::BlueprintLoader;
use plinth_core::application::{ModuleSpec, RunOptions};
use plinth_core::domain::{Action, ModuleInfo, ProjectMetadata};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    cli::ExpandArgs,
    commands::support,
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

#[derive(Debug, Serialize)]
struct ExpandedBlueprint<'a> {
    blueprint: &'a str,
    module: &'a str,
    actions: Vec<Action>,
    warnings: Vec<String>,
}

#[instrument(skip_all, fields(blueprint = %args.blueprint.display()))]
pub fn execute(args: ExpandArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let blueprint = BlueprintLoader::new()
        .load(&args.blueprint)
        .with_cli_context(|| format!("loading {}", args.blueprint.display()))?;

    let manifest = support::manifest_path(&args.manifest);
    let explicit = args.manifest.manifest.is_some() || args.module.is_some();
    let (project, variables, module) = if explicit || manifest.is_file() {
        let loaded = support::load_project(&manifest)?;
        let module = match &args.module {
            Some(id) => {
                let found = loaded.module(id).ok_or_else(|| CliError::ModuleNotFound {
                    id: id.clone(),
                    available: loaded.modules.iter().map(|m| m.info.id.clone()).collect(),
                })?;
                ModuleSpec {
                    info: found.info.clone(),
                    blueprint: blueprint.clone(),
                    template_root: found.template_root.clone(),
                }
            }
            None => ModuleSpec::new(
                ModuleInfo::new(&blueprint.id, &config.catalog.scope),
                blueprint.clone(),
            ),
        };
        let variables = support::variables(&config, &loaded);
        (loaded.project, variables, module)
    } else {
        debug!("No manifest; expanding against a single-app project in the working directory");
        let cwd = std::env::current_dir()
            .with_cli_context(|| "reading the working directory")?;
        let name = cwd
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        let module = ModuleSpec::new(
            ModuleInfo::new(&blueprint.id, &config.catalog.scope),
            blueprint.clone(),
        );
        (
            ProjectMetadata::single_app(name, cwd),
            config.variables.clone(),
            module,
        )
    };

    let collaborators = support::collaborators(&config)?;
    let runner = support::runner(&collaborators, RunOptions::default(), variables);
    let ctx = runner.context_for(&module, &project);

    match support::engine(&collaborators).expand(&blueprint, &ctx) {
        Ok(expansion) => {
            output.json(&ExpandedBlueprint {
                blueprint: &blueprint.id,
                module: &module.info.id,
                actions: expansion.actions,
                warnings: expansion.warnings,
            })?;
            Ok(())
        }
        Err(report) => {
            if output.is_json() {
                output.json(&report)?;
            } else {
                output.error(&format!(
                    "{} ({}): {} issue(s)",
                    module.info.id,
                    report.blueprint,
                    report.issues.len()
                ))?;
                for issue in &report.issues {
                    output.detail(&issue.to_string())?;
                }
            }
            Err(CliError::ValidationFailed {
                count: report.issues.len(),
            })
        }
    }
}
