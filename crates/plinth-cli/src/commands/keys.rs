//! `plinth keys`: list the path keys of a catalog scope.

use plinth_core::application::ports::PathKeyCatalog as _;
use plinth_core::domain::{KeyDefinition, KeyDefinitions};

use crate::{
    cli::KeysArgs, commands::support, config::AppConfig, error::CliResult,
    output::OutputManager,
};

pub fn execute(args: KeysArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let scope = args.scope.unwrap_or_else(|| config.catalog.scope.clone());
    let definitions = support::catalog(&config)?.load_key_catalog(&scope)?;

    if output.is_json() {
        output.json(&definitions)?;
        return Ok(());
    }

    output.header(&format!(
        "Scope '{}' ({} key(s))",
        definitions.scope,
        definitions.keys.len()
    ))?;
    for line in table(&definitions) {
        output.print(&line)?;
    }
    Ok(())
}

/// One aligned row per key: name, path, topologies, description.
fn table(definitions: &KeyDefinitions) -> Vec<String> {
    let width = definitions.keys.keys().map(String::len).max().unwrap_or(0);
    let path_width = definitions
        .keys
        .values()
        .map(|d| d.path.len())
        .max()
        .unwrap_or(0);

    definitions
        .keys
        .iter()
        .map(|(key, def)| {
            let row = format!(
                "  {key:<width$}  {:<path_width$}  {}",
                def.path,
                structures(def)
            );
            match &def.description {
                Some(description) => format!("{row}  {description}"),
                None => row,
            }
        })
        .collect()
}

fn structures(def: &KeyDefinition) -> String {
    def.structures
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join("|")
}
