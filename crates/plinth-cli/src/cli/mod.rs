//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "plinth",
    bin_name = "plinth",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Blueprint execution engine for composable project scaffolding",
    long_about = "Plinth applies module blueprints to a project. Every module runs \
                  against a virtual filesystem and is written to disk only when \
                  all of its actions succeed.",
    after_help = "EXAMPLES:\n\
        \x20 plinth validate\n\
        \x20 plinth apply --dry-run\n\
        \x20 plinth expand blueprints/auth.toml --module auth\n\
        \x20 plinth completions bash > /usr/share/bash-completion/completions/plinth",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run every module of the project manifest.
    #[command(
        about = "Apply the project's modules",
        after_help = "EXAMPLES:\n\
            \x20 plinth apply\n\
            \x20 plinth apply --manifest site/plinth.toml --dry-run\n\
            \x20 plinth apply --continue-on-failure --output-format json"
    )]
    Apply(ApplyArgs),

    /// Validate every module blueprint without writing anything.
    #[command(
        visible_alias = "check",
        about = "Validate the project's blueprints",
        after_help = "EXAMPLES:\n\
            \x20 plinth validate\n\
            \x20 plinth validate --manifest site/plinth.toml"
    )]
    Validate(ValidateArgs),

    /// Print a blueprint's actions after forEach and path-key expansion.
    #[command(
        about = "Show the expanded action list",
        after_help = "EXAMPLES:\n\
            \x20 plinth expand blueprints/auth.toml\n\
            \x20 plinth expand blueprints/auth.toml --module auth"
    )]
    Expand(ExpandArgs),

    /// List the path keys a catalog scope defines.
    #[command(
        visible_alias = "ls",
        about = "List path keys",
        after_help = "EXAMPLES:\n\
            \x20 plinth keys\n\
            \x20 plinth keys --scope acme"
    )]
    Keys(KeysArgs),

    /// Initialise a Plinth configuration file.
    #[command(
        about = "Initialise configuration",
        after_help = "EXAMPLES:\n\
            \x20 plinth init\n\
            \x20 plinth init --force\n\
            \x20 plinth --config ./plinth-config.toml init"
    )]
    Init(InitArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 plinth completions bash > ~/.local/share/bash-completion/completions/plinth\n\
            \x20 plinth completions zsh  > ~/.zfunc/_plinth\n\
            \x20 plinth completions fish > ~/.config/fish/completions/plinth.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the Plinth configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 plinth config get catalog.scope\n\
            \x20 plinth config list\n\
            \x20 plinth config path"
    )]
    Config(ConfigCommands),
}

// ── shared ────────────────────────────────────────────────────────────────────

/// Location of the project manifest.
#[derive(Debug, Args)]
pub struct ManifestArgs {
    /// Path to the project manifest. Defaults to `plinth.toml` in the
    /// working directory.
    #[arg(
        short = 'm',
        long = "manifest",
        value_name = "FILE",
        help = "Project manifest (default: ./plinth.toml)"
    )]
    pub manifest: Option<PathBuf>,
}

// ── apply ─────────────────────────────────────────────────────────────────────

/// Arguments for `plinth apply`.
#[derive(Debug, Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Run every module but never write to disk.
    #[arg(long = "dry-run", help = "Execute without writing any files")]
    pub dry_run: bool,

    /// Keep going after a module fails.
    #[arg(
        long = "continue-on-failure",
        help = "Run the remaining modules after a failure"
    )]
    pub continue_on_failure: bool,
}

// ── validate ──────────────────────────────────────────────────────────────────

/// Arguments for `plinth validate`.
#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,
}

// ── expand ────────────────────────────────────────────────────────────────────

/// Arguments for `plinth expand`.
#[derive(Debug, Args)]
pub struct ExpandArgs {
    /// Blueprint file (TOML or JSON).
    #[arg(value_name = "BLUEPRINT", help = "Blueprint file to expand")]
    pub blueprint: PathBuf,

    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Take parameters and target package from this manifest module.
    #[arg(
        long = "module",
        value_name = "ID",
        help = "Manifest module whose context to use"
    )]
    pub module: Option<String>,
}

// ── keys ──────────────────────────────────────────────────────────────────────

/// Arguments for `plinth keys`.
#[derive(Debug, Args)]
pub struct KeysArgs {
    /// Catalog scope. Defaults to `catalog.scope` from the configuration.
    #[arg(short = 's', long = "scope", value_name = "SCOPE", help = "Catalog scope")]
    pub scope: Option<String>,
}

// ── init ──────────────────────────────────────────────────────────────────────

/// Arguments for `plinth init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(short = 'f', long = "force", help = "Overwrite existing configuration")]
    pub force: bool,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `plinth completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `plinth config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `catalog.scope`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the configuration file.
    Path,
}

// ── tests ─────────────────────────────────────────────────────────────────────
