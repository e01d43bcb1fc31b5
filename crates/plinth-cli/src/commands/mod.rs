//! One module per subcommand. Each exposes an `execute` entry point.

pub mod apply;
pub mod completions;
pub mod config;
pub mod expand;
pub mod init;
pub mod keys;
pub mod validate;

mod support;
