//! Path-key catalog adapters.

mod builtin;
mod memory;
mod toml_dir;

pub use builtin::{CORE_SCOPE, builtin_keys};
pub use memory::InMemoryCatalog;
pub use toml_dir::TomlKeyCatalog;
