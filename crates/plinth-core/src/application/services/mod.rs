//! Application services: the engine and the steps it is built from.
//!
//! ```text
//! ModuleRunner ─► BlueprintEngine ─► BlueprintValidator
//!                                 ─► ActionPreprocessor ─► PathResolver
//!                                 ─► ConditionGate
//!                                 ─► HandlerRegistry
//! ```

pub mod condition;
pub mod engine;
pub mod module_runner;
pub mod path_resolver;
pub mod preprocessor;
pub mod validator;

pub use condition::{ConditionGate, GateDecision};
pub use engine::BlueprintEngine;
pub use module_runner::{
    CommitStatus, ModuleReport, ModuleRunner, ModuleSpec, RunOptions, RunReport,
};
pub use path_resolver::{KeyResolution, PathResolver};
pub use preprocessor::{ActionPreprocessor, Expansion};
pub use validator::BlueprintValidator;
