//! Template evaluator adapters.

mod simple;

pub use simple::SimpleRenderer;
