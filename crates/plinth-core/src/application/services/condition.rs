//! Runtime gate on an action's `condition`.

use tracing::{debug, warn};

use crate::application::ports::TemplateEvaluator;
use crate::domain::{Condition, ExecutionContext, truthiness};

/// Outcome of evaluating a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Run,
    /// The condition was falsy.
    Skip,
    /// The condition could not be evaluated; the action is skipped.
    FailedClosed { warning: String },
}

impl GateDecision {
    pub fn should_run(&self) -> bool {
        matches!(self, Self::Run)
    }
}

pub struct ConditionGate<'e> {
    evaluator: &'e dyn TemplateEvaluator,
}

impl<'e> ConditionGate<'e> {
    pub fn new(evaluator: &'e dyn TemplateEvaluator) -> Self {
        Self { evaluator }
    }

    pub fn evaluate(&self, condition: Option<&Condition>, ctx: &ExecutionContext) -> GateDecision {
        let truthy = match condition {
            None => true,
            Some(Condition::Literal(value)) => *value,
            Some(Condition::Template(template)) => match if_block_path(template) {
                Some(path) => ctx
                    .lookup(path)
                    .is_some_and(|value| self.evaluator.is_truthy(value)),
                None => match self.evaluator.render(template, ctx) {
                    Ok(rendered) => truthiness::is_truthy_text(&rendered),
                    Err(e) => {
                        let warning =
                            format!("condition '{template}' could not be evaluated: {e}");
                        warn!(condition = %template, error = %e, "Condition failed closed");
                        return GateDecision::FailedClosed { warning };
                    }
                },
            },
        };

        if truthy {
            GateDecision::Run
        } else {
            debug!(?condition, "Condition is falsy");
            GateDecision::Skip
        }
    }
}

/// `{{#if a.b}}…` → `Some("a.b")`. Anything after the opening tag is ignored.
fn if_block_path(template: &str) -> Option<&str> {
    let rest = template.trim_start().strip_prefix("{{")?;
    let rest = rest.trim_start().strip_prefix("#if")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let end = rest.find("}}")?;
    let path = rest[..end].trim();
    (!path.is_empty()).then_some(path)
}
