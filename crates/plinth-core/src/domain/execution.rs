//! Engine run state and results.

use std::fmt;

use serde::Serialize;

/// Lifecycle of one engine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Idle,
    Preprocessing,
    Executing,
    Completed,
    Failed,
}

impl EngineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Preprocessing => "preprocessing",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What a handler did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    /// Anchor-relative paths written or deleted.
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The handler decided there was nothing to do.
    pub skipped: bool,
}

impl ActionOutcome {
    pub fn touched(path: impl Into<String>) -> Self {
        Self {
            files: vec![path.into()],
            ..Self::default()
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            files: Vec::new(),
            message: Some(message.into()),
            skipped: true,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Aggregate result of one engine run. Always produced, never an `Err`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// Project-relative touched paths, deduplicated in first-touch order.
    pub files: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Descriptions of actions that did not run.
    pub skipped: Vec<String>,
    /// Actions after expansion.
    pub total_actions: usize,
    /// Actions whose handler ran to success.
    pub executed_actions: usize,
    pub state: EngineState,
}

impl ExecutionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record touched files, keeping first-touch order.
    pub fn touch(&mut self, files: impl IntoIterator<Item = String>) {
        for file in files {
            if !self.files.contains(&file) {
                self.files.push(file);
            }
        }
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn skip(&mut self, description: impl Into<String>) {
        self.skipped.push(description.into());
    }

    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self.success = false;
        self.state = EngineState::Failed;
        self
    }

    pub fn complete(mut self) -> Self {
        self.success = true;
        self.state = EngineState::Completed;
        self
    }

    /// First error, if any.
    pub fn error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_dedupes_in_first_touch_order() {
        let mut result = ExecutionResult::new();
        result.touch(["b".to_string(), "a".to_string()]);
        result.touch(["b".to_string(), "c".to_string()]);
        assert_eq!(result.files, vec!["b", "a", "c"]);
    }

    #[test]
    fn terminal_transitions() {
        let ok = ExecutionResult::new().complete();
        assert!(ok.success);
        assert_eq!(ok.state, EngineState::Completed);

        let failed = ExecutionResult::new().fail("CREATE_FILE a.ts: boom");
        assert!(!failed.success);
        assert!(failed.state.is_terminal());
        assert_eq!(failed.error(), Some("CREATE_FILE a.ts: boom"));
    }
}
