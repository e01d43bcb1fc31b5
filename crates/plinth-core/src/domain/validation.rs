use std::fmt;

use serde::Serialize;

use crate::domain::{
    action::{Action, Operation},
    blueprint::Blueprint,
};

/// One problem found while validating a blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Index into the blueprint's action list; `None` for blueprint-level issues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<usize>,
    pub message: String,
}

impl ValidationIssue {
    pub fn blueprint(message: impl Into<String>) -> Self {
        Self {
            action: None,
            message: message.into(),
        }
    }

    pub fn action(index: usize, message: impl Into<String>) -> Self {
        Self {
            action: Some(index),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            Some(i) => write!(f, "action #{i}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Every problem found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub blueprint: String,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new(blueprint: impl Into<String>) -> Self {
        Self {
            blueprint: blueprint.into(),
            issues: Vec::new(),
        }
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        self.issues.extend(issues);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter()
    }

    /// `Ok` when no issue was recorded.
    pub fn into_result(self) -> Result<(), ValidationReport> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "blueprint '{}' has {} issue(s)",
            self.blueprint,
            self.issues.len()
        )?;
        for issue in &self.issues {
            write!(f, "\n  - {issue}")?;
        }
        Ok(())
    }
}

/// Structural blueprint checks that need no catalog.
///
/// Path-key checks need the resolver and live in the application layer.
pub struct DomainValidator;

impl DomainValidator {
    pub fn validate_blueprint(blueprint: &Blueprint) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if blueprint.id.trim().is_empty() {
            issues.push(ValidationIssue::blueprint("blueprint id is empty"));
        }

        for (index, action) in blueprint.actions.iter().enumerate() {
            issues.extend(
                Self::validate_action(action)
                    .into_iter()
                    .map(|m| ValidationIssue::action(index, format!("{}: {m}", action.kind()))),
            );
        }

        issues
    }

    pub fn validate_action(action: &Action) -> Vec<String> {
        let mut problems = Vec::new();
        let blank = |s: &str| s.trim().is_empty();

        if action.target_path().is_some_and(blank) {
            problems.push("path is empty".to_string());
        }

        match &action.operation {
            Operation::CreateFile(op) => {
                if op.content.is_none() && op.template.is_none() {
                    problems.push("needs either content or template".into());
                }
            }
            Operation::EnhanceFile(op) if blank(&op.modifier) => {
                problems.push("modifier is empty".into());
            }
            Operation::InstallPackages(op) => {
                if op.packages.is_empty() {
                    problems.push("no packages listed".into());
                } else if op.packages.iter().any(|p| blank(p)) {
                    problems.push("empty package spec".into());
                }
            }
            Operation::AddScript(op) if blank(&op.name) => {
                problems.push("script name is empty".into());
            }
            Operation::AddEnvVar(op) if blank(&op.key) => {
                problems.push("env var key is empty".into());
            }
            Operation::RunCommand(op) if blank(&op.command) => {
                problems.push("command is empty".into());
            }
            Operation::WrapConfig(op) if blank(&op.wrapper) => {
                problems.push("wrapper is empty".into());
            }
            _ => {}
        }

        if action.for_each.as_deref().is_some_and(blank) {
            problems.push("forEach expression is empty".into());
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::{CreateFile, InstallPackages, RunCommand};

    #[test]
    fn collects_every_issue() {
        let bp = Blueprint::new(" ", "broken")
            .with_action(Action::new(Operation::CreateFile(CreateFile {
                path: "".into(),
                content: None,
                template: None,
                overwrite: false,
            })))
            .with_action(Action::new(Operation::InstallPackages(InstallPackages {
                packages: vec![],
                dev: false,
                manifest: None,
            })))
            .with_action(
                Action::new(Operation::RunCommand(RunCommand {
                    command: "npm".into(),
                    args: vec![],
                    working_dir: None,
                }))
                .with_for_each(""),
            );

        let issues = DomainValidator::validate_blueprint(&bp);
        let rendered: Vec<String> = issues.iter().map(ToString::to_string).collect();

        assert_eq!(issues.len(), 5, "{rendered:#?}");
        assert_eq!(issues[0].action, None);
        assert!(rendered.contains(&"action #0: CREATE_FILE: path is empty".to_string()));
        assert!(rendered.contains(&"action #1: INSTALL_PACKAGES: no packages listed".to_string()));
        assert!(rendered.contains(&"action #2: RUN_COMMAND: forEach expression is empty".to_string()));
    }

    #[test]
    fn report_into_result() {
        assert!(ValidationReport::new("ok").into_result().is_ok());

        let mut report = ValidationReport::new("bad");
        report.push(ValidationIssue::action(3, "oops"));
        let err = report.into_result().unwrap_err();
        assert_eq!(err.to_string(), "blueprint 'bad' has 1 issue(s)\n  - action #3: oops");
    }
}
