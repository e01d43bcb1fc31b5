use serde::{Deserialize, Serialize};

use super::action::Action;

/// A named, ordered list of actions describing one module's contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Anchor-relative paths preloaded into the VFS regardless of what the
    /// actions target.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contextual_files: Vec<String>,
}

impl Blueprint {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            actions: Vec::new(),
            contextual_files: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub fn with_contextual_file(mut self, path: impl Into<String>) -> Self {
        self.contextual_files.push(path.into());
        self
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActionKind;

    #[test]
    fn deserializes_from_toml_shape() {
        let json = serde_json::json!({
            "id": "auth",
            "name": "Auth",
            "contextualFiles": ["tsconfig.json"],
            "actions": [
                { "type": "INSTALL_PACKAGES", "packages": ["lib@1.2.0"] },
                { "type": "CREATE_FILE", "path": "${paths.auth.config}", "content": "x" }
            ]
        });
        let bp: Blueprint = serde_json::from_value(json).unwrap();

        assert_eq!(bp.len(), 2);
        assert_eq!(bp.actions[1].kind(), ActionKind::CreateFile);
        assert_eq!(bp.contextual_files, vec!["tsconfig.json".to_string()]);
        assert!(bp.description.is_none());
    }
}
