//! In-memory key catalog.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use plinth_core::{
    application::{ApplicationError, ports::PathKeyCatalog},
    domain::KeyDefinitions,
    error::{PlinthError, PlinthResult},
};

use super::builtin;

fn poisoned() -> PlinthError {
    ApplicationError::LockError {
        resource: "in-memory key catalog",
    }
    .into()
}

/// Thread-safe catalog keyed by scope. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    inner: Arc<RwLock<HashMap<String, KeyDefinitions>>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with the built-in scopes loaded.
    pub fn with_builtin() -> PlinthResult<Self> {
        let catalog = Self::new();
        for defs in builtin::builtin_keys() {
            catalog.insert(defs)?;
        }
        Ok(catalog)
    }

    /// Add or replace the definitions of one scope.
    pub fn insert(&self, defs: KeyDefinitions) -> PlinthResult<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        inner.insert(defs.scope.clone(), defs);
        Ok(())
    }

    /// Known scopes, sorted.
    pub fn scopes(&self) -> PlinthResult<Vec<String>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        let mut scopes: Vec<String> = inner.keys().cloned().collect();
        scopes.sort();
        Ok(scopes)
    }
}

impl PathKeyCatalog for InMemoryCatalog {
    fn load_key_catalog(&self, scope: &str) -> PlinthResult<KeyDefinitions> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        inner.get(scope).cloned().ok_or_else(|| {
            ApplicationError::CatalogError {
                scope: scope.to_string(),
                reason: "scope is not registered".into(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use plinth_core::domain::KeyDefinition;

    use super::*;

    #[test]
    fn builtin_scope_loads() {
        let catalog = InMemoryCatalog::with_builtin().unwrap();
        let core = catalog.load_key_catalog(builtin::CORE_SCOPE).unwrap();
        assert!(core.get("auth.config").is_some());
        assert_eq!(catalog.scopes().unwrap(), vec![builtin::CORE_SCOPE]);
    }

    #[test]
    fn insert_replaces_scope() {
        let catalog = InMemoryCatalog::new();
        catalog
            .insert(KeyDefinitions::new("ui").with_key("a", KeyDefinition::new("a")))
            .unwrap();
        catalog
            .insert(KeyDefinitions::new("ui").with_key("b", KeyDefinition::new("b")))
            .unwrap();

        let ui = catalog.load_key_catalog("ui").unwrap();
        assert!(ui.get("a").is_none());
        assert!(ui.get("b").is_some());
    }

    #[test]
    fn unknown_scope_is_catalog_error() {
        let err = InMemoryCatalog::new().load_key_catalog("nope").unwrap_err();
        assert!(err.to_string().contains("scope 'nope'"));
    }
}
