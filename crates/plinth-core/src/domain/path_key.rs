//! Path keys and their catalog definitions.
//!
//! A path key is a symbolic placeholder such as `apps.frontend.components`,
//! referenced from a blueprint path as `${paths.apps.frontend.components}`.
//! Keys under `apps.frontend.*`, `apps.backend.*` and `apps.all.*` are
//! *semantic*: in a monorepo they fan out to one path per matching app.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::context::{PackageCategory, StructureKind};

const REFERENCE_OPEN: &str = "${paths.";
const REFERENCE_CLOSE: char = '}';

/// One `${paths.<key>}` occurrence inside a template string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyReference<'a> {
    pub key: &'a str,
    /// Byte offset of `$`.
    pub start: usize,
    /// Byte offset one past the closing `}`.
    pub end: usize,
}

impl KeyReference<'_> {
    /// A key built from template placeholders (`{{item}}`) cannot be resolved
    /// until those are rendered.
    pub fn is_deferred(&self) -> bool {
        self.key.contains("{{")
    }
}

/// Find every key reference in `template`, in order.
///
/// Nested `{{…}}` inside a reference are kept as part of the key.
pub fn find_key_references(template: &str) -> Vec<KeyReference<'_>> {
    let mut refs = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = template[cursor..].find(REFERENCE_OPEN) {
        let start = cursor + offset;
        let key_start = start + REFERENCE_OPEN.len();

        let Some(close) = find_reference_close(&template[key_start..]) else {
            break;
        };
        let key_end = key_start + close;
        refs.push(KeyReference {
            key: &template[key_start..key_end],
            start,
            end: key_end + 1,
        });
        cursor = key_end + 1;
    }

    refs
}

/// Position of the `}` closing a reference, skipping over `{{…}}` pairs.
fn find_reference_close(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Replace every `${paths.<key>}` occurrence of `key` with `replacement`.
pub fn substitute_key(template: &str, key: &str, replacement: &str) -> String {
    template.replace(&reference(key), replacement)
}

/// The reference syntax for `key`.
pub fn reference(key: &str) -> String {
    format!("{REFERENCE_OPEN}{key}{REFERENCE_CLOSE}")
}

/// `true` when `template` still contains an unresolved reference.
pub fn has_key_reference(template: &str) -> bool {
    !find_key_references(template).is_empty()
}

/// Reserved monorepo namespaces that fan out across apps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticNamespace {
    Frontend,
    Backend,
    All,
}

impl SemanticNamespace {
    /// Classify a key by its first two segments.
    pub fn of(key: &str) -> Option<Self> {
        let mut parts = key.splitn(3, '.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("apps"), Some("frontend"), Some(_)) => Some(Self::Frontend),
            (Some("apps"), Some("backend"), Some(_)) => Some(Self::Backend),
            (Some("apps"), Some("all"), Some(_)) => Some(Self::All),
            _ => None,
        }
    }

    pub fn matches(self, category: PackageCategory) -> bool {
        match self {
            Self::Frontend => category == PackageCategory::Frontend,
            Self::Backend => category == PackageCategory::Backend,
            Self::All => matches!(category, PackageCategory::Frontend | PackageCategory::Backend),
        }
    }
}

fn all_structures() -> Vec<StructureKind> {
    vec![StructureKind::SingleApp, StructureKind::Monorepo]
}

/// Catalog entry for a single key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDefinition {
    /// Path relative to the app (single-app root, or the package in a monorepo).
    pub path: String,
    /// Topologies the key is valid in.
    #[serde(default = "all_structures")]
    pub structures: Vec<StructureKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl KeyDefinition {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            structures: all_structures(),
            description: None,
        }
    }

    pub fn only(mut self, structure: StructureKind) -> Self {
        self.structures = vec![structure];
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn supports(&self, structure: StructureKind) -> bool {
        self.structures.contains(&structure)
    }
}

/// All keys defined for one marketplace scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDefinitions {
    pub scope: String,
    #[serde(default)]
    pub keys: BTreeMap<String, KeyDefinition>,
}

impl KeyDefinitions {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            keys: BTreeMap::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>, definition: KeyDefinition) -> Self {
        self.keys.insert(key.into(), definition);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, definition: KeyDefinition) {
        self.keys.insert(key.into(), definition);
    }

    pub fn get(&self, key: &str) -> Option<&KeyDefinition> {
        self.keys.get(key)
    }

    /// Defined in this scope and valid for `structure`.
    pub fn is_defined(&self, key: &str, structure: StructureKind) -> bool {
        self.get(key).is_some_and(|d| d.supports(structure))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KeyDefinition)> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_references_in_order() {
        let t = "${paths.apps.frontend.components}/x/${paths.auth.config}";
        let refs = find_key_references(t);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].key, "apps.frontend.components");
        assert_eq!(refs[1].key, "auth.config");
        assert_eq!(&t[refs[1].start..refs[1].end], "${paths.auth.config}");
    }

    #[test]
    fn templated_key_is_deferred() {
        let refs = find_key_references("${paths.apps.{{item}}.components}/a.ts");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].key, "apps.{{item}}.components");
        assert!(refs[0].is_deferred());
    }

    #[test]
    fn unterminated_reference_is_ignored() {
        assert!(find_key_references("${paths.auth.config").is_empty());
        assert!(!has_key_reference("src/{{item}}.ts"));
    }

    #[test]
    fn substitute_replaces_all_occurrences() {
        let out = substitute_key("${paths.a}/x/${paths.a}", "a", "src");
        assert_eq!(out, "src/x/src");
    }

    #[test]
    fn semantic_namespaces() {
        assert_eq!(SemanticNamespace::of("apps.frontend.components"), Some(SemanticNamespace::Frontend));
        assert_eq!(SemanticNamespace::of("apps.all.root"), Some(SemanticNamespace::All));
        assert_eq!(SemanticNamespace::of("apps.frontend"), None);
        assert_eq!(SemanticNamespace::of("auth.config"), None);

        assert!(SemanticNamespace::All.matches(PackageCategory::Backend));
        assert!(!SemanticNamespace::All.matches(PackageCategory::Library));
    }

    #[test]
    fn definitions_respect_structure() {
        let defs = KeyDefinitions::new("core")
            .with_key("auth.config", KeyDefinition::new("src/auth.config.ts"))
            .with_key(
                "workspace.root",
                KeyDefinition::new(".").only(StructureKind::Monorepo),
            );

        assert!(defs.is_defined("auth.config", StructureKind::SingleApp));
        assert!(defs.is_defined("workspace.root", StructureKind::Monorepo));
        assert!(!defs.is_defined("workspace.root", StructureKind::SingleApp));
        assert!(!defs.is_defined("nope", StructureKind::Monorepo));
    }
}
