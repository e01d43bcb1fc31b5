use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::DomainError;

/// A normalized path guaranteed to be **relative** to a module anchor.
///
/// Invariants, enforced at construction:
/// - never absolute;
/// - forward slashes only, no empty or `.` segments;
/// - no `..` segment that climbs above the anchor.
///
/// Blueprints come from data files, so construction is always fallible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// Normalize and validate a relative path.
    ///
    /// # Errors
    ///
    /// - [`DomainError::AbsolutePathNotAllowed`] for `/x`, `C:\x`, `\\server\x`
    /// - [`DomainError::PathOutsideRoot`] when `..` escapes the anchor
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let unified = raw.replace('\\', "/");

        if unified.starts_with('/') || Path::new(raw).is_absolute() || has_drive_prefix(&unified)
        {
            return Err(DomainError::AbsolutePathNotAllowed {
                path: raw.to_string(),
            });
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(DomainError::PathOutsideRoot {
                            path: raw.to_string(),
                        });
                    }
                }
                other => segments.push(other),
            }
        }

        Ok(Self(segments.join("/")))
    }

    /// `true` for the anchor itself (`""`, `"."`, `"./"`).
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Join a relative segment, re-normalizing the result.
    pub fn join(&self, segment: &str) -> Result<Self, DomainError> {
        if self.is_root() {
            return Self::parse(segment);
        }
        Self::parse(&format!("{}/{}", self.0, segment))
    }

    /// Strip `prefix` from this path, if this path lives under it.
    ///
    /// `packages/auth/src/a.ts` minus `packages/auth` is `src/a.ts`; a path
    /// equal to the prefix becomes the root.
    pub fn strip_prefix(&self, prefix: &RelativePath) -> Option<Self> {
        if prefix.is_root() {
            return Some(self.clone());
        }
        if self.0 == prefix.0 {
            return Some(Self(String::new()));
        }
        self.0
            .strip_prefix(prefix.0.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|rest| Self(rest.to_string()))
    }

    /// Resolve against an absolute anchor directory.
    pub fn to_path(&self, anchor: &Path) -> PathBuf {
        if self.is_root() {
            return anchor.to_path_buf();
        }
        self.0.split('/').fold(anchor.to_path_buf(), |acc, s| acc.join(s))
    }

    /// File extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.0)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Final path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

fn has_drive_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl TryFrom<String> for RelativePath {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for RelativePath {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dots_and_slashes() {
        assert_eq!(RelativePath::parse("./src//lib/./a.ts").unwrap().as_str(), "src/lib/a.ts");
        assert_eq!(RelativePath::parse("src\\main.rs").unwrap().as_str(), "src/main.rs");
        assert_eq!(RelativePath::parse("a/b/../c").unwrap().as_str(), "a/c");
    }

    #[test]
    fn rejects_absolute_paths() {
        assert!(matches!(
            RelativePath::parse("/etc/passwd"),
            Err(DomainError::AbsolutePathNotAllowed { .. })
        ));
        assert!(matches!(
            RelativePath::parse("C:\\Windows"),
            Err(DomainError::AbsolutePathNotAllowed { .. })
        ));
    }

    #[test]
    fn rejects_escaping_parent_segments() {
        assert!(matches!(
            RelativePath::parse("../outside.txt"),
            Err(DomainError::PathOutsideRoot { .. })
        ));
        assert!(matches!(
            RelativePath::parse("a/../../b"),
            Err(DomainError::PathOutsideRoot { .. })
        ));
    }

    #[test]
    fn root_and_join() {
        let root = RelativePath::parse(".").unwrap();
        assert!(root.is_root());
        assert_eq!(root.join("src/a.ts").unwrap().as_str(), "src/a.ts");

        let pkg = RelativePath::parse("packages/auth").unwrap();
        assert_eq!(pkg.join("src/config.ts").unwrap().as_str(), "packages/auth/src/config.ts");
    }

    #[test]
    fn strip_prefix_respects_segment_boundaries() {
        let pkg = RelativePath::parse("packages/auth").unwrap();
        let inside = RelativePath::parse("packages/auth/src/a.ts").unwrap();
        let sibling = RelativePath::parse("packages/authz/src/a.ts").unwrap();

        assert_eq!(inside.strip_prefix(&pkg).unwrap().as_str(), "src/a.ts");
        assert!(sibling.strip_prefix(&pkg).is_none());
    }

    #[test]
    fn to_path_joins_segments() {
        let p = RelativePath::parse("src/a.ts").unwrap();
        assert_eq!(p.to_path(Path::new("/proj")), PathBuf::from("/proj/src/a.ts"));
        assert_eq!(p.extension().as_deref(), Some("ts"));
        assert_eq!(p.file_name(), "a.ts");
    }
}
