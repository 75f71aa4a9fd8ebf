//! Source repository parameters

use crate::error::{ConfigError, Result};
use std::fmt;

pub const DEFAULT_REVISION: &str = "master";

/// Kind of git reference named by `GIT_TYPE`
///
/// Informational only: checkout uses the same command for every kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionKind {
    Branch,
    Tag,
    Commit,
    /// `GIT_REF` was given without `GIT_TYPE`
    Unspecified,
    Other(String),
}

impl RevisionKind {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None => Self::Unspecified,
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "branch" => Self::Branch,
                "tag" => Self::Tag,
                "commit" => Self::Commit,
                _ => Self::Other(v.to_string()),
            },
        }
    }
}

impl fmt::Display for RevisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch => f.write_str("branch"),
            Self::Tag => f.write_str("tag"),
            Self::Commit => f.write_str("commit"),
            Self::Unspecified => f.write_str("unspecified"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

/// Resolve `GIT_REF`/`GIT_TYPE`, falling back to the `master` branch.
pub fn resolve_revision(git_ref: Option<&str>, git_type: Option<&str>) -> (String, RevisionKind) {
    match git_ref {
        Some(r) => (r.to_string(), RevisionKind::parse(git_type)),
        None => (DEFAULT_REVISION.to_string(), RevisionKind::Branch),
    }
}

/// Derive the checkout directory name from a clone URL
///
/// One trailing `/` and then one trailing `.git` are dropped before taking
/// the last `/` segment.
///
/// # Examples
/// - `https://example.com/org/app.git` -> `app`
/// - `https://example.com/org/app/` -> `app`
/// - `git@example.com:org/app.git` -> `app`
pub fn project_name(source_url: &str) -> Result<String> {
    let trimmed = source_url.strip_suffix('/').unwrap_or(source_url);
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    let name = match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    };

    if name.is_empty() {
        return Err(ConfigError::InvalidSourceUrl(source_url.to_string()));
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_name_forms() {
        for url in [
            "https://example.com/org/app.git",
            "https://example.com/org/app/",
            "https://example.com/org/app",
            "git@example.com:org/app.git",
            "app",
        ] {
            assert_eq!(project_name(url).unwrap(), "app", "url: {}", url);
        }
    }

    #[test]
    fn test_project_name_strips_once() {
        assert_eq!(
            project_name("https://example.com/org/app.git.git").unwrap(),
            "app.git"
        );
        assert_eq!(
            project_name("https://example.com/org/app.git/").unwrap(),
            "app"
        );
    }

    #[test]
    fn test_project_name_empty() {
        assert_eq!(
            project_name("https://example.com/org//"),
            Err(ConfigError::InvalidSourceUrl(
                "https://example.com/org//".to_string()
            ))
        );
        assert!(project_name(".git").is_err());
    }

    #[test]
    fn test_resolve_revision_default() {
        assert_eq!(
            resolve_revision(None, Some("tag")),
            ("master".to_string(), RevisionKind::Branch)
        );
    }

    #[test]
    fn test_resolve_revision_given() {
        assert_eq!(
            resolve_revision(Some("v1.0"), Some("tag")),
            ("v1.0".to_string(), RevisionKind::Tag)
        );
        assert_eq!(
            resolve_revision(Some("abc123"), None),
            ("abc123".to_string(), RevisionKind::Unspecified)
        );
        assert_eq!(
            resolve_revision(Some("abc123"), Some("sha")),
            ("abc123".to_string(), RevisionKind::Other("sha".to_string()))
        );
    }
}
