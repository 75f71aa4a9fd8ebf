//! Image reference handling
//!
//! Splits `IMAGE` into repository and tag, applies the `IMAGE_TAG` override
//! and works out which registry host to log in to.

use crate::error::{ConfigError, Result};
use std::fmt;

/// Registry used when the repository does not name a host.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Tag used when neither `IMAGE` nor `IMAGE_TAG` carries one.
pub const DEFAULT_TAG: &str = "latest";

/// A fully resolved `repository:tag` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Same repository, different tag.
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        Self::new(self.repository.clone(), tag)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// Split an image identifier into repository and optional tag
///
/// The tag separator is the first `:` of the last path segment, so a
/// registry port is never taken for a tag.
///
/// # Examples
/// - `registry.example.com/app:v1` -> `("registry.example.com/app", Some("v1"))`
/// - `nginx` -> `("nginx", None)`
/// - `localhost:5000/app` -> `("localhost:5000/app", None)`
/// - `localhost:5000/app:dev` -> `("localhost:5000/app", Some("dev"))`
pub fn split_image_tag(image: &str) -> (&str, Option<&str>) {
    let name_start = image.rfind('/').map_or(0, |pos| pos + 1);

    match image[name_start..].find(':') {
        Some(pos) => {
            let split = name_start + pos;
            let tag = &image[split + 1..];
            (&image[..split], (!tag.is_empty()).then_some(tag))
        }
        None => (image, None),
    }
}

/// Resolve the final image reference
///
/// # Priority
/// 1. explicit override (`IMAGE_TAG`)
/// 2. tag embedded in the image identifier
/// 3. `latest`
pub fn resolve_image(image: &str, tag_override: Option<&str>) -> Result<ImageRef> {
    let (repository, embedded_tag) = split_image_tag(image);

    if repository.is_empty() {
        return Err(ConfigError::MissingImage);
    }

    let tag = tag_override.or(embedded_tag).unwrap_or(DEFAULT_TAG);
    validate_tag(tag)?;

    Ok(ImageRef::new(repository, tag))
}

/// Work out the registry host from a repository name
///
/// # Examples
/// - `registry.example.com/app` -> `registry.example.com`
/// - `localhost:5000/app` -> `localhost:5000`
/// - `registry.example.com` -> `registry.example.com`
/// - `myuser/app`, `nginx` -> `docker.io`
pub fn extract_registry(repository: &str) -> String {
    match repository.split_once('/') {
        Some((first, _))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            first.to_string()
        }
        Some(_) => DEFAULT_REGISTRY.to_string(),
        None if repository.contains('.') => repository.to_string(),
        None => DEFAULT_REGISTRY.to_string(),
    }
}

/// Registry tag rules: at most 128 characters of `[A-Za-z0-9_.-]`,
/// not starting with `.` or `-`.
pub fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(ConfigError::InvalidTag("(empty)".to_string()));
    }

    if tag.len() > 128 {
        return Err(ConfigError::InvalidTag(format!(
            "tag too long ({} characters, max 128)",
            tag.len()
        )));
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(ConfigError::InvalidTag(tag.to_string()));
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '-' | '_'))
    {
        return Err(ConfigError::InvalidTag(format!(
            "invalid character '{}' in tag: {}",
            c, tag
        )));
    }

    Ok(())
}
