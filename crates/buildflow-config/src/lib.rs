//! buildflow build parameters
//!
//! Turns the flat environment handed to a build job into a validated
//! [`BuildConfig`]. Resolution is a pure function of the input mapping:
//! nothing here touches the filesystem or spawns processes.

pub mod error;
pub mod image;
pub mod secret;
pub mod source;

pub use error::*;
pub use image::{DEFAULT_REGISTRY, DEFAULT_TAG, ImageRef, extract_registry, split_image_tag};
pub use secret::Secret;
pub use source::{RevisionKind, project_name};

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

pub const GIT_CLONE_URL: &str = "GIT_CLONE_URL";
pub const GIT_REF: &str = "GIT_REF";
pub const GIT_TYPE: &str = "GIT_TYPE";
pub const IMAGE: &str = "IMAGE";
pub const IMAGE_TAG: &str = "IMAGE_TAG";
pub const EXTRA_IMAGE_TAG: &str = "EXTRA_IMAGE_TAG";
pub const BUILD_WORKDIR: &str = "BUILD_WORKDIR";
pub const DOCKERFILE_PATH: &str = "DOCKERFILE_PATH";
pub const BUILD_ARGS: &str = "BUILD_ARGS";
pub const NO_CACHE: &str = "NO_CACHE";
pub const HUB_USER: &str = "HUB_USER";
pub const HUB_TOKEN: &str = "HUB_TOKEN";
pub const BUILD_ROOT: &str = "BUILD_ROOT";

/// Working root that checkouts are cloned into.
pub const DEFAULT_WORKSPACE_ROOT: &str = "/root/src";

/// Snapshot the whole process environment.
///
/// The full snapshot is kept so that `${NAME}` build arguments can refer to
/// any variable the job was started with.
pub fn snapshot_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Look up a variable, treating an empty value as unset.
fn lookup<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

/// External programs each pipeline step invokes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// version-control client
    pub git: String,
    /// registry login client
    pub login: String,
    /// image build / push tool
    pub image: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            login: "docker".to_string(),
            image: "buildah".to_string(),
        }
    }
}

impl Toolchain {
    /// Defaults overridden by `BUILDFLOW_GIT`, `BUILDFLOW_LOGIN_TOOL`
    /// and `BUILDFLOW_IMAGE_TOOL`.
    pub fn from_env(env: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        Self {
            git: lookup(env, "BUILDFLOW_GIT").map_or(defaults.git, str::to_string),
            login: lookup(env, "BUILDFLOW_LOGIN_TOOL").map_or(defaults.login, str::to_string),
            image: lookup(env, "BUILDFLOW_IMAGE_TOOL").map_or(defaults.image, str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub user: String,
    pub token: Secret,
}

/// Fully derived build parameters
#[derive(Clone)]
pub struct BuildConfig {
    pub source_url: String,
    pub revision: String,
    pub revision_kind: RevisionKind,
    pub image: ImageRef,
    pub extra_tags: Vec<String>,
    pub registry_host: String,
    pub project_name: String,
    pub build_workdir: Option<String>,
    pub dockerfile_subpath: Option<String>,
    pub raw_build_args: Option<String>,
    pub no_cache: bool,
    pub credentials: RegistryCredentials,
    pub workspace_root: PathBuf,
    pub toolchain: Toolchain,
    /// Original input, kept only for `${NAME}` build-argument lookup.
    pub input_environment: HashMap<String, String>,
}

// input_environment holds HUB_TOKEN in the clear, so it is summarised.
impl fmt::Debug for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildConfig")
            .field("source_url", &self.source_url)
            .field("revision", &self.revision)
            .field("revision_kind", &self.revision_kind)
            .field("image", &self.image)
            .field("extra_tags", &self.extra_tags)
            .field("registry_host", &self.registry_host)
            .field("project_name", &self.project_name)
            .field("build_workdir", &self.build_workdir)
            .field("dockerfile_subpath", &self.dockerfile_subpath)
            .field("raw_build_args", &self.raw_build_args)
            .field("no_cache", &self.no_cache)
            .field("credentials", &self.credentials)
            .field("workspace_root", &self.workspace_root)
            .field("toolchain", &self.toolchain)
            .field(
                "input_environment",
                &format_args!("<{} variables>", self.input_environment.len()),
            )
            .finish()
    }
}

impl BuildConfig {
    pub fn from_env(env: &HashMap<String, String>) -> Result<Self> {
        let source_url = lookup(env, GIT_CLONE_URL).ok_or(ConfigError::MissingSourceUrl)?;

        let (revision, revision_kind) =
            source::resolve_revision(lookup(env, GIT_REF), lookup(env, GIT_TYPE));

        let raw_image = lookup(env, IMAGE).ok_or(ConfigError::MissingImage)?;
        let image = image::resolve_image(raw_image, lookup(env, IMAGE_TAG))?;
        let registry_host = extract_registry(&image.repository);

        let extra_tags = parse_extra_tags(lookup(env, EXTRA_IMAGE_TAG))?;

        let project_name = project_name(source_url)?;

        let (user, token) = match (lookup(env, HUB_USER), lookup(env, HUB_TOKEN)) {
            (Some(user), Some(token)) => (user, token),
            _ => return Err(ConfigError::MissingCredentials),
        };

        let no_cache = lookup(env, NO_CACHE).is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let workspace_root = lookup(env, BUILD_ROOT)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKSPACE_ROOT));

        let config = Self {
            source_url: source_url.to_string(),
            revision,
            revision_kind,
            image,
            extra_tags,
            registry_host,
            project_name,
            build_workdir: lookup(env, BUILD_WORKDIR).map(str::to_string),
            dockerfile_subpath: lookup(env, DOCKERFILE_PATH).map(str::to_string),
            raw_build_args: lookup(env, BUILD_ARGS).map(str::to_string),
            no_cache,
            credentials: RegistryCredentials {
                user: user.to_string(),
                token: Secret::new(token),
            },
            workspace_root,
            toolchain: Toolchain::from_env(env),
            input_environment: env.clone(),
        };

        tracing::debug!(
            project = %config.project_name,
            revision = %config.revision,
            kind = %config.revision_kind,
            image = %config.image,
            registry = %config.registry_host,
            "resolved build configuration"
        );

        Ok(config)
    }

    /// Replace the working root (e.g. from a CLI flag).
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    /// Directory the repository is cloned into.
    pub fn project_dir(&self) -> PathBuf {
        self.workspace_root.join(&self.project_name)
    }

    /// Primary reference followed by one reference per extra tag.
    pub fn image_refs(&self) -> Vec<ImageRef> {
        std::iter::once(self.image.clone())
            .chain(self.extra_tags.iter().map(|t| self.image.with_tag(t)))
            .collect()
    }
}

fn parse_extra_tags(value: Option<&str>) -> Result<Vec<String>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| image::validate_tag(t).map(|_| t.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base_env() -> HashMap<String, String> {
        env(&[
            (GIT_CLONE_URL, "https://example.com/org/app.git"),
            (IMAGE, "registry.example.com/app"),
            (HUB_USER, "robot"),
            (HUB_TOKEN, "s3cr3t"),
        ])
    }

    #[test]
    fn test_from_env_scenario() {
        let mut input = base_env();
        input.insert(IMAGE_TAG.to_string(), "v1".to_string());

        let config = BuildConfig::from_env(&input).unwrap();
        assert_eq!(config.project_name, "app");
        assert_eq!(config.registry_host, "registry.example.com");
        assert_eq!(config.image.to_string(), "registry.example.com/app:v1");
        assert_eq!(config.revision, "master");
        assert_eq!(config.revision_kind, RevisionKind::Branch);
        assert_eq!(config.workspace_root, PathBuf::from(DEFAULT_WORKSPACE_ROOT));
        assert_eq!(config.project_dir(), PathBuf::from("/root/src/app"));
        assert!(!config.no_cache);
    }

    #[test]
    fn test_from_env_missing_required() {
        for key in [GIT_CLONE_URL, IMAGE, HUB_USER, HUB_TOKEN] {
            let mut input = base_env();
            input.remove(key);
            assert!(BuildConfig::from_env(&input).is_err(), "missing {}", key);
        }
    }

    #[test]
    fn test_from_env_error_order() {
        assert_eq!(
            BuildConfig::from_env(&HashMap::new()).unwrap_err(),
            ConfigError::MissingSourceUrl
        );

        let input = env(&[(GIT_CLONE_URL, "https://example.com/app")]);
        assert_eq!(
            BuildConfig::from_env(&input).unwrap_err(),
            ConfigError::MissingImage
        );

        let mut input = base_env();
        input.insert(HUB_TOKEN.to_string(), String::new());
        assert_eq!(
            BuildConfig::from_env(&input).unwrap_err(),
            ConfigError::MissingCredentials
        );
    }

    #[test]
    fn test_from_env_docker_hub() {
        let mut input = base_env();
        input.insert(IMAGE.to_string(), "myuser/app:edge".to_string());

        let config = BuildConfig::from_env(&input).unwrap();
        assert_eq!(config.registry_host, DEFAULT_REGISTRY);
        assert_eq!(config.image.tag, "edge");
    }

    #[test]
    fn test_from_env_no_cache_case_insensitive() {
        for (value, expected) in [("TRUE", true), ("True", true), ("yes", false), ("1", false)] {
            let mut input = base_env();
            input.insert(NO_CACHE.to_string(), value.to_string());
            assert_eq!(
                BuildConfig::from_env(&input).unwrap().no_cache,
                expected,
                "NO_CACHE={}",
                value
            );
        }
    }

    #[test]
    fn test_from_env_optional_fields() {
        let mut input = base_env();
        input.insert(GIT_REF.to_string(), "v2.0".to_string());
        input.insert(GIT_TYPE.to_string(), "tag".to_string());
        input.insert(DOCKERFILE_PATH.to_string(), "/docker/Dockerfile".to_string());
        input.insert(BUILD_WORKDIR.to_string(), "server".to_string());
        input.insert(BUILD_ROOT.to_string(), "/tmp/builds".to_string());
        input.insert(EXTRA_IMAGE_TAG.to_string(), "stable, 2.0 ,".to_string());

        let config = BuildConfig::from_env(&input).unwrap();
        assert_eq!(config.revision, "v2.0");
        assert_eq!(config.revision_kind, RevisionKind::Tag);
        assert_eq!(config.dockerfile_subpath.as_deref(), Some("/docker/Dockerfile"));
        assert_eq!(config.build_workdir.as_deref(), Some("server"));
        assert_eq!(config.project_dir(), PathBuf::from("/tmp/builds/app"));
        assert_eq!(
            config
                .image_refs()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            vec![
                "registry.example.com/app:latest",
                "registry.example.com/app:stable",
                "registry.example.com/app:2.0",
            ]
        );
    }

    #[test]
    fn test_from_env_invalid_tag() {
        let mut input = base_env();
        input.insert(IMAGE_TAG.to_string(), "-bad".to_string());
        assert!(matches!(
            BuildConfig::from_env(&input),
            Err(ConfigError::InvalidTag(_))
        ));

        let mut input = base_env();
        input.insert(EXTRA_IMAGE_TAG.to_string(), "ok,not/ok".to_string());
        assert!(matches!(
            BuildConfig::from_env(&input),
            Err(ConfigError::InvalidTag(_))
        ));
    }

    #[test]
    fn test_from_env_keeps_input_snapshot() {
        let mut input = base_env();
        input.insert("NPM_TOKEN".to_string(), "abc".to_string());

        let config = BuildConfig::from_env(&input).unwrap();
        assert_eq!(config.input_environment, input);
        assert!(!format!("{:?}", config).contains("s3cr3t"));
    }

    #[test]
    fn test_toolchain_overrides() {
        let input = env(&[("BUILDFLOW_LOGIN_TOOL", "podman"), ("BUILDFLOW_GIT", "")]);
        let toolchain = Toolchain::from_env(&input);
        assert_eq!(toolchain.login, "podman");
        assert_eq!(toolchain.git, "git");
        assert_eq!(toolchain.image, "buildah");
    }

    #[test]
    fn test_snapshot_env() {
        temp_env::with_var("BUILDFLOW_SNAPSHOT_PROBE", Some("present"), || {
            let snapshot = snapshot_env();
            assert_eq!(
                snapshot.get("BUILDFLOW_SNAPSHOT_PROBE").map(String::as_str),
                Some("present")
            );
        });
    }
}
