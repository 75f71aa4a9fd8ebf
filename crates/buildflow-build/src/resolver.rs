use buildflow_config::BuildConfig;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

/// A single `--build-arg KEY=VALUE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArg {
    pub key: String,
    pub value: String,
}

impl fmt::Display for BuildArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Outcome of `BUILD_ARGS` resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildArgs {
    Resolved(Vec<BuildArg>),
    /// `BUILD_ARGS` was not a JSON object of strings; the build runs without
    /// any build arguments.
    Degraded { reason: String },
}

impl BuildArgs {
    pub fn args(&self) -> &[BuildArg] {
        match self {
            BuildArgs::Resolved(args) => args,
            BuildArgs::Degraded { .. } => &[],
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, BuildArgs::Degraded { .. })
    }
}

/// Paths and arguments for the image build, derived from a [`BuildConfig`]
pub struct BuildResolver<'a> {
    config: &'a BuildConfig,
}

impl<'a> BuildResolver<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self { config }
    }

    /// Explicit Dockerfile inside the checkout, if `DOCKERFILE_PATH` is set
    ///
    /// Without one the build tool looks for `Dockerfile` in the context.
    pub fn resolve_dockerfile(&self) -> Option<PathBuf> {
        self.config
            .dockerfile_subpath
            .as_deref()
            .map(|sub| join_relative(&self.config.project_dir(), sub))
    }

    /// Build context: the checkout, or `BUILD_WORKDIR` inside it
    pub fn resolve_context(&self) -> PathBuf {
        let project_dir = self.config.project_dir();
        match self.config.build_workdir.as_deref() {
            Some(workdir) => join_relative(&project_dir, workdir),
            None => project_dir,
        }
    }

    /// Resolve `BUILD_ARGS` against the input environment
    pub fn resolve_build_args(&self) -> BuildArgs {
        let resolved = resolve_build_args(
            self.config.raw_build_args.as_deref(),
            &self.config.input_environment,
        );

        match &resolved {
            BuildArgs::Resolved(args) => {
                for arg in args {
                    validate_build_arg(&arg.key);
                }
            }
            BuildArgs::Degraded { reason } => {
                tracing::warn!(
                    "Unmarshal BUILD_ARGS error, building without build args: {}",
                    reason
                );
            }
        }

        resolved
    }
}

/// Join a user-supplied sub path, treating a leading `/` as relative.
fn join_relative(base: &Path, sub: &str) -> PathBuf {
    let sub = sub.trim_start_matches('/');
    if sub.is_empty() {
        base.to_path_buf()
    } else {
        base.join(sub)
    }
}

/// Parse `BUILD_ARGS` and expand `${NAME}` values
///
/// Entries come out sorted by key so command lines are reproducible.
pub fn resolve_build_args(raw: Option<&str>, env: &HashMap<String, String>) -> BuildArgs {
    let Some(raw) = raw else {
        return BuildArgs::Resolved(Vec::new());
    };

    match serde_json::from_str::<BTreeMap<String, String>>(raw) {
        Ok(map) => BuildArgs::Resolved(
            map.into_iter()
                .map(|(key, value)| BuildArg {
                    value: expand_indirection(&value, env),
                    key,
                })
                .collect(),
        ),
        Err(e) => BuildArgs::Degraded {
            reason: e.to_string(),
        },
    }
}

/// `${NAME}` becomes the value of `NAME` when it is set; anything else,
/// including `${NAME}` with `NAME` unset, is kept literally.
fn expand_indirection(value: &str, env: &HashMap<String, String>) -> String {
    value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .and_then(|name| env.get(name))
        .cloned()
        .unwrap_or_else(|| value.to_string())
}

/// Warn about build args that look like credentials
///
/// Build args end up in the image history.
pub fn validate_build_arg(key: &str) -> bool {
    const SENSITIVE_PATTERNS: [&str; 5] =
        ["password", "token", "secret", "api_key", "private_key"];

    let key_lower = key.to_lowercase();
    let sensitive = SENSITIVE_PATTERNS.iter().any(|p| key_lower.contains(p));
    if sensitive {
        tracing::warn!(
            "build arg '{}' may contain sensitive data; build args are recorded in the image history",
            key
        );
    }
    sensitive
}
