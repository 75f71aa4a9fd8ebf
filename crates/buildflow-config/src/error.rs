use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable GIT_CLONE_URL is required")]
    MissingSourceUrl,

    #[error("GIT_CLONE_URL does not name a project: {0}")]
    InvalidSourceUrl(String),

    #[error("environment variable IMAGE is required")]
    MissingImage,

    #[error("environment variables HUB_USER, HUB_TOKEN are required")]
    MissingCredentials,

    #[error("invalid image tag: {0}")]
    InvalidTag(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
