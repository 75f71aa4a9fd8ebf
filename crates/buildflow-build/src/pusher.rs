//! Image push
//!
//! Pushes the primary reference first, then every extra tag.

use crate::error::StepFailure;
use crate::runner::{CommandRunner, CommandSpec, run_step};
use buildflow_config::{BuildConfig, ImageRef};
use colored::Colorize;

pub struct ImagePusher<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a BuildConfig,
}

impl<'a> ImagePusher<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a BuildConfig) -> Self {
        Self { runner, config }
    }

    /// `buildah push <repository:tag>`
    pub fn push_command(&self, image: &ImageRef) -> CommandSpec {
        CommandSpec::new(&self.config.toolchain.image)
            .arg("push")
            .arg(image.to_string())
    }

    /// Push every reference, stopping at the first failure
    pub async fn push_all(&self) -> Result<Vec<ImageRef>, StepFailure> {
        let mut pushed = Vec::new();

        for image in self.config.image_refs() {
            println!("  → {}", image.to_string().cyan());
            run_step(self.runner, &self.push_command(&image)).await?;
            pushed.push(image);
        }

        Ok(pushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::DryRunRunner;
    use std::collections::HashMap;

    fn config(extra_tags: Option<&str>) -> BuildConfig {
        let mut input: HashMap<String, String> = [
            ("GIT_CLONE_URL", "https://example.com/org/app.git"),
            ("IMAGE", "registry.example.com/app:v1"),
            ("HUB_USER", "robot"),
            ("HUB_TOKEN", "s3cr3t"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        if let Some(tags) = extra_tags {
            input.insert("EXTRA_IMAGE_TAG".to_string(), tags.to_string());
        }
        BuildConfig::from_env(&input).unwrap()
    }

    #[test]
    fn test_push_command() {
        let config = config(None);
        let runner = DryRunRunner::new();
        let spec = ImagePusher::new(&runner, &config).push_command(&config.image);

        assert_eq!(spec.command_line(), "buildah push registry.example.com/app:v1");
    }

    #[tokio::test]
    async fn test_push_all_extra_tags() {
        let config = config(Some("stable,2026"));
        let runner = DryRunRunner::new();
        let pushed = ImagePusher::new(&runner, &config).push_all().await.unwrap();

        assert_eq!(
            pushed.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec![
                "registry.example.com/app:v1",
                "registry.example.com/app:stable",
                "registry.example.com/app:2026",
            ]
        );
    }
}
