//! Source checkout
//!
//! Clones the repository under the workspace root and moves the working
//! tree to the requested revision.

use crate::error::StepFailure;
use crate::runner::{CommandRunner, CommandSpec, run_step};
use buildflow_config::BuildConfig;

pub struct SourceCheckout<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a BuildConfig,
}

impl<'a> SourceCheckout<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a BuildConfig) -> Self {
        Self { runner, config }
    }

    /// `git clone --recurse-submodules <url> <project>` in the workspace root
    pub fn clone_command(&self) -> CommandSpec {
        CommandSpec::new(&self.config.toolchain.git)
            .args(["clone", "--recurse-submodules"])
            .arg(&self.config.source_url)
            .arg(&self.config.project_name)
            .current_dir(&self.config.workspace_root)
    }

    /// `git checkout <revision> --` in the checkout
    ///
    /// The same command serves branches, tags and commits. `--` keeps git
    /// from reading the revision as a path.
    pub fn checkout_command(&self) -> CommandSpec {
        CommandSpec::new(&self.config.toolchain.git)
            .arg("checkout")
            .arg(&self.config.revision)
            .arg("--")
            .current_dir(self.config.project_dir())
    }

    pub async fn fetch(&self) -> Result<(), StepFailure> {
        run_step(self.runner, &self.clone_command()).await?;
        Ok(())
    }

    pub async fn align(&self) -> Result<(), StepFailure> {
        tracing::debug!(
            revision = %self.config.revision,
            kind = %self.config.revision_kind,
            "aligning working tree"
        );
        run_step(self.runner, &self.checkout_command()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::DryRunRunner;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config(git_ref: Option<&str>) -> BuildConfig {
        let mut input: HashMap<String, String> = [
            ("GIT_CLONE_URL", "https://example.com/org/app.git"),
            ("IMAGE", "app"),
            ("HUB_USER", "robot"),
            ("HUB_TOKEN", "s3cr3t"),
            ("BUILD_ROOT", "/work"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        if let Some(r) = git_ref {
            input.insert("GIT_REF".to_string(), r.to_string());
        }
        BuildConfig::from_env(&input).unwrap()
    }

    #[test]
    fn test_clone_command() {
        let config = config(None);
        let runner = DryRunRunner::new();
        let spec = SourceCheckout::new(&runner, &config).clone_command();

        assert_eq!(
            spec.command_line(),
            "git clone --recurse-submodules https://example.com/org/app.git app"
        );
        assert_eq!(spec.cwd, Some(PathBuf::from("/work")));
    }

    #[test]
    fn test_checkout_command_default_branch() {
        let config = config(None);
        let runner = DryRunRunner::new();
        let spec = SourceCheckout::new(&runner, &config).checkout_command();

        assert_eq!(spec.command_line(), "git checkout master --");
        assert_eq!(spec.cwd, Some(PathBuf::from("/work/app")));
    }

    #[test]
    fn test_checkout_command_commit() {
        let config = config(Some("4f2a9c1"));
        let runner = DryRunRunner::new();
        let spec = SourceCheckout::new(&runner, &config).checkout_command();

        assert_eq!(spec.args, vec!["checkout", "4f2a9c1", "--"]);
    }
}
