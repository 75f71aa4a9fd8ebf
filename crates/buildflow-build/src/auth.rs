//! Registry login
//!
//! The token is handed to the login client on stdin, so it never appears
//! on the command line or in trace output.

use crate::error::StepFailure;
use crate::runner::{CommandRunner, CommandSpec, run_step};
use buildflow_config::BuildConfig;

pub struct RegistryAuth<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a BuildConfig,
}

impl<'a> RegistryAuth<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a BuildConfig) -> Self {
        Self { runner, config }
    }

    /// `docker login <host> --username <user> --password-stdin`
    pub fn login_command(&self) -> CommandSpec {
        let credentials = &self.config.credentials;
        CommandSpec::new(&self.config.toolchain.login)
            .arg("login")
            .arg(&self.config.registry_host)
            .arg("--username")
            .arg(&credentials.user)
            .arg("--password-stdin")
            .stdin(credentials.token.clone())
    }

    pub async fn login(&self) -> Result<(), StepFailure> {
        tracing::debug!(registry = %self.config.registry_host, "logging in");
        run_step(self.runner, &self.login_command()).await?;
        Ok(())
    }
}
