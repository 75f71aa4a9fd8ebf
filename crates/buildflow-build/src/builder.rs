use crate::error::StepFailure;
use crate::resolver::{BuildArgs, BuildResolver};
use crate::runner::{CommandRunner, CommandSpec, run_step};
use buildflow_config::BuildConfig;

pub struct ImageBuilder<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a BuildConfig,
}

impl<'a> ImageBuilder<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a BuildConfig) -> Self {
        Self { runner, config }
    }

    /// Build command for the given build args
    ///
    /// `buildah bud [-f <dockerfile>] [--no-cache] -t <ref>... [--build-arg K=V]... <context>`
    pub fn build_command(&self, build_args: &BuildArgs) -> CommandSpec {
        let resolver = BuildResolver::new(self.config);
        let mut cmd = CommandSpec::new(&self.config.toolchain.image).arg("bud");

        if let Some(dockerfile) = resolver.resolve_dockerfile() {
            cmd = cmd.arg("-f").arg(dockerfile.to_string_lossy());
        }

        if self.config.no_cache {
            cmd = cmd.arg("--no-cache");
        }

        for image in self.config.image_refs() {
            cmd = cmd.arg("-t").arg(image.to_string());
        }

        for build_arg in build_args.args() {
            cmd = cmd.arg("--build-arg").arg(build_arg.to_string());
        }

        cmd.arg(resolver.resolve_context().to_string_lossy())
            .current_dir(&self.config.workspace_root)
    }

    /// Run the image build.
    ///
    /// Returns the build args that were used, so a degraded `BUILD_ARGS`
    /// can be reported by the caller.
    pub async fn build(&self) -> Result<BuildArgs, StepFailure> {
        tracing::info!("Building image: {}", self.config.image);

        let build_args = BuildResolver::new(self.config).resolve_build_args();
        if !build_args.args().is_empty() {
            let keys: Vec<&str> = build_args.args().iter().map(|a| a.key.as_str()).collect();
            tracing::debug!("Build args: {:?}", keys);
        }

        run_step(self.runner, &self.build_command(&build_args)).await?;

        tracing::info!("Successfully built: {}", self.config.image);
        Ok(build_args)
    }
}
