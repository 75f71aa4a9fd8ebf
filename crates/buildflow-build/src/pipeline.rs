//! Build pipeline orchestration
//!
//! Runs the steps strictly in order:
//!
//! `Start → SourceFetched → RevisionAligned → RegistryAuthenticated →
//! ImageBuilt → ImagePushed → Done`
//!
//! The first failing step stops the pipeline. Nothing is retried or rolled
//! back: a clone or registry session left behind by earlier steps stays.

use crate::auth::RegistryAuth;
use crate::builder::ImageBuilder;
use crate::error::{PipelineError, Result};
use crate::progress::BuildProgress;
use crate::pusher::ImagePusher;
use crate::resolver::BuildArgs;
use crate::runner::CommandRunner;
use crate::source::SourceCheckout;
use buildflow_config::{BuildConfig, ImageRef};
use std::fmt;
use std::io;
use std::path::Path;

/// Pipeline steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Prepare,
    SourceFetch,
    RevisionAlign,
    RegistryAuthenticate,
    ImageBuild,
    ImagePush,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Prepare => "prepare workspace",
            Stage::SourceFetch => "source fetch",
            Stage::RevisionAlign => "revision align",
            Stage::RegistryAuthenticate => "registry authenticate",
            Stage::ImageBuild => "image build",
            Stage::ImagePush => "image push",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    SourceFetched,
    RevisionAligned,
    RegistryAuthenticated,
    ImageBuilt,
    ImagePushed,
    Done,
    Failed(Stage),
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub pushed: Vec<ImageRef>,
    pub build_args: BuildArgs,
}

pub struct Pipeline<'a> {
    config: &'a BuildConfig,
    runner: &'a dyn CommandRunner,
    prepare_workspace: bool,
    state: PipelineState,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a BuildConfig, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            runner,
            prepare_workspace: true,
            state: PipelineState::Start,
        }
    }

    /// Leave the workspace root alone (dry runs).
    pub fn skip_workspace_preparation(mut self) -> Self {
        self.prepare_workspace = false;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub async fn run(&mut self) -> Result<PipelineReport> {
        match self.execute().await {
            Ok(report) => {
                self.transition(PipelineState::Done);
                Ok(report)
            }
            Err(e) => {
                BuildProgress::failed(e.stage(), &e.to_string());
                self.transition(PipelineState::Failed(e.stage()));
                Err(e)
            }
        }
    }

    async fn execute(&mut self) -> Result<PipelineReport> {
        let (config, runner) = (self.config, self.runner);

        if self.prepare_workspace {
            ensure_dir_exists(&config.workspace_root).map_err(|source| {
                PipelineError::Workspace {
                    path: config.workspace_root.clone(),
                    source,
                }
            })?;
        }

        let source = SourceCheckout::new(runner, config);

        BuildProgress::started(Stage::SourceFetch);
        source.fetch().await.map_err(PipelineError::CheckoutFailed)?;
        BuildProgress::succeeded(&format!("Clone project {} succeed.", config.source_url));
        self.transition(PipelineState::SourceFetched);

        BuildProgress::started(Stage::RevisionAlign);
        source.align().await.map_err(PipelineError::RevisionFailed)?;
        BuildProgress::succeeded(&format!("Switch to {} succeed.", config.revision));
        self.transition(PipelineState::RevisionAligned);

        BuildProgress::started(Stage::RegistryAuthenticate);
        RegistryAuth::new(runner, config)
            .login()
            .await
            .map_err(PipelineError::AuthFailed)?;
        BuildProgress::succeeded(&format!("Login to {} succeed.", config.registry_host));
        self.transition(PipelineState::RegistryAuthenticated);

        BuildProgress::started(Stage::ImageBuild);
        let build_args = ImageBuilder::new(runner, config)
            .build()
            .await
            .map_err(PipelineError::BuildFailed)?;
        if let BuildArgs::Degraded { reason } = &build_args {
            BuildProgress::degraded(&format!(
                "BUILD_ARGS ignored, built without build args: {}",
                reason
            ));
        }
        BuildProgress::succeeded(&format!("Build {} succeed.", config.image));
        self.transition(PipelineState::ImageBuilt);

        BuildProgress::started(Stage::ImagePush);
        let pushed = ImagePusher::new(runner, config)
            .push_all()
            .await
            .map_err(PipelineError::PushFailed)?;
        BuildProgress::succeeded(&format!("Push {} succeed.", config.image));
        self.transition(PipelineState::ImagePushed);

        Ok(PipelineReport { pushed, build_args })
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::info!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }
}

/// Create `dir` if missing; fail if something else is in the way.
fn ensure_dir_exists(dir: &Path) -> io::Result<()> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("{} is not a directory", dir.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => std::fs::create_dir_all(dir),
        Err(e) => Err(e),
    }
}
