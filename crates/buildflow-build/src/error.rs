use crate::pipeline::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// The runner could not execute a program at all.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to talk to {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single pipeline step failed
#[derive(Debug, Error)]
pub enum StepFailure {
    #[error("{}", exit_label(.code))]
    Exited { code: Option<i32>, output: String },

    #[error(transparent)]
    Run(#[from] RunError),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl StepFailure {
    /// Captured output of the failed command, if it ran.
    pub fn output(&self) -> Option<&str> {
        match self {
            StepFailure::Exited { output, .. } => Some(output),
            StepFailure::Run(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("preparing workspace {} failed: {source}", .path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("clone project failed: {0}")]
    CheckoutFailed(StepFailure),

    #[error("switch to git ref failed: {0}")]
    RevisionFailed(StepFailure),

    #[error("registry login failed: {0}")]
    AuthFailed(StepFailure),

    #[error("image build failed: {0}")]
    BuildFailed(StepFailure),

    #[error("image push failed: {0}")]
    PushFailed(StepFailure),
}

impl PipelineError {
    /// Step at which the pipeline stopped
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Workspace { .. } => Stage::Prepare,
            PipelineError::CheckoutFailed(_) => Stage::SourceFetch,
            PipelineError::RevisionFailed(_) => Stage::RevisionAlign,
            PipelineError::AuthFailed(_) => Stage::RegistryAuthenticate,
            PipelineError::BuildFailed(_) => Stage::ImageBuild,
            PipelineError::PushFailed(_) => Stage::ImagePush,
        }
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        match self {
            PipelineError::Workspace { .. } => None,
            PipelineError::CheckoutFailed(f)
            | PipelineError::RevisionFailed(f)
            | PipelineError::AuthFailed(f)
            | PipelineError::BuildFailed(f)
            | PipelineError::PushFailed(f) => Some(f),
        }
    }

    /// One human-readable line naming the failing phase
    pub fn user_message(&self) -> String {
        format!("[{}] {}", self.stage(), self)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
