//! buildflow image build pipeline
//!
//! Clones a repository, checks out the requested revision, logs in to the
//! registry, builds the image and pushes it. Every step is an external
//! program run through a [`CommandRunner`]; this crate only decides which
//! programs run, in what order and with which arguments.

pub mod auth;
pub mod builder;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod pusher;
pub mod resolver;
pub mod runner;
pub mod source;

pub use auth::RegistryAuth;
pub use builder::ImageBuilder;
pub use error::{PipelineError, Result, RunError, StepFailure};
pub use pipeline::{Pipeline, PipelineReport, PipelineState, Stage};
pub use progress::BuildProgress;
pub use pusher::ImagePusher;
pub use resolver::{BuildArg, BuildArgs, BuildResolver, resolve_build_args};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, DryRunRunner, ProcessRunner};
pub use source::SourceCheckout;
