use anyhow::anyhow;
use buildflow_build::{CommandRunner, DryRunRunner, Pipeline, ProcessRunner};
use buildflow_config::{BuildConfig, snapshot_env};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

/// Clone a git repository, build its image and push it to a registry.
///
/// Build parameters come from the environment: GIT_CLONE_URL, GIT_REF,
/// GIT_TYPE, IMAGE, IMAGE_TAG, EXTRA_IMAGE_TAG, BUILD_WORKDIR,
/// DOCKERFILE_PATH, BUILD_ARGS, NO_CACHE, HUB_USER, HUB_TOKEN, BUILD_ROOT.
#[derive(Parser)]
#[command(name = "buildflow", version)]
struct Cli {
    /// Directory the repository is cloned into [default: BUILD_ROOT or /root/src]
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Print the commands without running them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // ログはstderr、ビルド出力はstdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => {
            println!("{}", "BUILD SUCCEED".green().bold());
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", e.to_string().red());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config =
        BuildConfig::from_env(&snapshot_env()).map_err(|e| anyhow!("BUILDER FAILED: {}", e))?;
    if let Some(workspace) = cli.workspace {
        config = config.with_workspace_root(workspace);
    }

    println!("Project: {}", config.project_name.cyan());
    println!(
        "Revision: {} ({})",
        config.revision.cyan(),
        config.revision_kind
    );
    println!("Image: {}", config.image.to_string().cyan());
    println!("Workspace: {}", config.workspace_root.display());

    let token = &config.credentials.token;
    let runner: Box<dyn CommandRunner> = if cli.dry_run {
        tracing::info!("dry run, no command will be executed");
        Box::new(DryRunRunner::new().with_secret(token))
    } else {
        Box::new(ProcessRunner::new().with_secret(token))
    };

    let mut pipeline = Pipeline::new(&config, runner.as_ref());
    if cli.dry_run {
        pipeline = pipeline.skip_workspace_preparation();
    }

    let report = pipeline
        .run()
        .await
        .map_err(|e| anyhow!("BUILD FAILED: {}", e.user_message()))?;

    for image in &report.pushed {
        println!("Pushed {}", image.to_string().cyan());
    }

    Ok(())
}
