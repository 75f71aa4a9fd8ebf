//! External command execution
//!
//! Every pipeline step goes through a [`CommandRunner`]. [`ProcessRunner`]
//! spawns the program for real, [`DryRunRunner`] only prints what would run.

use crate::error::{RunError, StepFailure};
use async_trait::async_trait;
use buildflow_config::Secret;
use buildflow_config::secret::MASK;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout, Command};

/// A program invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Written to the child's stdin, then stdin is closed.
    pub stdin: Option<Secret>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdin(mut self, secret: Secret) -> Self {
        self.stdin = Some(secret);
        self
    }

    /// Program and arguments joined by spaces, as shown in trace output
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a finished program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    /// stdout and stderr, interleaved in arrival order
    pub output: String,
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a program to completion
    ///
    /// A non-zero exit is reported through [`CommandOutput::success`];
    /// `Err` means the program could not be run at all.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunError>;
}

/// Run a step command and turn a non-zero exit into a [`StepFailure`].
pub async fn run_step(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
) -> Result<CommandOutput, StepFailure> {
    let output = runner.run(spec).await?;
    if output.success {
        Ok(output)
    } else {
        Err(StepFailure::Exited {
            code: output.code,
            output: output.output,
        })
    }
}

/// Masks known secret values in text
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    secrets: Vec<Secret>,
}

impl Redactor {
    pub fn add(&mut self, secret: &Secret) {
        if !secret.is_empty() {
            self.secrets.push(secret.clone());
        }
    }

    /// Replace every occurrence of each secret with the mask.
    ///
    /// Matching is plain substring replacement with no minimum length, so a
    /// very short secret also masks the same characters in unrelated text.
    pub fn redact(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, s| acc.replace(s.expose(), MASK))
    }
}

fn trace_line(command_line: &str) -> String {
    format!(
        "[{}] Run CMD: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        command_line
    )
}

/// Spawns programs with tokio and streams their output to stdout
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    redactor: Redactor,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mask `secret` in trace lines and command output.
    pub fn with_secret(mut self, secret: &Secret) -> Self {
        self.redactor.add(secret);
        self
    }

    async fn drain(&self, stdout: ChildStdout, stderr: ChildStderr) -> io::Result<String> {
        let mut out = BufReader::new(stdout).split(b'\n');
        let mut err = BufReader::new(stderr).split(b'\n');
        let (mut out_done, mut err_done) = (false, false);
        let mut captured = String::new();

        while !(out_done && err_done) {
            tokio::select! {
                segment = out.next_segment(), if !out_done => match segment? {
                    Some(line) => self.emit(&line, &mut captured),
                    None => out_done = true,
                },
                segment = err.next_segment(), if !err_done => match segment? {
                    Some(line) => self.emit(&line, &mut captured),
                    None => err_done = true,
                },
            }
        }

        Ok(captured)
    }

    fn emit(&self, raw: &[u8], captured: &mut String) {
        let text = String::from_utf8_lossy(raw);
        let line = self.redactor.redact(text.trim_end_matches(['\n', '\r']));
        println!("{}", line);
        captured.push_str(&line);
        captured.push('\n');
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunError> {
        println!("{}", trace_line(&self.redactor.redact(&spec.command_line())));
        tracing::debug!(program = %spec.program, cwd = ?spec.cwd, "spawning command");

        let io_err = |source: io::Error| RunError::Io {
            program: spec.program.clone(),
            source,
        };

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| RunError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(io_err(io::Error::other("output pipes not captured")));
        };

        // stdin is fed while the output is drained
        let (fed, captured) = tokio::join!(
            feed_stdin(&spec.program, child.stdin.take(), spec.stdin.as_ref()),
            self.drain(stdout, stderr),
        );
        fed.map_err(io_err)?;
        let captured = captured.map_err(io_err)?;

        let status = child.wait().await.map_err(io_err)?;
        tracing::debug!(program = %spec.program, ?status, "command finished");

        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            output: captured,
        })
    }
}

/// Write `secret` to the child's stdin, then close it.
///
/// A child that exits without reading stdin is not an error here; its exit
/// status and output are reported like any other run.
async fn feed_stdin(
    program: &str,
    stdin: Option<ChildStdin>,
    secret: Option<&Secret>,
) -> io::Result<()> {
    let (Some(mut stdin), Some(secret)) = (stdin, secret) else {
        return Ok(());
    };

    match stdin.write_all(secret.expose().as_bytes()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            tracing::warn!(program, "stdin closed before the input was written");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Prints each command instead of running it
#[derive(Debug, Clone, Default)]
pub struct DryRunRunner {
    redactor: Redactor,
}

impl DryRunRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, secret: &Secret) -> Self {
        self.redactor.add(secret);
        self
    }
}

#[async_trait]
impl CommandRunner for DryRunRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunError> {
        println!(
            "{} (dry run)",
            trace_line(&self.redactor.redact(&spec.command_line()))
        );
        if let Some(dir) = &spec.cwd {
            println!("    in {}", dir.display());
        }

        Ok(CommandOutput {
            success: true,
            code: Some(0),
            output: String::new(),
        })
    }
}
