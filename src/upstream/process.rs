//! Bounded subprocess execution.
//!
//! Commands are always spawned from a program name plus an argument vector;
//! nothing goes through a shell. A child that outlives its timeout is killed.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::dispatch::{ErrorKind, ToolError};

/// Errors that can occur while running a subprocess.
#[derive(Error, Diagnostic, Debug)]
pub enum ProcessError {
    #[error("{program} not installed or not in PATH")]
    #[diagnostic(code(toolbelt::process::not_found))]
    NotFound { program: String },

    #[error("Failed to run {program}: {message}")]
    #[diagnostic(code(toolbelt::process::spawn_failed))]
    Spawn { program: String, message: String },

    #[error("{program} timed out after {} seconds", .after.as_secs())]
    #[diagnostic(code(toolbelt::process::timed_out))]
    TimedOut { program: String, after: Duration },
}

impl From<ProcessError> for ToolError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::TimedOut { .. } => ToolError::new(ErrorKind::Timeout, err.to_string()),
            _ => ToolError::upstream(err.to_string()),
        }
    }
}

/// One fully specified command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
    /// Extra environment variables set for the child.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// `program` followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs invocations. Substituted in tests to observe argument vectors.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        invocation: &Invocation,
    ) -> impl Future<Output = Result<CommandOutput, ProcessError>> + Send;
}

/// Real implementation using `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRunner;

impl TokioRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for TokioRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ProcessError> {
        debug!(argv = ?invocation.argv(), cwd = %invocation.cwd.display(), "spawning command");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the output future on timeout kills the child.
            .kill_on_drop(true);

        let output = match tokio::time::timeout(invocation.timeout, command.output()).await {
            Ok(result) => result.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProcessError::NotFound {
                        program: invocation.program.clone(),
                    }
                } else {
                    ProcessError::Spawn {
                        program: invocation.program.clone(),
                        message: e.to_string(),
                    }
                }
            })?,
            Err(_) => {
                return Err(ProcessError::TimedOut {
                    program: invocation.program.clone(),
                    after: invocation.timeout,
                });
            }
        };

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: clean(&output.stdout),
            stderr: clean(&output.stderr),
        })
    }
}

/// Lossy UTF-8 with terminal escape sequences removed.
fn clean(bytes: &[u8]) -> String {
    String::from_utf8_lossy(&strip_ansi_escapes::strip(bytes)).into_owned()
}
