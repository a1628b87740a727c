//! Git command-line operations.
//!
//! The set of git subcommands the git tools can reach is closed: each
//! [`GitCommand`] variant renders to one fixed argument vector built from
//! typed fields. Caller values only ever land in positional slots.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use super::process::{CommandOutput, CommandRunner, Invocation, ProcessError};
use crate::dispatch::ToolError;

/// Errors that can occur during git operations.
#[derive(Error, Diagnostic, Debug)]
pub enum GitError {
    #[error(transparent)]
    #[diagnostic(code(toolbelt::git::process))]
    Process(#[from] ProcessError),

    #[error("git {subcommand} exited with code {code}: {output}")]
    #[diagnostic(code(toolbelt::git::non_zero_exit))]
    NonZeroExit {
        subcommand: String,
        code: i32,
        output: String,
    },
}

impl From<GitError> for ToolError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::Process(process) => process.into(),
            other => ToolError::upstream(other.to_string()),
        }
    }
}

/// Every git invocation the tools can make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCommand {
    Status,
    Add { files: Vec<String> },
    Commit { message: String },
    Push { remote: String, branch: Option<String> },
    Pull { remote: String, branch: Option<String> },
    BranchList,
    BranchCreate { name: String },
    BranchDelete { name: String },
    Checkout { branch: String },
    Log { max_count: u32 },
    Diff { cached: bool },
}

impl GitCommand {
    pub fn subcommand(&self) -> &'static str {
        match self {
            GitCommand::Status => "status",
            GitCommand::Add { .. } => "add",
            GitCommand::Commit { .. } => "commit",
            GitCommand::Push { .. } => "push",
            GitCommand::Pull { .. } => "pull",
            GitCommand::BranchList | GitCommand::BranchCreate { .. } | GitCommand::BranchDelete { .. } => {
                "branch"
            }
            GitCommand::Checkout { .. } => "checkout",
            GitCommand::Log { .. } => "log",
            GitCommand::Diff { .. } => "diff",
        }
    }

    /// Arguments following `git`.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.subcommand().to_string()];
        match self {
            GitCommand::Status | GitCommand::Diff { cached: false } => {}
            GitCommand::Add { files } => {
                args.push("--".into());
                args.extend(files.iter().cloned());
            }
            GitCommand::Commit { message } => {
                args.push("-m".into());
                args.push(message.clone());
            }
            GitCommand::Push { remote, branch } | GitCommand::Pull { remote, branch } => {
                args.push(remote.clone());
                if let Some(branch) = branch {
                    args.push(branch.clone());
                }
            }
            GitCommand::BranchList => args.push("-a".into()),
            GitCommand::BranchCreate { name } => args.push(name.clone()),
            GitCommand::BranchDelete { name } => {
                args.push("-d".into());
                args.push(name.clone());
            }
            GitCommand::Checkout { branch } => args.push(branch.clone()),
            GitCommand::Log { max_count } => {
                args.push(format!("--max-count={max_count}"));
                args.push("--oneline".into());
                args.push("--decorate".into());
            }
            GitCommand::Diff { cached: true } => args.push("--cached".into()),
        }
        args
    }
}

/// A successful git run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRun {
    pub argv: Vec<String>,
    pub output: CommandOutput,
}

/// Runs [`GitCommand`]s through a [`CommandRunner`].
#[derive(Debug, Clone)]
pub struct Git<R: CommandRunner> {
    runner: R,
    program: String,
    timeout: Duration,
}

impl<R: CommandRunner> Git<R> {
    pub fn new(runner: R, timeout: Duration) -> Self {
        Self {
            runner,
            program: "git".to_string(),
            timeout,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn invocation(&self, repo: &Path, command: &GitCommand) -> Invocation {
        Invocation {
            program: self.program.clone(),
            args: command.args(),
            cwd: PathBuf::from(repo),
            timeout: self.timeout,
            // Fail instead of waiting on a credential prompt nobody can answer.
            env: vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())],
        }
    }

    /// Run one command; non-zero exit becomes [`GitError::NonZeroExit`].
    pub async fn run(&self, repo: &Path, command: &GitCommand) -> Result<GitRun, GitError> {
        let invocation = self.invocation(repo, command);
        let output = self.runner.run(&invocation).await?;
        let argv = invocation.argv();
        check_output(command, argv, output)
    }
}

fn check_output(
    command: &GitCommand,
    argv: Vec<String>,
    output: CommandOutput,
) -> Result<GitRun, GitError> {
    if output.success() {
        return Ok(GitRun { argv, output });
    }

    let code = output.exit_code.unwrap_or(-1);
    let stdout = output.stdout.trim();
    let stderr = output.stderr.trim();
    // Combine stdout and stderr for the error message
    let combined = match (stdout.is_empty(), stderr.is_empty()) {
        (false, false) => format!("{stderr}\n{stdout}"),
        (false, true) => stdout.to_string(),
        _ => stderr.to_string(),
    };
    Err(GitError::NonZeroExit {
        subcommand: command.subcommand().to_string(),
        code,
        output: combined,
    })
}
