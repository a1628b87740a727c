//! Local git repository tools.
//!
//! Every tool maps to exactly one [`GitCommand`]; the repository directory is
//! checked before anything is spawned.

use std::path::Path;
use std::time::Duration;

use serde_json::{Value, json};

use super::non_blank;
use crate::dispatch::{Arguments, ParamSpec, ToolDescriptor, ToolError, ToolOutcome, ToolSet};
use crate::upstream::{CommandRunner, Git, GitCommand, GitRun};

const BRANCH_ACTIONS: &[&str] = &["list", "create", "delete"];

pub struct GitTools<R: CommandRunner> {
    git: Git<R>,
    timeout: Duration,
    descriptors: Vec<ToolDescriptor>,
}

impl<R: CommandRunner> GitTools<R> {
    /// Create the git tool set.
    ///
    /// # Arguments
    /// * `runner` - spawns the `git` processes
    /// * `timeout` - per-command limit after which the child is killed
    ///
    /// # Returns
    /// A tool set exposing the `git_*` tools.
    pub fn new(runner: R, timeout: Duration) -> Self {
        Self {
            git: Git::new(runner, timeout),
            timeout,
            descriptors: descriptors(),
        }
    }

    pub fn runner(&self) -> &R {
        self.git.runner()
    }

    /// Translate validated arguments into the one command the tool runs.
    fn command(tool: &str, args: &Arguments) -> ToolOutcome<GitCommand> {
        let remote = || args.str("remote").unwrap_or("origin").to_string();
        let branch = || args.str("branch").map(str::to_string);

        Ok(match tool {
            "git_status" => GitCommand::Status,
            "git_add" => {
                let files = args.strings("files");
                if files.is_empty() || files.iter().any(|f| f.trim().is_empty()) {
                    return Err(ToolError::invalid_parameter(
                        "files",
                        "must list at least one non-empty path",
                    ));
                }
                GitCommand::Add {
                    files: files.to_vec(),
                }
            }
            "git_commit" => GitCommand::Commit {
                message: non_blank(args, "message")?.to_string(),
            },
            "git_push" => GitCommand::Push {
                remote: remote(),
                branch: branch(),
            },
            "git_pull" => GitCommand::Pull {
                remote: remote(),
                branch: branch(),
            },
            "git_branch" => {
                let name = || {
                    args.str("branch_name")
                        .map(str::to_string)
                        .ok_or_else(|| ToolError::missing_parameter("branch_name"))
                };
                match args.required_str("action")? {
                    "create" => GitCommand::BranchCreate { name: name()? },
                    "delete" => GitCommand::BranchDelete { name: name()? },
                    _ => GitCommand::BranchList,
                }
            }
            "git_checkout" => GitCommand::Checkout {
                branch: non_blank(args, "branch")?.to_string(),
            },
            "git_log" => GitCommand::Log {
                max_count: args
                    .int("max_count")
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(10),
            },
            "git_diff" => GitCommand::Diff {
                cached: args.bool_or("cached", false),
            },
            other => return Err(ToolError::unknown_tool(other)),
        })
    }
}

impl<R: CommandRunner> ToolSet for GitTools<R> {
    fn server_name(&self) -> &'static str {
        "git"
    }

    fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn call(&self, tool: &'static str, args: Arguments) -> ToolOutcome<Value> {
        let repo_path = non_blank(&args, "repo_path")?;
        let repo = Path::new(repo_path);
        if !repo.is_dir() {
            return Err(ToolError::invalid_parameter(
                "repo_path",
                format!("{repo_path} is not a directory"),
            ));
        }

        let command = Self::command(tool, &args)?;
        let run = self.git.run(repo, &command).await?;
        Ok(payload(repo_path, &command, run))
    }
}

fn payload(repo_path: &str, command: &GitCommand, run: GitRun) -> Value {
    let mut payload = json!({
        "repo_path": repo_path,
        "command": run.argv,
        "exit_code": run.output.exit_code,
        "stdout": run.output.stdout,
        "stderr": run.output.stderr,
    });
    if let GitCommand::Diff { cached } = command {
        if run.output.stdout.trim().is_empty() {
            payload["message"] = json!(if *cached { "No staged changes" } else { "No changes" });
        }
    }
    payload
}

fn repo_path() -> ParamSpec {
    ParamSpec::string("repo_path")
        .required()
        .describe("Path to the git repository")
}

fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new("git_status", "Show the working tree status of a git repository.")
            .param(repo_path()),
        ToolDescriptor::new("git_add", "Stage files for commit.")
            .param(repo_path())
            .param(
                ParamSpec::string_array("files")
                    .required()
                    .positional()
                    .describe("Paths to stage; use [\".\"] for everything"),
            ),
        ToolDescriptor::new("git_commit", "Commit staged changes with a message.")
            .param(repo_path())
            .param(ParamSpec::string("message").required().describe("Commit message")),
        ToolDescriptor::new("git_push", "Push commits to a remote.")
            .param(repo_path())
            .param(
                ParamSpec::string("remote")
                    .default_str("origin")
                    .positional()
                    .describe("Remote name (default: origin)"),
            )
            .param(
                ParamSpec::string("branch")
                    .positional()
                    .describe("Branch to push (default: current branch)"),
            ),
        ToolDescriptor::new("git_pull", "Pull changes from a remote.")
            .param(repo_path())
            .param(
                ParamSpec::string("remote")
                    .default_str("origin")
                    .positional()
                    .describe("Remote name (default: origin)"),
            )
            .param(
                ParamSpec::string("branch")
                    .positional()
                    .describe("Branch to pull (default: current branch)"),
            ),
        ToolDescriptor::new("git_branch", "List, create or delete branches.")
            .param(repo_path())
            .param(
                ParamSpec::string("action")
                    .required()
                    .one_of(BRANCH_ACTIONS)
                    .describe("list, create or delete"),
            )
            .param(
                ParamSpec::string("branch_name")
                    .positional()
                    .describe("Branch name, required for create and delete"),
            ),
        ToolDescriptor::new("git_checkout", "Switch to another branch.")
            .param(repo_path())
            .param(
                ParamSpec::string("branch")
                    .required()
                    .positional()
                    .describe("Branch to check out"),
            ),
        ToolDescriptor::new("git_log", "Show recent commits, one line each.")
            .param(repo_path())
            .param(
                ParamSpec::integer("max_count")
                    .default_int(10)
                    .reject_outside(Some(1.0), Some(1000.0))
                    .describe("Number of commits to show (1-1000, default: 10)"),
            ),
        ToolDescriptor::new("git_diff", "Show unstaged changes, or staged ones with cached=true.")
            .param(repo_path())
            .param(
                ParamSpec::boolean("cached")
                    .default_bool(false)
                    .describe("Show staged changes instead"),
            ),
    ]
}
