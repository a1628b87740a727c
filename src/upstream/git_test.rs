use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::dispatch::{ErrorKind, ToolError};
use crate::upstream::git::*;
use crate::upstream::process::{CommandOutput, CommandRunner, Invocation, ProcessError};

/// Runner that records invocations and replays one canned result.
struct ScriptedRunner {
    seen: Mutex<Vec<Invocation>>,
    reply: fn() -> Result<CommandOutput, ProcessError>,
}

impl ScriptedRunner {
    fn new(reply: fn() -> Result<CommandOutput, ProcessError>) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            reply,
        }
    }
}

impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ProcessError> {
        self.seen.lock().unwrap().push(invocation.clone());
        (self.reply)()
    }
}

fn output(code: i32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(code),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

#[test]
fn test_command_argument_vectors() {
    let cases: Vec<(GitCommand, Vec<&str>)> = vec![
        (GitCommand::Status, vec!["status"]),
        (
            GitCommand::Add {
                files: vec!["src/main.rs".into(), "*.md".into()],
            },
            vec!["add", "--", "src/main.rs", "*.md"],
        ),
        (
            GitCommand::Commit {
                message: "fix: handle; rm -rf /".into(),
            },
            vec!["commit", "-m", "fix: handle; rm -rf /"],
        ),
        (
            GitCommand::Push {
                remote: "origin".into(),
                branch: None,
            },
            vec!["push", "origin"],
        ),
        (
            GitCommand::Pull {
                remote: "upstream".into(),
                branch: Some("main".into()),
            },
            vec!["pull", "upstream", "main"],
        ),
        (GitCommand::BranchList, vec!["branch", "-a"]),
        (
            GitCommand::BranchCreate {
                name: "feature".into(),
            },
            vec!["branch", "feature"],
        ),
        (
            GitCommand::BranchDelete {
                name: "feature".into(),
            },
            vec!["branch", "-d", "feature"],
        ),
        (
            GitCommand::Checkout {
                branch: "dev".into(),
            },
            vec!["checkout", "dev"],
        ),
        (
            GitCommand::Log { max_count: 5 },
            vec!["log", "--max-count=5", "--oneline", "--decorate"],
        ),
        (GitCommand::Diff { cached: false }, vec!["diff"]),
        (GitCommand::Diff { cached: true }, vec!["diff", "--cached"]),
    ];

    for (command, expected) in cases {
        assert_eq!(command.args(), expected, "{command:?}");
    }
}

#[tokio::test]
async fn test_run_success_returns_argv_and_output() {
    let git = Git::new(
        ScriptedRunner::new(|| Ok(output(0, "On branch main\n", ""))),
        Duration::from_secs(30),
    );

    let run = git.run(Path::new("/tmp/repo"), &GitCommand::Status).await.unwrap();

    assert_eq!(run.argv, vec!["git", "status"]);
    assert!(run.output.stdout.contains("On branch main"));

    let seen = git.runner().seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].cwd, Path::new("/tmp/repo"));
    assert_eq!(seen[0].timeout, Duration::from_secs(30));
    assert_eq!(
        seen[0].env,
        vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())]
    );
}

#[tokio::test]
async fn test_non_zero_exit_carries_stderr() {
    let git = Git::new(
        ScriptedRunner::new(|| {
            Ok(output(
                1,
                "On branch main\nnothing to commit, working tree clean\n",
                "",
            ))
        }),
        Duration::from_secs(30),
    );

    let err = git
        .run(
            Path::new("/tmp/repo"),
            &GitCommand::Commit {
                message: "x".into(),
            },
        )
        .await
        .unwrap_err();

    match &err {
        GitError::NonZeroExit {
            subcommand,
            code,
            output,
        } => {
            assert_eq!(subcommand, "commit");
            assert_eq!(*code, 1);
            assert!(output.contains("nothing to commit"));
        }
        other => panic!("Expected NonZeroExit, got {other:?}"),
    }

    let tool_error: ToolError = err.into();
    assert_eq!(tool_error.kind, ErrorKind::UpstreamError);
    assert!(tool_error.message.contains("code 1"));
}

#[tokio::test]
async fn test_git_not_found_is_upstream_error() {
    let git = Git::new(
        ScriptedRunner::new(|| {
            Err(ProcessError::NotFound {
                program: "git".into(),
            })
        }),
        Duration::from_secs(30),
    );

    let err = git.run(Path::new("/tmp/repo"), &GitCommand::Status).await.unwrap_err();
    let tool_error: ToolError = err.into();
    assert_eq!(tool_error.kind, ErrorKind::UpstreamError);
    assert!(tool_error.message.contains("not installed"));
}

#[tokio::test]
async fn test_process_timeout_maps_to_timeout() {
    let git = Git::new(
        ScriptedRunner::new(|| {
            Err(ProcessError::TimedOut {
                program: "git".into(),
                after: Duration::from_secs(30),
            })
        }),
        Duration::from_secs(30),
    );

    let err = git
        .run(
            Path::new("/tmp/repo"),
            &GitCommand::Pull {
                remote: "origin".into(),
                branch: None,
            },
        )
        .await
        .unwrap_err();
    let tool_error: ToolError = err.into();
    assert_eq!(tool_error.kind, ErrorKind::Timeout);
}
