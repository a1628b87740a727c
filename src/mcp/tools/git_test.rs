use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Map, Value, json};
use tempfile::TempDir;

use crate::dispatch::{Dispatcher, ErrorKind};
use crate::mcp::tools::git::*;
use crate::upstream::{CommandOutput, CommandRunner, Invocation, ProcessError};

/// Runner that records argument vectors and answers with a fixed output.
struct RecordingRunner {
    seen: Mutex<Vec<Vec<String>>>,
    reply: CommandOutput,
}

impl RecordingRunner {
    fn replying(code: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            reply: CommandOutput {
                exit_code: Some(code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ProcessError> {
        self.seen.lock().unwrap().push(invocation.argv());
        Ok(self.reply.clone())
    }
}

fn setup(code: i32, stdout: &str, stderr: &str) -> (TempDir, Dispatcher<GitTools<RecordingRunner>>) {
    let repo = TempDir::new().unwrap();
    let tools = GitTools::new(
        RecordingRunner::replying(code, stdout, stderr),
        Duration::from_secs(5),
    );
    (repo, Dispatcher::new(tools))
}

fn args(repo: &TempDir, extra: Value) -> Map<String, Value> {
    let mut map = extra.as_object().cloned().unwrap_or_default();
    map.insert(
        "repo_path".to_string(),
        json!(repo.path().to_str().unwrap()),
    );
    map
}

#[tokio::test]
async fn test_git_status_payload() {
    let (repo, dispatcher) = setup(0, "On branch main\nnothing to commit\n", "");

    let result = dispatcher.dispatch("git_status", &args(&repo, json!({}))).await;

    let payload = result.payload().unwrap();
    assert_eq!(payload["repo_path"], repo.path().to_str().unwrap());
    assert_eq!(payload["command"], json!(["git", "status"]));
    assert_eq!(payload["exit_code"], 0);
    assert!(payload["stdout"].as_str().unwrap().contains("On branch main"));
}

#[tokio::test]
async fn test_git_commit_failure_surfaces_stderr() {
    let (repo, dispatcher) = setup(1, "", "nothing to commit, working tree clean");

    let result = dispatcher
        .dispatch("git_commit", &args(&repo, json!({ "message": "x" })))
        .await;

    assert_eq!(result.kind(), Some(ErrorKind::UpstreamError));
    let message = result.message().unwrap();
    assert!(message.contains("nothing to commit, working tree clean"));
    assert!(message.contains("code 1"));
    assert_eq!(
        dispatcher.tool_set().runner().calls(),
        vec![vec!["git", "commit", "-m", "x"]]
    );
}

#[tokio::test]
async fn test_git_add_runs_once_with_separator() {
    let (repo, dispatcher) = setup(0, "", "");

    let result = dispatcher
        .dispatch(
            "git_add",
            &args(&repo, json!({ "files": ["src/lib.rs", "README.md"] })),
        )
        .await;

    assert!(result.is_success());
    assert_eq!(
        dispatcher.tool_set().runner().calls(),
        vec![vec!["git", "add", "--", "src/lib.rs", "README.md"]]
    );
}

#[tokio::test]
async fn test_git_add_single_string_is_accepted() {
    let (repo, dispatcher) = setup(0, "", "");

    dispatcher
        .dispatch("git_add", &args(&repo, json!({ "files": "." })))
        .await;

    assert_eq!(
        dispatcher.tool_set().runner().calls(),
        vec![vec!["git", "add", "--", "."]]
    );
}

#[tokio::test]
async fn test_git_branch_invalid_action_never_runs() {
    let (repo, dispatcher) = setup(0, "", "");

    let result = dispatcher
        .dispatch("git_branch", &args(&repo, json!({ "action": "rename" })))
        .await;

    assert_eq!(result.kind(), Some(ErrorKind::InvalidParameter));
    assert!(dispatcher.tool_set().runner().calls().is_empty());
}

#[tokio::test]
async fn test_git_branch_create_requires_name() {
    let (repo, dispatcher) = setup(0, "", "");

    let result = dispatcher
        .dispatch("git_branch", &args(&repo, json!({ "action": "create" })))
        .await;

    assert_eq!(result.kind(), Some(ErrorKind::MissingParameter));
    assert!(result.message().unwrap().contains("branch_name"));
    assert!(dispatcher.tool_set().runner().calls().is_empty());
}

#[tokio::test]
async fn test_git_branch_actions() {
    let (repo, dispatcher) = setup(0, "", "");

    for action in [
        json!({ "action": "list" }),
        json!({ "action": "create", "branch_name": "feature/x" }),
        json!({ "action": "delete", "branch_name": "old" }),
    ] {
        assert!(dispatcher.dispatch("git_branch", &args(&repo, action)).await.is_success());
    }

    assert_eq!(
        dispatcher.tool_set().runner().calls(),
        vec![
            vec!["git", "branch", "-a"],
            vec!["git", "branch", "feature/x"],
            vec!["git", "branch", "-d", "old"],
        ]
    );
}

#[tokio::test]
async fn test_option_like_values_are_refused() {
    let (repo, dispatcher) = setup(0, "", "");

    let attempts = [
        ("git_checkout", json!({ "branch": "--orphan=evil" })),
        ("git_push", json!({ "remote": "--receive-pack=sh" })),
        ("git_add", json!({ "files": ["ok.txt", "-A"] })),
        ("git_branch", json!({ "action": "delete", "branch_name": "-D" })),
    ];
    for (tool, extra) in attempts {
        let result = dispatcher.dispatch(tool, &args(&repo, extra)).await;
        assert_eq!(result.kind(), Some(ErrorKind::InvalidParameter), "{tool}");
    }
    assert!(dispatcher.tool_set().runner().calls().is_empty());
}

#[tokio::test]
async fn test_git_push_defaults_to_origin() {
    let (repo, dispatcher) = setup(0, "", "");

    dispatcher.dispatch("git_push", &args(&repo, json!({}))).await;
    dispatcher
        .dispatch("git_pull", &args(&repo, json!({ "remote": "upstream", "branch": "main" })))
        .await;

    assert_eq!(
        dispatcher.tool_set().runner().calls(),
        vec![
            vec!["git", "push", "origin"],
            vec!["git", "pull", "upstream", "main"],
        ]
    );
}

#[tokio::test]
async fn test_git_log_max_count_bounds() {
    let (repo, dispatcher) = setup(0, "abc123 first\n", "");

    let ok = dispatcher
        .dispatch("git_log", &args(&repo, json!({ "max_count": 1000 })))
        .await;
    assert!(ok.is_success());

    for bad in [0, 1001] {
        let result = dispatcher
            .dispatch("git_log", &args(&repo, json!({ "max_count": bad })))
            .await;
        assert_eq!(result.kind(), Some(ErrorKind::InvalidParameter), "{bad}");
    }

    assert_eq!(
        dispatcher.tool_set().runner().calls(),
        vec![vec!["git", "log", "--max-count=1000", "--oneline", "--decorate"]]
    );
}

#[tokio::test]
async fn test_git_diff_empty_output_message() {
    let (repo, dispatcher) = setup(0, "", "");

    let unstaged = dispatcher.dispatch("git_diff", &args(&repo, json!({}))).await;
    let staged = dispatcher
        .dispatch("git_diff", &args(&repo, json!({ "cached": true })))
        .await;

    assert_eq!(unstaged.payload().unwrap()["message"], "No changes");
    assert_eq!(staged.payload().unwrap()["message"], "No staged changes");
}

#[tokio::test]
async fn test_repo_path_must_be_directory() {
    let (repo, dispatcher) = setup(0, "", "");
    let mut map = Map::new();
    map.insert(
        "repo_path".to_string(),
        json!(repo.path().join("missing").to_str().unwrap()),
    );

    let result = dispatcher.dispatch("git_status", &map).await;

    assert_eq!(result.kind(), Some(ErrorKind::InvalidParameter));
    assert!(dispatcher.tool_set().runner().calls().is_empty());
}
