use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Map, Value, json};

use crate::dispatch::{Dispatcher, ErrorKind};
use crate::mcp::tools::github::*;
use crate::upstream::HttpError;
use crate::upstream::github::{GitHubApi, Query};

#[derive(Debug, Clone, PartialEq)]
struct Recorded {
    method: &'static str,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

/// GitHub API stub answering from a path-keyed table.
#[derive(Default)]
struct StubApi {
    responses: HashMap<String, Value>,
    calls: Mutex<Vec<Recorded>>,
}

impl StubApi {
    fn respond(mut self, path: &str, value: Value) -> Self {
        self.responses.insert(path.to_string(), value);
        self
    }

    fn recorded(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, path: &str) -> Result<Value, HttpError> {
        self.responses
            .get(path)
            .cloned()
            .ok_or_else(|| HttpError::Status {
                status: 404,
                message: "Not Found".to_string(),
            })
    }
}

impl GitHubApi for StubApi {
    async fn get(&self, _token: &str, path: &str, query: &Query) -> Result<Value, HttpError> {
        self.calls.lock().unwrap().push(Recorded {
            method: "GET",
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            body: None,
        });
        self.answer(path)
    }

    async fn post(&self, _token: &str, path: &str, body: &Value) -> Result<Value, HttpError> {
        self.calls.lock().unwrap().push(Recorded {
            method: "POST",
            path: path.to_string(),
            query: Vec::new(),
            body: Some(body.clone()),
        });
        self.answer(path)
    }
}

fn dispatcher(api: StubApi) -> Dispatcher<GitHubTools<StubApi>> {
    Dispatcher::new(GitHubTools::new(
        api,
        Some("ghp_test".to_string()),
        Duration::from_secs(5),
    ))
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_repo_ref_forms() {
    let expected = RepoRef {
        owner: "rust-lang".to_string(),
        name: "cargo".to_string(),
    };
    for input in [
        "rust-lang/cargo",
        "rust-lang/cargo.git",
        " rust-lang/cargo ",
        "github.com/rust-lang/cargo",
        "https://github.com/rust-lang/cargo",
        "https://github.com/rust-lang/cargo/",
        "https://github.com/rust-lang/cargo/pull/42",
        "http://www.github.com/rust-lang/cargo.git",
    ] {
        assert_eq!(RepoRef::parse(input).unwrap(), expected, "{input}");
    }
    assert_eq!(expected.to_string(), "rust-lang/cargo");
}

#[test]
fn test_repo_ref_malformed() {
    for input in [
        "",
        "cargo",
        "a/b/c",
        "https://gitlab.com/rust-lang/cargo",
        "https://github.com/rust-lang",
        "../etc/passwd",
        "owner/re po",
    ] {
        let err = RepoRef::parse(input).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidParameter, "{input}");
    }
}

#[tokio::test]
async fn test_get_repo_info_is_idempotent() {
    let api = StubApi::default().respond(
        "repos/octo/hello",
        json!({
            "name": "hello",
            "full_name": "octo/hello",
            "description": "Greeting service",
            "html_url": "https://github.com/octo/hello",
            "stargazers_count": 42,
            "forks_count": 3,
            "open_issues_count": 1,
            "default_branch": "main",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-06-01T12:00:00Z"
        }),
    );
    let dispatcher = dispatcher(api);
    let call = args(json!({ "repo": "octo/hello" }));

    let first = dispatcher.dispatch("get_repo_info", &call).await;
    let second = dispatcher.dispatch("get_repo_info", &call).await;

    assert_eq!(first, second);
    let payload = first.payload().unwrap();
    assert_eq!(payload["stars"], 42);
    assert_eq!(payload["default_branch"], "main");
    assert_eq!(payload["created_at"], 1704067200);
    assert_eq!(payload["updated_at"], 1717243200);
}

#[tokio::test]
async fn test_missing_token_is_configuration_error() {
    let dispatcher = Dispatcher::new(GitHubTools::new(
        StubApi::default(),
        None,
        Duration::from_secs(5),
    ));

    let result = dispatcher
        .dispatch("list_branches", &args(json!({ "repo": "octo/hello" })))
        .await;

    assert_eq!(result.kind(), Some(ErrorKind::ConfigurationMissing));
    assert!(result.message().unwrap().contains("GITHUB_TOKEN"));
    assert!(dispatcher.tool_set().api().recorded().is_empty());
}

#[tokio::test]
async fn test_list_pull_requests_passes_state() {
    let api = StubApi::default().respond(
        "repos/octo/hello/pulls",
        json!([
            { "number": 7, "title": "Add feature", "state": "closed", "user": { "login": "alice" } }
        ]),
    );
    let dispatcher = dispatcher(api);

    let result = dispatcher
        .dispatch(
            "list_pull_requests",
            &args(json!({ "repo": "https://github.com/octo/hello", "state": "closed" })),
        )
        .await;

    let payload = result.payload().unwrap();
    assert_eq!(payload["repo"], "octo/hello");
    assert_eq!(payload["state"], "closed");
    assert_eq!(
        payload["pull_requests"],
        json!([{ "number": 7, "title": "Add feature", "state": "closed", "author": "alice" }])
    );
    let calls = dispatcher.tool_set().api().recorded();
    assert_eq!(calls[0].query, vec![("state".to_string(), "closed".to_string())]);
}

#[tokio::test]
async fn test_invalid_state_is_rejected() {
    let dispatcher = dispatcher(StubApi::default());

    let result = dispatcher
        .dispatch(
            "list_issues",
            &args(json!({ "repo": "octo/hello", "state": "merged" })),
        )
        .await;

    assert_eq!(result.kind(), Some(ErrorKind::InvalidParameter));
    assert!(dispatcher.tool_set().api().recorded().is_empty());
}

#[tokio::test]
async fn test_list_issues_filters_pull_requests() {
    let api = StubApi::default().respond(
        "repos/octo/hello/issues",
        json!([
            { "number": 1, "title": "Bug", "state": "open", "user": { "login": "bob" },
              "labels": [{ "name": "bug" }], "created_at": "2024-01-01T00:00:00Z" },
            { "number": 2, "title": "PR", "state": "open", "user": { "login": "bob" },
              "labels": [], "pull_request": { "url": "x" } }
        ]),
    );
    let dispatcher = dispatcher(api);

    let result = dispatcher
        .dispatch("list_issues", &args(json!({ "repo": "octo/hello" })))
        .await;

    let issues = result.payload().unwrap()["issues"].as_array().unwrap().clone();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["number"], 1);
    assert_eq!(issues[0]["labels"], json!(["bug"]));
}

#[tokio::test]
async fn test_create_issue_posts_once() {
    let api = StubApi::default().respond(
        "repos/octo/hello/issues",
        json!({ "number": 12, "title": "Crash", "html_url": "https://github.com/octo/hello/issues/12" }),
    );
    let dispatcher = dispatcher(api);

    let result = dispatcher
        .dispatch(
            "create_issue",
            &args(json!({ "repo": "octo/hello", "title": "Crash", "labels": ["bug"] })),
        )
        .await;

    assert_eq!(
        result.payload().unwrap(),
        &json!({ "number": 12, "title": "Crash", "url": "https://github.com/octo/hello/issues/12" })
    );
    let calls = dispatcher.tool_set().api().recorded();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "POST");
    assert_eq!(
        calls[0].body,
        Some(json!({ "title": "Crash", "body": "", "labels": ["bug"] }))
    );
}

#[tokio::test]
async fn test_create_pull_request_defaults_base() {
    let api = StubApi::default().respond(
        "repos/octo/hello/pulls",
        json!({ "number": 8, "title": "Feature", "html_url": "https://github.com/octo/hello/pull/8" }),
    );
    let dispatcher = dispatcher(api);

    dispatcher
        .dispatch(
            "create_pull_request",
            &args(json!({ "repo": "octo/hello", "title": "Feature", "head": "feature" })),
        )
        .await;

    let calls = dispatcher.tool_set().api().recorded();
    assert_eq!(
        calls[0].body,
        Some(json!({ "title": "Feature", "head": "feature", "base": "main", "body": "" }))
    );
}

#[tokio::test]
async fn test_get_pull_request_number_bounds() {
    let dispatcher = dispatcher(StubApi::default());

    let result = dispatcher
        .dispatch(
            "get_pull_request",
            &args(json!({ "repo": "octo/hello", "pr_number": 0 })),
        )
        .await;

    assert_eq!(result.kind(), Some(ErrorKind::InvalidParameter));
    assert!(dispatcher.tool_set().api().recorded().is_empty());
}

#[tokio::test]
async fn test_get_file_content_decodes_base64() {
    let api = StubApi::default().respond(
        "repos/octo/hello/contents/src/main.rs",
        json!({ "size": 13, "content": "Zm4gbWFpbigp\nIHt9\n", "encoding": "base64" }),
    );
    let dispatcher = dispatcher(api);

    let result = dispatcher
        .dispatch(
            "get_file_content",
            &args(json!({ "repo": "octo/hello", "path": "/src/main.rs", "ref": "dev" })),
        )
        .await;

    let payload = result.payload().unwrap();
    assert_eq!(payload["content"], "fn main() {}");
    assert_eq!(payload["path"], "src/main.rs");
    assert_eq!(payload["ref"], "dev");
    assert_eq!(payload["size_bytes"], 13);
    let calls = dispatcher.tool_set().api().recorded();
    assert_eq!(calls[0].query, vec![("ref".to_string(), "dev".to_string())]);
}

#[tokio::test]
async fn test_get_file_content_binary_is_upstream_error() {
    let api = StubApi::default().respond(
        "repos/octo/hello/contents/logo.png",
        json!({ "size": 4, "content": "/9j/4A==" }),
    );
    let dispatcher = dispatcher(api);

    let result = dispatcher
        .dispatch(
            "get_file_content",
            &args(json!({ "repo": "octo/hello", "path": "logo.png" })),
        )
        .await;

    assert_eq!(result.kind(), Some(ErrorKind::UpstreamError));
}

#[tokio::test]
async fn test_get_file_content_refuses_dot_segments() {
    let dispatcher = dispatcher(StubApi::default());

    for path in ["../../../../user/keys", "src/./main.rs", "src//main.rs", ".."] {
        let result = dispatcher
            .dispatch(
                "get_file_content",
                &args(json!({ "repo": "octo/hello", "path": path })),
            )
            .await;
        assert_eq!(result.kind(), Some(ErrorKind::InvalidParameter), "{path}");
    }

    assert!(dispatcher.tool_set().api().recorded().is_empty());
}

#[tokio::test]
async fn test_list_commits_first_line_and_clamped_page() {
    let api = StubApi::default().respond(
        "repos/octo/hello/commits",
        json!([{
            "sha": "0123456789abcdef",
            "commit": {
                "message": "Fix parser\n\nLonger explanation",
                "author": { "name": "Alice", "date": "2024-01-01T00:00:00Z" }
            }
        }]),
    );
    let dispatcher = dispatcher(api);

    let result = dispatcher
        .dispatch(
            "list_commits",
            &args(json!({ "repo": "octo/hello", "per_page": 500 })),
        )
        .await;

    let commit = &result.payload().unwrap()["commits"][0];
    assert_eq!(commit["short_sha"], "0123456");
    assert_eq!(commit["message"], "Fix parser");
    assert_eq!(commit["author"], "Alice");
    assert_eq!(commit["date"], 1704067200);
    let calls = dispatcher.tool_set().api().recorded();
    assert_eq!(calls[0].query, vec![("per_page".to_string(), "100".to_string())]);
}

#[tokio::test]
async fn test_search_repositories() {
    let api = StubApi::default().respond(
        "search/repositories",
        json!({
            "total_count": 1,
            "items": [{
                "full_name": "tokio-rs/tokio",
                "description": "Runtime",
                "stargazers_count": 25000,
                "html_url": "https://github.com/tokio-rs/tokio"
            }]
        }),
    );
    let dispatcher = dispatcher(api);

    let result = dispatcher
        .dispatch(
            "search_repositories",
            &args(json!({ "query": "async runtime", "sort": "stars" })),
        )
        .await;

    let payload = result.payload().unwrap();
    assert_eq!(payload["total_count"], 1);
    assert_eq!(payload["repositories"][0]["full_name"], "tokio-rs/tokio");
    assert_eq!(payload["repositories"][0]["stars"], 25000);
}

#[tokio::test]
async fn test_upstream_status_is_preserved() {
    let dispatcher = dispatcher(StubApi::default());

    let result = dispatcher
        .dispatch("get_repo_info", &args(json!({ "repo": "octo/missing" })))
        .await;

    assert_eq!(result.kind(), Some(ErrorKind::UpstreamError));
    assert!(result.message().unwrap().contains("404"));
    assert!(result.message().unwrap().contains("Not Found"));
}
