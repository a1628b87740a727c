//! GitHub REST tools.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

use super::{epoch_seconds, non_blank};
use crate::config::GITHUB_TOKEN;
use crate::dispatch::{Arguments, ParamSpec, ToolDescriptor, ToolError, ToolOutcome, ToolSet};
use crate::upstream::GitHubApi;

const STATES: &[&str] = &["open", "closed", "all"];
const SEARCH_SORTS: &[&str] = &["stars", "forks", "updated"];

/// An `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Accepts `owner/repo`, `owner/repo.git`, or a github.com URL with
    /// optional trailing path segments.
    pub fn parse(input: &str) -> Result<Self, ToolError> {
        let invalid = || {
            ToolError::invalid_parameter(
                "repo",
                format!("'{input}' is not in owner/repo form or a github.com URL"),
            )
        };

        let trimmed = input.trim();
        let without_scheme = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"));

        let segments: Vec<&str> = match without_scheme {
            Some(rest) => {
                let rest = rest.strip_prefix("www.").unwrap_or(rest);
                let path = rest.strip_prefix("github.com/").ok_or_else(invalid)?;
                path.split('/').filter(|s| !s.is_empty()).take(2).collect()
            }
            None => {
                let rest = trimmed.strip_prefix("github.com/").unwrap_or(trimmed);
                let parts: Vec<&str> = rest.trim_end_matches('/').split('/').collect();
                if parts.len() != 2 {
                    return Err(invalid());
                }
                parts
            }
        };

        let [owner, name] = segments.as_slice() else {
            return Err(invalid());
        };
        let name = name.strip_suffix(".git").unwrap_or(name);

        if !valid_segment(owner) || !valid_segment(name) {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    fn api_path(&self, tail: &str) -> String {
        if tail.is_empty() {
            format!("repos/{}/{}", self.owner, self.name)
        } else {
            format!("repos/{}/{}/{}", self.owner, self.name, tail)
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

pub struct GitHubTools<A: GitHubApi> {
    api: A,
    token: Option<String>,
    timeout: Duration,
    descriptors: Vec<ToolDescriptor>,
}

impl<A: GitHubApi> GitHubTools<A> {
    /// Create the GitHub tool set.
    ///
    /// # Arguments
    /// * `api` - REST client
    /// * `token` - personal access token; `None` makes every tool report `ConfigurationMissing`
    /// * `timeout` - per-call limit
    ///
    /// # Returns
    /// A tool set exposing the repository, issue and pull request tools.
    pub fn new(api: A, token: Option<String>, timeout: Duration) -> Self {
        Self {
            api,
            token,
            timeout,
            descriptors: descriptors(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn token(&self) -> ToolOutcome<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| ToolError::configuration_missing(&[GITHUB_TOKEN]))
    }

    async fn get_repo_info(&self, repo: &RepoRef) -> ToolOutcome<Value> {
        let data = self.api.get(self.token()?, &repo.api_path(""), &[]).await?;
        Ok(json!({
            "name": data["name"],
            "full_name": data["full_name"],
            "description": data["description"],
            "url": data["html_url"],
            "stars": data["stargazers_count"],
            "forks": data["forks_count"],
            "open_issues": data["open_issues_count"],
            "default_branch": data["default_branch"],
            "created_at": timestamp(&data["created_at"]),
            "updated_at": timestamp(&data["updated_at"]),
        }))
    }

    async fn list_branches(&self, repo: &RepoRef) -> ToolOutcome<Value> {
        let data = self
            .api
            .get(
                self.token()?,
                &repo.api_path("branches"),
                &[("per_page", "100".to_string())],
            )
            .await?;
        let branches: Vec<&Value> = items(&data).map(|b| &b["name"]).collect();
        Ok(json!({ "repo": repo.to_string(), "branches": branches }))
    }

    async fn list_pull_requests(&self, repo: &RepoRef, args: &Arguments) -> ToolOutcome<Value> {
        let state = args.str("state").unwrap_or("open");
        let data = self
            .api
            .get(
                self.token()?,
                &repo.api_path("pulls"),
                &[("state", state.to_string())],
            )
            .await?;
        let pulls: Vec<Value> = items(&data)
            .map(|pr| {
                json!({
                    "number": pr["number"],
                    "title": pr["title"],
                    "state": pr["state"],
                    "author": pr["user"]["login"],
                })
            })
            .collect();
        Ok(json!({ "repo": repo.to_string(), "state": state, "pull_requests": pulls }))
    }

    async fn create_pull_request(&self, repo: &RepoRef, args: &Arguments) -> ToolOutcome<Value> {
        let body = json!({
            "title": non_blank(args, "title")?,
            "head": non_blank(args, "head")?,
            "base": args.str("base").unwrap_or("main"),
            "body": args.str_or_empty("body"),
        });
        let data = self.api.post(self.token()?, &repo.api_path("pulls"), &body).await?;
        Ok(created(&data))
    }

    async fn get_pull_request(&self, repo: &RepoRef, args: &Arguments) -> ToolOutcome<Value> {
        let number = args.required_int("pr_number")?;
        let data = self
            .api
            .get(self.token()?, &repo.api_path(&format!("pulls/{number}")), &[])
            .await?;
        Ok(json!({
            "number": data["number"],
            "title": data["title"],
            "body": data["body"],
            "state": data["state"],
            "author": data["user"]["login"],
            "head": data["head"]["ref"],
            "base": data["base"]["ref"],
            "url": data["html_url"],
            "created_at": timestamp(&data["created_at"]),
            "updated_at": timestamp(&data["updated_at"]),
            "mergeable": data["mergeable"],
            "merged": data["merged"],
        }))
    }

    async fn list_issues(&self, repo: &RepoRef, args: &Arguments) -> ToolOutcome<Value> {
        let state = args.str("state").unwrap_or("open");
        let data = self
            .api
            .get(
                self.token()?,
                &repo.api_path("issues"),
                &[("state", state.to_string())],
            )
            .await?;
        // The issues endpoint also returns pull requests.
        let issues: Vec<Value> = items(&data)
            .filter(|issue| issue.get("pull_request").is_none())
            .map(|issue| {
                let labels: Vec<&Value> = items(&issue["labels"]).map(|l| &l["name"]).collect();
                json!({
                    "number": issue["number"],
                    "title": issue["title"],
                    "state": issue["state"],
                    "author": issue["user"]["login"],
                    "labels": labels,
                    "created_at": timestamp(&issue["created_at"]),
                })
            })
            .collect();
        Ok(json!({ "repo": repo.to_string(), "state": state, "issues": issues }))
    }

    async fn create_issue(&self, repo: &RepoRef, args: &Arguments) -> ToolOutcome<Value> {
        let mut body = json!({
            "title": non_blank(args, "title")?,
            "body": args.str_or_empty("body"),
        });
        let labels = args.strings("labels");
        if !labels.is_empty() {
            body["labels"] = json!(labels);
        }
        let data = self.api.post(self.token()?, &repo.api_path("issues"), &body).await?;
        Ok(created(&data))
    }

    async fn get_file_content(&self, repo: &RepoRef, args: &Arguments) -> ToolOutcome<Value> {
        let path = non_blank(args, "path")?.trim_matches('/');
        if path
            .split('/')
            .any(|segment| matches!(segment.trim(), "" | "." | ".."))
        {
            return Err(ToolError::invalid_parameter(
                "path",
                format!("'{path}' must be a relative path without empty, '.' or '..' segments"),
            ));
        }
        let reference = args.str("ref");
        let query: Vec<(&'static str, String)> = reference
            .map(|r| vec![("ref", r.to_string())])
            .unwrap_or_default();

        let data = self
            .api
            .get(self.token()?, &repo.api_path(&format!("contents/{path}")), &query)
            .await?;
        if data.is_array() {
            return Err(ToolError::invalid_parameter(
                "path",
                format!("{path} is a directory"),
            ));
        }

        let encoded: String = data["content"]
            .as_str()
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| ToolError::upstream(format!("Invalid base64 content for {path}: {e}")))?;
        let content = String::from_utf8(bytes)
            .map_err(|_| ToolError::upstream(format!("{path} is not valid UTF-8 text")))?;

        Ok(json!({
            "path": path,
            "ref": reference,
            "size_bytes": data["size"],
            "content": content,
        }))
    }

    async fn list_commits(&self, repo: &RepoRef, args: &Arguments) -> ToolOutcome<Value> {
        let mut query = vec![("per_page", args.int("per_page").unwrap_or(30).to_string())];
        if let Some(sha) = args.str("sha") {
            query.push(("sha", sha.to_string()));
        }
        let data = self
            .api
            .get(self.token()?, &repo.api_path("commits"), &query)
            .await?;
        let commits: Vec<Value> = items(&data)
            .map(|c| {
                let sha = c["sha"].as_str().unwrap_or_default();
                let message = c["commit"]["message"].as_str().unwrap_or_default();
                json!({
                    "sha": sha,
                    "short_sha": sha.chars().take(7).collect::<String>(),
                    "message": message.lines().next().unwrap_or_default(),
                    "author": c["commit"]["author"]["name"],
                    "date": timestamp(&c["commit"]["author"]["date"]),
                })
            })
            .collect();
        Ok(json!({ "repo": repo.to_string(), "commits": commits }))
    }

    async fn search_repositories(&self, args: &Arguments) -> ToolOutcome<Value> {
        let mut query = vec![
            ("q", non_blank(args, "query")?.to_string()),
            ("per_page", args.int("per_page").unwrap_or(30).to_string()),
        ];
        if let Some(sort) = args.str("sort") {
            query.push(("sort", sort.to_string()));
        }
        let data = self
            .api
            .get(self.token()?, "search/repositories", &query)
            .await?;
        let repositories: Vec<Value> = items(&data["items"])
            .map(|r| {
                json!({
                    "full_name": r["full_name"],
                    "description": r["description"],
                    "stars": r["stargazers_count"],
                    "url": r["html_url"],
                })
            })
            .collect();
        Ok(json!({
            "total_count": data["total_count"],
            "repositories": repositories,
        }))
    }
}

impl<A: GitHubApi> ToolSet for GitHubTools<A> {
    fn server_name(&self) -> &'static str {
        "github"
    }

    fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn call(&self, tool: &'static str, args: Arguments) -> ToolOutcome<Value> {
        if tool == "search_repositories" {
            return self.search_repositories(&args).await;
        }

        let repo = RepoRef::parse(args.required_str("repo")?)?;
        match tool {
            "get_repo_info" => self.get_repo_info(&repo).await,
            "list_branches" => self.list_branches(&repo).await,
            "list_pull_requests" => self.list_pull_requests(&repo, &args).await,
            "create_pull_request" => self.create_pull_request(&repo, &args).await,
            "get_pull_request" => self.get_pull_request(&repo, &args).await,
            "list_issues" => self.list_issues(&repo, &args).await,
            "create_issue" => self.create_issue(&repo, &args).await,
            "get_file_content" => self.get_file_content(&repo, &args).await,
            "list_commits" => self.list_commits(&repo, &args).await,
            other => Err(ToolError::unknown_tool(other)),
        }
    }
}

fn items(value: &Value) -> impl Iterator<Item = &Value> {
    value.as_array().into_iter().flatten()
}

fn timestamp(value: &Value) -> Value {
    value
        .as_str()
        .and_then(epoch_seconds)
        .map(Value::from)
        .unwrap_or(Value::Null)
}

fn created(data: &Value) -> Value {
    json!({
        "number": data["number"],
        "title": data["title"],
        "url": data["html_url"],
    })
}

fn repo() -> ParamSpec {
    ParamSpec::string("repo")
        .required()
        .describe("Repository as owner/repo or a github.com URL")
}

fn state() -> ParamSpec {
    ParamSpec::string("state")
        .default_str("open")
        .one_of(STATES)
        .describe("open, closed or all (default: open)")
}

fn per_page() -> ParamSpec {
    ParamSpec::integer("per_page")
        .default_int(30)
        .clamp(Some(1.0), Some(100.0))
        .describe("Results per page (1-100, default: 30)")
}

fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "get_repo_info",
            "Get repository details: description, stars, forks, open issues and default branch.",
        )
        .param(repo()),
        ToolDescriptor::new("list_branches", "List branch names of a repository.").param(repo()),
        ToolDescriptor::new("list_pull_requests", "List pull requests of a repository.")
            .param(repo())
            .param(state()),
        ToolDescriptor::new("create_pull_request", "Open a pull request.")
            .param(repo())
            .param(ParamSpec::string("title").required().describe("Pull request title"))
            .param(ParamSpec::string("head").required().describe("Branch with the changes"))
            .param(ParamSpec::string("body").default_str("").describe("Pull request description"))
            .param(
                ParamSpec::string("base")
                    .default_str("main")
                    .describe("Branch to merge into (default: main)"),
            ),
        ToolDescriptor::new("get_pull_request", "Get one pull request by number.")
            .param(repo())
            .param(
                ParamSpec::integer("pr_number")
                    .required()
                    .reject_outside(Some(1.0), None)
                    .describe("Pull request number"),
            ),
        ToolDescriptor::new("list_issues", "List issues of a repository, excluding pull requests.")
            .param(repo())
            .param(state()),
        ToolDescriptor::new("create_issue", "Open an issue.")
            .param(repo())
            .param(ParamSpec::string("title").required().describe("Issue title"))
            .param(ParamSpec::string("body").default_str("").describe("Issue description"))
            .param(ParamSpec::string_array("labels").describe("Labels to apply")),
        ToolDescriptor::new("get_file_content", "Read a text file from a repository.")
            .param(repo())
            .param(ParamSpec::string("path").required().describe("File path within the repository"))
            .param(ParamSpec::string("ref").describe("Branch, tag or commit (default: default branch)")),
        ToolDescriptor::new("list_commits", "List recent commits of a repository.")
            .param(repo())
            .param(ParamSpec::string("sha").describe("Branch or commit to start from"))
            .param(per_page()),
        ToolDescriptor::new("search_repositories", "Search GitHub repositories.")
            .param(ParamSpec::string("query").required().describe("Search query"))
            .param(
                ParamSpec::string("sort")
                    .one_of(SEARCH_SORTS)
                    .describe("stars, forks or updated (default: best match)"),
            )
            .param(per_page()),
    ]
}
