//! Tool sets, one per server.
//!
//! Each tool set owns its descriptor table, the configuration its upstream
//! needs and a client generic over the upstream trait, so tests substitute
//! stubs without dynamic dispatch.

mod email;
mod filesystem;
mod git;
mod github;
mod search;
mod system;
mod todoist;
mod web_api;

#[cfg(test)]
mod git_test;
#[cfg(test)]
mod github_test;

pub use email::{EmailTools, Outbox};
pub use filesystem::FilesystemTools;
pub use git::GitTools;
pub use github::{GitHubTools, RepoRef};
pub use search::{PageText, SearchTools, extract_page};
pub use system::{SystemTools, format_bytes};
pub use todoist::{TaskRequest, TodoistTools, encode_subject};
pub use web_api::{MAX_BODY_CHARS, WebApiTools, truncate_body};

use chrono::{DateTime, Utc};
use reqwest::Url;
use tokio::task::JoinError;

use crate::dispatch::{Arguments, ToolError, ToolOutcome};

/// A required string that must also contain something besides whitespace.
pub(crate) fn non_blank<'a>(args: &'a Arguments, name: &str) -> ToolOutcome<&'a str> {
    let value = args.required_str(name)?;
    if value.trim().is_empty() {
        return Err(ToolError::invalid_parameter(name, "must not be empty"));
    }
    Ok(value)
}

/// A required absolute `http` or `https` URL.
pub(crate) fn http_url(args: &Arguments, name: &str) -> ToolOutcome<Url> {
    let raw = non_blank(args, name)?;
    let url = Url::parse(raw.trim()).map_err(|e| ToolError::invalid_parameter(name, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ToolError::invalid_parameter(
            name,
            format!("unsupported scheme '{}', expected http or https", url.scheme()),
        ));
    }
    Ok(url)
}

/// RFC 3339 timestamp to Unix epoch seconds.
pub(crate) fn epoch_seconds(timestamp: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|dt| dt.timestamp())
}

pub(crate) fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

/// Blocking-pool task failures surface as upstream errors.
pub(crate) fn map_join_error(err: JoinError) -> ToolError {
    ToolError::upstream(format!("Background task failed: {err}"))
}
