//! Shared HTTP plumbing for the REST-backed tools.

use std::time::Duration;

use miette::Diagnostic;
use reqwest::{Client, Response};
use serde_json::Value;
use thiserror::Error;

use crate::dispatch::{ErrorKind, ToolError};

/// Upstream body text kept in error messages.
const MAX_ERROR_BODY: usize = 500;

#[derive(Error, Diagnostic, Debug)]
pub enum HttpError {
    #[error("HTTP {status}: {message}")]
    #[diagnostic(code(toolbelt::http::status))]
    Status { status: u16, message: String },

    #[error("Request timed out: {0}")]
    #[diagnostic(code(toolbelt::http::timeout))]
    Timeout(String),

    #[error("Request failed: {0}")]
    #[diagnostic(code(toolbelt::http::transport))]
    Transport(String),

    #[error("Invalid response body: {0}")]
    #[diagnostic(code(toolbelt::http::decode))]
    Decode(String),

    #[error("Failed to build HTTP client: {0}")]
    #[diagnostic(code(toolbelt::http::client))]
    Client(String),
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout(e.to_string())
        } else if e.is_decode() {
            HttpError::Decode(e.to_string())
        } else {
            HttpError::Transport(e.to_string())
        }
    }
}

impl From<HttpError> for ToolError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout(_) => ToolError::new(ErrorKind::Timeout, err.to_string()),
            other => ToolError::upstream(other.to_string()),
        }
    }
}

/// Build a client with the ring TLS provider and a request timeout.
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client, HttpError> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| HttpError::Client(e.to_string()))
}

/// Pass 2xx responses through; turn anything else into [`HttpError::Status`]
/// carrying the upstream `message` field (or body text).
pub async fn check_status(response: Response) -> Result<Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| truncate(&body, MAX_ERROR_BODY));

    Err(HttpError::Status {
        status: status.as_u16(),
        message: if message.is_empty() {
            status.canonical_reason().unwrap_or("error").to_string()
        } else {
            message
        },
    })
}

pub async fn json_body(response: Response) -> Result<Value, HttpError> {
    let response = check_status(response).await?;
    Ok(response.json::<Value>().await?)
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
