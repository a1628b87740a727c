//! Tool failure taxonomy.
//!
//! Every failure a tool call can produce is expressed as a [`ToolError`]
//! carrying one of a small fixed set of [`ErrorKind`]s. Upstream-specific
//! error types (`ProcessError`, `HttpError`, `MailError`) convert into it at
//! the tool-set boundary, so nothing past the dispatcher sees a raw fault.

use std::fmt;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable failure kinds surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownTool,
    MissingParameter,
    InvalidParameter,
    PathNotAllowed,
    Timeout,
    UpstreamError,
    ConfigurationMissing,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownTool => "UnknownTool",
            ErrorKind::MissingParameter => "MissingParameter",
            ErrorKind::InvalidParameter => "InvalidParameter",
            ErrorKind::PathNotAllowed => "PathNotAllowed",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::UpstreamError => "UpstreamError",
            ErrorKind::ConfigurationMissing => "ConfigurationMissing",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured tool failure.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
#[diagnostic(code(toolbelt::dispatch::tool_error))]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ErrorKind::UnknownTool, format!("Unknown tool: {name}"))
    }

    pub fn missing_parameter(name: &str) -> Self {
        Self::new(
            ErrorKind::MissingParameter,
            format!("Missing required parameter '{name}'"),
        )
    }

    pub fn invalid_parameter(name: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::InvalidParameter,
            format!("Invalid parameter '{name}': {reason}"),
        )
    }

    pub fn path_not_allowed(path: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::PathNotAllowed,
            format!("Access denied: {path} is outside allowed directories"),
        )
    }

    pub fn timeout(what: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Timeout, format!("{what} timed out"))
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamError, message)
    }

    /// `settings` names the environment variables the tool needs.
    pub fn configuration_missing(settings: &[&str]) -> Self {
        Self::new(
            ErrorKind::ConfigurationMissing,
            format!(
                "Missing required configuration: {}",
                settings.join(", ")
            ),
        )
    }
}

pub type ToolOutcome<T> = Result<T, ToolError>;
