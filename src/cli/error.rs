use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::dispatch::ErrorKind;
use crate::mcp::ServeError;
use crate::upstream::{HttpError, MailError};

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to set up HTTP client: {0}")]
    #[diagnostic(code(toolbelt::cli::http_client))]
    Http(#[from] HttpError),

    #[error("Failed to set up SMTP transport: {0}")]
    #[diagnostic(
        code(toolbelt::cli::smtp),
        help("Check SMTP_HOST; it must be a host name reachable over STARTTLS.")
    )]
    Mail(#[from] MailError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Serve(#[from] ServeError),

    #[error("Invalid --args: {message}")]
    #[diagnostic(
        code(toolbelt::cli::invalid_arguments),
        help("Pass a JSON object, e.g. --args '{{\"query\": \"rust\"}}'")
    )]
    InvalidArguments { message: String },

    #[error("Tool failed ({kind}): {message}")]
    #[diagnostic(code(toolbelt::cli::tool_failed))]
    ToolFailed { kind: ErrorKind, message: String },

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(toolbelt::cli::output))]
    Output(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;
