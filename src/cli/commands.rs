//! Building a server's tool set from configuration and running one action
//! against it.

use serde_json::{Map, Value};
use tracing::info;

use super::ServerKind;
use super::error::{CliError, CliResult};
use crate::config::Config;
use crate::dispatch::{Dispatcher, ToolDescriptor, ToolResult, ToolSet};
use crate::mcp::serve_stdio;
use crate::mcp::tools::{
    EmailTools, FilesystemTools, GitHubTools, GitTools, Outbox, SearchTools, SystemTools,
    TodoistTools, WebApiTools,
};
use crate::upstream::{
    AllowList, BraveClient, GitHubClient, ReqwestApi, SmtpMailer, SysinfoStats, TokioRunner,
};

/// What to do with the selected server.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Serve,
    Tools,
    Call {
        tool: String,
        arguments: Map<String, Value>,
    },
}

/// Parse the `--args` JSON; it must be an object.
pub fn parse_arguments(raw: &str) -> CliResult<Map<String, Value>> {
    let value: Value = serde_json::from_str(raw).map_err(|e| CliError::InvalidArguments {
        message: e.to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CliError::InvalidArguments {
            message: format!("expected a JSON object, got {other}"),
        }),
    }
}

pub fn describe_tools(descriptors: &[ToolDescriptor]) -> CliResult<String> {
    let tools: Vec<Value> = descriptors.iter().map(ToolDescriptor::to_json).collect();
    Ok(serde_json::to_string_pretty(&tools)?)
}

pub fn render_result(result: &ToolResult) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(&result.to_response())?)
}

async fn execute<T: ToolSet + 'static>(tools: T, action: Action) -> CliResult<()> {
    let dispatcher = Dispatcher::new(tools);
    match action {
        Action::Serve => serve_stdio(dispatcher).await?,
        Action::Tools => println!("{}", describe_tools(dispatcher.descriptors())?),
        Action::Call { tool, arguments } => {
            let result = dispatcher.dispatch(&tool, &arguments).await;
            println!("{}", render_result(&result)?);
            if let ToolResult::Failure { kind, message } = result {
                return Err(CliError::ToolFailed { kind, message });
            }
        }
    }
    Ok(())
}

fn outbox(config: &Config) -> CliResult<Outbox<SmtpMailer>> {
    Ok(match config.smtp_settings() {
        Ok(settings) => Outbox::new(SmtpMailer::new(&settings)?, settings.user.clone()),
        Err(missing) => Outbox::unconfigured(missing),
    })
}

/// Construct the tool set for `server` and run `action` against it.
pub async fn run_server(server: ServerKind, config: &Config, action: Action) -> CliResult<()> {
    info!(server = ?server, "starting");
    match server {
        ServerKind::Search => {
            let client = BraveClient::new(&config.brave_api_url, config.http_timeout)?;
            let tools = SearchTools::new(client, config.brave_api_key.clone(), config.http_timeout);
            execute(tools, action).await
        }
        ServerKind::Github => {
            let client = GitHubClient::new(&config.github_api_url, config.http_timeout)?;
            let tools = GitHubTools::new(client, config.github_token.clone(), config.http_timeout);
            execute(tools, action).await
        }
        ServerKind::Git => {
            execute(GitTools::new(TokioRunner::new(), config.command_timeout), action).await
        }
        ServerKind::Email => {
            execute(EmailTools::new(outbox(config)?, config.smtp_timeout), action).await
        }
        ServerKind::Todoist => {
            let tools = TodoistTools::new(
                outbox(config)?,
                config.todoist_email.clone(),
                config.smtp_timeout,
            );
            execute(tools, action).await
        }
        ServerKind::Filesystem => {
            let allow = AllowList::new(config.allowed_dirs.iter().cloned());
            info!(roots = ?allow.roots(), "filesystem allow-list");
            execute(FilesystemTools::new(allow, config.command_timeout), action).await
        }
        ServerKind::System => {
            execute(SystemTools::new(SysinfoStats::new(), config.command_timeout), action).await
        }
        ServerKind::WebApi => {
            let api = ReqwestApi::new(config.http_timeout)?;
            execute(WebApiTools::new(api, config.http_timeout), action).await
        }
    }
}
