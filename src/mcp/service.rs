//! MCP stdio service
//!
//! stdout carries protocol frames only; everything else goes to stderr.

use miette::Diagnostic;
use rmcp::{ServiceExt, transport::stdio};
use thiserror::Error;
use tracing::info;

use crate::dispatch::{Dispatcher, ToolSet};

use super::server::McpServer;

#[derive(Error, Diagnostic, Debug)]
pub enum ServeError {
    #[error("Failed to start MCP session: {0}")]
    #[diagnostic(code(toolbelt::mcp::start))]
    Start(String),

    #[error("MCP session ended abnormally: {0}")]
    #[diagnostic(code(toolbelt::mcp::session))]
    Session(String),
}

/// Serve `dispatcher` over stdin/stdout until the client disconnects.
pub async fn serve_stdio<T: ToolSet + 'static>(dispatcher: Dispatcher<T>) -> Result<(), ServeError> {
    let server = McpServer::new(dispatcher);
    let name = server.dispatcher().tool_set().server_name();
    info!(server = name, tools = server.dispatcher().descriptors().len(), "serving MCP over stdio");

    let running = server
        .serve(stdio())
        .await
        .map_err(|e| ServeError::Start(e.to_string()))?;

    let reason = running
        .waiting()
        .await
        .map_err(|e| ServeError::Session(e.to_string()))?;

    info!(server = name, reason = ?reason, "MCP session closed");
    Ok(())
}
