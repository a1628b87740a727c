//! MCP server implementation
//!
//! Bridges the MCP `tools/list` and `tools/call` requests onto a
//! [`Dispatcher`]. Every call result, success or failure, is returned as a
//! single text content block holding the normalized JSON response.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParams, CallToolResult, Content, ListToolsResult, PaginatedRequestParams,
        ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use tracing::debug;

use crate::dispatch::{Dispatcher, ToolDescriptor, ToolResult, ToolSet};

/// MCP front for one tool set.
pub struct McpServer<T: ToolSet> {
    dispatcher: Arc<Dispatcher<T>>,
}

impl<T: ToolSet> Clone for McpServer<T> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<T: ToolSet> McpServer<T> {
    /// Wrap a dispatcher for serving over MCP.
    ///
    /// # Arguments
    /// * `dispatcher` - the dispatcher, owned or already shared
    ///
    /// # Returns
    /// A cheaply cloneable server handle.
    pub fn new(dispatcher: impl Into<Arc<Dispatcher<T>>>) -> Self {
        Self {
            dispatcher: dispatcher.into(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    /// Tools as advertised to clients, in declaration order.
    pub fn tools(&self) -> Vec<Tool> {
        self.dispatcher.descriptors().iter().map(to_tool).collect()
    }
}

/// Convert a descriptor into its MCP tool definition.
pub fn to_tool(descriptor: &ToolDescriptor) -> Tool {
    Tool::new(
        descriptor.name,
        descriptor.description,
        Arc::new(descriptor.input_schema()),
    )
}

/// Render a dispatch result as an MCP call result.
pub fn to_call_result(result: &ToolResult) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(&result.to_response())
        .map_err(|e| McpError::internal_error(format!("Failed to serialize result: {e}"), None))?;

    Ok(if result.is_success() {
        CallToolResult::success(vec![Content::text(text)])
    } else {
        CallToolResult::error(vec![Content::text(text)])
    })
}

impl<T: ToolSet + 'static> ServerHandler for McpServer<T> {
    fn get_info(&self) -> ServerInfo {
        let server = self.dispatcher.tool_set().server_name();
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build()).with_instructions(
            format!(
                "toolbelt {server} server - {} tools; results are JSON with an \"ok\" flag",
                self.dispatcher.descriptors().len()
            ),
        )
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        debug!(tool = %request.name, "tools/call received");
        let arguments = request.arguments.unwrap_or_default();
        let result = self.dispatcher.dispatch(&request.name, &arguments).await;
        to_call_result(&result)
    }
}
