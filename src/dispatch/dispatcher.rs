//! Tool lookup, validation and invocation.

use std::future::Future;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::error::{ToolError, ToolOutcome};
use super::result::ToolResult;
use super::schema::ToolDescriptor;
use super::validate::{Arguments, validate};

/// Extra time granted past a tool set's own upstream timeout, so the
/// upstream client reports its timeout before the dispatcher cuts it off.
const TIMEOUT_GRACE: Duration = Duration::from_secs(1);

/// A server's tools: a static descriptor table and the handler behind it.
///
/// `call` only ever receives a tool name from `descriptors()` and arguments
/// that already passed validation against that descriptor.
pub trait ToolSet: Send + Sync {
    /// Server identifier used in logs and MCP server info.
    fn server_name(&self) -> &'static str;

    fn descriptors(&self) -> &[ToolDescriptor];

    /// Upper bound for one upstream call.
    fn timeout(&self) -> Duration;

    /// Whether dropping an unfinished `call` also stops its side effect.
    ///
    /// Tool sets that hand work to the blocking pool return `false`. The
    /// dispatcher then waits for the call to finish instead of enforcing
    /// [`timeout`](ToolSet::timeout), and the upstream has to bound itself.
    fn cancel_safe(&self) -> bool {
        true
    }

    fn call(
        &self,
        tool: &'static str,
        args: Arguments,
    ) -> impl Future<Output = ToolOutcome<Value>> + Send;
}

/// Resolves tool calls against one [`ToolSet`].
///
/// Calls are serialized: one call is validated, executed and translated
/// before the next one starts.
pub struct Dispatcher<T: ToolSet> {
    tools: T,
    gate: Mutex<()>,
}

impl<T: ToolSet> Dispatcher<T> {
    /// Create a dispatcher for one tool set.
    ///
    /// # Arguments
    /// * `tools` - The server's tool set; its descriptor table is fixed from here on
    ///
    /// # Returns
    /// A dispatcher that resolves one call at a time
    pub fn new(tools: T) -> Self {
        Self {
            tools,
            gate: Mutex::new(()),
        }
    }

    pub fn tool_set(&self) -> &T {
        &self.tools
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        self.tools.descriptors()
    }

    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.descriptors().iter().find(|d| d.name == name)
    }

    #[instrument(skip_all, fields(server = self.tools.server_name(), tool = %tool))]
    pub async fn dispatch(&self, tool: &str, arguments: &Map<String, Value>) -> ToolResult {
        let _turn = self.gate.lock().await;

        let Some(descriptor) = self.descriptor(tool) else {
            warn!("unknown tool requested");
            return ToolError::unknown_tool(tool).into();
        };

        let args = match validate(descriptor, arguments) {
            Ok(args) => args,
            Err(err) => {
                debug!(kind = %err.kind, "rejected before upstream call");
                return err.into();
            }
        };

        let call = self.tools.call(descriptor.name, args);
        let result: ToolResult = if self.tools.cancel_safe() {
            let limit = self.tools.timeout().saturating_add(TIMEOUT_GRACE);
            match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome.into(),
                Err(_) => ToolError::timeout(format!("Tool '{}'", descriptor.name)).into(),
            }
        } else {
            // The gate stays held until the blocking work has really finished.
            let started = Instant::now();
            let outcome = call.await;
            if started.elapsed() > self.tools.timeout() {
                warn!(elapsed = ?started.elapsed(), "blocking call overran its timeout");
            }
            outcome.into()
        };

        match &result {
            ToolResult::Success { .. } => debug!("tool call succeeded"),
            ToolResult::Failure { kind, message } => {
                warn!(kind = %kind, message = %message, "tool call failed")
            }
        }
        result
    }
}
