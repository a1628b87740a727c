use serde_json::{Value, json};

use super::error::{ErrorKind, ToolError, ToolOutcome};

/// The normalized outcome of one dispatched call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success { payload: Value },
    Failure { kind: ErrorKind, message: String },
}

impl ToolResult {
    pub fn success(payload: Value) -> Self {
        ToolResult::Success { payload }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    /// Failure kind, `None` on success.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ToolResult::Success { .. } => None,
            ToolResult::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            ToolResult::Success { payload } => Some(payload),
            ToolResult::Failure { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ToolResult::Success { .. } => None,
            ToolResult::Failure { message, .. } => Some(message),
        }
    }

    /// Transport shape: `{ok, payload}` or `{ok, error: {kind, message}}`.
    pub fn to_response(&self) -> Value {
        match self {
            ToolResult::Success { payload } => json!({
                "ok": true,
                "payload": payload,
            }),
            ToolResult::Failure { kind, message } => json!({
                "ok": false,
                "error": {
                    "kind": kind.as_str(),
                    "message": message,
                },
            }),
        }
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        ToolResult::Failure {
            kind: err.kind,
            message: err.message,
        }
    }
}

impl From<ToolOutcome<Value>> for ToolResult {
    fn from(outcome: ToolOutcome<Value>) -> Self {
        match outcome {
            Ok(payload) => ToolResult::success(payload),
            Err(err) => err.into(),
        }
    }
}
