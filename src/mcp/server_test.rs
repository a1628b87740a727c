//! Tests for the MCP bridge

use std::time::Duration;

use rmcp::ServerHandler;
use rmcp::model::RawContent;
use serde_json::{Map, Value, json};

use crate::dispatch::{Dispatcher, ErrorKind, ToolResult};
use crate::mcp::server::{McpServer, to_call_result, to_tool};
use crate::mcp::tools::SystemTools;
use crate::upstream::{MemorySnapshot, MockStatsSource};

fn server(stats: MockStatsSource) -> McpServer<SystemTools<MockStatsSource>> {
    McpServer::new(Dispatcher::new(SystemTools::new(stats, Duration::from_secs(30))))
}

fn text(result: &rmcp::model::CallToolResult) -> Value {
    let content_text = match &result.content[0].raw {
        RawContent::Text(text) => text.text.as_str(),
        _ => panic!("Expected text content"),
    };
    serde_json::from_str(content_text).unwrap()
}

#[test]
fn test_server_info_enables_tools() {
    let info = server(MockStatsSource::new()).get_info();

    assert!(info.capabilities.tools.is_some(), "Server should support tools");
    assert!(info.instructions.unwrap().contains("system"));
}

#[test]
fn test_tools_follow_descriptor_order() {
    let names: Vec<String> = server(MockStatsSource::new())
        .tools()
        .into_iter()
        .map(|tool| tool.name.to_string())
        .collect();

    assert_eq!(names, ["get_cpu_usage", "get_memory_usage", "get_system_info"]);
}

#[test]
fn test_tool_schema_is_object() {
    let server = server(MockStatsSource::new());
    let descriptor = &server.dispatcher().descriptors()[0];

    let tool = to_tool(descriptor);

    assert_eq!(tool.input_schema.get("type"), Some(&json!("object")));
    assert_eq!(
        tool.input_schema["properties"]["interval"]["type"],
        json!("number")
    );
    assert_eq!(tool.description.as_deref(), Some(descriptor.description));
}

#[test]
fn test_success_result_rendering() {
    let result = to_call_result(&ToolResult::success(json!({ "total": 1 }))).unwrap();

    assert!(result.is_error.is_none() || result.is_error == Some(false));
    assert_eq!(text(&result), json!({ "ok": true, "payload": { "total": 1 } }));
}

#[test]
fn test_failure_result_rendering() {
    let failure = ToolResult::Failure {
        kind: ErrorKind::PathNotAllowed,
        message: "Access denied: /etc/passwd is outside allowed directories".to_string(),
    };

    let result = to_call_result(&failure).unwrap();

    assert_eq!(result.is_error, Some(true));
    assert_eq!(
        text(&result),
        json!({
            "ok": false,
            "error": {
                "kind": "PathNotAllowed",
                "message": "Access denied: /etc/passwd is outside allowed directories"
            }
        })
    );
}

#[tokio::test]
async fn test_dispatch_through_server() {
    let mut stats = MockStatsSource::new();
    stats.expect_memory().times(1).returning(|| MemorySnapshot {
        total: 100,
        available: 40,
        used: 60,
        free: 40,
    });
    let server = server(stats);

    let result = server
        .dispatcher()
        .dispatch("get_memory_usage", &Map::new())
        .await;
    let rendered = to_call_result(&result).unwrap();

    assert_eq!(text(&rendered)["payload"]["percent"], 60.0);
}
