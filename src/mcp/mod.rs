//! Model Context Protocol (MCP) servers
//!
//! Each server process exposes one tool set over the stdio transport.
//!
//! - **server**: `ServerHandler` bridging `tools/list` and `tools/call` onto a dispatcher
//! - **service**: stdio session lifecycle
//! - **tools**: the tool sets, one per server, each generic over its upstream trait

pub mod server;
mod service;
pub mod tools;

#[cfg(test)]
mod server_test;

pub use server::McpServer;
pub use service::{ServeError, serve_stdio};
