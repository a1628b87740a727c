pub mod cli;
pub mod config;
pub mod dispatch;
pub mod mcp;
pub mod upstream;
