//! # Gateway MCP
//!
//! This crate provides MCP (Model Context Protocol) tool gateways: processes
//! that expose a small, declared set of tools to a calling agent and run each
//! call against one upstream service.
//!
//! Two gateways share the same pipeline:
//! - **athena-mcp**: SQL queries and catalog browsing on AWS Athena
//! - **slack-mcp**: channel listing and messages on the Slack Web API
//!
//! ## Pipeline
//!
//! ```text
//! request -> McpServer -> validate -> Tool::execute
//!                                       |-> Resolver -> Allowlist (channel-scoped tools)
//!                                       |-> upstream client
//!                                       `-> markdown report
//! ```
//!
//! Every failure becomes a single text result flagged `isError`; the dispatcher
//! is the only place a [`GatewayError`] is turned into caller-facing text.
//!
//! ## MCP Protocol
//!
//! Supported methods:
//! - `initialize`: Initialize the MCP session
//! - `ping`: Liveness check
//! - `tools/list`: List available tools
//! - `tools/call`: Execute a tool
//!
//! ## Available Tools
//!
//! ### Athena
//! - `athena_query`: Run SQL and render the rows
//! - `athena_list_databases`: List catalog databases
//! - `athena_list_tables`: List tables in a database
//! - `athena_describe_table`: Show a table's columns
//! - `athena_sample_query`: Sample the bid pricer log over a time window
//!
//! ### Slack
//! - `slack_list_channels`: List channels the allowlist admits
//! - `slack_read_messages`: Read recent messages, oldest first
//! - `slack_send_message`: Post a message, optionally in a thread
//! - `slack_delete_message`: Delete a message by timestamp
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gateway_mcp::{McpServer, Tool, ToolDefinition, ToolResult, GatewayResult};
//! use gateway_mcp::schema::ParamSpec;
//! use gateway_mcp::validation::ValidatedArgs;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct EchoTool;
//!
//! #[async_trait]
//! impl Tool for EchoTool {
//!     fn definition(&self) -> ToolDefinition {
//!         ToolDefinition::new("echo", "Echo the input")
//!             .with_param(ParamSpec::string("text", "Text to echo").required())
//!     }
//!
//!     async fn execute(&self, args: ValidatedArgs) -> GatewayResult<ToolResult> {
//!         Ok(ToolResult::text(args.str("text")?))
//!     }
//! }
//!
//! async fn run() -> std::io::Result<()> {
//!     let server = McpServer::new("echo-mcp", "0.1.0").with_tools(vec![Arc::new(EchoTool)]);
//!     gateway_mcp::stdio::serve(&server).await
//! }
//! ```

pub mod clients;
pub mod error;
pub mod format;
pub mod observability;
pub mod resolver;
pub mod schema;
pub mod server;
pub mod stdio;
pub mod tools;
pub mod types;
pub mod validation;

// Re-export main types
pub use error::{GatewayError, GatewayResult};
pub use server::{McpServer, Tool, PROTOCOL_VERSION};
pub use types::{
    ContentBlock, McpError, McpRequest, McpResponse, RequestId, ServerCapabilities, ServerInfo,
    ToolCall, ToolCapabilities, ToolDefinition, ToolResult,
};

// Re-export tool collections
pub use tools::{athena_tools, slack_tools};

// Re-export service clients
pub use clients::{AthenaClient, AthenaConfig, ConfigError, QueryEngine, SlackClient, SlackConfig};
