//! Athena MCP gateway over stdio.

use gateway_mcp::observability::init_tracing;
use gateway_mcp::{athena_tools, stdio, AthenaClient, AthenaConfig, McpServer};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match AthenaConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let engine = Arc::new(AthenaClient::connect(&config).await);
    let server = McpServer::new("athena-mcp", env!("CARGO_PKG_VERSION"))
        .with_tools(athena_tools(engine, config));

    match stdio::serve(&server).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Transport failed");
            ExitCode::FAILURE
        }
    }
}
