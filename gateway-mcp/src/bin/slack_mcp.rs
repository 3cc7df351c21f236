//! Slack MCP gateway over stdio.

use gateway_mcp::observability::init_tracing;
use gateway_mcp::{slack_tools, stdio, McpServer, SlackClient, SlackConfig};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match SlackConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(
                error = %err,
                "Invalid configuration. Create a Slack App and set its bot token in SLACK_BOT_TOKEN."
            );
            return ExitCode::FAILURE;
        }
    };

    if config.allowlist.is_unrestricted() {
        info!("No channel allowlist configured; all accessible channels are allowed");
    } else {
        info!(allowlist = %config.allowlist, "Channel allowlist active");
    }

    let client = match SlackClient::new(config.clone()) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            error!(error = %err, "Failed to build Slack client");
            return ExitCode::FAILURE;
        }
    };

    let server = McpServer::new("slack-mcp", env!("CARGO_PKG_VERSION"))
        .with_tools(slack_tools(client, Arc::new(config)));

    match stdio::serve(&server).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Transport failed");
            ExitCode::FAILURE
        }
    }
}
