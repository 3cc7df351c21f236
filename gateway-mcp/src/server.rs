//! MCP server implementation
//!
//! This module provides the dispatcher shared by both gateways: it owns the
//! tool catalog, validates arguments against each tool's declared schema,
//! routes calls to handlers and turns every failure into a single text report.

use crate::error::{GatewayError, GatewayResult};
use crate::types::*;
use crate::validation::{validate, ValidatedArgs};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// MCP protocol revision announced on `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Trait for tool implementations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with arguments that already passed validation.
    async fn execute(&self, args: ValidatedArgs) -> GatewayResult<ToolResult>;
}

/// Tool gateway MCP server.
///
/// Holds an immutable catalog once built; concurrent calls share it read-only.
pub struct McpServer {
    /// Server info
    info: ServerInfo,

    /// Server capabilities
    capabilities: ServerCapabilities,

    /// Registered tools, keyed by name
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl McpServer {
    /// Create a new MCP server with an empty catalog.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolCapabilities {
                    list_changed: false,
                }),
            },
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. A later tool with the same name replaces the earlier one.
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "Tool registered twice; keeping the latest");
        }
    }

    /// Register multiple tools.
    pub fn register_tools(&mut self, tools: Vec<Arc<dyn Tool>>) {
        for tool in tools {
            self.register_tool(tool);
        }
    }

    /// Builder-style registration.
    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.register_tools(tools);
        self
    }

    /// Get all tool definitions, ordered by name.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Execute a tool: look up, validate, run.
    ///
    /// Unknown names and invalid arguments fail here, before the handler runs.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> GatewayResult<ToolResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| GatewayError::UnknownTool(name.to_string()))?;

        let definition = tool.definition();
        let args = validate(&definition.params, arguments)?;

        debug!(tool = %name, service = ?definition.service, "Dispatching tool call");
        tool.execute(args).await
    }

    /// Execute a tool and convert any failure into an error report.
    ///
    /// Always yields exactly one result.
    #[instrument(skip(self, arguments), fields(tool = %name))]
    pub async fn dispatch(&self, name: &str, arguments: serde_json::Value) -> ToolResult {
        match self.call_tool(name, arguments).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error_kind = err.kind(), error = %err, "Tool call failed");
                ToolResult::error(err.report(name))
            }
        }
    }

    /// Handle an MCP request. Notifications produce no response.
    pub async fn handle_request(&self, request: McpRequest) -> Option<McpResponse> {
        let Some(id) = request.id else {
            debug!(method = %request.method, "Notification received");
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => McpResponse::success(id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            _ => McpResponse::error(id, McpError::method_not_found(&request.method)),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: RequestId) -> McpResponse {
        info!(server = %self.info.name, version = %self.info.version, "Client initialized");
        McpResponse::success(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": self.capabilities,
                "serverInfo": self.info
            }),
        )
    }

    fn handle_tools_list(&self, id: RequestId) -> McpResponse {
        let tools = self.list_tools();
        McpResponse::success(id, serde_json::json!({ "tools": tools }))
    }

    async fn handle_tools_call(
        &self,
        id: RequestId,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let params = match params {
            Some(p) => p,
            None => return McpResponse::error(id, McpError::invalid_params("Missing params")),
        };

        let call: ToolCall = match serde_json::from_value(params) {
            Ok(c) => c,
            Err(e) => return McpResponse::error(id, McpError::invalid_params(e.to_string())),
        };

        let result = self.dispatch(&call.name, call.arguments).await;
        match serde_json::to_value(result) {
            Ok(value) => McpResponse::success(id, value),
            Err(e) => McpResponse::error(id, McpError::internal_error(e.to_string())),
        }
    }

    /// Get server info.
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamSpec;
    use gateway_policy::Service;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct TestTool {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Tool for TestTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("test_tool", "A test tool")
                .with_service(Service::Slack)
                .with_param(ParamSpec::string("channel", "Channel").required())
                .with_param(ParamSpec::integer("limit", "Limit").with_default(20))
        }

        async fn execute(&self, args: ValidatedArgs) -> GatewayResult<ToolResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ToolResult::text(format!(
                "{} {}",
                args.str("channel")?,
                args.int("limit")?
            )))
        }
    }

    fn server() -> (McpServer, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let mut server = McpServer::new("test-mcp", "0.0.0");
        server.register_tool(Arc::new(TestTool {
            calls: calls.clone(),
        }));
        (server, calls)
    }

    #[tokio::test]
    async fn test_register_tool() {
        let (server, _) = server();
        let tools = server.list_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "test_tool");
        assert_eq!(tools[0].service, Some(Service::Slack));
    }

    #[tokio::test]
    async fn test_call_tool_fills_defaults() {
        let (server, calls) = server();
        let result = server
            .call_tool("test_tool", serde_json::json!({"channel": "general"}))
            .await
            .unwrap();

        assert!(!result.is_error);
        assert_eq!(result.text_content(), "general 20");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_never_reaches_handler() {
        let (server, calls) = server();
        let err = server
            .call_tool("missing_tool", serde_json::json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::UnknownTool(ref name) if name == "missing_tool"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let result = server.dispatch("missing_tool", serde_json::json!({})).await;
        assert!(result.is_error);
        assert_eq!(result.text_content(), "Unknown tool: missing_tool");
    }

    #[tokio::test]
    async fn test_missing_required_never_reaches_handler() {
        let (server, calls) = server();
        let result = server.dispatch("test_tool", serde_json::json!({})).await;

        assert!(result.is_error);
        assert_eq!(
            result.text_content(),
            "Error executing test_tool: Missing required argument: channel"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handle_initialize() {
        let (server, _) = server();
        let resp = server
            .handle_request(McpRequest::new("1", "initialize"))
            .await
            .unwrap();

        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "test-mcp");
    }

    #[tokio::test]
    async fn test_handle_tools_call() {
        let (server, _) = server();
        let req = McpRequest::new(2i64, "tools/call").with_params(serde_json::json!({
            "name": "test_tool",
            "arguments": {"channel": "C0123456789", "limit": 5}
        }));
        let resp = server.handle_request(req).await.unwrap();

        let result = resp.result.unwrap();
        assert_eq!(result["isError"], false);
        assert_eq!(result["content"][0]["text"], "C0123456789 5");
    }

    #[tokio::test]
    async fn test_tool_failure_is_a_result_not_a_protocol_error() {
        let (server, _) = server();
        let req = McpRequest::new(3i64, "tools/call")
            .with_params(serde_json::json!({"name": "nope", "arguments": {}}));
        let resp = server.handle_request(req).await.unwrap();

        assert!(resp.error.is_none());
        assert_eq!(resp.result.unwrap()["isError"], true);
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let (server, _) = server();
        let resp = server
            .handle_request(McpRequest::notification("notifications/initialized"))
            .await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn test_null_id_gets_a_response() {
        let (server, _) = server();
        let request: McpRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).unwrap();
        let resp = server.handle_request(request).await.unwrap();

        assert_eq!(resp.id, RequestId::Null);
        let wire = serde_json::to_value(&resp).unwrap();
        assert!(wire["id"].is_null());
        assert_eq!(wire["result"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (server, _) = server();
        let resp = server
            .handle_request(McpRequest::new("4", "resources/list"))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, McpError::METHOD_NOT_FOUND);
    }
}
