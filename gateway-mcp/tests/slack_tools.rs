//! End-to-end tests for the Slack gateway tools.
//!
//! These tests drive the tools through the MCP dispatcher against a wiremock
//! stand-in for the Slack Web API and verify both the rendered reports and
//! which upstream calls were (or were not) made.
//!
//! Scenarios:
//! 1. list_channels: allowlist filtering per entry
//! 2. read_messages: resolution across pages, chronological order, sender cache
//! 3. read/send/delete: access denied before any content call
//! 4. upstream errors: missing scope, unknown channel after exhausting pages

use gateway_mcp::{slack_tools, McpServer, SlackClient, SlackConfig};
use gateway_policy::Allowlist;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Test fixture: mock Slack API plus a dispatcher wired to it.
struct TestFixture {
    /// Mock Slack server.
    slack_server: MockServer,
    /// Dispatcher with the Slack tools registered.
    server: McpServer,
}

impl TestFixture {
    /// Create a fixture with the given allowlist (empty = unrestricted).
    async fn new(allowlist: &str) -> Self {
        let slack_server = MockServer::start().await;

        let mut config = SlackConfig::new("xoxb-test");
        config.api_url = format!("{}/api", slack_server.uri());
        config.allowlist = Allowlist::parse(allowlist);
        config.max_messages = 100;

        let client = SlackClient::new(config.clone()).expect("client builds");
        let server = McpServer::new("slack-mcp", "test")
            .with_tools(slack_tools(Arc::new(client), Arc::new(config)));

        Self {
            slack_server,
            server,
        }
    }

    /// Dispatch a tool call and return (is_error, text).
    async fn call(&self, tool: &str, arguments: Value) -> (bool, String) {
        let result = self.server.dispatch(tool, arguments).await;
        (result.is_error, result.text_content())
    }
}

/// Serves `conversations.list` pages keyed by a `page-N` cursor.
struct PagedChannels {
    pages: Vec<Vec<Value>>,
}

impl Respond for PagedChannels {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let index = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "cursor")
            .and_then(|(_, value)| value.trim_start_matches("page-").parse::<usize>().ok())
            .unwrap_or(0);

        let next_cursor = if index + 1 < self.pages.len() {
            format!("page-{}", index + 1)
        } else {
            String::new()
        };

        ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "channels": self.pages[index],
            "response_metadata": {"next_cursor": next_cursor}
        }))
    }
}

fn channel(id: &str, name: &str, is_member: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "is_private": false,
        "is_member": is_member,
        "num_members": 12
    })
}

fn ok(body: Value) -> ResponseTemplate {
    let mut body = body;
    body["ok"] = json!(true);
    ResponseTemplate::new(200).set_body_json(body)
}

// =============================================================================
// Test 1: list_channels
// =============================================================================

/// Only allowlisted channels are rendered; the footer names the allowlist.
#[tokio::test]
async fn test_list_channels_filters_by_allowlist() {
    let fixture = TestFixture::new("general").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.list"))
        .and(header("authorization", "Bearer xoxb-test"))
        .and(query_param("types", "public_channel"))
        .and(query_param("exclude_archived", "true"))
        .respond_with(PagedChannels {
            pages: vec![vec![
                channel("C1", "general", true),
                channel("C2", "random", false),
            ]],
        })
        .expect(1)
        .mount(&fixture.slack_server)
        .await;

    let (is_error, text) = fixture.call("slack_list_channels", json!({})).await;

    assert!(!is_error, "unexpected error: {}", text);
    assert!(text.starts_with("**Accessible Slack Channels**\n\n"));
    assert!(text.contains("| C1 | #general | No | Yes | 12 |"));
    assert!(!text.contains("random"));
    assert!(text.ends_with("*Filtered by allowlist: general*"));
}

/// Listing stops once the requested count is reached, across pages.
#[tokio::test]
async fn test_list_channels_respects_limit_across_pages() {
    let fixture = TestFixture::new("").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.list"))
        .and(query_param("types", "public_channel,private_channel"))
        .respond_with(PagedChannels {
            pages: vec![
                vec![channel("C1", "one", true), channel("C2", "two", true)],
                vec![channel("C3", "three", true), channel("C4", "four", true)],
                vec![channel("C5", "five", true)],
            ],
        })
        .expect(2)
        .mount(&fixture.slack_server)
        .await;

    let (is_error, text) = fixture
        .call(
            "slack_list_channels",
            json!({"include_private": true, "limit": 3}),
        )
        .await;

    assert!(!is_error, "unexpected error: {}", text);
    assert!(text.contains("#three"));
    assert!(!text.contains("#four"));
    assert!(!text.contains("Filtered by allowlist"));
}

/// An allowlist that admits nothing yields the empty report.
#[tokio::test]
async fn test_list_channels_empty() {
    let fixture = TestFixture::new("secret").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.list"))
        .respond_with(PagedChannels {
            pages: vec![vec![channel("C1", "general", true)]],
        })
        .mount(&fixture.slack_server)
        .await;

    let (_, text) = fixture.call("slack_list_channels", json!({})).await;
    assert_eq!(text, "No accessible channels found.");
}

// =============================================================================
// Test 2: read_messages
// =============================================================================

/// `#general` resolves on the second page; messages render oldest first with
/// resolved sender names, and each sender is looked up once.
#[tokio::test]
async fn test_read_messages_resolves_and_orders() {
    let fixture = TestFixture::new("general").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.list"))
        .respond_with(PagedChannels {
            pages: vec![
                vec![channel("C0000000002", "random", false)],
                vec![channel("C0000000001", "general", true)],
            ],
        })
        .expect(2)
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.info"))
        .and(query_param("channel", "C0000000001"))
        .respond_with(ok(json!({"channel": channel("C0000000001", "general", true)})))
        .expect(1)
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.history"))
        .and(query_param("channel", "C0000000001"))
        .and(query_param("limit", "20"))
        .respond_with(ok(json!({
            "messages": [
                {"user": "U2", "text": "third", "ts": "1700000300.000300"},
                {"user": "U1", "text": "second", "ts": "1700000200.000200"},
                {"user": "U1", "text": "first", "ts": "1700000100.000100"}
            ]
        })))
        .expect(1)
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/users.info"))
        .and(query_param("user", "U1"))
        .respond_with(ok(json!({"user": {"id": "U1", "name": "ada", "real_name": "Ada Lovelace"}})))
        .expect(1)
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/users.info"))
        .and(query_param("user", "U2"))
        .respond_with(ok(json!({"user": {"id": "U2", "name": "bob"}})))
        .expect(1)
        .mount(&fixture.slack_server)
        .await;

    let (is_error, text) = fixture
        .call("slack_read_messages", json!({"channel": "#general"}))
        .await;

    assert!(!is_error, "unexpected error: {}", text);
    assert!(text.starts_with("**Messages from #general** (3 messages)\n\n"));

    let first = text.find("first").unwrap();
    let second = text.find("second").unwrap();
    let third = text.find("third").unwrap();
    assert!(first < second && second < third);

    assert!(text.contains(
        "**Ada Lovelace** (2023-11-14 22:15:00) [ts: 1700000100.000100]:\nfirst\n\n"
    ));
    assert!(text.contains("**bob** ("));
}

/// Bot and anonymous messages never trigger user lookups.
#[tokio::test]
async fn test_read_messages_bot_and_unknown_senders() {
    let fixture = TestFixture::new("").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.info"))
        .respond_with(ok(json!({"channel": channel("C0000000001", "general", true)})))
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.history"))
        .respond_with(ok(json!({
            "messages": [
                {"bot_id": "B1", "username": "deploy-bot", "text": "shipped", "ts": "1700000200.1"},
                {"text": "joined", "ts": "1700000100.1"}
            ]
        })))
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/users.info"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&fixture.slack_server)
        .await;

    let (_, text) = fixture
        .call("slack_read_messages", json!({"channel": "C0000000001"}))
        .await;

    assert!(text.contains("**deploy-bot** ("));
    assert!(text.contains("**Unknown** ("));
}

/// An empty history yields the empty report.
#[tokio::test]
async fn test_read_messages_empty_history() {
    let fixture = TestFixture::new("").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.info"))
        .respond_with(ok(json!({"channel": channel("C0000000001", "general", true)})))
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.history"))
        .and(query_param("limit", "20"))
        .respond_with(ok(json!({"messages": []})))
        .expect(1)
        .mount(&fixture.slack_server)
        .await;

    let (is_error, text) = fixture
        .call("slack_read_messages", json!({"channel": "C0000000001"}))
        .await;

    assert!(!is_error);
    assert_eq!(text, "No messages found in #general.");
}

/// Requested counts are capped by the configured maximum.
#[tokio::test]
async fn test_read_messages_limit_capped_by_config() {
    let fixture = TestFixture::new("").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.info"))
        .respond_with(ok(json!({"channel": channel("C0000000001", "general", true)})))
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.history"))
        .and(query_param("limit", "100"))
        .respond_with(ok(json!({
            "messages": [{"bot_id": "B1", "text": "hi", "ts": "1700000100.1"}]
        })))
        .expect(1)
        .mount(&fixture.slack_server)
        .await;

    let (is_error, text) = fixture
        .call(
            "slack_read_messages",
            json!({"channel": "C0000000001", "limit": 5000}),
        )
        .await;

    assert!(!is_error, "unexpected error: {}", text);
    assert!(text.starts_with("**Messages from #general** (1 messages)"));
}

/// A channel outside the allowlist is refused before its history is fetched.
#[tokio::test]
async fn test_read_messages_denied_outside_allowlist() {
    let fixture = TestFixture::new("general").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.info"))
        .respond_with(ok(json!({"channel": channel("C0RANDOM001", "random", true)})))
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.history"))
        .respond_with(ok(json!({"messages": []})))
        .expect(0)
        .mount(&fixture.slack_server)
        .await;

    let (is_error, text) = fixture
        .call("slack_read_messages", json!({"channel": "C0RANDOM001"}))
        .await;

    assert!(is_error);
    assert_eq!(
        text,
        "Error: Channel 'C0RANDOM001' is not in the allowed channels list."
    );
}

// =============================================================================
// Test 3: send_message / delete_message
// =============================================================================

/// A channel outside a non-empty allowlist is refused with zero posts.
#[tokio::test]
async fn test_send_message_denied_outside_allowlist() {
    let fixture = TestFixture::new("general").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.info"))
        .respond_with(ok(json!({"channel": channel("C0RANDOM001", "random", true)})))
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat.postMessage"))
        .respond_with(ok(json!({"channel": "C0RANDOM001", "ts": "1.0"})))
        .expect(0)
        .mount(&fixture.slack_server)
        .await;

    let (is_error, text) = fixture
        .call(
            "slack_send_message",
            json!({"channel": "C0RANDOM001", "message": "hello"}),
        )
        .await;

    assert!(is_error);
    assert_eq!(
        text,
        "Error: Channel 'C0RANDOM001' is not in the allowed channels list."
    );
}

/// An id-only allowlist still refuses a name that resolves to another channel.
#[tokio::test]
async fn test_send_message_by_name_checks_resolved_id() {
    let fixture = TestFixture::new("C0000000001").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.list"))
        .respond_with(PagedChannels {
            pages: vec![vec![
                channel("C0000000001", "general", true),
                channel("C0000000002", "random", true),
            ]],
        })
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.info"))
        .and(query_param("channel", "C0000000002"))
        .respond_with(ok(json!({"channel": channel("C0000000002", "random", true)})))
        .expect(1)
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat.postMessage"))
        .respond_with(ok(json!({"channel": "C0000000002", "ts": "1.0"})))
        .expect(0)
        .mount(&fixture.slack_server)
        .await;

    let (is_error, text) = fixture
        .call(
            "slack_send_message",
            json!({"channel": "random", "message": "hello"}),
        )
        .await;

    assert!(is_error);
    assert_eq!(
        text,
        "Error: Channel 'random' is not in the allowed channels list."
    );
}

/// An allowed channel gets the post, threaded when asked.
#[tokio::test]
async fn test_send_message_in_thread() {
    let fixture = TestFixture::new("general").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.info"))
        .respond_with(ok(json!({"channel": channel("C0GENERAL01", "general", true)})))
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat.postMessage"))
        .and(body_json(json!({
            "channel": "C0GENERAL01",
            "text": "hello",
            "thread_ts": "1700000000.000100"
        })))
        .respond_with(ok(json!({"channel": "C0GENERAL01", "ts": "1700000500.000200"})))
        .expect(1)
        .mount(&fixture.slack_server)
        .await;

    let (is_error, text) = fixture
        .call(
            "slack_send_message",
            json!({
                "channel": "C0GENERAL01",
                "message": "hello",
                "thread_ts": "1700000000.000100"
            }),
        )
        .await;

    assert!(!is_error, "unexpected error: {}", text);
    assert_eq!(
        text,
        "**Message sent successfully**\n\n\
         - Channel: #general\n\
         - Timestamp: 1700000500.000200\n\
         - Thread: 1700000000.000100\n\
         - Message: hello"
    );
}

/// When channel metadata is unavailable only an id entry can admit it.
#[tokio::test]
async fn test_delete_message_with_info_fallback() {
    let fixture = TestFixture::new("C0GENERAL01").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": false, "error": "channel_not_found"})),
        )
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat.delete"))
        .and(body_json(json!({"channel": "C0GENERAL01", "ts": "1700000500.000200"})))
        .respond_with(ok(json!({"channel": "C0GENERAL01", "ts": "1700000500.000200"})))
        .expect(1)
        .mount(&fixture.slack_server)
        .await;

    let (is_error, text) = fixture
        .call(
            "slack_delete_message",
            json!({"channel": "C0GENERAL01", "ts": "1700000500.000200"}),
        )
        .await;

    assert!(!is_error, "unexpected error: {}", text);
    assert_eq!(
        text,
        "**Message deleted successfully**\n\n\
         - Channel: #C0GENERAL01\n\
         - Deleted timestamp: 1700000500.000200"
    );
}

/// A channel outside the allowlist is refused before anything is deleted.
#[tokio::test]
async fn test_delete_message_denied_outside_allowlist() {
    let fixture = TestFixture::new("general").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.info"))
        .respond_with(ok(json!({"channel": channel("C0RANDOM001", "random", true)})))
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat.delete"))
        .respond_with(ok(json!({"channel": "C0RANDOM001", "ts": "1.0"})))
        .expect(0)
        .mount(&fixture.slack_server)
        .await;

    let (is_error, text) = fixture
        .call(
            "slack_delete_message",
            json!({"channel": "C0RANDOM001", "ts": "1700000500.000200"}),
        )
        .await;

    assert!(is_error);
    assert_eq!(
        text,
        "Error: Channel 'C0RANDOM001' is not in the allowed channels list."
    );
}

// =============================================================================
// Test 4: upstream errors
// =============================================================================

/// Slack's `needed` scope is carried into the report.
#[tokio::test]
async fn test_missing_scope_is_reported() {
    let fixture = TestFixture::new("").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.info"))
        .respond_with(ok(json!({"channel": channel("C0000000001", "general", true)})))
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "error": "missing_scope",
            "needed": "channels:history"
        })))
        .mount(&fixture.slack_server)
        .await;

    let (is_error, text) = fixture
        .call("slack_read_messages", json!({"channel": "C0000000001"}))
        .await;

    assert!(is_error);
    assert_eq!(
        text,
        "Error executing slack_read_messages: Slack API error: missing_scope\nMissing scope: channels:history"
    );
}

/// An unknown name fails only after every page was searched, and nothing is posted.
#[tokio::test]
async fn test_unknown_channel_exhausts_pages() {
    let fixture = TestFixture::new("").await;

    Mock::given(method("GET"))
        .and(path("/api/conversations.list"))
        .respond_with(PagedChannels {
            pages: vec![
                vec![channel("C0000000001", "general", true)],
                vec![channel("C0000000002", "random", true)],
                vec![channel("C0000000003", "eng", true)],
            ],
        })
        .expect(3)
        .mount(&fixture.slack_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat.postMessage"))
        .respond_with(ok(json!({"channel": "C0000000001", "ts": "1.0"})))
        .expect(0)
        .mount(&fixture.slack_server)
        .await;

    let (is_error, text) = fixture
        .call(
            "slack_send_message",
            json!({"channel": "#missing", "message": "hello"}),
        )
        .await;

    assert!(is_error);
    assert_eq!(
        text,
        "Error executing slack_send_message: Channel '#missing' not found. Use its ID or exact name."
    );
}

/// Missing required arguments never reach Slack.
#[tokio::test]
async fn test_missing_argument_makes_no_calls() {
    let fixture = TestFixture::new("").await;

    Mock::given(method("GET"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&fixture.slack_server)
        .await;

    let (is_error, text) = fixture
        .call("slack_send_message", json!({"channel": "C0000000001"}))
        .await;

    assert!(is_error);
    assert_eq!(
        text,
        "Error executing slack_send_message: Missing required argument: message"
    );
}
