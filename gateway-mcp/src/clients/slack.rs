//! Slack Web API client.
//!
//! Thin HTTP client over the handful of Web API methods the Slack gateway
//! needs. Reads go out as GET with query parameters, writes as JSON POST.
//! Slack answers most failures with HTTP 200 and `"ok": false`, so every
//! response body is checked for the `ok`/`error`/`needed` envelope.

use super::config::SlackConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::resolver::{Directory, DirectoryEntry, Page};
use async_trait::async_trait;
use gateway_policy::{ResourceRef, Service};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Slack client errors.
#[derive(Debug, Error)]
pub enum SlackError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Slack answered with `"ok": false`.
    #[error("{error}")]
    Api {
        /// Slack error code (e.g. `channel_not_found`).
        error: String,
        /// Missing OAuth scope, when Slack reports one.
        needed: Option<String>,
    },

    /// Rate limited by Slack.
    #[error("ratelimited (retry after {retry_after:?}s)")]
    RateLimited {
        /// Seconds to wait, from the `Retry-After` header.
        retry_after: Option<u64>,
    },

    /// Non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Response body did not have the expected shape.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl From<SlackError> for GatewayError {
    fn from(err: SlackError) -> Self {
        match err {
            SlackError::Api { error, needed } => GatewayError::Upstream {
                service: Service::Slack,
                message: error,
                needed,
            },
            other => GatewayError::upstream(Service::Slack, other.to_string()),
        }
    }
}

/// A conversation as returned by `conversations.list` / `conversations.info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Conversation id.
    pub id: String,

    /// Channel name without `#`. Absent for DMs.
    #[serde(default)]
    pub name: String,

    /// Private channel flag.
    #[serde(default)]
    pub is_private: bool,

    /// Whether the bot is a member.
    #[serde(default)]
    pub is_member: bool,

    /// Member count.
    #[serde(default)]
    pub num_members: u64,
}

impl Channel {
    /// Id and current name, for allowlist checks.
    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef::new(self.id.clone(), self.name.clone())
    }
}

/// A message from `conversations.history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Author user id; absent for some bot and system messages.
    #[serde(default)]
    pub user: Option<String>,

    /// Message text.
    #[serde(default)]
    pub text: Option<String>,

    /// Message timestamp, also its identifier within the channel.
    #[serde(default)]
    pub ts: String,

    /// Set on messages posted by bots.
    #[serde(default)]
    pub bot_id: Option<String>,

    /// Display name bots post under.
    #[serde(default)]
    pub username: Option<String>,
}

/// A workspace member from `users.info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id: String,

    /// Handle.
    #[serde(default)]
    pub name: Option<String>,

    /// Full name.
    #[serde(default)]
    pub real_name: Option<String>,
}

impl User {
    /// Best available display name: real name, then handle, then id.
    pub fn display_name(&self) -> String {
        [self.real_name.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .unwrap_or(&self.id)
            .to_string()
    }
}

/// Outcome of `chat.postMessage` / `chat.delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRef {
    /// Channel id.
    pub channel: String,
    /// Message timestamp.
    pub ts: String,
}

#[derive(Debug, Deserialize)]
struct ChannelList {
    #[serde(default)]
    channels: Vec<Channel>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelInfo {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct History {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    user: User,
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DeleteMessage<'a> {
    channel: &'a str,
    ts: &'a str,
}

/// Slack Web API client.
#[derive(Clone)]
pub struct SlackClient {
    /// HTTP client instance.
    client: Client,

    /// Gateway configuration (token, base URL).
    config: SlackConfig,
}

impl SlackClient {
    /// Conversation types searched by name resolution.
    pub const ALL_CHANNEL_TYPES: &'static str = "public_channel,private_channel";

    /// Create a new Slack client.
    pub fn new(config: SlackConfig) -> Result<Self, SlackError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, config })
    }

    /// List one page of non-archived conversations.
    #[instrument(skip(self))]
    pub async fn list_conversations(
        &self,
        types: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<Channel>, SlackError> {
        let limit = limit.to_string();
        let mut query = vec![
            ("types", types),
            ("exclude_archived", "true"),
            ("limit", limit.as_str()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }

        let list: ChannelList = self.get("conversations.list", &query).await?;
        let next_cursor = list.response_metadata.and_then(|meta| meta.next_cursor);
        debug!(count = list.channels.len(), "Fetched conversation page");
        Ok(Page::new(list.channels, next_cursor))
    }

    /// Fetch current metadata for a conversation.
    #[instrument(skip(self))]
    pub async fn conversation_info(&self, channel: &str) -> Result<Channel, SlackError> {
        let info: ChannelInfo = self
            .get("conversations.info", &[("channel", channel)])
            .await?;
        Ok(info.channel)
    }

    /// Fetch the most recent messages, newest first.
    #[instrument(skip(self))]
    pub async fn conversation_history(
        &self,
        channel: &str,
        limit: u32,
    ) -> Result<Vec<Message>, SlackError> {
        let limit = limit.to_string();
        let history: History = self
            .get(
                "conversations.history",
                &[("channel", channel), ("limit", limit.as_str())],
            )
            .await?;
        Ok(history.messages)
    }

    /// Look up a workspace member.
    #[instrument(skip(self))]
    pub async fn user_info(&self, user: &str) -> Result<User, SlackError> {
        let info: UserInfo = self.get("users.info", &[("user", user)]).await?;
        Ok(info.user)
    }

    /// Post a message, optionally as a thread reply.
    #[instrument(skip(self, text))]
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<MessageRef, SlackError> {
        let body = PostMessage {
            channel,
            text,
            thread_ts,
        };
        self.post("chat.postMessage", &body).await
    }

    /// Delete a message by timestamp.
    #[instrument(skip(self))]
    pub async fn delete_message(&self, channel: &str, ts: &str) -> Result<MessageRef, SlackError> {
        self.post("chat.delete", &DeleteMessage { channel, ts }).await
    }

    async fn get<T>(&self, method: &str, query: &[(&str, &str)]) -> Result<T, SlackError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .get(self.config.url(method))
            .bearer_auth(&self.config.bot_token)
            .query(query)
            .send()
            .await?;
        self.handle_response(method, response).await
    }

    async fn post<B, T>(&self, method: &str, body: &B) -> Result<T, SlackError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(self.config.url(method))
            .bearer_auth(&self.config.bot_token)
            .json(body)
            .send()
            .await?;
        self.handle_response(method, response).await
    }

    /// Check status and the `ok` envelope, then parse the payload.
    async fn handle_response<T>(
        &self,
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, SlackError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok());
            warn!(method, ?retry_after, "Slack rate limit hit");
            return Err(SlackError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(method, status = status.as_u16(), "Slack HTTP error");
            return Err(SlackError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SlackError::InvalidResponse(e.to_string()))?;

        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            let needed = body
                .get("needed")
                .and_then(Value::as_str)
                .map(str::to_string);
            warn!(method, %error, ?needed, "Slack API error");
            return Err(SlackError::Api { error, needed });
        }

        serde_json::from_value(body).map_err(|e| SlackError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl Directory for SlackClient {
    fn kind(&self) -> &'static str {
        "Channel"
    }

    async fn list_page(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> GatewayResult<Page<DirectoryEntry>> {
        let page = self
            .list_conversations(Self::ALL_CHANNEL_TYPES, cursor, limit)
            .await?;
        Ok(page.map(|channel| DirectoryEntry {
            id: channel.id,
            name: channel.name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_display_name_preference() {
        let user = User {
            id: "U1".to_string(),
            name: Some("ada".to_string()),
            real_name: Some("Ada Lovelace".to_string()),
        };
        assert_eq!(user.display_name(), "Ada Lovelace");

        let user = User {
            id: "U1".to_string(),
            name: Some("ada".to_string()),
            real_name: None,
        };
        assert_eq!(user.display_name(), "ada");

        let user = User {
            id: "U1".to_string(),
            name: None,
            real_name: None,
        };
        assert_eq!(user.display_name(), "U1");
    }

    #[test]
    fn test_channel_defaults() {
        let channel: Channel = serde_json::from_value(serde_json::json!({"id": "D0123456789"})).unwrap();
        assert_eq!(channel.name, "");
        assert!(!channel.is_private);
        assert_eq!(channel.num_members, 0);
    }

    #[test]
    fn test_api_error_keeps_needed_scope() {
        let err = GatewayError::from(SlackError::Api {
            error: "missing_scope".to_string(),
            needed: Some("chat:write".to_string()),
        });
        assert!(matches!(
            err,
            GatewayError::Upstream { service: Service::Slack, ref needed, .. }
                if needed.as_deref() == Some("chat:write")
        ));
    }

    #[test]
    fn test_post_body_omits_empty_thread() {
        let body = serde_json::to_value(PostMessage {
            channel: "C1",
            text: "hi",
            thread_ts: None,
        })
        .unwrap();
        assert!(body.get("thread_ts").is_none());
    }
}
