//! Slack MCP tools
//!
//! Channel listing plus read, post and delete on a single channel. The
//! channel-scoped tools share one path: resolve the caller's reference, fetch
//! the channel's current name, check the allowlist, and only then make the
//! call that reads or changes content.

use crate::clients::config::SlackConfig;
use crate::clients::slack::{Message, SlackClient};
use crate::error::GatewayResult;
use crate::format::{markdown_table, yes_no, TabularResult};
use crate::resolver::{Directory, Resolver, CHANNEL_ID_SHAPE, PAGE_SIZE};
use crate::schema::ParamSpec;
use crate::server::Tool;
use crate::types::{ToolDefinition, ToolResult};
use crate::validation::ValidatedArgs;
use async_trait::async_trait;
use chrono::DateTime;
use gateway_policy::{Action, ResourceRef, Service};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::at_least_one;

/// Hard ceiling on channels returned by one listing call.
pub const MAX_CHANNEL_LIMIT: usize = 1000;

/// Characters of the posted text echoed back in the send report.
const PREVIEW_CHARS: usize = 100;

const CHANNEL_DESCRIPTION: &str = "Channel ID (e.g., 'C1234567890') or name (e.g., 'general')";

/// Shared state for every Slack tool.
#[derive(Clone)]
struct SlackContext {
    client: Arc<SlackClient>,
    config: Arc<SlackConfig>,
}

impl SlackContext {
    /// Resolve a reference and gate it on the allowlist.
    ///
    /// The check always sees the resolved id and the channel's current name.
    async fn authorize(&self, reference: &str, action: Action) -> GatewayResult<ResourceRef> {
        let id = Resolver::new(self.client.as_ref(), CHANNEL_ID_SHAPE)
            .resolve(reference)
            .await?;

        let resource = match self.client.conversation_info(&id).await {
            Ok(channel) => channel.resource_ref(),
            Err(err) => {
                debug!(channel = %id, error = %err, "Channel info unavailable; checking by id only");
                ResourceRef::id_only(id)
            }
        };

        let kind = self.client.kind();
        if let Err(denied) = self.config.allowlist.check(&resource, action, kind, reference) {
            warn!(channel = %resource.id, action = %denied.action, "Channel outside allowlist");
            return Err(denied.into());
        }
        Ok(resource)
    }
}

/// Name to show for a channel: its current name, else the caller's reference.
fn display_name<'a>(resource: &'a ResourceRef, reference: &'a str) -> &'a str {
    if resource.name.is_empty() {
        reference.trim_start_matches('#')
    } else {
        &resource.name
    }
}

/// Tool to list accessible channels.
pub struct ListChannelsTool {
    ctx: SlackContext,
}

#[async_trait]
impl Tool for ListChannelsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "slack_list_channels",
            "List accessible Slack channels.\n\n\
             Returns the channels the bot has access to. If a channel allowlist is \
             configured, only those channels are returned. Use this to discover \
             available channels before reading or sending messages.",
        )
        .with_service(Service::Slack)
        .with_param(
            ParamSpec::boolean(
                "include_private",
                "Include private channels the bot is a member of (default: false)",
            )
            .with_default(false),
        )
        .with_param(
            ParamSpec::integer("limit", "Maximum number of channels to return (default: 100)")
                .with_default(100),
        )
    }

    #[instrument(skip(self, args), fields(tool = "slack_list_channels"))]
    async fn execute(&self, args: ValidatedArgs) -> GatewayResult<ToolResult> {
        let include_private = args.bool("include_private")?;
        let limit = at_least_one(args.int("limit")?).min(MAX_CHANNEL_LIMIT);
        let types = if include_private {
            SlackClient::ALL_CHANNEL_TYPES
        } else {
            "public_channel"
        };
        let allowlist = &self.ctx.config.allowlist;

        let mut channels = Vec::new();
        let mut cursor: Option<String> = None;

        'pages: loop {
            let page = self
                .ctx
                .client
                .list_conversations(types, cursor.as_deref(), PAGE_SIZE)
                .await?;

            for channel in page.items {
                let resource = channel.resource_ref();
                if let Err(denied) =
                    allowlist.check(&resource, Action::List, self.ctx.client.kind(), &channel.name)
                {
                    debug!(channel = %resource.id, action = %denied.action, "Skipping channel");
                    continue;
                }
                channels.push(channel);
                if channels.len() >= limit {
                    break 'pages;
                }
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(count = channels.len(), "Listed channels");
        if channels.is_empty() {
            return Ok(ToolResult::text("No accessible channels found."));
        }

        let mut table = TabularResult::new(["ID", "Name", "Private", "Bot Member", "Members"]);
        for channel in &channels {
            table.push_row([
                channel.id.clone(),
                format!("#{}", channel.name),
                yes_no(channel.is_private).to_string(),
                yes_no(channel.is_member).to_string(),
                channel.num_members.to_string(),
            ]);
        }

        let mut output = String::from("**Accessible Slack Channels**\n\n");
        output.push_str(&markdown_table(&table, MAX_CHANNEL_LIMIT));
        if !allowlist.is_unrestricted() {
            output.push_str(&format!("\n\n*Filtered by allowlist: {}*", allowlist));
        }
        Ok(ToolResult::text(output))
    }
}

/// Tool to read recent messages from a channel.
pub struct ReadMessagesTool {
    ctx: SlackContext,
}

impl ReadMessagesTool {
    /// Sender label for a message, filling `senders` as users are looked up.
    ///
    /// `senders` lives for one call only.
    async fn sender(&self, message: &Message, senders: &mut HashMap<String, String>) -> String {
        if message.bot_id.is_some() {
            return message.username.clone().unwrap_or_else(|| "Bot".to_string());
        }

        let Some(user) = message.user.as_deref() else {
            return "Unknown".to_string();
        };

        if let Some(name) = senders.get(user) {
            return name.clone();
        }

        let name = match self.ctx.client.user_info(user).await {
            Ok(info) => info.display_name(),
            Err(err) => {
                debug!(user, error = %err, "User lookup failed; showing raw id");
                user.to_string()
            }
        };
        senders.insert(user.to_string(), name.clone());
        name
    }
}

/// Render a Slack `ts` as `YYYY-MM-DD HH:MM:SS` UTC, or raw if unparsable.
pub fn format_timestamp(ts: &str) -> String {
    ts.split('.')
        .next()
        .and_then(|secs| secs.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[async_trait]
impl Tool for ReadMessagesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "slack_read_messages",
            "Read recent messages from a Slack channel.\n\n\
             Returns the most recent messages with sender, timestamp and content. \
             Only works for channels the bot has been added to and that are in the \
             allowlist (if configured).",
        )
        .with_service(Service::Slack)
        .with_param(ParamSpec::string("channel", CHANNEL_DESCRIPTION).required())
        .with_param(
            ParamSpec::integer(
                "limit",
                format!(
                    "Number of messages to retrieve (default: 20, max: {})",
                    self.ctx.config.max_messages
                ),
            )
            .with_default(20),
        )
    }

    #[instrument(skip(self, args), fields(tool = "slack_read_messages"))]
    async fn execute(&self, args: ValidatedArgs) -> GatewayResult<ToolResult> {
        let reference = args.str("channel")?;
        let limit = at_least_one(args.int("limit")?).min(self.ctx.config.max_messages as usize);

        let channel = self.ctx.authorize(reference, Action::Read).await?;
        let name = display_name(&channel, reference);

        let messages = self
            .ctx
            .client
            .conversation_history(&channel.id, limit as u32)
            .await?;

        if messages.is_empty() {
            return Ok(ToolResult::text(format!("No messages found in #{}.", name)));
        }

        let mut output = format!(
            "**Messages from #{}** ({} messages)\n\n",
            name,
            messages.len()
        );

        let mut senders = HashMap::new();
        // History arrives newest first.
        for message in messages.iter().rev() {
            let sender = self.sender(message, &mut senders).await;
            output.push_str(&format!(
                "**{}** ({}) [ts: {}]:\n{}\n\n",
                sender,
                format_timestamp(&message.ts),
                message.ts,
                message.text.as_deref().unwrap_or("(no text)")
            ));
        }

        Ok(ToolResult::text(output))
    }
}

/// Tool to post a message.
pub struct SendMessageTool {
    ctx: SlackContext,
}

#[async_trait]
impl Tool for SendMessageTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "slack_send_message",
            "Send a message to a Slack channel.\n\n\
             Posts a message as the bot user. Supports basic Slack formatting. Only \
             works for channels the bot has been added to and that are in the \
             allowlist (if configured).",
        )
        .with_service(Service::Slack)
        .with_param(ParamSpec::string("channel", CHANNEL_DESCRIPTION).required())
        .with_param(
            ParamSpec::string(
                "message",
                "The message text to send (supports Slack formatting)",
            )
            .required(),
        )
        .with_param(ParamSpec::string(
            "thread_ts",
            "Optional: Thread timestamp to reply in a thread",
        ))
    }

    #[instrument(skip(self, args), fields(tool = "slack_send_message"))]
    async fn execute(&self, args: ValidatedArgs) -> GatewayResult<ToolResult> {
        let reference = args.str("channel")?;
        let message = args.str("message")?;
        let thread_ts = args.opt_str("thread_ts")?;

        let channel = self.ctx.authorize(reference, Action::Post).await?;
        let posted = self
            .ctx
            .client
            .post_message(&channel.id, message, thread_ts)
            .await?;
        info!(channel = %channel.id, ts = %posted.ts, "Message posted");

        let mut output = String::from("**Message sent successfully**\n\n");
        output.push_str(&format!("- Channel: #{}\n", display_name(&channel, reference)));
        output.push_str(&format!("- Timestamp: {}\n", posted.ts));
        if let Some(thread_ts) = thread_ts {
            output.push_str(&format!("- Thread: {}\n", thread_ts));
        }
        output.push_str(&format!("- Message: {}", preview(message)));
        Ok(ToolResult::text(output))
    }
}

fn preview(message: &str) -> String {
    let mut chars = message.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Tool to delete a message.
pub struct DeleteMessageTool {
    ctx: SlackContext,
}

#[async_trait]
impl Tool for DeleteMessageTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "slack_delete_message",
            "Delete a message from a Slack channel.\n\n\
             The bot can only delete messages it sent, unless it has admin \
             permissions. Use slack_read_messages to get message timestamps (ts).",
        )
        .with_service(Service::Slack)
        .with_param(ParamSpec::string("channel", CHANNEL_DESCRIPTION).required())
        .with_param(
            ParamSpec::string(
                "ts",
                "The timestamp of the message to delete (from the ts field)",
            )
            .required(),
        )
    }

    #[instrument(skip(self, args), fields(tool = "slack_delete_message"))]
    async fn execute(&self, args: ValidatedArgs) -> GatewayResult<ToolResult> {
        let reference = args.str("channel")?;
        let ts = args.str("ts")?;

        let channel = self.ctx.authorize(reference, Action::Delete).await?;
        self.ctx.client.delete_message(&channel.id, ts).await?;
        info!(channel = %channel.id, ts, "Message deleted");

        let mut output = String::from("**Message deleted successfully**\n\n");
        output.push_str(&format!("- Channel: #{}\n", display_name(&channel, reference)));
        output.push_str(&format!("- Deleted timestamp: {}", ts));
        Ok(ToolResult::text(output))
    }
}

/// Get all Slack tools.
pub fn slack_tools(client: Arc<SlackClient>, config: Arc<SlackConfig>) -> Vec<Arc<dyn Tool>> {
    let ctx = SlackContext { client, config };
    vec![
        Arc::new(ListChannelsTool { ctx: ctx.clone() }),
        Arc::new(ReadMessagesTool { ctx: ctx.clone() }),
        Arc::new(SendMessageTool { ctx: ctx.clone() }),
        Arc::new(DeleteMessageTool { ctx }),
    ]
}
