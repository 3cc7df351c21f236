//! Gateway configuration.
//!
//! Each gateway reads its settings from environment variables once at
//! startup and passes the resulting value object to every component.
//! Missing credentials fail here rather than on the first tool call.

use gateway_policy::Allowlist;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Athena gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaConfig {
    /// AWS shared-config profile used for credentials.
    pub profile_name: String,

    /// AWS region.
    pub region: String,

    /// Athena workgroup queries run in.
    pub workgroup: String,

    /// Database used when a call does not name one.
    pub database: String,

    /// Data catalog holding the databases.
    pub catalog: String,

    /// S3 prefix under which each query gets its own result location.
    pub output_location: String,

    /// Interval between query state polls, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for AthenaConfig {
    fn default() -> Self {
        Self {
            profile_name: "voodoo-adn-prod".to_string(),
            region: "eu-west-1".to_string(),
            workgroup: "adn-s3-query-engine".to_string(),
            database: "adn_lakehouse_silver".to_string(),
            catalog: "AwsDataCatalog".to_string(),
            output_location:
                "s3://voodoo-adn-lakehouse-sandbox-20240913130058669800000001/athena-mcp"
                    .to_string(),
            poll_interval_ms: 500,
        }
    }
}

impl AthenaConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `AWS_PROFILE_NAME`: AWS profile (default: voodoo-adn-prod)
    /// - `AWS_REGION_NAME`: AWS region (default: eu-west-1)
    /// - `ATHENA_WORKGROUP`: Workgroup (default: adn-s3-query-engine)
    /// - `ATHENA_DATABASE`: Default database (default: adn_lakehouse_silver)
    /// - `ATHENA_CATALOG`: Data catalog (default: AwsDataCatalog)
    /// - `ATHENA_S3_OUTPUT`: Result location prefix
    /// - `ATHENA_POLL_INTERVAL_MS`: Query state poll interval (default: 500)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let config = Self {
            profile_name: lookup("AWS_PROFILE_NAME").unwrap_or(default.profile_name),
            region: lookup("AWS_REGION_NAME").unwrap_or(default.region),
            workgroup: lookup("ATHENA_WORKGROUP").unwrap_or(default.workgroup),
            database: lookup("ATHENA_DATABASE").unwrap_or(default.database),
            catalog: lookup("ATHENA_CATALOG").unwrap_or(default.catalog),
            output_location: lookup("ATHENA_S3_OUTPUT").unwrap_or(default.output_location),
            poll_interval_ms: parse_or(&lookup, "ATHENA_POLL_INTERVAL_MS", default.poll_interval_ms)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail on the first query.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.output_location.starts_with("s3://") {
            return Err(ConfigError::InvalidValue {
                key: "ATHENA_S3_OUTPUT".to_string(),
                message: format!("expected an s3:// URI, got '{}'", self.output_location),
            });
        }
        Ok(())
    }

    /// Poll interval as a Duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// A result location no other call will use.
    pub fn fresh_output_location(&self) -> String {
        format!(
            "{}/{}",
            self.output_location.trim_end_matches('/'),
            Uuid::now_v7()
        )
    }
}

/// Slack gateway configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token (`xoxb-…`).
    #[serde(skip_serializing)]
    pub bot_token: String,

    /// Web API base URL.
    pub api_url: String,

    /// Channels the gateway may touch; empty means all.
    pub allowlist: Allowlist,

    /// Ceiling on messages returned by one history read.
    pub max_messages: u32,

    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl SlackConfig {
    /// Default Web API base URL.
    pub const DEFAULT_API_URL: &'static str = "https://slack.com/api";

    /// Configuration with a token and defaults for everything else.
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_url: Self::DEFAULT_API_URL.to_string(),
            allowlist: Allowlist::unrestricted(),
            max_messages: 100,
            timeout_secs: 30,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SLACK_BOT_TOKEN`: Bot token (required)
    /// - `SLACK_CHANNEL_ALLOWLIST`: Comma-separated channel ids or names (default: all)
    /// - `SLACK_MAX_MESSAGES`: Max messages per read (default: 100)
    /// - `SLACK_API_URL`: Web API base URL (default: https://slack.com/api)
    /// - `SLACK_TIMEOUT_SECS`: Request timeout in seconds (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("SLACK_BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("SLACK_BOT_TOKEN".to_string()))?;
        let default = Self::new(bot_token);

        let config = Self {
            allowlist: lookup("SLACK_CHANNEL_ALLOWLIST")
                .map(|raw| Allowlist::parse(&raw))
                .unwrap_or(default.allowlist),
            max_messages: parse_or(&lookup, "SLACK_MAX_MESSAGES", default.max_messages)?,
            api_url: lookup("SLACK_API_URL").unwrap_or(default.api_url),
            timeout_secs: parse_or(&lookup, "SLACK_TIMEOUT_SECS", default.timeout_secs)?,
            bot_token: default.bot_token,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_messages == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SLACK_MAX_MESSAGES".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build a full URL for a Web API method.
    pub fn url(&self, method: &str) -> String {
        let base = self.api_url.trim_end_matches('/');
        let method = method.trim_start_matches('/');
        format!("{}/{}", base, method)
    }
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("allowlist", &self.allowlist)
            .field("max_messages", &self.max_messages)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}
